//! Named backend services and the per-region endpoint catalog that locates them.

// self
use crate::{_prelude::*, compile::ResolveEndpoint, error::CompileError};

/// Backend service a request is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
	/// Compute (Nova-compatible servers API).
	CloudServers,
	/// Cloud load balancers API.
	CloudLoadBalancers,
	/// Autoscale groups and policies API.
	Autoscale,
	/// RackConnect v3 API.
	RackConnect,
}
impl ServiceType {
	/// Every known service, in declaration order.
	pub const ALL: [Self; 4] =
		[Self::CloudServers, Self::CloudLoadBalancers, Self::Autoscale, Self::RackConnect];

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CloudServers => "cloud_servers",
			Self::CloudLoadBalancers => "cloud_load_balancers",
			Self::Autoscale => "autoscale",
			Self::RackConnect => "rack_connect",
		}
	}

	/// Returns the name the service carries in an identity service catalog.
	pub const fn catalog_name(self) -> &'static str {
		match self {
			Self::CloudServers => "cloudServersOpenStack",
			Self::CloudLoadBalancers => "cloudLoadBalancers",
			Self::Autoscale => "autoscale",
			Self::RackConnect => "rackconnect",
		}
	}
}
impl Display for ServiceType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Base URLs per service and region, plus the region requests default to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCatalog {
	/// Region used when a caller does not name one.
	pub region: String,
	/// Base URL for each service, keyed by region.
	pub endpoints: BTreeMap<ServiceType, BTreeMap<String, Url>>,
}
impl EndpointCatalog {
	/// Creates an empty catalog defaulting to `region`.
	pub fn new(region: impl Into<String>) -> Self {
		Self { region: region.into(), endpoints: BTreeMap::new() }
	}

	/// Registers (or replaces) the base URL for a service in a region.
	pub fn with_endpoint(mut self, service: ServiceType, region: impl Into<String>, url: Url) -> Self {
		self.endpoints.entry(service).or_default().insert(region.into(), url);

		self
	}

	/// Looks up the base URL for a service in an explicit region.
	pub fn lookup(&self, service: ServiceType, region: &str) -> Result<Url, CompileError> {
		self.endpoints
			.get(&service)
			.and_then(|by_region| by_region.get(region))
			.cloned()
			.ok_or_else(|| CompileError::UnknownService { service, region: region.to_owned() })
	}
}
impl ResolveEndpoint for EndpointCatalog {
	fn endpoint(&self, service: ServiceType) -> Result<Url, CompileError> {
		self.lookup(service, &self.region)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse catalog fixture URL.")
	}

	#[test]
	fn lookup_respects_region() {
		let catalog = EndpointCatalog::new("ORD")
			.with_endpoint(ServiceType::CloudServers, "ORD", url("https://ord.servers.example.com/v2/1"))
			.with_endpoint(ServiceType::CloudServers, "DFW", url("https://dfw.servers.example.com/v2/1"));

		assert_eq!(
			catalog.endpoint(ServiceType::CloudServers).expect("ORD endpoint should resolve.").host_str(),
			Some("ord.servers.example.com"),
		);
		assert_eq!(
			catalog
				.lookup(ServiceType::CloudServers, "DFW")
				.expect("DFW endpoint should resolve.")
				.host_str(),
			Some("dfw.servers.example.com"),
		);

		let err = catalog
			.lookup(ServiceType::CloudServers, "SYD")
			.expect_err("Unknown regions should not resolve.");

		assert!(matches!(err, CompileError::UnknownService { ref region, .. } if region == "SYD"));
	}

	#[test]
	fn catalog_deserializes_service_keys() {
		let catalog: EndpointCatalog = serde_json::from_str(
			r#"{"region":"ORD","endpoints":{"cloud_load_balancers":{"ORD":"https://lb.example.com/v1.0/1"}}}"#,
		)
		.expect("Catalog JSON should deserialize.");

		assert!(catalog.endpoint(ServiceType::CloudLoadBalancers).is_ok());
		assert!(catalog.endpoint(ServiceType::Autoscale).is_err());
		assert_eq!(ServiceType::CloudServers.catalog_name(), "cloudServersOpenStack");
	}
}
