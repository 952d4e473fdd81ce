//! JSON configuration for building an [`Effector`](crate::effect::Effector).
//!
//! ```json
//! {
//!   "region": "ORD",
//!   "endpoints": {
//!     "autoscale": { "ORD": "https://ord.autoscale.api.example.com/v1.0/123456" }
//!   },
//!   "identity": {
//!     "url": "https://identity.api.example.com/v2.0",
//!     "credentials": { "kind": "api_key", "username": "demo", "api_key": "..." }
//!   },
//!   "max_concurrency": 16,
//!   "request_timeout_secs": 30
//! }
//! ```
//!
//! Either `identity` or a pre-issued `token` must be present. Parse failures report the JSON
//! path of the offending field.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::{IdentityCredentials, TokenSecret},
	error::ConfigError,
	service::{EndpointCatalog, ServiceType},
};

/// Identity endpoint plus the credentials posted to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
	/// Identity service base URL; tokens are requested from `{url}/tokens`.
	pub url: Url,
	/// Credentials exchanged for a token.
	pub credentials: IdentityCredentials,
}

/// Settings used to assemble the transport, authenticator, and executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectorConfig {
	/// Region requests resolve against.
	pub region: String,
	/// Base URL per service, keyed by region.
	pub endpoints: BTreeMap<ServiceType, BTreeMap<String, Url>>,
	/// Identity service used to mint and refresh tokens.
	#[serde(default)]
	pub identity: Option<IdentityConfig>,
	/// Pre-issued token used when no identity service is configured.
	#[serde(default)]
	pub token: Option<TokenSecret>,
	/// Upper bound on concurrently dispatched requests; unbounded when absent.
	#[serde(default)]
	pub max_concurrency: Option<usize>,
	/// Per-request transport timeout.
	#[serde(default = "EffectorConfig::default_request_timeout_secs")]
	pub request_timeout_secs: u64,
}
impl EffectorConfig {
	/// Timeout applied when the document does not set one.
	pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let config: Self =
			serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(raw))?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;

		Self::from_json_str(&raw)
	}

	/// Checks invariants serde cannot express.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (service, by_region) in &self.endpoints {
			for url in by_region.values() {
				if !matches!(url.scheme(), "http" | "https") {
					return Err(ConfigError::InvalidEndpoint {
						service: service.to_string(),
						url: url.to_string(),
					});
				}
			}
		}

		if let Some(identity) = &self.identity {
			if !matches!(identity.url.scheme(), "http" | "https") {
				return Err(ConfigError::InvalidEndpoint {
					service: "identity".into(),
					url: identity.url.to_string(),
				});
			}
		} else if self.token.is_none() {
			return Err(ConfigError::MissingCredentials);
		}
		if self.max_concurrency == Some(0) {
			return Err(ConfigError::ZeroConcurrency);
		}

		Ok(())
	}

	/// Builds the endpoint catalog for the configured region.
	pub fn catalog(&self) -> EndpointCatalog {
		EndpointCatalog { region: self.region.clone(), endpoints: self.endpoints.clone() }
	}

	/// Returns the per-request timeout.
	pub fn request_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.request_timeout_secs)
	}

	fn default_request_timeout_secs() -> u64 {
		Self::DEFAULT_REQUEST_TIMEOUT_SECS
	}
}
