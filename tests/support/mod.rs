//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};
// crates.io
use httpmock::MockServer;
// self
use autoscale_effector::{
	auth::{Authenticator, Credentials, TokenFuture, TokenSecret, TokenSource},
	effect::ReqwestEffector,
	error::EffectError,
	service::{EndpointCatalog, ServiceType},
	url::Url,
};

pub const REGION: &str = "ORD";

/// Mints `token-1`, `token-2`, ... and counts acquisitions.
#[derive(Debug, Default)]
pub struct CountingSource {
	calls: AtomicU64,
	fail_after: Option<u64>,
}
impl CountingSource {
	/// Succeeds for the first `n` acquisitions, then fails every later one.
	pub fn failing_after(n: u64) -> Self {
		Self { calls: AtomicU64::new(0), fail_after: Some(n) }
	}

	pub fn calls(&self) -> u64 {
		self.calls.load(Ordering::SeqCst)
	}
}
impl TokenSource for CountingSource {
	fn acquire(&self) -> TokenFuture<'_> {
		let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let fail = self.fail_after.is_some_and(|limit| n > limit);

		Box::pin(async move {
			if fail {
				Err(EffectError::authentication("identity is down"))
			} else {
				Ok(Credentials::new(TokenSecret::new(format!("token-{n}"))))
			}
		})
	}
}

/// Plain-HTTP URL for `path` on the mock server.
///
/// `MockServer::url` prefers `https` once the TLS feature is on, and the default reqwest
/// transport rejects the mock's self-signed certificate.
pub fn http_url(server: &MockServer, path: &str) -> String {
	format!("http://{}{path}", server.address())
}

/// Routes every service in [`REGION`] to `{server}{prefix}`.
pub fn catalog(server: &MockServer, prefix: &str) -> EndpointCatalog {
	let base = Url::parse(&http_url(server, prefix)).expect("Mock server URL should parse.");

	ServiceType::ALL
		.into_iter()
		.fold(EndpointCatalog::new(REGION), |catalog, service| {
			catalog.with_endpoint(service, REGION, base.clone())
		})
}

pub fn effector_with(
	server: &MockServer,
	prefix: &str,
	source: CountingSource,
) -> (ReqwestEffector, Arc<CountingSource>) {
	let source = Arc::new(source);
	let dyn_source: Arc<dyn TokenSource> = source.clone();
	let authenticator = Authenticator::new(catalog(server, prefix), dyn_source);

	(ReqwestEffector::new(authenticator), source)
}

pub fn effector(server: &MockServer, prefix: &str) -> (ReqwestEffector, Arc<CountingSource>) {
	effector_with(server, prefix, CountingSource::default())
}
