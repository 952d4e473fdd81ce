//! Pure compilation of [`Request`] descriptors into [`BoundRequest`] values.
//!
//! Compilation resolves a descriptor's service to a base URL and joins it with the
//! descriptor's path. It performs no I/O and touches no token state, so the same
//! descriptor and resolver always produce the same bound request and tests can assert on
//! compiled output directly.

// self
use crate::{
	_prelude::*,
	error::CompileError,
	http::{Headers, HttpRequest, Method},
	request::{Request, StatusPredicate},
	service::ServiceType,
};

/// Header carrying the auth token on every effected request.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Synchronous base-URL lookup used by the compiler.
pub trait ResolveEndpoint {
	/// Returns the base URL for `service`.
	fn endpoint(&self, service: ServiceType) -> Result<Url, CompileError>;
}

/// A [`Request`] resolved to an absolute URL, ready to execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundRequest {
	/// Service the call is addressed to.
	pub service_type: ServiceType,
	/// HTTP verb.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Extra headers copied from the descriptor.
	pub headers: Option<Headers>,
	/// JSON payload copied from the descriptor.
	pub data: Option<Value>,
	/// Success predicate copied from the descriptor.
	pub success: StatusPredicate,
	/// Re-authentication statuses copied from the descriptor.
	pub reauth_statuses: BTreeSet<u16>,
	/// Whether the response body is decoded as JSON.
	pub json_response: bool,
}
impl BoundRequest {
	/// Builds the transport request, attaching `token` as the auth header.
	///
	/// Descriptor headers are applied last and may override the defaults, except for the
	/// auth header which always carries the current token.
	pub fn to_http_request(&self, token: &str) -> HttpRequest {
		let mut headers = Headers::new();

		headers.insert("accept".into(), "application/json".into());

		let body = self.data.as_ref().map(|data| data.to_string().into_bytes());

		if body.is_some() {
			headers.insert("content-type".into(), "application/json".into());
		}
		if let Some(extra) = &self.headers {
			for (name, value) in extra {
				headers.insert(name.to_ascii_lowercase(), value.clone());
			}
		}

		headers.insert(AUTH_TOKEN_HEADER.into(), token.to_owned());

		HttpRequest { method: self.method, url: self.url.clone(), headers, body }
	}
}

/// Compiles one descriptor against `resolver`.
pub fn compile<R>(request: &Request, resolver: &R) -> Result<BoundRequest, CompileError>
where
	R: ?Sized + ResolveEndpoint,
{
	let url = if is_absolute(&request.path) {
		parse_url(request.path.clone())?
	} else {
		join_url(&resolver.endpoint(request.service)?, &request.path)?
	};

	Ok(BoundRequest {
		service_type: request.service,
		method: request.method,
		url,
		headers: request.headers.clone(),
		data: request.data.clone(),
		success: request.success.clone(),
		reauth_statuses: request.reauth_statuses.clone(),
		json_response: request.json_response,
	})
}

/// Compiles every descriptor in order, failing on the first programmer error.
pub fn compile_batch<R>(requests: &[Request], resolver: &R) -> Result<Vec<BoundRequest>, CompileError>
where
	R: ?Sized + ResolveEndpoint,
{
	requests.iter().map(|request| compile(request, resolver)).collect()
}

fn is_absolute(path: &str) -> bool {
	path.starts_with("http://") || path.starts_with("https://")
}

fn join_url(base: &Url, path: &str) -> Result<Url, CompileError> {
	if path.is_empty() {
		return Ok(base.clone());
	}

	let joined =
		format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	parse_url(joined)
}

fn parse_url(raw: String) -> Result<Url, CompileError> {
	Url::parse(&raw).map_err(|source| CompileError::InvalidUrl { url: raw, source })
}
