//! Declarative request descriptors produced by a convergence planner.
//!
//! A [`Request`] names the backend service, verb, and path of one HTTP call along with
//! how its response should be judged. It carries no URL or credentials; those are bound
//! later by [`compile`](crate::compile::compile). Defaults for the success predicate,
//! re-authentication statuses, and JSON decoding live here so every call site agrees on
//! them.

pub mod predicate;

pub use predicate::*;

// self
use crate::{
	_prelude::*,
	http::{Headers, Method},
	service::ServiceType,
};

/// One HTTP call a convergence pass wants to make.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
	/// Service the call is addressed to.
	pub service: ServiceType,
	/// HTTP verb.
	pub method: Method,
	/// Path relative to the service's base URL, or an absolute link returned by the API.
	pub path: String,
	/// Extra headers; `None` is kept distinct from an empty map.
	#[serde(default)]
	pub headers: Option<Headers>,
	/// JSON payload; `None` means the request has no body.
	#[serde(default)]
	pub data: Option<Value>,
	/// Predicate deciding whether the response counts as success.
	#[serde(default)]
	pub success: StatusPredicate,
	/// Statuses that trigger a token refresh followed by one retry.
	#[serde(default = "Request::default_reauth_statuses")]
	pub reauth_statuses: BTreeSet<u16>,
	/// Whether a non-empty response body should be decoded as JSON.
	#[serde(default = "Request::default_json_response")]
	pub json_response: bool,
}
impl Request {
	/// Status codes a request succeeds on unless overridden.
	pub const DEFAULT_SUCCESS_CODES: [u16; 1] = [200];
	/// Status codes that trigger re-authentication unless overridden.
	pub const DEFAULT_REAUTH_STATUSES: [u16; 2] = [401, 403];

	/// Creates a descriptor with default headers, data, predicate, and reauth statuses.
	pub fn new(service: ServiceType, method: Method, path: impl Into<String>) -> Self {
		Self {
			service,
			method,
			path: path.into(),
			headers: None,
			data: None,
			success: StatusPredicate::has_code(Self::DEFAULT_SUCCESS_CODES),
			reauth_statuses: Self::default_reauth_statuses(),
			json_response: Self::default_json_response(),
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(service: ServiceType, path: impl Into<String>) -> Self {
		Self::new(service, Method::Get, path)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(service: ServiceType, path: impl Into<String>) -> Self {
		Self::new(service, Method::Post, path)
	}

	/// Shorthand for a `PUT` descriptor.
	pub fn put(service: ServiceType, path: impl Into<String>) -> Self {
		Self::new(service, Method::Put, path)
	}

	/// Shorthand for a `DELETE` descriptor.
	pub fn delete(service: ServiceType, path: impl Into<String>) -> Self {
		Self::new(service, Method::Delete, path)
	}

	/// Attaches extra headers.
	pub fn with_headers(mut self, headers: Headers) -> Self {
		self.headers = Some(headers);

		self
	}

	/// Attaches a JSON payload.
	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);

		self
	}

	/// Overrides the success predicate.
	pub fn with_success(mut self, success: StatusPredicate) -> Self {
		self.success = success;

		self
	}

	/// Overrides the success predicate with an explicit code list.
	pub fn with_success_codes(self, codes: impl IntoIterator<Item = u16>) -> Self {
		self.with_success(StatusPredicate::has_code(codes))
	}

	/// Overrides the re-authentication statuses.
	pub fn with_reauth_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
		self.reauth_statuses = statuses.into_iter().collect();

		self
	}

	/// Toggles JSON decoding of the response body.
	pub fn with_json_response(mut self, json_response: bool) -> Self {
		self.json_response = json_response;

		self
	}

	fn default_reauth_statuses() -> BTreeSet<u16> {
		Self::DEFAULT_REAUTH_STATUSES.into_iter().collect()
	}

	fn default_json_response() -> bool {
		true
	}
}
