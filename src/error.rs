//! Effector error types shared by the compiler, executor, authenticator, and helpers.

// self
use crate::{_prelude::*, autoscale::ValidationError, outcome::BatchError, service::ServiceType};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs that may fail as a whole.
///
/// Per-request failures inside a batch never surface here directly; they become
/// [`Outcome::Failure`](crate::outcome::Outcome::Failure) entries instead.
#[derive(Debug, ThisError)]
pub enum Error {
	/// A request descriptor could not be compiled.
	#[error(transparent)]
	Compile(#[from] CompileError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A single effected request failed.
	#[error(transparent)]
	Effect(#[from] EffectError),
	/// One or more requests in a batch failed.
	#[error(transparent)]
	Batch(#[from] BatchError),
	/// A payload was rejected before being sent.
	#[error(transparent)]
	Validation(#[from] ValidationError),
}

/// Programmer errors raised synchronously while compiling request descriptors.
#[derive(Debug, ThisError)]
pub enum CompileError {
	/// The endpoint catalog has no entry for the service in the region.
	#[error("No endpoint is configured for service `{service}` in region `{region}`.")]
	UnknownService {
		/// Service the descriptor targeted.
		service: ServiceType,
		/// Region that was searched.
		region: String,
	},
	/// Joining the base URL and path produced an invalid URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// The rejected URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Configuration and validation failures raised while building an effector.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// JSON path of the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Configuration file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
	/// An endpoint uses a scheme other than HTTP(S).
	#[error("Endpoint for `{service}` must use HTTP or HTTPS: {url}.")]
	InvalidEndpoint {
		/// Service the endpoint belongs to.
		service: String,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Neither identity credentials nor a pre-issued token were configured.
	#[error("Configuration must provide identity credentials or a token.")]
	MissingCredentials,
	/// The concurrency cap must be positive.
	#[error("The max_concurrency value must be positive.")]
	ZeroConcurrency,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Parse { path: e.path().to_string(), source: e.into_inner() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Stable labels for [`EffectError`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectErrorKind {
	/// See [`EffectError::Authentication`].
	Authentication,
	/// See [`EffectError::UnexpectedStatus`].
	UnexpectedStatus,
	/// See [`EffectError::Transport`].
	Transport,
	/// See [`EffectError::Decode`].
	Decode,
}
impl EffectErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authentication => "authentication",
			Self::UnexpectedStatus => "unexpected_status",
			Self::Transport => "transport",
			Self::Decode => "decode",
		}
	}
}
impl Display for EffectErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Failure of a single effected request.
///
/// Values are cheap to clone so a failed token refresh can be handed to every request
/// that was waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum EffectError {
	/// Token acquisition or refresh failed.
	#[error("Authentication failed: {reason}.")]
	Authentication {
		/// Identity- or effector-supplied reason string.
		reason: String,
		/// HTTP status returned by the identity endpoint, when available.
		status: Option<u16>,
	},
	/// The response status was rejected by the request's success predicate.
	#[error("Unexpected HTTP status {status}.")]
	UnexpectedStatus {
		/// Status of the final attempt.
		status: u16,
		/// Raw response body, when one was returned.
		body: Option<String>,
	},
	/// Connection-level failure (DNS, TCP, TLS, timeout).
	#[error("Transport failure: {source}.")]
	Transport {
		/// Transport-specific error.
		#[source]
		source: Arc<dyn std::error::Error + Send + Sync>,
	},
	/// The response body was expected to be JSON but could not be parsed.
	#[error("Response body is not valid JSON: {detail}.")]
	Decode {
		/// Parser message including the failing path.
		detail: String,
		/// Raw response body kept for diagnostics.
		body: String,
	},
}
impl EffectError {
	/// Wraps a transport-specific error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Arc::new(src) }
	}

	/// Builds an authentication failure from any displayable reason.
	pub fn authentication(reason: impl Display) -> Self {
		Self::Authentication { reason: reason.to_string(), status: None }
	}

	/// Returns the variant label.
	pub fn kind(&self) -> EffectErrorKind {
		match self {
			Self::Authentication { .. } => EffectErrorKind::Authentication,
			Self::UnexpectedStatus { .. } => EffectErrorKind::UnexpectedStatus,
			Self::Transport { .. } => EffectErrorKind::Transport,
			Self::Decode { .. } => EffectErrorKind::Decode,
		}
	}

	/// Returns the HTTP status carried by the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Authentication { status, .. } => *status,
			Self::UnexpectedStatus { status, .. } => Some(*status),
			Self::Transport { .. } | Self::Decode { .. } => None,
		}
	}

	/// Re-labels any failure raised while acquiring a token as an authentication failure.
	pub(crate) fn into_authentication(self) -> Self {
		match self {
			Self::Authentication { .. } => self,
			other => Self::Authentication { reason: other.to_string(), status: other.status() },
		}
	}
}
