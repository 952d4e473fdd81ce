//! Per-request results produced by the executor.

// self
use crate::{
	_prelude::*,
	compile::BoundRequest,
	error::EffectError,
	http::Method,
	service::ServiceType,
};

/// Decoded response body of a successful request.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
	/// Body parsed as JSON.
	Json(Value),
	/// Body kept as text because JSON decoding was not requested.
	Text(String),
}
impl ResponseBody {
	/// Returns the JSON value, if the body was decoded as JSON.
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Self::Json(value) => Some(value),
			Self::Text(_) => None,
		}
	}

	/// Returns the text, if the body was kept as text.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Json(_) => None,
			Self::Text(text) => Some(text),
		}
	}
}

/// Result of effecting one bound request.
#[derive(Clone, Debug)]
pub enum Outcome {
	/// The success predicate accepted the final status.
	Success {
		/// Final HTTP status.
		status: u16,
		/// Decoded body; `None` when the body was empty or whitespace.
		body: Option<ResponseBody>,
	},
	/// The request failed; see [`EffectError`] for the cause.
	Failure(EffectError),
}
impl Outcome {
	/// Returns `true` for [`Outcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// Returns the final HTTP status, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Success { status, .. } => Some(*status),
			Self::Failure(err) => err.status(),
		}
	}

	/// Returns the decoded JSON body of a successful outcome.
	pub fn json(&self) -> Option<&Value> {
		match self {
			Self::Success { body: Some(body), .. } => body.as_json(),
			_ => None,
		}
	}

	/// Converts the outcome into a `Result` of `(status, body)`.
	pub fn into_result(self) -> Result<(u16, Option<ResponseBody>), EffectError> {
		match self {
			Self::Success { status, body } => Ok((status, body)),
			Self::Failure(err) => Err(err),
		}
	}
}

/// One failed entry of a batch, with the request it originated from.
#[derive(Clone, Debug)]
pub struct FailedRequest {
	/// Position of the request in the batch.
	pub index: usize,
	/// Service the request was addressed to.
	pub service: ServiceType,
	/// HTTP verb.
	pub method: Method,
	/// Request URL.
	pub url: Url,
	/// Failure cause.
	pub error: EffectError,
}
impl Display for FailedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"#{} {} {} ({}): {}",
			self.index, self.method, self.url, self.service, self.error
		)
	}
}

/// Aggregate error for callers that need every request of a batch to succeed.
#[derive(Clone, Debug, ThisError)]
#[error("{} of {total} requests failed: {}", .failures.len(), summary(.failures))]
pub struct BatchError {
	/// Failed requests in input order.
	pub failures: Vec<FailedRequest>,
	/// Size of the batch.
	pub total: usize,
}

fn summary(failures: &[FailedRequest]) -> String {
	failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Returns `Ok` when every outcome succeeded, otherwise a [`BatchError`] naming each failed
/// request by index, service, method, and URL.
///
/// `outcomes` must be the result of executing `batch`, one per request in the same order.
pub fn ensure_success(
	batch: &[BoundRequest],
	outcomes: &[Outcome],
) -> Result<(), BatchError> {
	debug_assert_eq!(batch.len(), outcomes.len(), "outcomes must align with the batch");

	let failures = batch
		.iter()
		.zip(outcomes)
		.enumerate()
		.filter_map(|(index, (request, outcome))| match outcome {
			Outcome::Success { .. } => None,
			Outcome::Failure(error) => Some(FailedRequest {
				index,
				service: request.service_type,
				method: request.method,
				url: request.url.clone(),
				error: error.clone(),
			}),
		})
		.collect::<Vec<_>>();

	if failures.is_empty() { Ok(()) } else { Err(BatchError { failures, total: batch.len() }) }
}
