//! Optional observability helpers for effected operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `autoscale_effector.effect` with the `op`
//!   (operation kind) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `autoscale_effector_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the effector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// A whole batch passed to the executor.
	Execute,
	/// One bound request inside a batch.
	Request,
	/// Token acquisition or refresh.
	Authenticate,
	/// Scaling group or policy lifecycle helpers.
	Lifecycle,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Execute => "execute",
			OpKind::Request => "request",
			OpKind::Authenticate => "authenticate",
			OpKind::Lifecycle => "lifecycle",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an effector operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
	/// A rejected token was replaced and the request re-sent.
	Retry,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
			OpOutcome::Retry => "retry",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
