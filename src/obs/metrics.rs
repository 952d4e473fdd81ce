// self
use crate::obs::{OpKind, OpOutcome};

/// Counter incremented once per recorded effector event.
pub const OP_COUNTER: &str = "autoscale_effector_op_total";

/// Counts one effector event under `op` and `outcome` labels.
///
/// Batches, single requests, token acquisitions, and lifecycle helpers all report here, so
/// one counter shows retries next to the failures that follow them. Without the `metrics`
/// feature nothing is recorded.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(OP_COUNTER, "op" => kind.as_str(), "outcome" => outcome.as_str())
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn every_label_pair_records() {
		let kinds = [OpKind::Execute, OpKind::Request, OpKind::Authenticate, OpKind::Lifecycle];
		let outcomes = [OpOutcome::Attempt, OpOutcome::Success, OpOutcome::Failure, OpOutcome::Retry];

		for kind in kinds {
			for outcome in outcomes {
				record_op_outcome(kind, outcome);
			}
		}

		assert_eq!(OP_COUNTER, "autoscale_effector_op_total");
	}
}
