// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token acquisitions.
#[derive(Debug, Default)]
pub struct AuthMetrics {
	acquisitions: AtomicU64,
	refreshes: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl AuthMetrics {
	/// Returns the number of token acquisitions started, including the first one.
	pub fn acquisitions(&self) -> u64 {
		self.acquisitions.load(Ordering::Relaxed)
	}

	/// Returns the number of acquisitions started to replace a rejected token.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of acquisitions that produced a session.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of acquisitions that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_acquisition(&self, refresh: bool) {
		self.acquisitions.fetch_add(1, Ordering::Relaxed);

		if refresh {
			self.refreshes.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
