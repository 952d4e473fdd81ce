//! Authentication: token sessions, coalesced refresh, and endpoint resolution.
//!
//! [`Authenticator`] caches the current [`Session`] and hands out cheap `Arc` snapshots.
//! When a session is missing, expired, or rejected by a backend, a single acquisition is
//! started through the configured [`TokenSource`]; every concurrent caller awaits that same
//! shared future and receives its result. A failed refresh is remembered for the session it
//! tried to replace, so requests still holding that session fail fast instead of starting
//! another acquisition.

mod metrics;

pub mod identity;
pub mod secret;
pub mod session;

pub use identity::*;
pub use metrics::AuthMetrics;
pub use secret::*;
pub use session::*;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	compile::ResolveEndpoint,
	error::{CompileError, EffectError},
	obs::{self, EffectSpan, OpKind, OpOutcome},
	service::{EndpointCatalog, ServiceType},
};

type SharedAcquisition = Shared<BoxFuture<'static, Result<Arc<Session>, EffectError>>>;

#[derive(Default)]
struct AuthState {
	session: Option<Arc<Session>>,
	in_flight: Option<SharedAcquisition>,
	generation: u64,
	// Generation whose replacement failed, with the error handed to its waiters.
	failed: Option<(u64, EffectError)>,
}

/// Resolves services to base URLs and supplies valid auth tokens.
///
/// Clones share the same token state.
#[derive(Clone)]
pub struct Authenticator {
	/// Endpoint catalog used for service resolution.
	pub catalog: Arc<EndpointCatalog>,
	/// Shared counters for token acquisitions.
	pub metrics: Arc<AuthMetrics>,
	source: Arc<dyn TokenSource>,
	state: Arc<Mutex<AuthState>>,
}
impl Authenticator {
	/// Creates an authenticator over `catalog` that mints tokens from `source`.
	pub fn new(catalog: EndpointCatalog, source: Arc<dyn TokenSource>) -> Self {
		Self {
			catalog: Arc::new(catalog),
			metrics: Default::default(),
			source,
			state: Default::default(),
		}
	}

	/// Returns the cached session without validating or refreshing it.
	pub fn current(&self) -> Option<Arc<Session>> {
		self.state.lock().session.clone()
	}

	/// Drops the cached session so the next caller acquires a new one.
	pub fn invalidate(&self) {
		self.state.lock().session = None;
	}

	/// Returns the cached session while it is valid, otherwise joins or starts an
	/// acquisition.
	pub async fn session(&self) -> Result<Arc<Session>, EffectError> {
		let acquisition = {
			let mut state = self.state.lock();
			let now = OffsetDateTime::now_utc();

			if let Some(session) = state.session.as_ref().filter(|s| !s.is_expired_at(now)) {
				return Ok(session.clone());
			}

			self.acquisition(&mut state, None)
		};

		acquisition.await
	}

	/// Replaces `stale` after a backend rejected it.
	///
	/// If another caller already replaced `stale`, the newer session is returned without a
	/// second acquisition. If the replacement of `stale` already failed, that failure is
	/// returned again.
	pub async fn refresh(&self, stale: &Session) -> Result<Arc<Session>, EffectError> {
		let acquisition = {
			let mut state = self.state.lock();

			if let Some(current) = state.session.as_ref() {
				if current.generation != stale.generation {
					return Ok(current.clone());
				}
			}
			if let Some((generation, err)) = state.failed.as_ref() {
				if *generation == stale.generation {
					return Err(err.clone());
				}
			}

			state.session = None;

			self.acquisition(&mut state, Some(stale.generation))
		};

		acquisition.await
	}

	/// Resolves `service` in the catalog's default region and returns its base URL together
	/// with a valid session.
	pub async fn resolve(&self, service: ServiceType) -> Result<(Url, Arc<Session>)> {
		let region = self.catalog.region.clone();

		self.resolve_in(service, &region).await
	}

	/// Resolves `service` in an explicit region and returns its base URL together with a
	/// valid session.
	pub async fn resolve_in(
		&self,
		service: ServiceType,
		region: &str,
	) -> Result<(Url, Arc<Session>)> {
		let url = self.catalog.lookup(service, region)?;
		let session = self.session().await?;

		Ok((url, session))
	}

	fn acquisition(&self, state: &mut AuthState, replacing: Option<u64>) -> SharedAcquisition {
		if let Some(in_flight) = state.in_flight.as_ref() {
			return in_flight.clone();
		}

		let source = self.source.clone();
		let slot = self.state.clone();
		let metrics = self.metrics.clone();
		let span = EffectSpan::new(
			OpKind::Authenticate,
			if replacing.is_some() { "refresh" } else { "acquire" },
		);

		metrics.record_acquisition(replacing.is_some());
		obs::record_op_outcome(OpKind::Authenticate, OpOutcome::Attempt);

		let acquisition = span
			.instrument(async move {
				let result = source.acquire().await.map_err(EffectError::into_authentication);
				let mut state = slot.lock();

				state.in_flight = None;

				match result {
					Ok(credentials) => {
						state.generation += 1;

						let session = Arc::new(Session::new(state.generation, credentials));

						state.session = Some(session.clone());
						state.failed = None;
						metrics.record_success();
						obs::record_op_outcome(OpKind::Authenticate, OpOutcome::Success);

						Ok(session)
					},
					Err(err) => {
						if let Some(generation) = replacing {
							state.failed = Some((generation, err.clone()));
						}

						metrics.record_failure();
						obs::record_op_outcome(OpKind::Authenticate, OpOutcome::Failure);

						Err(err)
					},
				}
			})
			.boxed()
			.shared();

		state.in_flight = Some(acquisition.clone());

		acquisition
	}
}
impl ResolveEndpoint for Authenticator {
	fn endpoint(&self, service: ServiceType) -> Result<Url, CompileError> {
		self.catalog.endpoint(service)
	}
}
impl Debug for Authenticator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("Authenticator")
			.field("region", &self.catalog.region)
			.field("generation", &state.generation)
			.field("session_cached", &state.session.is_some())
			.field("refresh_in_flight", &state.in_flight.is_some())
			.finish()
	}
}
