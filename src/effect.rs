//! Parallel effect executor: dispatches a batch of bound requests concurrently.
//!
//! [`Effector::execute`] returns one [`Outcome`] per input request, in input order, no
//! matter which request finishes first. A failure in one request never cancels or
//! short-circuits the others. Each request runs the same steps:
//!
//! 1. obtain the authenticator's current session and send with the `x-auth-token` header;
//! 2. if the status satisfies the request's success predicate, decode the body;
//! 3. if the status is one of its re-authentication statuses, refresh the token once (joining
//!    any refresh already in flight), re-send once, and judge the retried status;
//! 4. any other status, or a retried status that still fails, is reported as
//!    [`EffectError::UnexpectedStatus`]. Transport failures are never retried.

mod metrics;

pub use metrics::EffectMetrics;

// crates.io
use async_lock::Semaphore;
// self
use crate::{
	_prelude::*,
	auth::{Authenticator, IdentityTokenSource, Session, StaticTokenSource, TokenSource},
	compile::{self, BoundRequest},
	config::EffectorConfig,
	error::{CompileError, ConfigError, EffectError},
	http::{EffectHttpClient, HttpResponse},
	obs::{self, EffectSpan, OpKind, OpOutcome},
	outcome::{Outcome, ResponseBody},
	request::Request,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Effector specialized for the crate's default reqwest transport.
pub type ReqwestEffector = Effector<ReqwestHttpClient>;

/// Executes batches of [`BoundRequest`]s against a shared transport and authenticator.
#[derive(Clone)]
pub struct Effector<C>
where
	C: ?Sized + EffectHttpClient,
{
	/// HTTP client used for every outbound request.
	pub http_client: Arc<C>,
	/// Token and endpoint provider shared by every request.
	pub authenticator: Authenticator,
	/// Shared counters for effected requests.
	pub metrics: Arc<EffectMetrics>,
	limiter: Option<Arc<Semaphore>>,
}
impl<C> Effector<C>
where
	C: ?Sized + EffectHttpClient,
{
	/// Creates an executor over a caller-provided transport.
	pub fn with_http_client(authenticator: Authenticator, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			authenticator,
			metrics: Default::default(),
			limiter: None,
		}
	}

	/// Caps how many requests of a batch are in flight at once; `0` is treated as `1`.
	pub fn with_max_concurrency(mut self, limit: usize) -> Self {
		self.limiter = Some(Arc::new(Semaphore::new(limit.max(1))));

		self
	}

	/// Builds an executor from configuration over a caller-provided transport.
	///
	/// The transport is shared with the identity token source when one is configured.
	pub fn with_config(config: &EffectorConfig, http_client: impl Into<Arc<C>>) -> Result<Self> {
		config.validate()?;

		let http_client = http_client.into();
		let source: Arc<dyn TokenSource> = match (&config.identity, &config.token) {
			(Some(identity), _) => Arc::new(IdentityTokenSource::<C>::new(
				http_client.clone(),
				&identity.url,
				identity.credentials.clone(),
			)?),
			(None, Some(token)) => Arc::new(StaticTokenSource::new(token.expose())),
			(None, None) => return Err(ConfigError::MissingCredentials.into()),
		};
		let authenticator = Authenticator::new(config.catalog(), source);
		let effector = Self::with_http_client(authenticator, http_client);

		Ok(match config.max_concurrency {
			Some(limit) => effector.with_max_concurrency(limit),
			None => effector,
		})
	}

	/// Effects every request concurrently and returns index-aligned outcomes.
	pub async fn execute(&self, batch: &[BoundRequest]) -> Vec<Outcome> {
		const KIND: OpKind = OpKind::Execute;

		let span = EffectSpan::new(KIND, "execute");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let outcomes = span
			.instrument(futures::future::join_all(
				batch.iter().enumerate().map(|(index, request)| self.effect(index, request)),
			))
			.await;

		if outcomes.iter().all(Outcome::is_success) {
			obs::record_op_outcome(KIND, OpOutcome::Success);
		} else {
			obs::record_op_outcome(KIND, OpOutcome::Failure);
		}

		outcomes
	}

	/// Compiles `requests` against the authenticator's catalog, then executes them.
	pub async fn run(&self, requests: &[Request]) -> Result<Vec<Outcome>, CompileError> {
		let batch = compile::compile_batch(requests, &self.authenticator)?;

		Ok(self.execute(&batch).await)
	}

	/// Compiles and executes a single request.
	pub async fn run_one(&self, request: Request) -> Result<Outcome, CompileError> {
		let bound = compile::compile(&request, &self.authenticator)?;

		Ok(self.effect(0, &bound).await)
	}

	async fn effect(&self, index: usize, request: &BoundRequest) -> Outcome {
		let _permit = match &self.limiter {
			Some(limiter) => Some(limiter.acquire().await),
			None => None,
		};
		let span = EffectSpan::for_request(index, request.method.as_str(), &request.url);

		self.metrics.record_attempt();
		obs::record_op_outcome(OpKind::Request, OpOutcome::Attempt);

		match span.instrument(self.attempt(request, &span)).await {
			Ok((status, body)) => {
				self.metrics.record_success();
				obs::record_op_outcome(OpKind::Request, OpOutcome::Success);

				Outcome::Success { status, body }
			},
			Err(err) => {
				span.note(&format!("request failed: {err}"));
				self.metrics.record_failure();
				obs::record_op_outcome(OpKind::Request, OpOutcome::Failure);

				Outcome::Failure(err)
			},
		}
	}

	async fn attempt(
		&self,
		request: &BoundRequest,
		span: &EffectSpan,
	) -> Result<(u16, Option<ResponseBody>), EffectError> {
		let session = self.authenticator.session().await?;
		let response = self.send(request, &session).await?;

		if request.success.matches(response.status) {
			return decode(request, response);
		}
		if !request.reauth_statuses.contains(&response.status) {
			return Err(unexpected(response));
		}

		span.note(&format!("token rejected with {}; refreshing once", response.status));
		self.metrics.record_retry();
		obs::record_op_outcome(OpKind::Request, OpOutcome::Retry);

		let session = self.authenticator.refresh(&session).await?;
		let response = self.send(request, &session).await?;

		if request.success.matches(response.status) {
			decode(request, response)
		} else {
			Err(unexpected(response))
		}
	}

	async fn send(
		&self,
		request: &BoundRequest,
		session: &Session,
	) -> Result<HttpResponse, EffectError> {
		self.http_client
			.send(request.to_http_request(session.token.expose()))
			.await
			.map_err(EffectError::transport)
	}
}
#[cfg(feature = "reqwest")]
impl Effector<ReqwestHttpClient> {
	/// Creates an executor with a default reqwest transport.
	pub fn new(authenticator: Authenticator) -> Self {
		Self::with_http_client(authenticator, ReqwestHttpClient::default())
	}

	/// Builds the reqwest transport, authenticator, and executor described by `config`.
	pub fn from_config(config: &EffectorConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.request_timeout())?;

		Self::with_config(config, http_client)
	}
}
impl<C> Debug for Effector<C>
where
	C: ?Sized + EffectHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Effector")
			.field("authenticator", &self.authenticator)
			.field("bounded", &self.limiter.is_some())
			.finish()
	}
}

fn decode(
	request: &BoundRequest,
	response: HttpResponse,
) -> Result<(u16, Option<ResponseBody>), EffectError> {
	if response.is_blank() {
		return Ok((response.status, None));
	}
	if !request.json_response {
		return Ok((response.status, Some(ResponseBody::Text(response.text()))));
	}

	let value = serde_json::from_slice::<Value>(&response.body)
		.map_err(|err| EffectError::Decode { detail: err.to_string(), body: response.text() })?;

	Ok((response.status, Some(ResponseBody::Json(value))))
}

fn unexpected(response: HttpResponse) -> EffectError {
	let body = (!response.is_blank()).then(|| response.text());

	EffectError::UnexpectedStatus { status: response.status, body }
}
