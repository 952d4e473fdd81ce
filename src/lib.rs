//! Declarative request effecting for autoscale convergence.
//!
//! Describe the HTTP calls a convergence pass needs as plain values, compile them against an
//! endpoint catalog, and run the whole batch concurrently with transparent re-authentication.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod autoscale;
pub mod compile;
pub mod config;
pub mod effect;
pub mod error;
pub mod http;
pub mod obs;
pub mod outcome;
pub mod request;
pub mod service;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		io,
		sync::atomic::{AtomicU64, Ordering},
		task::{Context, Poll},
	};
	// self
	use crate::{
		auth::{Authenticator, Credentials, TokenFuture, TokenSecret, TokenSource},
		error::EffectError,
		http::{EffectHttpClient, HttpFuture, HttpRequest, HttpResponse},
		service::{EndpointCatalog, ServiceType},
	};

	type Script = dyn Fn(&HttpRequest) -> (u32, io::Result<HttpResponse>) + Send + Sync;

	/// Region label used by test catalogs.
	pub const TEST_REGION: &str = "ORD";

	/// Token source that mints `token-1`, `token-2`, ... and counts every acquisition.
	#[derive(Debug, Default)]
	pub struct CountingTokenSource {
		calls: AtomicU64,
	}
	impl CountingTokenSource {
		/// Returns how many tokens have been minted so far.
		pub fn calls(&self) -> u64 {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl TokenSource for CountingTokenSource {
		fn acquire(&self) -> TokenFuture<'_> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			Box::pin(async move { Ok(Credentials::new(TokenSecret::new(format!("token-{n}")))) })
		}
	}

	/// Token source whose acquisitions always fail.
	#[derive(Debug, Default)]
	pub struct FailingTokenSource;
	impl TokenSource for FailingTokenSource {
		fn acquire(&self) -> TokenFuture<'_> {
			Box::pin(async {
				Err(EffectError::Authentication {
					reason: "identity unavailable".into(),
					status: Some(503),
				})
			})
		}
	}

	/// In-process transport replying from a script and recording every request it sees.
	///
	/// The script returns how many scheduler turns to yield before replying, which lets tests
	/// scramble completion order without a timer.
	pub struct ScriptedHttpClient {
		script: Box<Script>,
		sent: Mutex<Vec<HttpRequest>>,
	}
	impl ScriptedHttpClient {
		/// Creates a transport answering with `script`.
		pub fn new(
			script: impl 'static + Fn(&HttpRequest) -> (u32, io::Result<HttpResponse>) + Send + Sync,
		) -> Self {
			Self { script: Box::new(script), sent: Default::default() }
		}

		/// Returns every request sent so far, in send order.
		pub fn sent(&self) -> Vec<HttpRequest> {
			self.sent.lock().clone()
		}
	}
	impl EffectHttpClient for ScriptedHttpClient {
		type TransportError = io::Error;

		fn send(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
			let (turns, reply) = (self.script)(&request);

			self.sent.lock().push(request);

			Box::pin(async move {
				YieldTurns(turns).await;

				reply
			})
		}
	}
	impl Debug for ScriptedHttpClient {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedHttpClient").field("sent", &self.sent.lock().len()).finish()
		}
	}

	struct YieldTurns(u32);
	impl Future for YieldTurns {
		type Output = ();

		fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
			if self.0 == 0 {
				return Poll::Ready(());
			}

			self.0 -= 1;
			cx.waker().wake_by_ref();

			Poll::Pending
		}
	}

	/// Builds a catalog that routes every known service to `base` in [`TEST_REGION`].
	pub fn test_catalog(base: &str) -> EndpointCatalog {
		let url = Url::parse(base).expect("Failed to parse test catalog base URL.");
		let mut catalog = EndpointCatalog::new(TEST_REGION);

		for service in ServiceType::ALL {
			catalog = catalog.with_endpoint(service, TEST_REGION, url.clone());
		}

		catalog
	}

	/// Builds an [`Authenticator`] over [`test_catalog`] backed by a fresh
	/// [`CountingTokenSource`].
	pub fn test_authenticator(base: &str) -> (Authenticator, Arc<CountingTokenSource>) {
		let source = Arc::new(CountingTokenSource::default());
		let dyn_source: Arc<dyn TokenSource> = source.clone();

		(Authenticator::new(test_catalog(base), dyn_source), source)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
