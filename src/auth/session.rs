//! Token sessions and the sources that mint them.

// self
use crate::{_prelude::*, auth::TokenSecret, error::EffectError};

/// Boxed future returned by [`TokenSource::acquire`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<Credentials, EffectError>> + 'a + Send>>;

/// Mints fresh credentials, typically by calling an identity service.
///
/// The [`Authenticator`](crate::auth::Authenticator) guarantees that at most one
/// acquisition is in flight at a time, so implementations need no coalescing of their own.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Acquires a new token.
	fn acquire(&self) -> TokenFuture<'_>;
}

/// Credentials returned by a [`TokenSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	/// Auth token attached to requests.
	pub token: TokenSecret,
	/// Expiry reported by the identity service, if any.
	pub expires_at: Option<OffsetDateTime>,
}
impl Credentials {
	/// Creates credentials without a known expiry.
	pub fn new(token: TokenSecret) -> Self {
		Self { token, expires_at: None }
	}

	/// Sets the expiry instant.
	pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}
}

/// Immutable snapshot of the authenticator's current token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
	/// Monotonic counter identifying which acquisition produced this session.
	pub generation: u64,
	/// Auth token attached to requests.
	pub token: TokenSecret,
	/// Instant the session was created.
	pub issued_at: OffsetDateTime,
	/// Expiry reported by the identity service, if any.
	pub expires_at: Option<OffsetDateTime>,
}
impl Session {
	/// Tokens this close to expiry are treated as expired.
	pub const EXPIRY_SKEW: Duration = Duration::seconds(30);

	pub(crate) fn new(generation: u64, credentials: Credentials) -> Self {
		Self {
			generation,
			token: credentials.token,
			issued_at: OffsetDateTime::now_utc(),
			expires_at: credentials.expires_at,
		}
	}

	/// Returns `true` if the token should no longer be used at `now`.
	///
	/// The skew never exceeds half of the token's lifetime, so a short-lived token is still
	/// usable for a while after it is issued.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now >= expires_at - self.skew(expires_at))
	}

	fn skew(&self, expires_at: OffsetDateTime) -> Duration {
		let half_life = (expires_at - self.issued_at) / 2;

		Self::EXPIRY_SKEW.min(half_life).max(Duration::ZERO)
	}
}

/// Token source that always hands out the same pre-issued token.
#[derive(Clone, Debug)]
pub struct StaticTokenSource {
	token: TokenSecret,
}
impl StaticTokenSource {
	/// Wraps a pre-issued token.
	pub fn new(token: impl Into<String>) -> Self {
		Self { token: TokenSecret::new(token) }
	}
}
impl TokenSource for StaticTokenSource {
	fn acquire(&self) -> TokenFuture<'_> {
		let credentials = Credentials::new(self.token.clone());

		Box::pin(async move { Ok(credentials) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expiry_honours_skew() {
		let now = OffsetDateTime::now_utc();
		let fresh = Session::new(
			1,
			Credentials::new(TokenSecret::new("a")).with_expires_at(now + Duration::minutes(10)),
		);
		let nearly = Session::new(
			2,
			Credentials::new(TokenSecret::new("b")).with_expires_at(now + Duration::seconds(10)),
		);
		let unbounded = Session::new(3, Credentials::new(TokenSecret::new("c")));

		assert!(!fresh.is_expired_at(now));
		assert!(fresh.is_expired_at(now + Duration::seconds(571)));
		assert!(!nearly.is_expired_at(now + Duration::seconds(4)));
		assert!(nearly.is_expired_at(now + Duration::seconds(6)));
		assert!(!unbounded.is_expired_at(now + Duration::days(365)));
	}

	#[test]
	fn short_lived_tokens_are_not_born_expired() {
		let issued = Session::new(
			1,
			Credentials::new(TokenSecret::new("a"))
				.with_expires_at(OffsetDateTime::now_utc() + Duration::seconds(5)),
		);
		let at = issued.issued_at;

		assert!(!issued.is_expired_at(at));
		assert!(!issued.is_expired_at(at + Duration::seconds(2)));
		assert!(issued.is_expired_at(at + Duration::seconds(3)));

		let dead = Session::new(
			2,
			Credentials::new(TokenSecret::new("b")).with_expires_at(at - Duration::seconds(1)),
		);

		assert!(dead.is_expired_at(dead.issued_at));
	}

	#[tokio::test]
	async fn static_source_repeats_token() {
		let source = StaticTokenSource::new("fixed");
		let first = source.acquire().await.expect("Static source should not fail.");
		let second = source.acquire().await.expect("Static source should not fail.");

		assert_eq!(first.token.expose(), "fixed");
		assert_eq!(first, second);
	}
}
