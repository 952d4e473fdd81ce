//! Identity-service token source (v2 `POST /tokens`).
//!
//! The source posts API-key or password credentials to `{identity_url}/tokens` and reads
//! `access.token.id` plus the optional RFC 3339 `access.token.expires` from the response.
//! Any non-2xx reply or malformed body surfaces as
//! [`EffectError::Authentication`].

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenFuture, TokenSecret, TokenSource},
	error::EffectError,
	http::{EffectHttpClient, Headers, HttpRequest, Method},
};

/// Credentials accepted by the identity service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IdentityCredentials {
	/// Username + API key.
	ApiKey {
		/// Account username.
		username: String,
		/// Account API key.
		api_key: TokenSecret,
	},
	/// Username + password.
	Password {
		/// Account username.
		username: String,
		/// Account password.
		password: TokenSecret,
	},
}
impl IdentityCredentials {
	fn to_body(&self) -> Value {
		match self {
			Self::ApiKey { username, api_key } => serde_json::json!({
				"auth": {
					"RAX-KSKEY:apiKeyCredentials": {
						"username": username,
						"apiKey": api_key.expose(),
					}
				}
			}),
			Self::Password { username, password } => serde_json::json!({
				"auth": {
					"passwordCredentials": {
						"username": username,
						"password": password.expose(),
					}
				}
			}),
		}
	}
}

#[derive(Deserialize)]
struct AccessResponse {
	access: Access,
}
#[derive(Deserialize)]
struct Access {
	token: AccessToken,
}
#[derive(Deserialize)]
struct AccessToken {
	id: String,
	expires: Option<String>,
}

/// [`TokenSource`] that authenticates against an identity endpoint.
pub struct IdentityTokenSource<C>
where
	C: ?Sized + EffectHttpClient,
{
	http_client: Arc<C>,
	tokens_url: Url,
	credentials: IdentityCredentials,
}
impl<C> IdentityTokenSource<C>
where
	C: ?Sized + EffectHttpClient,
{
	/// Creates a source posting `credentials` to `{identity_url}/tokens`.
	pub fn new(
		http_client: impl Into<Arc<C>>,
		identity_url: &Url,
		credentials: IdentityCredentials,
	) -> Result<Self, EffectError> {
		let raw = format!("{}/tokens", identity_url.as_str().trim_end_matches('/'));
		let tokens_url = Url::parse(&raw).map_err(EffectError::authentication)?;

		Ok(Self { http_client: http_client.into(), tokens_url, credentials })
	}

	async fn authenticate(&self) -> Result<Credentials, EffectError> {
		let mut headers = Headers::new();

		headers.insert("accept".into(), "application/json".into());
		headers.insert("content-type".into(), "application/json".into());

		let request = HttpRequest {
			method: Method::Post,
			url: self.tokens_url.clone(),
			headers,
			body: Some(self.credentials.to_body().to_string().into_bytes()),
		};
		let response = self.http_client.send(request).await.map_err(EffectError::transport)?;

		if !(200..300).contains(&response.status) {
			return Err(EffectError::Authentication {
				reason: format!("identity endpoint rejected the credentials: {}", response.text()),
				status: Some(response.status),
			});
		}

		let parsed: AccessResponse = serde_path_to_error::deserialize(
			&mut serde_json::Deserializer::from_slice(&response.body),
		)
		.map_err(|err| EffectError::Authentication {
			reason: format!("identity response is malformed: {err}"),
			status: Some(response.status),
		})?;
		let mut credentials = Credentials::new(TokenSecret::new(parsed.access.token.id));

		if let Some(raw) = parsed.access.token.expires {
			let expires_at = OffsetDateTime::parse(&raw, &Rfc3339).map_err(|err| {
				EffectError::authentication(format!("token expiry `{raw}` is invalid: {err}"))
			})?;

			credentials = credentials.with_expires_at(expires_at);
		}

		Ok(credentials)
	}
}
impl<C> TokenSource for IdentityTokenSource<C>
where
	C: ?Sized + EffectHttpClient,
{
	fn acquire(&self) -> TokenFuture<'_> {
		Box::pin(self.authenticate())
	}
}
impl<C> Debug for IdentityTokenSource<C>
where
	C: ?Sized + EffectHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdentityTokenSource").field("tokens_url", &self.tokens_url).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn api_key_body_uses_extension_namespace() {
		let body = IdentityCredentials::ApiKey {
			username: "demo".into(),
			api_key: TokenSecret::new("k3y"),
		}
		.to_body();

		assert_eq!(body["auth"]["RAX-KSKEY:apiKeyCredentials"]["apiKey"], "k3y");
		assert_eq!(body["auth"]["RAX-KSKEY:apiKeyCredentials"]["username"], "demo");
	}

	#[test]
	fn password_credentials_deserialize_from_tagged_config() {
		let credentials: IdentityCredentials =
			serde_json::from_str(r#"{"kind":"password","username":"demo","password":"pw"}"#)
				.expect("Tagged password credentials should deserialize.");

		assert!(matches!(credentials, IdentityCredentials::Password { ref username, .. } if username == "demo"));
		assert_eq!(credentials.to_body()["auth"]["passwordCredentials"]["password"], "pw");
	}
}
