#![cfg(feature = "reqwest")]

mod support;

// crates.io
use httpmock::prelude::*;
// self
use autoscale_effector::{
	auth::{IdentityCredentials, IdentityTokenSource, TokenSecret, TokenSource},
	config::EffectorConfig,
	effect::ReqwestEffector,
	error::EffectError,
	http::ReqwestHttpClient,
	outcome::Outcome,
	request::Request,
	service::ServiceType,
	url::Url,
};

fn api_key() -> IdentityCredentials {
	IdentityCredentials::ApiKey { username: "demo".into(), api_key: TokenSecret::new("k3y") }
}

#[tokio::test]
async fn identity_source_exchanges_api_key_for_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2.0/tokens").json_body(serde_json::json!({
				"auth": { "RAX-KSKEY:apiKeyCredentials": { "username": "demo", "apiKey": "k3y" } }
			}));
			then.status(200).header("content-type", "application/json").body(
				r#"{"access":{"token":{"id":"tok-abc","expires":"2099-01-01T00:00:00Z"}}}"#,
			);
		})
		.await;
	let identity_url =
		Url::parse(&support::http_url(&server, "/v2.0/")).expect("Identity URL should parse.");
	let source = <IdentityTokenSource<ReqwestHttpClient>>::new(
		ReqwestHttpClient::default(),
		&identity_url,
		api_key(),
	)
	.expect("Identity source should build.");
	let credentials = source.acquire().await.expect("Identity should issue a token.");

	mock.assert_async().await;

	assert_eq!(credentials.token.expose(), "tok-abc");
	assert_eq!(credentials.expires_at.map(|at| at.year()), Some(2099));
}

#[tokio::test]
async fn identity_rejection_surfaces_as_authentication_failure() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v2.0/tokens");
			then.status(401).body(r#"{"unauthorized":{"code":401}}"#);
		})
		.await;

	let identity_url =
		Url::parse(&support::http_url(&server, "/v2.0")).expect("Identity URL should parse.");
	let source = <IdentityTokenSource<ReqwestHttpClient>>::new(
		ReqwestHttpClient::default(),
		&identity_url,
		api_key(),
	)
	.expect("Identity source should build.");
	let err = source.acquire().await.expect_err("Rejected credentials should fail.");

	assert!(matches!(err, EffectError::Authentication { status: Some(401), .. }));
}

#[tokio::test]
async fn effector_from_config_authenticates_through_identity() {
	let server = MockServer::start_async().await;
	let identity = server
		.mock_async(|when, then| {
			when.method(POST).path("/identity/v2.0/tokens");
			then.status(200).body(r#"{"access":{"token":{"id":"cfg-token"}}}"#);
		})
		.await;
	let groups = server
		.mock_async(|when, then| {
			when.method(GET).path("/autoscale/v1.0/1/groups").header("x-auth-token", "cfg-token");
			then.status(200).body(r#"{"groups":[]}"#);
		})
		.await;
	let raw = serde_json::json!({
		"region": "IAD",
		"endpoints": { "autoscale": { "IAD": support::http_url(&server, "/autoscale/v1.0/1") } },
		"identity": {
			"url": support::http_url(&server, "/identity/v2.0"),
			"credentials": { "kind": "password", "username": "demo", "password": "pw" }
		},
		"max_concurrency": 2,
		"request_timeout_secs": 5
	})
	.to_string();
	let config = EffectorConfig::from_json_str(&raw).expect("Config should parse.");
	let effector = ReqwestEffector::from_config(&config).expect("Effector should build.");
	let outcomes = effector
		.run(&[Request::get(ServiceType::Autoscale, "/groups"), Request::get(ServiceType::Autoscale, "groups")])
		.await
		.expect("Batch should compile.");

	identity.assert_calls_async(1).await;
	groups.assert_calls_async(2).await;

	assert!(outcomes.iter().all(Outcome::is_success));
}
