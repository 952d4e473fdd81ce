#![cfg(feature = "reqwest")]

mod support;

// crates.io
use httpmock::prelude::*;
// self
use autoscale_effector::{
	compile::compile_batch,
	error::EffectError,
	outcome::{self, Outcome, ResponseBody},
	request::Request,
	service::ServiceType,
};
use support::CountingSource;

#[tokio::test]
async fn default_request_sends_token_and_decodes_json() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/whatever")
				.header("x-auth-token", "token-1")
				.header("accept", "application/json")
				.header_missing("content-type");
			then.status(200).header("content-type", "application/json").body(r#"{"a":[1,2]}"#);
		})
		.await;
	let (effector, source) = support::effector(&server, "/v1");
	let outcome = effector
		.run_one(Request::get(ServiceType::CloudLoadBalancers, "/whatever"))
		.await
		.expect("Request should compile.");

	mock.assert_async().await;

	assert_eq!(outcome.json(), Some(&serde_json::json!({ "a": [1, 2] })));
	assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn mixed_batch_returns_index_aligned_outcomes_without_short_circuit() {
	let server = MockServer::start_async().await;
	let created = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/servers")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "server": { "name": "xyzzy" } }));
			then.status(202).body(r#"{"server":{"id":"s1"}}"#);
		})
		.await;
	let missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/loadbalancers/9");
			then.status(404).body("not here");
		})
		.await;
	let slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/loadbalancers/1");
			then.status(231).body("").delay(std::time::Duration::from_millis(150));
		})
		.await;
	let (effector, _) = support::effector(&server, "/v1");
	let requests = [
		Request::get(ServiceType::CloudLoadBalancers, "/loadbalancers/1").with_success_codes([231]),
		Request::get(ServiceType::CloudLoadBalancers, "/loadbalancers/9"),
		Request::post(ServiceType::CloudServers, "/servers")
			.with_data(serde_json::json!({ "server": { "name": "xyzzy" } }))
			.with_success_codes([202]),
	];
	let batch = compile_batch(&requests, &effector.authenticator).expect("Batch should compile.");
	let outcomes = effector.execute(&batch).await;

	created.assert_async().await;
	missing.assert_async().await;
	slow.assert_async().await;

	assert_eq!(outcomes.len(), 3);
	assert!(matches!(outcomes[0], Outcome::Success { status: 231, body: None }));
	assert!(matches!(
		&outcomes[1],
		Outcome::Failure(EffectError::UnexpectedStatus { status: 404, body: Some(body) })
			if body == "not here"
	));
	assert_eq!(outcomes[2].json().map(|v| &v["server"]["id"]), Some(&serde_json::json!("s1")));

	let err = outcome::ensure_success(&batch, &outcomes).expect_err("One request failed.");

	assert_eq!(err.failures.len(), 1);
	assert_eq!(err.failures[0].index, 1);
	assert_eq!(err.failures[0].service, ServiceType::CloudLoadBalancers);
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_request_retried_once() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/groups").header("x-auth-token", "token-1");
			then.status(401).body("");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/groups").header("x-auth-token", "token-2");
			then.status(200).body(r#"{"groups":[]}"#);
		})
		.await;
	let (effector, source) = support::effector(&server, "/v1");
	let outcome = effector
		.run_one(Request::get(ServiceType::Autoscale, "/groups"))
		.await
		.expect("Request should compile.");

	rejected.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	assert!(matches!(outcome, Outcome::Success { status: 200, .. }));
	assert_eq!(source.calls(), 2);
	assert_eq!(effector.authenticator.metrics.refreshes(), 1);
}

#[tokio::test]
async fn retried_failure_reports_the_retried_status() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/groups").header("x-auth-token", "token-1");
			then.status(401).body("");
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/groups").header("x-auth-token", "token-2");
			then.status(403).body("forbidden");
		})
		.await;
	let (effector, source) = support::effector(&server, "/v1");
	let outcome = effector
		.run_one(Request::get(ServiceType::Autoscale, "/groups"))
		.await
		.expect("Request should compile.");

	first.assert_calls_async(1).await;
	second.assert_calls_async(1).await;

	assert!(matches!(
		outcome,
		Outcome::Failure(EffectError::UnexpectedStatus { status: 403, body: Some(ref body) })
			if body == "forbidden"
	));
	assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn concurrent_rejections_trigger_a_single_refresh() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(DELETE).header("x-auth-token", "token-1");
			then.status(401).body("");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(DELETE).header("x-auth-token", "token-2");
			then.status(204).body("");
		})
		.await;
	let (effector, source) = support::effector(&server, "/v1");
	let requests = (0..8)
		.map(|n| {
			Request::delete(ServiceType::CloudServers, format!("/servers/{n}"))
				.with_success_codes([204])
		})
		.collect::<Vec<_>>();
	let outcomes = effector.run(&requests).await.expect("Batch should compile.");

	rejected.assert_calls_async(8).await;
	accepted.assert_calls_async(8).await;

	assert!(outcomes.iter().all(|o| matches!(o, Outcome::Success { status: 204, body: None })));
	assert_eq!(source.calls(), 2);
	assert_eq!(effector.authenticator.metrics.refreshes(), 1);
	assert_eq!(effector.metrics.retries(), 8);
}

#[tokio::test]
async fn failed_refresh_fails_every_waiting_request() {
	let server = MockServer::start_async().await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).header("x-auth-token", "token-1");
			then.status(401).body("");
		})
		.await;
	let (effector, source) = support::effector_with(&server, "/v1", CountingSource::failing_after(1));
	let requests = (0..5)
		.map(|n| Request::get(ServiceType::RackConnect, format!("/lb_pools/{n}")))
		.collect::<Vec<_>>();
	let outcomes = effector.run(&requests).await.expect("Batch should compile.");

	rejected.assert_calls_async(5).await;

	assert!(outcomes
		.iter()
		.all(|o| matches!(o, Outcome::Failure(EffectError::Authentication { .. }))));
	assert_eq!(source.calls(), 2);
	assert_eq!(effector.authenticator.metrics.failures(), 1);
}

#[tokio::test]
async fn text_bodies_and_decode_failures() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/text");
			then.status(200).body("plain");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/broken");
			then.status(200).body("{not json");
		})
		.await;

	let (effector, _) = support::effector(&server, "/v1");
	let outcomes = effector
		.run(&[
			Request::get(ServiceType::Autoscale, "/text").with_json_response(false),
			Request::get(ServiceType::Autoscale, "/broken"),
		])
		.await
		.expect("Batch should compile.");

	assert!(matches!(
		&outcomes[0],
		Outcome::Success { body: Some(ResponseBody::Text(text)), .. } if text == "plain"
	));
	assert!(matches!(
		&outcomes[1],
		Outcome::Failure(EffectError::Decode { body, .. }) if body == "{not json"
	));
}

#[tokio::test]
async fn transport_failures_are_reported_without_retry() {
	let server = MockServer::start_async().await;
	let (effector, source) = support::effector(&server, "/v1");
	let dead = Request::get(ServiceType::Autoscale, "http://127.0.0.1:9/unreachable");
	let outcome = effector.run_one(dead).await.expect("Absolute links should compile.");

	assert!(matches!(outcome, Outcome::Failure(EffectError::Transport { .. })));
	assert_eq!(source.calls(), 1);
	assert_eq!(effector.metrics.retries(), 0);
}
