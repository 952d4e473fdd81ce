//! Runs one convergence step against an in-process transport.
//!
//! 1. Build an [`EndpointCatalog`] and an [`Authenticator`] over a [`TokenSource`].
//! 2. Describe the step as plain [`Request`] values.
//! 3. Compile and execute them with an [`Effector`]; outcomes come back in input order.
//! 4. Use [`ensure_success`] when the step must succeed as a whole.
//!
//! The transport rejects the first token it sees so the output also shows the single shared
//! refresh that follows.

// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
// crates.io
use color_eyre::Result;
// self
use autoscale_effector::{
	auth::{Authenticator, Credentials, TokenFuture, TokenSecret, TokenSource},
	compile::compile_batch,
	effect::Effector,
	http::{EffectHttpClient, HttpFuture, HttpRequest, HttpResponse, Method},
	outcome::{Outcome, ensure_success},
	request::Request,
	service::{EndpointCatalog, ServiceType},
	url::Url,
};

#[derive(Default)]
struct RotatingTokens(AtomicU64);
impl TokenSource for RotatingTokens {
	fn acquire(&self) -> TokenFuture<'_> {
		let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;

		Box::pin(async move { Ok(Credentials::new(TokenSecret::new(format!("demo-token-{n}")))) })
	}
}

struct DemoTransport;
impl EffectHttpClient for DemoTransport {
	type TransportError = io::Error;

	fn send(&self, request: HttpRequest) -> HttpFuture<'_, Self::TransportError> {
		let token = request.header("x-auth-token").unwrap_or_default().to_owned();

		Box::pin(async move {
			println!("-> {} {} ({token})", request.method, request.url);

			if token == "demo-token-1" {
				return Ok(HttpResponse::new(401, ""));
			}

			Ok(match (request.method, request.url.path()) {
				(Method::Get, path) if path.ends_with("/state") => HttpResponse::new(
					200,
					r#"{"group":{"active":[],"pendingCapacity":1,"desiredCapacity":1}}"#,
				),
				(Method::Post, "/v2/1/servers") => HttpResponse::new(202, r#"{"server":{"id":"s-1"}}"#),
				(Method::Delete, _) => HttpResponse::new(404, ""),
				_ => HttpResponse::new(500, "unexpected"),
			})
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let catalog = EndpointCatalog::new("ORD")
		.with_endpoint(ServiceType::Autoscale, "ORD", Url::parse("https://autoscale.example.com/v1.0/1")?)
		.with_endpoint(ServiceType::CloudServers, "ORD", Url::parse("https://servers.example.com/v2/1")?)
		.with_endpoint(
			ServiceType::CloudLoadBalancers,
			"ORD",
			Url::parse("https://lb.example.com/v1.0/1")?,
		);
	let source: Arc<dyn TokenSource> = Arc::new(RotatingTokens::default());
	let authenticator = Authenticator::new(catalog, source);
	let effector = Effector::with_http_client(authenticator, DemoTransport).with_max_concurrency(4);
	let requests = [
		Request::get(ServiceType::Autoscale, "/groups/g-1/state"),
		Request::post(ServiceType::CloudServers, "/servers")
			.with_data(serde_json::json!({ "server": { "name": "as-demo", "flavorRef": "2" } }))
			.with_success_codes([202]),
		Request::delete(ServiceType::CloudLoadBalancers, "/loadbalancers/7/nodes/3")
			.with_success_codes([202, 404]),
	];
	let batch = compile_batch(&requests, &effector.authenticator)?;
	let outcomes = effector.execute(&batch).await;

	for (request, outcome) in batch.iter().zip(&outcomes) {
		match outcome {
			Outcome::Success { status, body } =>
				println!("<- {} {} => {status} {body:?}", request.method, request.url),
			Outcome::Failure(err) => println!("<- {} {} => {err}", request.method, request.url),
		}
	}

	println!(
		"token acquisitions: {}, refreshes: {}, retries: {}",
		effector.authenticator.metrics.acquisitions(),
		effector.authenticator.metrics.refreshes(),
		effector.metrics.retries(),
	);

	ensure_success(&batch, &outcomes)?;

	Ok(())
}
