//! Scaling policy lifecycle: create, execute, inspect, update, and delete.
//!
//! Once created, a policy is addressed through the `links[0].href` the API returned for it
//! rather than a path rebuilt from identifiers. The href ends with `/`, so execution is
//! `{link}execute` and deletion is `{link}?force=true`.

// self
use crate::{
	_prelude::*,
	autoscale::{self, MAX_COOLDOWN, ScalingGroup, ValidationError},
	effect::Effector,
	http::EffectHttpClient,
	request::Request,
	service::ServiceType,
};

/// How a policy is triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
	/// Executed through its webhook or the execute endpoint.
	Webhook,
	/// Executed by the scheduler.
	Schedule,
}

/// Capacity adjustment applied when a policy executes.
///
/// Serialized as exactly one of `change`, `changePercent`, or `desiredCapacity`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyChange {
	/// Add (positive) or remove (negative) this many servers.
	Change(i64),
	/// Scale by a percentage of the current capacity.
	ChangePercent(f64),
	/// Converge to an absolute capacity.
	DesiredCapacity(u64),
}

/// Policy document as sent to `POST /groups/{id}/policies` and `PUT {link}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
	/// Human-readable policy name.
	pub name: String,
	/// Seconds before the policy may execute again.
	pub cooldown: i64,
	/// Trigger kind.
	#[serde(rename = "type")]
	pub policy_type: PolicyType,
	/// Capacity adjustment.
	#[serde(flatten)]
	pub change: PolicyChange,
}
impl PolicySpec {
	/// Name used for policies created by [`ScalingPolicy::new`].
	pub const DEFAULT_NAME: &'static str = "integration-test-policy";

	/// Creates a webhook policy with no cooldown that changes capacity by `scale_by`.
	pub fn webhook(name: impl Into<String>, scale_by: i64) -> Self {
		Self {
			name: name.into(),
			cooldown: 0,
			policy_type: PolicyType::Webhook,
			change: PolicyChange::Change(scale_by),
		}
	}

	/// Overrides the cooldown.
	pub fn with_cooldown(mut self, cooldown: i64) -> Self {
		self.cooldown = cooldown;

		self
	}

	/// Overrides the capacity adjustment.
	pub fn with_change(mut self, change: PolicyChange) -> Self {
		self.change = change;

		self
	}

	/// Rejects documents the API would answer with 400.
	pub fn validate(&self) -> Result<(), ValidationError> {
		if self.name.trim().is_empty() {
			return Err(ValidationError::BlankName);
		}
		if !(0..=MAX_COOLDOWN).contains(&self.cooldown) {
			return Err(ValidationError::CooldownOutOfRange { cooldown: self.cooldown });
		}

		let zero = match self.change {
			PolicyChange::Change(n) => n == 0,
			PolicyChange::ChangePercent(p) => p == 0. || !p.is_finite(),
			PolicyChange::DesiredCapacity(_) => false,
		};

		if zero {
			return Err(ValidationError::ZeroChange);
		}

		Ok(())
	}
}

/// A policy attached to a scaling group.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingPolicy {
	/// Document the policy is created (or last updated) with.
	pub spec: PolicySpec,
	/// Group the policy belongs to.
	pub group_id: String,
	/// Identifier assigned by the API once the policy exists.
	pub policy_id: Option<String>,
	/// Self link returned by the API, ending with `/`.
	pub link: Option<String>,
}
impl ScalingPolicy {
	const RESOURCE: &'static str = "scaling policy";

	/// Prepares the default webhook policy changing capacity by `scale_by` on `group`.
	pub fn new(group: &ScalingGroup, scale_by: i64) -> Result<Self, ValidationError> {
		Ok(Self::with_spec(group.id()?, PolicySpec::webhook(PolicySpec::DEFAULT_NAME, scale_by)))
	}

	/// Prepares a policy with an explicit document for the group `group_id`.
	pub fn with_spec(group_id: impl Into<String>, spec: PolicySpec) -> Self {
		Self { spec, group_id: group_id.into(), policy_id: None, link: None }
	}

	/// Returns the self link assigned by the API.
	pub fn link(&self) -> Result<&str, ValidationError> {
		self.link.as_deref().ok_or(ValidationError::NotCreated { resource: Self::RESOURCE })
	}

	/// `POST /groups/{id}/policies` with a one-element policy list, expecting 201.
	pub fn create_request(&self) -> Result<Request, ValidationError> {
		let data = serde_json::to_value([&self.spec])
			.map_err(|err| ValidationError::MalformedPolicy { detail: err.to_string() })?;

		Ok(Request::post(ServiceType::Autoscale, format!("/groups/{}/policies", self.group_id))
			.with_data(data)
			.with_success_codes([201]))
	}

	/// `POST {link}execute`, expecting 202 with no meaningful body.
	pub fn execute_request(link: &str) -> Request {
		Request::post(ServiceType::Autoscale, format!("{link}execute"))
			.with_success_codes([202])
			.with_json_response(false)
	}

	/// `DELETE {link}?force=true`; 404 counts as success so cleanup is idempotent.
	pub fn delete_request(link: &str) -> Request {
		Request::delete(ServiceType::Autoscale, format!("{link}?force=true"))
			.with_success_codes([204, 404])
	}

	/// `GET {link}`, accepting 200 and 404.
	pub fn get_request(link: &str) -> Request {
		Request::get(ServiceType::Autoscale, link).with_success_codes([200, 404])
	}

	/// `PUT {link}` with a single policy document, expecting 204.
	pub fn update_request(link: &str, spec: &PolicySpec) -> Result<Request, ValidationError> {
		let data = serde_json::to_value(spec)
			.map_err(|err| ValidationError::MalformedPolicy { detail: err.to_string() })?;

		Ok(Request::put(ServiceType::Autoscale, link).with_data(data).with_success_codes([204]))
	}

	/// Validates and creates the policy, recording its identifier and self link.
	pub async fn create<C>(&mut self, effector: &Effector<C>) -> Result<()>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.spec.validate()?;

		let (status, body) =
			autoscale::effect_one(effector, "policy_create", self.create_request()?).await?;
		let created = autoscale::json_body(status, body)?;
		let policy_id = autoscale::string_at(&created, "/policies/0/id")?;
		let link = autoscale::string_at(&created, "/policies/0/links/0/href")?;

		self.policy_id = Some(policy_id);
		self.link = Some(link);

		Ok(())
	}

	/// Alias for [`ScalingPolicy::create`].
	pub async fn start<C>(&mut self, effector: &Effector<C>) -> Result<()>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.create(effector).await
	}

	/// Executes the policy, returning the 202 status.
	pub async fn execute<C>(&self, effector: &Effector<C>) -> Result<u16>
	where
		C: ?Sized + EffectHttpClient,
	{
		let request = Self::execute_request(self.link()?);
		let (status, _) = autoscale::effect_one(effector, "policy_execute", request).await?;

		Ok(status)
	}

	/// Fetches the policy document, or `None` once it has been deleted.
	pub async fn get<C>(&self, effector: &Effector<C>) -> Result<Option<Value>>
	where
		C: ?Sized + EffectHttpClient,
	{
		let request = Self::get_request(self.link()?);
		let (status, body) = autoscale::effect_one(effector, "policy_get", request).await?;

		if status == 404 {
			return Ok(None);
		}

		Ok(Some(autoscale::json_body(status, body)?))
	}

	/// Validates and applies `spec`, keeping it as the policy's document on success.
	pub async fn update<C>(&mut self, effector: &Effector<C>, spec: PolicySpec) -> Result<()>
	where
		C: ?Sized + EffectHttpClient,
	{
		spec.validate()?;

		let request = Self::update_request(self.link()?, &spec)?;

		autoscale::effect_one(effector, "policy_update", request).await?;

		self.spec = spec;

		Ok(())
	}

	/// Force-deletes the policy, returning 204 or 404.
	pub async fn delete<C>(&self, effector: &Effector<C>) -> Result<u16>
	where
		C: ?Sized + EffectHttpClient,
	{
		let request = Self::delete_request(self.link()?);
		let (status, _) = autoscale::effect_one(effector, "policy_delete", request).await?;

		Ok(status)
	}

	/// Alias for [`ScalingPolicy::delete`].
	pub async fn stop<C>(&self, effector: &Effector<C>) -> Result<u16>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.delete(effector).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{compile::compile, service::EndpointCatalog};

	const LINK: &str = "https://autoscale.example.com/v1.0/1/groups/g1/policies/p1/";

	#[test]
	fn default_policy_body_matches_the_api_shape() {
		let policy = ScalingPolicy::with_spec("g1", PolicySpec::webhook(PolicySpec::DEFAULT_NAME, 2));
		let request = policy.create_request().expect("Policy body should serialize.");

		assert_eq!(request.path, "/groups/g1/policies");
		assert_eq!(
			request.data,
			Some(serde_json::json!([{
				"name": "integration-test-policy",
				"cooldown": 0,
				"type": "webhook",
				"change": 2
			}])),
		);
	}

	#[test]
	fn change_variants_serialize_under_their_own_keys() {
		let spec = PolicySpec::webhook("p", 1).with_change(PolicyChange::DesiredCapacity(5));
		let value = serde_json::to_value(&spec).expect("Spec should serialize.");

		assert_eq!(value["desiredCapacity"], 5);
		assert!(value.get("change").is_none());

		let parsed: PolicySpec = serde_json::from_value(serde_json::json!({
			"name": "p", "cooldown": 30, "type": "schedule", "changePercent": 12.5
		}))
		.expect("Spec should deserialize.");

		assert_eq!(parsed.change, PolicyChange::ChangePercent(12.5));
		assert_eq!(parsed.policy_type, PolicyType::Schedule);
	}

	#[test]
	fn validation_mirrors_api_rejections() {
		assert_eq!(PolicySpec::webhook("", 1).validate(), Err(ValidationError::BlankName));
		assert_eq!(PolicySpec::webhook("  ", 1).validate(), Err(ValidationError::BlankName));
		assert_eq!(
			PolicySpec::webhook("p", 1).with_cooldown(-1).validate(),
			Err(ValidationError::CooldownOutOfRange { cooldown: -1 }),
		);
		assert_eq!(
			PolicySpec::webhook("p", 1).with_cooldown(MAX_COOLDOWN + 1).validate(),
			Err(ValidationError::CooldownOutOfRange { cooldown: MAX_COOLDOWN + 1 }),
		);
		assert_eq!(PolicySpec::webhook("p", 0).validate(), Err(ValidationError::ZeroChange));
		assert!(PolicySpec::webhook("p", i64::MAX).validate().is_ok());
		assert!(serde_json::from_value::<PolicySpec>(serde_json::json!({
			"name": "p", "cooldown": 0, "type": "myowntype", "change": 1
		}))
		.is_err());
	}

	#[test]
	fn link_requests_follow_the_returned_href() {
		let catalog = EndpointCatalog::new("ORD");
		let execute = compile(&ScalingPolicy::execute_request(LINK), &catalog)
			.expect("Execute request should compile.");
		let delete = compile(&ScalingPolicy::delete_request(LINK), &catalog)
			.expect("Delete request should compile.");

		assert_eq!(execute.url.as_str(), format!("{LINK}execute"));
		assert!(!execute.json_response);
		assert_eq!(delete.url.as_str(), format!("{LINK}?force=true"));
		assert!(ScalingPolicy::with_spec("g1", PolicySpec::webhook("p", 1)).link().is_err());
	}
}
