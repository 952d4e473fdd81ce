//! Scaling group lifecycle: create, inspect state, and delete.

// self
use crate::{
	_prelude::*,
	autoscale::{self, MAX_COOLDOWN, MAX_ENTITIES, Personality, ValidationError},
	effect::Effector,
	http::EffectHttpClient,
	request::Request,
	service::ServiceType,
};

/// A scaling group created from a caller-supplied configuration document.
///
/// The document is sent verbatim; only the fields the API bounds are checked beforehand.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalingGroup {
	/// Group document (`groupConfiguration`, `launchConfiguration`, optional `scalingPolicies`).
	pub config: Value,
	/// Identifier assigned by the API once the group exists.
	pub group_id: Option<String>,
	/// Full creation response.
	pub created: Option<Value>,
}
impl ScalingGroup {
	const RESOURCE: &'static str = "scaling group";

	/// Wraps a group document; nothing is sent until [`ScalingGroup::create`].
	pub fn new(config: Value) -> Self {
		Self { config, group_id: None, created: None }
	}

	/// Returns the identifier assigned by the API.
	pub fn id(&self) -> Result<&str, ValidationError> {
		self.group_id.as_deref().ok_or(ValidationError::NotCreated { resource: Self::RESOURCE })
	}

	/// Checks entity bounds, cooldown, and launch-configuration personality files.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let group = &self.config["groupConfiguration"];
		let min = group["minEntities"].as_u64().unwrap_or(0);

		if let Some(max) = group["maxEntities"].as_u64() {
			if max > MAX_ENTITIES {
				return Err(ValidationError::TooManyEntities { count: max });
			}
			if min > max {
				return Err(ValidationError::InvertedEntityBounds { min, max });
			}
		}
		if min > MAX_ENTITIES {
			return Err(ValidationError::TooManyEntities { count: min });
		}
		if let Some(cooldown) = group["cooldown"].as_i64() {
			if !(0..=MAX_COOLDOWN).contains(&cooldown) {
				return Err(ValidationError::CooldownOutOfRange { cooldown });
			}
		}

		let personality = &self.config["launchConfiguration"]["args"]["server"]["personality"];

		if !personality.is_null() {
			Personality::validate_value(personality)?;
		}

		Ok(())
	}

	/// `POST /groups` with the group document, expecting 201.
	pub fn create_request(&self) -> Request {
		Request::post(ServiceType::Autoscale, "/groups")
			.with_data(self.config.clone())
			.with_success_codes([201])
	}

	/// `DELETE /groups/{id}?force=true`; 404 counts as success so cleanup is idempotent.
	pub fn delete_request(group_id: &str) -> Request {
		Request::delete(ServiceType::Autoscale, format!("/groups/{group_id}?force=true"))
			.with_success_codes([204, 404])
	}

	/// `GET /groups/{id}/state`, accepting 200 and 404.
	pub fn state_request(group_id: &str) -> Request {
		Request::get(ServiceType::Autoscale, format!("/groups/{group_id}/state"))
			.with_success_codes([200, 404])
	}

	/// Validates and creates the group, recording its identifier and the creation response.
	pub async fn create<C>(&mut self, effector: &Effector<C>) -> Result<&str>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.validate()?;

		let (status, body) =
			autoscale::effect_one(effector, "group_create", self.create_request()).await?;
		let created = autoscale::json_body(status, body)?;
		let group_id = autoscale::string_at(&created, "/group/id")?;

		self.created = Some(created);

		Ok(self.group_id.insert(group_id).as_str())
	}

	/// Alias for [`ScalingGroup::create`].
	pub async fn start<C>(&mut self, effector: &Effector<C>) -> Result<&str>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.create(effector).await
	}

	/// Force-deletes the group, returning 204 or 404.
	pub async fn delete<C>(&self, effector: &Effector<C>) -> Result<u16>
	where
		C: ?Sized + EffectHttpClient,
	{
		let request = Self::delete_request(self.id()?);
		let (status, _) = autoscale::effect_one(effector, "group_delete", request).await?;

		Ok(status)
	}

	/// Alias for [`ScalingGroup::delete`]; does not wait for servers to be removed.
	pub async fn stop<C>(&self, effector: &Effector<C>) -> Result<u16>
	where
		C: ?Sized + EffectHttpClient,
	{
		self.delete(effector).await
	}

	/// Returns `(200, Some(state))`, or `(404, None)` when the group no longer exists.
	pub async fn state<C>(&self, effector: &Effector<C>) -> Result<(u16, Option<Value>)>
	where
		C: ?Sized + EffectHttpClient,
	{
		let request = Self::state_request(self.id()?);
		let (status, body) = autoscale::effect_one(effector, "group_state", request).await?;

		if status == 404 {
			return Ok((404, None));
		}

		Ok((status, Some(autoscale::json_body(status, body)?)))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::test_catalog, compile::compile, request::has_code};

	fn config(max: u64, personality: Value) -> Value {
		serde_json::json!({
			"groupConfiguration": { "name": "g", "cooldown": 0, "minEntities": 0, "maxEntities": max },
			"launchConfiguration": {
				"type": "launch_server",
				"args": { "server": { "flavorRef": "2", "personality": personality } }
			}
		})
	}

	#[test]
	fn requests_target_group_paths() {
		let catalog = test_catalog("https://autoscale.example.com/v1.0/1");
		let delete = compile(&ScalingGroup::delete_request("g1"), &catalog)
			.expect("Delete request should compile.");
		let state = compile(&ScalingGroup::state_request("g1"), &catalog)
			.expect("State request should compile.");

		assert_eq!(delete.url.as_str(), "https://autoscale.example.com/v1.0/1/groups/g1?force=true");
		assert_eq!(delete.success, has_code([204, 404]));
		assert_eq!(state.url.path(), "/v1.0/1/groups/g1/state");
		assert_eq!(state.success, has_code([200, 404]));
	}

	#[test]
	fn validation_checks_bounds_and_personality() {
		let ok = ScalingGroup::new(config(MAX_ENTITIES, Value::Null));
		let too_big = ScalingGroup::new(config(MAX_ENTITIES + 1, Value::Null));
		let bad_file =
			ScalingGroup::new(config(1, serde_json::json!([{ "path": "/root/a", "contents": "%%" }])));

		assert!(ok.validate().is_ok());
		assert_eq!(too_big.validate(), Err(ValidationError::TooManyEntities { count: 26 }));
		assert!(matches!(bad_file.validate(), Err(ValidationError::PersonalityNotBase64 { .. })));
		assert!(matches!(ok.id(), Err(ValidationError::NotCreated { .. })));
	}
}
