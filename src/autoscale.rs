//! Scaling group and policy lifecycle helpers.
//!
//! These are thin consumers of the effecting core: every operation builds one [`Request`]
//! and runs it through an [`Effector`], so the same descriptors can also be batched by a
//! planner. Payloads are checked against the collaborator's documented limits before they
//! are sent; a rejected payload is a [`ValidationError`] and never reaches the executor.

pub mod group;
pub mod limits;
pub mod policy;

pub use group::*;
pub use limits::*;
pub use policy::*;

// self
use crate::{
	_prelude::*,
	effect::Effector,
	error::EffectError,
	http::EffectHttpClient,
	obs::{self, EffectSpan, OpKind, OpOutcome},
	outcome::ResponseBody,
	request::Request,
};

/// Payloads rejected before they are sent.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Policy names must contain a non-whitespace character.
	#[error("Policy name must not be blank.")]
	BlankName,
	/// Cooldowns must lie within `0..=MAX_COOLDOWN` seconds.
	#[error("Cooldown {cooldown} is outside 0..={max} seconds.", max = MAX_COOLDOWN)]
	CooldownOutOfRange {
		/// Rejected cooldown.
		cooldown: i64,
	},
	/// Policies must change capacity by a non-zero amount.
	#[error("Policy change must be non-zero and finite.")]
	ZeroChange,
	/// Group entity bounds exceed the collaborator's maximum.
	#[error("Entity count {count} exceeds the maximum of {max}.", max = MAX_ENTITIES)]
	TooManyEntities {
		/// Rejected count.
		count: u64,
	},
	/// Minimum entities must not exceed maximum entities.
	#[error("Minimum entities {min} exceed maximum entities {max}.")]
	InvertedEntityBounds {
		/// Configured minimum.
		min: u64,
		/// Configured maximum.
		max: u64,
	},
	/// Too many personality files were supplied.
	#[error("{count} personality files exceed the maximum of {max}.", max = MAX_PERSONALITIES)]
	TooManyPersonalities {
		/// Number supplied.
		count: usize,
	},
	/// A personality path is too long.
	#[error(
		"Personality path is {len} characters; the maximum is {max}.",
		max = MAX_PERSONALITY_PATH
	)]
	PersonalityPathTooLong {
		/// Length in characters.
		len: usize,
	},
	/// A personality's contents are not valid base64.
	#[error("Personality contents for `{path}` are not base64 encoded.")]
	PersonalityNotBase64 {
		/// Path of the offending file.
		path: String,
	},
	/// A personality's decoded contents are too large.
	#[error(
		"Personality contents for `{path}` are {size} bytes; the maximum is {limit}.",
		limit = MAX_PERSONALITY_CONTENT
	)]
	PersonalityTooLarge {
		/// Path of the offending file.
		path: String,
		/// Decoded size in bytes.
		size: usize,
	},
	/// The personality list is not an array of `{path, contents}` objects.
	#[error("Personality list is malformed: {detail}.")]
	MalformedPersonality {
		/// Parser message.
		detail: String,
	},
	/// A policy document could not be encoded.
	#[error("Policy document is malformed: {detail}.")]
	MalformedPolicy {
		/// Encoder message.
		detail: String,
	},
	/// The operation needs a resource that has not been created yet.
	#[error("The {resource} has not been created yet.")]
	NotCreated {
		/// Resource kind.
		resource: &'static str,
	},
}

async fn effect_one<C>(
	effector: &Effector<C>,
	stage: &'static str,
	request: Request,
) -> Result<(u16, Option<ResponseBody>)>
where
	C: ?Sized + EffectHttpClient,
{
	const KIND: OpKind = OpKind::Lifecycle;

	let span = EffectSpan::new(KIND, stage);

	obs::record_op_outcome(KIND, OpOutcome::Attempt);

	let result = span
		.instrument(async move {
			let outcome = effector.run_one(request).await?;

			Ok(outcome.into_result()?)
		})
		.await;

	match &result {
		Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
	}

	result
}

fn json_body(status: u16, body: Option<ResponseBody>) -> Result<Value, EffectError> {
	match body {
		Some(ResponseBody::Json(value)) => Ok(value),
		Some(ResponseBody::Text(text)) => Err(EffectError::Decode {
			detail: format!("status {status} carried a non-JSON body"),
			body: text,
		}),
		None => Err(EffectError::Decode {
			detail: format!("status {status} carried no body"),
			body: String::new(),
		}),
	}
}

fn string_at(value: &Value, pointer: &str) -> Result<String, EffectError> {
	value.pointer(pointer).and_then(Value::as_str).map(ToOwned::to_owned).ok_or_else(|| {
		EffectError::Decode { detail: format!("missing string at `{pointer}`"), body: value.to_string() }
	})
}
