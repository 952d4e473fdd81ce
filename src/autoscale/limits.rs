//! Limits enforced by the autoscale API, plus launch-configuration personality files.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, autoscale::ValidationError};

/// Largest `maxEntities` a group may declare.
pub const MAX_ENTITIES: u64 = 25;
/// Longest cooldown, in seconds, a group or policy may declare.
pub const MAX_COOLDOWN: i64 = 86_400;
/// Most personality files a launch configuration may carry.
pub const MAX_PERSONALITIES: usize = 3;
/// Largest decoded personality file, in bytes.
pub const MAX_PERSONALITY_CONTENT: usize = 1000;
/// Longest personality path, in characters.
pub const MAX_PERSONALITY_PATH: usize = 255;

/// A file injected into servers built from a launch configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
	/// Destination path on the server.
	pub path: String,
	/// Base64-encoded file contents.
	pub contents: String,
}
impl Personality {
	/// Creates a personality file, base64-encoding `raw`.
	pub fn new(path: impl Into<String>, raw: impl AsRef<[u8]>) -> Self {
		Self { path: path.into(), contents: STANDARD.encode(raw) }
	}

	/// Decodes the file contents.
	pub fn decode(&self) -> Result<Vec<u8>, ValidationError> {
		STANDARD
			.decode(&self.contents)
			.map_err(|_| ValidationError::PersonalityNotBase64 { path: self.path.clone() })
	}

	/// Checks path length, encoding, and decoded size.
	pub fn validate(&self) -> Result<(), ValidationError> {
		let len = self.path.chars().count();

		if len > MAX_PERSONALITY_PATH {
			return Err(ValidationError::PersonalityPathTooLong { len });
		}

		let size = self.decode()?.len();

		if size > MAX_PERSONALITY_CONTENT {
			return Err(ValidationError::PersonalityTooLarge { path: self.path.clone(), size });
		}

		Ok(())
	}

	/// Checks the number of files and then each file.
	pub fn validate_all(personalities: &[Self]) -> Result<(), ValidationError> {
		if personalities.len() > MAX_PERSONALITIES {
			return Err(ValidationError::TooManyPersonalities { count: personalities.len() });
		}

		personalities.iter().try_for_each(Self::validate)
	}

	/// Parses and checks a raw JSON personality list.
	pub fn validate_value(value: &Value) -> Result<Vec<Self>, ValidationError> {
		let personalities = Vec::<Self>::deserialize(value)
			.map_err(|err| ValidationError::MalformedPersonality { detail: err.to_string() })?;

		Self::validate_all(&personalities)?;

		Ok(personalities)
	}
}
