//! Success predicates evaluated against response status codes.

// self
use crate::_prelude::*;

/// Decides whether a response status counts as success.
///
/// Predicates are plain values rather than closures so request descriptors stay
/// comparable and serializable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPredicate {
	/// Succeeds only for the listed codes.
	HasCode(BTreeSet<u16>),
	/// Succeeds for any 2xx code.
	AnySuccess,
}
impl StatusPredicate {
	/// Builds a predicate accepting exactly the provided codes.
	pub fn has_code(codes: impl IntoIterator<Item = u16>) -> Self {
		Self::HasCode(codes.into_iter().collect())
	}

	/// Evaluates the predicate.
	pub fn matches(&self, status: u16) -> bool {
		match self {
			Self::HasCode(codes) => codes.contains(&status),
			Self::AnySuccess => (200..300).contains(&status),
		}
	}
}
impl Default for StatusPredicate {
	fn default() -> Self {
		Self::has_code([200])
	}
}
impl Display for StatusPredicate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::HasCode(codes) => {
				f.write_str("status in {")?;

				for (idx, code) in codes.iter().enumerate() {
					if idx > 0 {
						f.write_str(", ")?;
					}

					write!(f, "{code}")?;
				}

				f.write_str("}")
			},
			Self::AnySuccess => f.write_str("status in 2xx"),
		}
	}
}

/// Shorthand for [`StatusPredicate::has_code`].
pub fn has_code(codes: impl IntoIterator<Item = u16>) -> StatusPredicate {
	StatusPredicate::has_code(codes)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn has_code_ignores_duplicates_and_order() {
		assert_eq!(has_code([404, 204, 204]), has_code([204, 404]));
		assert!(has_code([204, 404]).matches(404));
		assert!(!has_code([204, 404]).matches(200));
		assert_eq!(has_code([404, 204]).to_string(), "status in {204, 404}");
	}

	#[test]
	fn any_success_covers_2xx_only() {
		assert!(StatusPredicate::AnySuccess.matches(202));
		assert!(!StatusPredicate::AnySuccess.matches(302));
		assert_eq!(StatusPredicate::default(), has_code([200]));
	}
}
