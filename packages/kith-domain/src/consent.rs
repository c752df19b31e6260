use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do when the consent service cannot be reached. A denial from the
/// service itself is never an error; this only covers service failures.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentErrorPolicy {
	/// Proceed as if consent was granted.
	AllowOnError,
	/// Fail the affected user's indexing attempt.
	DenyOnError,
}

impl ConsentErrorPolicy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AllowOnError => "allow",
			Self::DenyOnError => "deny",
		}
	}
}

impl FromStr for ConsentErrorPolicy {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_lowercase().as_str() {
			"allow" => Ok(Self::AllowOnError),
			"deny" => Ok(Self::DenyOnError),
			other => Err(format!("Unknown consent error policy: {other}.")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_both_policies() {
		assert_eq!("allow".parse::<ConsentErrorPolicy>(), Ok(ConsentErrorPolicy::AllowOnError));
		assert_eq!(" DENY ".parse::<ConsentErrorPolicy>(), Ok(ConsentErrorPolicy::DenyOnError));
		assert!("maybe".parse::<ConsentErrorPolicy>().is_err());
	}
}
