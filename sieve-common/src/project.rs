use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised if a project ID cannot be parsed from a string.
#[derive(Debug, Error, Eq, Ord, PartialEq, PartialOrd)]
pub enum ParseProjectIdError {
    /// Raised if the value is not an integer in the supported range.
    #[error("invalid value for project id")]
    InvalidValue,
    /// Raised if an empty value is parsed.
    #[error("empty or missing project id")]
    EmptyValue,
}

/// The identifier of a project that owns a sampling rule set.
///
/// Every project has at most one rule set. The id is also used to name the persisted rule file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct ProjectId(u64);

impl ProjectId {
    /// Creates a new project ID from its numeric value.
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value of this project ID.
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for ProjectId {
    type Err = ParseProjectIdError;

    fn from_str(s: &str) -> Result<ProjectId, ParseProjectIdError> {
        if s.is_empty() {
            return Err(ParseProjectIdError::EmptyValue);
        }

        s.parse::<u64>()
            .map(ProjectId::new)
            .map_err(|_| ParseProjectIdError::InvalidValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_id() {
        assert_eq!("42".parse::<ProjectId>(), Ok(ProjectId::new(42)));
        assert_eq!("".parse::<ProjectId>(), Err(ParseProjectIdError::EmptyValue));
        assert_eq!(
            "-1".parse::<ProjectId>(),
            Err(ParseProjectIdError::InvalidValue)
        );
    }

    #[test]
    fn test_project_id_serde() {
        let id: ProjectId = serde_json::from_str("17").unwrap();
        assert_eq!(id.value(), 17);
        assert_eq!(serde_json::to_string(&id).unwrap(), "17");
    }
}
