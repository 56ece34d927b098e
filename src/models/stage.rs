use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};

/// Academic year level of a student or module, 1 to 4 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

impl Stage {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    /// Validate `value` as the stage of `subject` (used in the error message).
    pub fn new(value: u8, subject: impl Into<String>) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AllocationError::InvalidStage {
                subject: subject.into(),
                stage: value,
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Stage {
    type Error = AllocationError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value, "record")
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> u8 {
        stage.0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_stages() {
        for value in 1..=4 {
            assert_eq!(Stage::new(value, "student").unwrap().get(), value);
        }
    }

    #[test]
    fn test_invalid_stages() {
        for value in [0, 5, 9, 255] {
            let err = Stage::new(value, "student 'Ada Lovelace'").unwrap_err();
            assert_eq!(err.kind(), "invalid_stage");
            assert!(err.to_string().contains("Ada Lovelace"));
        }
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Stage>("3").is_ok());
        assert!(serde_json::from_str::<Stage>("0").is_err());
    }
}
