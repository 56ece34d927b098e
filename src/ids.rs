//! Identifier types and their syntactic validation.
//!
//! | Entity | Shape | Example |
//! |---|---|---|
//! | [`StudentId`] | 10 decimal digits | `0012345678` |
//! | [`StaffId`] | 5 hex digits, stored lowercase | `01a2f` |
//! | [`ModuleCode`] | 5 decimal digits | `00042` |
//!
//! Each type can only be constructed from a string of the right shape, so a
//! value in hand is always valid. Ordering is the lexicographic ordering of
//! the underlying string, which for fixed-width digits is also numeric order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};

pub const STUDENT_ID_LEN: usize = 10;
pub const STAFF_ID_LEN: usize = 5;
pub const MODULE_CODE_LEN: usize = 5;

pub fn is_valid_student_id(s: &str) -> bool {
    s.len() == STUDENT_ID_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// Either case is accepted; [`StaffId::parse`] normalises to lowercase.
pub fn is_valid_staff_id(s: &str) -> bool {
    s.len() == STAFF_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn is_valid_module_code(s: &str) -> bool {
    s.len() == MODULE_CODE_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $check:ident, $expected:literal, $normalise:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(s: &str) -> Result<Self> {
                if $check(s) {
                    let normalise: fn(&str) -> String = $normalise;
                    Ok(Self(normalise(s)))
                } else {
                    Err(AllocationError::InvalidId {
                        value: s.to_string(),
                        expected: $expected,
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = AllocationError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = AllocationError;

            fn try_from(s: String) -> Result<Self> {
                Self::parse(&s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// A student's 10-digit identifier.
    StudentId,
    is_valid_student_id,
    "student ID (10 decimal digits)",
    |s| s.to_string()
);

identifier!(
    /// A staff member's 5-digit hexadecimal identifier.
    StaffId,
    is_valid_staff_id,
    "staff ID (5 hexadecimal digits)",
    |s| s.to_ascii_lowercase()
);

identifier!(
    /// A module's 5-digit code.
    ModuleCode,
    is_valid_module_code,
    "module code (5 decimal digits)",
    |s| s.to_string()
);

impl StudentId {
    pub(crate) fn from_number(n: u64) -> Self {
        Self(format!("{n:0width$}", width = STUDENT_ID_LEN))
    }
}

impl StaffId {
    pub(crate) fn from_number(n: u32) -> Self {
        Self(format!("{n:0width$x}", width = STAFF_ID_LEN))
    }
}

impl ModuleCode {
    pub(crate) fn from_number(n: u32) -> Self {
        Self(format!("{n:0width$}", width = MODULE_CODE_LEN))
    }
}
