//! Random identifier generation with collision retry.
//!
//! Candidates are drawn at random and checked against the caller's notion of
//! "taken" (normally an [`OrderedIndex`](crate::index::OrderedIndex) lookup).
//! The identifier spaces dwarf any realistic population, so collisions are
//! rare, but the retry loop is still bounded: a nearly full space fails with
//! [`AllocationError::IdSpaceExhausted`] instead of spinning forever.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{AllocationError, Result};
use crate::ids::{ModuleCode, StaffId, StudentId};

pub const MAX_GENERATION_ATTEMPTS: usize = 1_000_000;

const STAFF_ID_MAX: u32 = 0xF_FFFF;
const MODULE_CODE_MAX: u32 = 99_999;
const STUDENT_PART_MAX: u64 = 99_999;

#[derive(Debug, Clone)]
pub struct IdGenerator<R = StdRng> {
    rng: R,
    max_attempts: usize,
}

impl IdGenerator<StdRng> {
    /// A generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// A deterministic generator, for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> IdGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            max_attempts: MAX_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Ten digits formed by joining two random numbers and left-padding with
    /// zeros.
    pub fn student_id(&mut self, taken: impl Fn(&StudentId) -> bool) -> Result<StudentId> {
        self.generate("student", taken, |rng| {
            let high = rng.random_range(0..STUDENT_PART_MAX);
            let low = rng.random_range(1..=STUDENT_PART_MAX);
            StudentId::from_number(join_digits(high, low))
        })
    }

    pub fn staff_id(&mut self, taken: impl Fn(&StaffId) -> bool) -> Result<StaffId> {
        self.generate("staff", taken, |rng| {
            StaffId::from_number(rng.random_range(0..=STAFF_ID_MAX))
        })
    }

    pub fn module_code(&mut self, taken: impl Fn(&ModuleCode) -> bool) -> Result<ModuleCode> {
        self.generate("module", taken, |rng| {
            ModuleCode::from_number(rng.random_range(1..=MODULE_CODE_MAX))
        })
    }

    fn generate<K>(
        &mut self,
        entity: &'static str,
        taken: impl Fn(&K) -> bool,
        mut candidate: impl FnMut(&mut R) -> K,
    ) -> Result<K> {
        for attempt in 0..self.max_attempts {
            let id = candidate(&mut self.rng);
            if !taken(&id) {
                return Ok(id);
            }
            tracing::debug!("{} identifier collision on attempt {}, retrying", entity, attempt + 1);
        }
        Err(AllocationError::IdSpaceExhausted {
            entity,
            attempts: self.max_attempts,
        })
    }
}

/// `high` followed by the decimal digits of `low`, which must be non-zero.
fn join_digits(high: u64, low: u64) -> u64 {
    high * 10u64.pow(low.ilog10() + 1) + low
}

impl Default for IdGenerator<StdRng> {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::ids::{is_valid_module_code, is_valid_staff_id, is_valid_student_id};

    #[test]
    fn test_generated_ids_have_the_right_shape() {
        let mut generator = IdGenerator::seeded(42);
        for _ in 0..1000 {
            let student = generator.student_id(|_| false).unwrap();
            let staff = generator.staff_id(|_| false).unwrap();
            let module = generator.module_code(|_| false).unwrap();
            assert!(is_valid_student_id(student.as_str()), "{student}");
            assert!(is_valid_staff_id(staff.as_str()), "{staff}");
            assert!(is_valid_module_code(module.as_str()), "{module}");
            assert_ne!(module.as_str(), "00000");
            assert_eq!(staff.as_str(), staff.as_str().to_ascii_lowercase());
        }
    }

    #[test]
    fn test_retries_past_taken_ids() {
        let mut generator = IdGenerator::seeded(7);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let code = generator.module_code(|c| seen.contains(c)).unwrap();
            assert!(seen.insert(code));
        }
    }

    #[test]
    fn test_gives_up_when_everything_is_taken() {
        let mut generator = IdGenerator::seeded(1).with_max_attempts(50);
        let err = generator.staff_id(|_| true).unwrap_err();
        assert_eq!(err.kind(), "id_space_exhausted");
        assert!(err.to_string().contains("50 attempts"));
    }

    #[test]
    fn test_joins_decimal_forms() {
        assert_eq!(join_digits(0, 7), 7);
        assert_eq!(join_digits(12, 7), 127);
        assert_eq!(join_digits(12, 100), 12100);
        assert_eq!(join_digits(99_998, 99_999), 9_999_899_999);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = IdGenerator::seeded(99);
        let mut b = IdGenerator::seeded(99);
        assert_eq!(
            a.student_id(|_| false).unwrap(),
            b.student_id(|_| false).unwrap()
        );
    }
}
