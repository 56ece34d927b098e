use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::stage::Stage;
use crate::error::{AllocationError, Result};
use crate::ids::{ModuleCode, StudentId};

/// The most credits a student can hold across all enrolled modules.
pub const MAX_CREDITS: u8 = 120;

/// The most credits a student can take below their own stage and still be
/// eligible for honours.
pub const MAX_LOWER_STAGE_CREDITS: u8 = 30;

/// A student and the modules they are enrolled on.
///
/// Enrolled modules are held by code. The three credit tallies are derived
/// from those modules and are only ever changed together, so
/// `total_credits == same_stage_credits + lower_stage_credits` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    id: Identity<StudentId>,
    forename: String,
    surname: String,
    stage: Stage,
    modules: BTreeSet<ModuleCode>,
    same_stage_credits: u8,
    lower_stage_credits: u8,
    total_credits: u8,
}

impl Student {
    pub fn new(forename: impl Into<String>, surname: impl Into<String>, stage: u8) -> Result<Self> {
        let forename = forename.into();
        let surname = surname.into();
        let stage = Stage::new(stage, format!("student '{forename} {surname}'"))?;
        Ok(Self {
            id: Identity::Pending,
            forename,
            surname,
            stage,
            modules: BTreeSet::new(),
            same_stage_credits: 0,
            lower_stage_credits: 0,
            total_credits: 0,
        })
    }

    pub fn id(&self) -> Option<&StudentId> {
        self.id.get()
    }

    /// Give this student their identifier. Fails if one is already set.
    pub fn set_id(&mut self, id: StudentId) -> Result<()> {
        self.id.assign(id).map_err(|_| AllocationError::IdAlreadySet {
            subject: self.describe(),
            id: self.id.get().map(ToString::to_string).unwrap_or_default(),
        })
    }

    pub fn forename(&self) -> &str {
        &self.forename
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn modules(&self) -> &BTreeSet<ModuleCode> {
        &self.modules
    }

    pub fn is_enrolled_on(&self, code: &ModuleCode) -> bool {
        self.modules.contains(code)
    }

    pub fn same_stage_credits(&self) -> u8 {
        self.same_stage_credits
    }

    pub fn lower_stage_credits(&self) -> u8 {
        self.lower_stage_credits
    }

    pub fn total_credits(&self) -> u8 {
        self.total_credits
    }

    pub fn is_fully_allocated(&self) -> bool {
        self.total_credits == MAX_CREDITS
    }

    pub(crate) fn describe(&self) -> String {
        format!("student '{} {}'", self.forename, self.surname)
    }

    /// Record the student side of an enrolment. Callers have already checked
    /// eligibility, so the tallies cannot overflow.
    pub(crate) fn attach_module(&mut self, code: ModuleCode, module_stage: Stage, credits: u8) {
        if !self.modules.insert(code) {
            return;
        }
        if module_stage == self.stage {
            self.same_stage_credits += credits;
        } else {
            self.lower_stage_credits += credits;
        }
        self.total_credits += credits;
    }

    /// Reverse [`Student::attach_module`]. Returns whether a link existed.
    pub(crate) fn detach_module(&mut self, code: &ModuleCode, module_stage: Stage, credits: u8) -> bool {
        if !self.modules.remove(code) {
            return false;
        }
        if module_stage == self.stage {
            self.same_stage_credits -= credits;
        } else {
            self.lower_stage_credits -= credits;
        }
        self.total_credits -= credits;
        true
    }
}

/// Input for creating a new student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudentInput {
    pub forename: String,
    pub surname: String,
    pub stage: u8,
}

/// Input for enrolling a student on a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolInput {
    pub student_id: String,
    pub module_code: String,
}
