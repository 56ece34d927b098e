use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::stage::Stage;
use super::student::MAX_CREDITS;
use crate::error::{AllocationError, Result};
use crate::ids::{ModuleCode, StaffId, StudentId};

/// A taught module with its staff and enrolled students.
///
/// # Lifecycle
/// A module is running until it is discontinued. Discontinuing severs every
/// link and is permanent: a discontinued module never has staff or students
/// again, and its enrolled count stays at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    code: Identity<ModuleCode>,
    name: String,
    credits: u8,
    stage: Stage,
    capacity: u32,
    enrolled: u32,
    discontinued: bool,
    staff: BTreeSet<StaffId>,
    students: BTreeSet<StudentId>,
}

impl Module {
    pub fn new(name: impl Into<String>, credits: u8, stage: u8, capacity: u32) -> Result<Self> {
        let name = name.into();
        if credits > MAX_CREDITS {
            return Err(AllocationError::InvalidCredits {
                module: name,
                credits,
            });
        }
        let stage = Stage::new(stage, format!("module '{name}'"))?;
        if capacity < 1 {
            return Err(AllocationError::InvalidCapacity {
                module: name,
                capacity,
            });
        }
        Ok(Self {
            code: Identity::Pending,
            name,
            credits,
            stage,
            capacity,
            enrolled: 0,
            discontinued: false,
            staff: BTreeSet::new(),
            students: BTreeSet::new(),
        })
    }

    pub fn code(&self) -> Option<&ModuleCode> {
        self.code.get()
    }

    /// Give this module its code. Fails if one is already set.
    pub fn set_code(&mut self, code: ModuleCode) -> Result<()> {
        self.code.assign(code).map_err(|_| AllocationError::IdAlreadySet {
            subject: format!("module '{}'", self.name),
            id: self.code.get().map(ToString::to_string).unwrap_or_default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn credits(&self) -> u8 {
        self.credits
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn enrolled(&self) -> u32 {
        self.enrolled
    }

    pub fn is_at_capacity(&self) -> bool {
        self.enrolled >= self.capacity
    }

    pub fn is_discontinued(&self) -> bool {
        self.discontinued
    }

    pub fn teaching_staff(&self) -> &BTreeSet<StaffId> {
        &self.staff
    }

    pub fn students(&self) -> &BTreeSet<StudentId> {
        &self.students
    }

    pub(crate) fn attach_student(&mut self, id: StudentId) {
        if self.students.insert(id) {
            self.enrolled += 1;
        }
    }

    pub(crate) fn detach_student(&mut self, id: &StudentId) -> bool {
        let removed = self.students.remove(id);
        if removed {
            self.enrolled -= 1;
        }
        removed
    }

    pub(crate) fn attach_staff(&mut self, id: StaffId) -> bool {
        self.staff.insert(id)
    }

    pub(crate) fn detach_staff(&mut self, id: &StaffId) -> bool {
        self.staff.remove(id)
    }

    /// Clear every link and mark the module discontinued. Callers unlink the
    /// other side first.
    pub(crate) fn close(&mut self) {
        self.staff.clear();
        self.students.clear();
        self.enrolled = 0;
        self.discontinued = true;
    }

    /// Used when restoring a snapshot. Links are replayed afterwards.
    pub(crate) fn mark_discontinued(&mut self) {
        self.discontinued = true;
    }
}

/// Input for creating a new module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModuleInput {
    pub name: String,
    pub credits: u8,
    pub stage: u8,
    pub capacity: u32,
    /// Staff IDs of the members who will teach the module.
    #[serde(default)]
    pub staff: Vec<String>,
}
