use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::identity::Identity;
use crate::error::{AllocationError, Result};
use crate::ids::{ModuleCode, StaffId};

/// A member of staff and the modules they teach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    id: Identity<StaffId>,
    forename: String,
    surname: String,
    modules: BTreeSet<ModuleCode>,
}

impl Staff {
    pub fn new(forename: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            id: Identity::Pending,
            forename: forename.into(),
            surname: surname.into(),
            modules: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Option<&StaffId> {
        self.id.get()
    }

    /// Give this staff member their identifier. Fails if one is already set.
    pub fn set_id(&mut self, id: StaffId) -> Result<()> {
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

    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }

    /// Codes of the modules this staff member currently teaches.
    pub fn teaching_modules(&self) -> &BTreeSet<ModuleCode> {
        &self.modules
    }

    pub fn teaches(&self, code: &ModuleCode) -> bool {
        self.modules.contains(code)
    }

    pub(crate) fn describe(&self) -> String {
        format!("staff member '{}'", self.full_name())
    }

    pub(crate) fn attach_module(&mut self, code: ModuleCode) {
        self.modules.insert(code);
    }

    pub(crate) fn detach_module(&mut self, code: &ModuleCode) -> bool {
        self.modules.remove(code)
    }
}

/// Input for creating a new staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaffInput {
    pub forename: String,
    pub surname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_id_only_once() {
        let mut staff = Staff::new("Grace", "Hopper");
        assert!(staff.id().is_none());
        staff.set_id(StaffId::parse("0abcd").unwrap()).unwrap();
        assert!(staff.set_id(StaffId::parse("0abce").unwrap()).is_err());
        assert_eq!(staff.id().unwrap().as_str(), "0abcd");
    }

    #[test]
    fn test_teaching_links() {
        let mut staff = Staff::new("Grace", "Hopper");
        let code = ModuleCode::parse("00042").unwrap();
        staff.attach_module(code.clone());
        assert!(staff.teaches(&code));
        assert!(staff.detach_module(&code));
        assert!(!staff.detach_module(&code));
    }
}
