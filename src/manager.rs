//! The allocation engine.
//!
//! [`AllocationManager`] owns one [`OrderedIndex`] per entity kind and is the
//! only code that links or unlinks records. Every dual-sided change goes
//! through one of four helpers (`link_enrolment`, `unlink_enrolment`,
//! `link_teaching`, `unlink_teaching`), so the two sides of a relationship can
//! never disagree.
//!
//! Every public operation validates its input and resolves every identifier
//! before it touches anything. A returned error means the store is exactly
//! as it was before the call.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, Result};
use crate::idgen::IdGenerator;
use crate::ids::{ModuleCode, StaffId, StudentId};
use crate::index::OrderedIndex;
use crate::models::{Module, Staff, Student, MAX_CREDITS, MAX_LOWER_STAGE_CREDITS};
use crate::snapshot;

/// Which modules a listing should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleFilter {
    #[default]
    All,
    /// Not discontinued.
    Running,
    /// Not discontinued and not at capacity.
    Available,
}

impl ModuleFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Running => "running",
            Self::Available => "available",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "running" => Some(Self::Running),
            "available" => Some(Self::Available),
            _ => None,
        }
    }

    fn matches(&self, module: &Module) -> bool {
        match self {
            Self::All => true,
            Self::Running => !module.is_discontinued(),
            Self::Available => !module.is_discontinued() && !module.is_at_capacity(),
        }
    }
}

/// Counts across the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub students: usize,
    pub staff: usize,
    pub modules: usize,
    pub running_modules: usize,
    pub fully_allocated_students: usize,
    pub modules_at_capacity: usize,
}

#[derive(Debug)]
pub struct AllocationManager {
    students: OrderedIndex<StudentId, Student>,
    staff: OrderedIndex<StaffId, Staff>,
    modules: OrderedIndex<ModuleCode, Module>,
    ids: IdGenerator,
}

impl AllocationManager {
    pub fn new() -> Self {
        Self::with_generator(IdGenerator::from_os_rng())
    }

    pub fn with_generator(ids: IdGenerator) -> Self {
        Self {
            students: OrderedIndex::new(),
            staff: OrderedIndex::new(),
            modules: OrderedIndex::new(),
            ids,
        }
    }

    // ============================================================
    // Creation
    // ============================================================

    pub fn add_student(
        &mut self,
        forename: impl Into<String>,
        surname: impl Into<String>,
        stage: u8,
    ) -> Result<StudentId> {
        let mut student = Student::new(forename, surname, stage)?;
        let id = self.ids.student_id(|id| self.students.contains_key(id))?;
        student.set_id(id.clone())?;

        tracing::info!("Added {} as {}", student.describe(), id);
        self.students.insert(id.clone(), student);
        Ok(id)
    }

    /// Index a caller-built student, assigning the new identifier to both the
    /// stored copy and `student`.
    pub fn add_existing_student(&mut self, student: &mut Student) -> Result<StudentId> {
        if let Some(id) = student.id() {
            return Err(AllocationError::IdAlreadySet {
                subject: student.describe(),
                id: id.to_string(),
            });
        }

        let mut stored = Student::new(
            student.forename(),
            student.surname(),
            student.stage().get(),
        )?;
        let id = self.ids.student_id(|id| self.students.contains_key(id))?;
        student.set_id(id.clone())?;
        stored.set_id(id.clone())?;

        tracing::info!("Added existing {} as {}", stored.describe(), id);
        self.students.insert(id.clone(), stored);
        Ok(id)
    }

    pub fn add_staff(
        &mut self,
        forename: impl Into<String>,
        surname: impl Into<String>,
    ) -> Result<StaffId> {
        let mut staff = Staff::new(forename, surname);
        let id = self.ids.staff_id(|id| self.staff.contains_key(id))?;
        staff.set_id(id.clone())?;

        tracing::info!("Added {} as {}", staff.describe(), id);
        self.staff.insert(id.clone(), staff);
        Ok(id)
    }

    /// Index a caller-built staff member, assigning the new identifier to both
    /// the stored copy and `staff`.
    pub fn add_existing_staff(&mut self, staff: &mut Staff) -> Result<StaffId> {
        if let Some(id) = staff.id() {
            return Err(AllocationError::IdAlreadySet {
                subject: staff.describe(),
                id: id.to_string(),
            });
        }

        let mut stored = Staff::new(staff.forename(), staff.surname());
        let id = self.ids.staff_id(|id| self.staff.contains_key(id))?;
        staff.set_id(id.clone())?;
        stored.set_id(id.clone())?;

        tracing::info!("Added existing {} as {}", stored.describe(), id);
        self.staff.insert(id.clone(), stored);
        Ok(id)
    }

    /// Create a module taught by `staff`, every one of whom must already be
    /// in the store.
    pub fn add_module(
        &mut self,
        name: impl Into<String>,
        credits: u8,
        stage: u8,
        capacity: u32,
        staff: &[Staff],
    ) -> Result<ModuleCode> {
        let name = name.into();
        check_capacity(&name, capacity)?;

        for (i, a) in staff.iter().enumerate() {
            for b in &staff[i + 1..] {
                if let (Some(x), Some(y)) = (a.id(), b.id()) {
                    if x == y {
                        return Err(AllocationError::DuplicateStaff {
                            module: name,
                            staff_id: x.to_string(),
                        });
                    }
                }
            }
        }

        let mut staff_ids = Vec::with_capacity(staff.len());
        for member in staff {
            let id = member.id().ok_or_else(|| AllocationError::IdNotSet {
                subject: member.describe(),
            })?;
            if !self.staff.contains_key(id) {
                return Err(AllocationError::StaffNotInSystem {
                    name: member.full_name(),
                    staff_id: id.to_string(),
                });
            }
            staff_ids.push(id.clone());
        }

        self.insert_module(name, credits, stage, capacity, &staff_ids)
    }

    /// Create a module taught by the staff with the given identifiers.
    ///
    /// Checks run in the same order as [`AllocationManager::add_module`]:
    /// capacity, duplicates, then presence in the store.
    pub fn add_module_taught_by(
        &mut self,
        name: impl Into<String>,
        credits: u8,
        stage: u8,
        capacity: u32,
        staff_ids: &[StaffId],
    ) -> Result<ModuleCode> {
        let name = name.into();
        check_capacity(&name, capacity)?;

        for (i, id) in staff_ids.iter().enumerate() {
            if staff_ids[i + 1..].contains(id) {
                return Err(AllocationError::DuplicateStaff {
                    module: name,
                    staff_id: id.to_string(),
                });
            }
        }

        if let Some(missing) = staff_ids.iter().find(|id| !self.staff.contains_key(*id)) {
            return Err(AllocationError::StaffNotInSystem {
                name: "unknown".to_string(),
                staff_id: missing.to_string(),
            });
        }

        self.insert_module(name, credits, stage, capacity, staff_ids)
    }

    fn insert_module(
        &mut self,
        name: String,
        credits: u8,
        stage: u8,
        capacity: u32,
        staff_ids: &[StaffId],
    ) -> Result<ModuleCode> {
        let mut module = Module::new(name, credits, stage, capacity)?;
        let code = self.ids.module_code(|code| self.modules.contains_key(code))?;
        module.set_code(code.clone())?;

        tracing::info!(
            "Added module '{}' as {} with {} teaching staff",
            module.name(),
            code,
            staff_ids.len()
        );
        self.modules.insert(code.clone(), module);
        for staff_id in staff_ids {
            self.link_teaching(staff_id, &code);
        }
        Ok(code)
    }

    /// Index a caller-built module, assigning the new code to both the stored
    /// copy and `module`. The module must have no teaching staff.
    pub fn add_existing_module(&mut self, module: &mut Module) -> Result<ModuleCode> {
        if let Some(code) = module.code() {
            return Err(AllocationError::IdAlreadySet {
                subject: format!("module '{}'", module.name()),
                id: code.to_string(),
            });
        }
        if !module.teaching_staff().is_empty() {
            return Err(AllocationError::StaffAttached {
                module: module.name().to_string(),
            });
        }

        let mut stored = Module::new(
            module.name(),
            module.credits(),
            module.stage().get(),
            module.capacity(),
        )?;
        let code = self.ids.module_code(|code| self.modules.contains_key(code))?;
        module.set_code(code.clone())?;
        stored.set_code(code.clone())?;

        tracing::info!("Added existing module '{}' as {}", stored.name(), code);
        self.modules.insert(code.clone(), stored);
        Ok(code)
    }

    // ============================================================
    // Teaching
    // ============================================================

    pub fn assign_staff(&mut self, module_code: &str, staff_id: &str) -> Result<()> {
        let code = ModuleCode::parse(module_code)?;
        let staff_id = StaffId::parse(staff_id)?;
        let module = self.module_ref(&code)?;
        self.staff_ref(&staff_id)?;

        if module.is_discontinued() {
            return Err(AllocationError::ModuleDiscontinued {
                module_code: code.to_string(),
            });
        }
        if module.teaching_staff().contains(&staff_id) {
            return Err(AllocationError::DuplicateStaff {
                module: module.name().to_string(),
                staff_id: staff_id.to_string(),
            });
        }

        self.link_teaching(&staff_id, &code);
        tracing::debug!("Staff {} now teaches module {}", staff_id, code);
        Ok(())
    }

    pub fn unassign_staff(&mut self, module_code: &str, staff_id: &str) -> Result<()> {
        let code = ModuleCode::parse(module_code)?;
        let staff_id = StaffId::parse(staff_id)?;
        let module = self.module_ref(&code)?;
        self.staff_ref(&staff_id)?;

        if !module.teaching_staff().contains(&staff_id) {
            return Err(AllocationError::StaffNotInvolved {
                staff_id: staff_id.to_string(),
                module_code: code.to_string(),
            });
        }

        self.unlink_teaching(&staff_id, &code);
        tracing::debug!("Staff {} no longer teaches module {}", staff_id, code);
        Ok(())
    }

    // ============================================================
    // Enrolment
    // ============================================================

    /// Enrol a student on a module.
    ///
    /// Rules are checked in a fixed order and the first failure wins:
    /// capacity, available credits, discontinued, stage too high, honours
    /// protection, then an existing enrolment.
    pub fn enrol(&mut self, student_id: &str, module_code: &str) -> Result<()> {
        let student_id = StudentId::parse(student_id)?;
        let code = ModuleCode::parse(module_code)?;
        let student = self.student_ref(&student_id)?;
        let module = self.module_ref(&code)?;

        check_enrolment(student, module, &student_id, &code)?;

        self.link_enrolment(&student_id, &code);
        tracing::debug!("Enrolled student {} on module {}", student_id, code);
        Ok(())
    }

    /// Remove an enrolment. Returns `false` if the pair was not linked.
    pub fn un_enrol(&mut self, student_id: &str, module_code: &str) -> Result<bool> {
        let student_id = StudentId::parse(student_id)?;
        let code = ModuleCode::parse(module_code)?;
        self.student_ref(&student_id)?;
        self.module_ref(&code)?;

        let removed = self.unlink_enrolment(&student_id, &code);
        if removed {
            tracing::debug!("Un-enrolled student {} from module {}", student_id, code);
        }
        Ok(removed)
    }

    /// Permanently close a module, unlinking all of its students and staff.
    pub fn discontinue(&mut self, module_code: &str) -> Result<()> {
        let code = ModuleCode::parse(module_code)?;
        let module = self.module_ref(&code)?;
        if module.is_discontinued() {
            return Ok(());
        }

        let students: Vec<StudentId> = module.students().iter().cloned().collect();
        let staff: Vec<StaffId> = module.teaching_staff().iter().cloned().collect();

        for student_id in &students {
            self.unlink_enrolment(student_id, &code);
        }
        for staff_id in &staff {
            self.unlink_teaching(staff_id, &code);
        }
        if let Some(module) = self.modules.find_mut(&code) {
            module.close();
        }

        tracing::info!(
            "Discontinued module {} ({} students, {} staff unlinked)",
            code,
            students.len(),
            staff.len()
        );
        Ok(())
    }

    // ============================================================
    // Removal
    // ============================================================

    /// Remove a staff member, unlinking them from everything they teach.
    ///
    /// Returns the modules left with no teaching staff as a result.
    pub fn remove_staff(&mut self, staff: &Staff) -> Result<Vec<Module>> {
        let id = staff
            .id()
            .ok_or_else(|| AllocationError::IdNotSet {
                subject: staff.describe(),
            })?
            .clone();
        let codes: Vec<ModuleCode> = self
            .staff_ref(&id)?
            .teaching_modules()
            .iter()
            .cloned()
            .collect();

        let mut unstaffed = Vec::new();
        for code in &codes {
            self.unlink_teaching(&id, code);
            if let Some(module) = self.modules.find(code) {
                if module.teaching_staff().is_empty() {
                    unstaffed.push(module.clone());
                }
            }
        }
        self.staff.remove(&id);

        tracing::info!(
            "Removed staff {} ({} modules left without staff)",
            id,
            unstaffed.len()
        );
        Ok(unstaffed)
    }

    /// Remove a student, un-enrolling them from every module first.
    pub fn remove_student(&mut self, student: &Student) -> Result<()> {
        let id = student
            .id()
            .ok_or_else(|| AllocationError::IdNotSet {
                subject: student.describe(),
            })?
            .clone();
        let codes: Vec<ModuleCode> = self.student_ref(&id)?.modules().iter().cloned().collect();

        for code in &codes {
            self.unlink_enrolment(&id, code);
        }
        self.students.remove(&id);

        tracing::info!("Removed student {} ({} enrolments dropped)", id, codes.len());
        Ok(())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn number_of_students(&self) -> usize {
        self.students.len()
    }

    pub fn number_of_staff(&self) -> usize {
        self.staff.len()
    }

    pub fn number_of_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn number_of_fully_allocated_students(&self) -> usize {
        self.students
            .values()
            .filter(|s| s.is_fully_allocated())
            .count()
    }

    pub fn number_of_modules_at_capacity(&self) -> usize {
        self.modules
            .values()
            .filter(|m| m.is_at_capacity())
            .count()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            students: self.number_of_students(),
            staff: self.number_of_staff(),
            modules: self.number_of_modules(),
            running_modules: self
                .modules
                .values()
                .filter(|m| !m.is_discontinued())
                .count(),
            fully_allocated_students: self.number_of_fully_allocated_students(),
            modules_at_capacity: self.number_of_modules_at_capacity(),
        }
    }

    /// Every student, in identifier order.
    pub fn students(&self) -> Vec<Student> {
        self.students.values().cloned().collect()
    }

    pub fn staff(&self) -> Vec<Staff> {
        self.staff.values().cloned().collect()
    }

    pub fn modules(&self) -> Vec<Module> {
        self.filtered_modules(ModuleFilter::All)
    }

    pub fn running_modules(&self) -> Vec<Module> {
        self.filtered_modules(ModuleFilter::Running)
    }

    pub fn available_modules(&self) -> Vec<Module> {
        self.filtered_modules(ModuleFilter::Available)
    }

    pub fn filtered_modules(&self, filter: ModuleFilter) -> Vec<Module> {
        self.modules
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect()
    }

    pub fn student(&self, student_id: &str) -> Result<Student> {
        let id = StudentId::parse(student_id)?;
        self.student_ref(&id).cloned()
    }

    pub fn staff_member(&self, staff_id: &str) -> Result<Staff> {
        let id = StaffId::parse(staff_id)?;
        self.staff_ref(&id).cloned()
    }

    pub fn module(&self, module_code: &str) -> Result<Module> {
        let code = ModuleCode::parse(module_code)?;
        self.module_ref(&code).cloned()
    }

    /// The staff teaching a module.
    pub fn staff_of(&self, module_code: &str) -> Result<Vec<Staff>> {
        let code = ModuleCode::parse(module_code)?;
        let module = self.module_ref(&code)?;
        Ok(module
            .teaching_staff()
            .iter()
            .filter_map(|id| self.staff.find(id).cloned())
            .collect())
    }

    /// The students enrolled on a module.
    pub fn students_of(&self, module_code: &str) -> Result<Vec<Student>> {
        let code = ModuleCode::parse(module_code)?;
        let module = self.module_ref(&code)?;
        Ok(module
            .students()
            .iter()
            .filter_map(|id| self.students.find(id).cloned())
            .collect())
    }

    /// The modules a student is enrolled on.
    pub fn modules_of(&self, student_id: &str) -> Result<Vec<Module>> {
        let id = StudentId::parse(student_id)?;
        let student = self.student_ref(&id)?;
        Ok(student
            .modules()
            .iter()
            .filter_map(|code| self.modules.find(code).cloned())
            .collect())
    }

    // ============================================================
    // Persistence
    // ============================================================

    /// Write a complete snapshot of the store to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        snapshot::save(self, path.as_ref())
    }

    /// Replace the store's contents with the snapshot at `path`.
    ///
    /// The snapshot is rebuilt into a separate store first, so a failed load
    /// leaves the current contents untouched. The ID generator is kept.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let restored = snapshot::load(path.as_ref())?;
        self.students = restored.students;
        self.staff = restored.staff;
        self.modules = restored.modules;
        Ok(())
    }

    pub(crate) fn student_records(&self) -> impl Iterator<Item = (&StudentId, &Student)> {
        self.students.iter()
    }

    pub(crate) fn staff_records(&self) -> impl Iterator<Item = (&StaffId, &Staff)> {
        self.staff.iter()
    }

    pub(crate) fn module_records(&self) -> impl Iterator<Item = (&ModuleCode, &Module)> {
        self.modules.iter()
    }

    // ============================================================
    // Snapshot restore
    // ============================================================

    /// Insert a record read from a snapshot. It must carry its identifier and
    /// no links; links are replayed separately.
    pub(crate) fn restore_student(&mut self, student: Student) -> Result<()> {
        let id = student
            .id()
            .cloned()
            .ok_or_else(|| AllocationError::incompatible("student row without an ID"))?;
        if self.students.insert(id.clone(), student).is_some() {
            return Err(AllocationError::incompatible(format!(
                "student {id} appears more than once"
            )));
        }
        Ok(())
    }

    pub(crate) fn restore_staff(&mut self, staff: Staff) -> Result<()> {
        let id = staff
            .id()
            .cloned()
            .ok_or_else(|| AllocationError::incompatible("staff row without an ID"))?;
        if self.staff.insert(id.clone(), staff).is_some() {
            return Err(AllocationError::incompatible(format!(
                "staff {id} appears more than once"
            )));
        }
        Ok(())
    }

    pub(crate) fn restore_module(&mut self, module: Module) -> Result<()> {
        let code = module
            .code()
            .cloned()
            .ok_or_else(|| AllocationError::incompatible("module row without a code"))?;
        if self.modules.insert(code.clone(), module).is_some() {
            return Err(AllocationError::incompatible(format!(
                "module {code} appears more than once"
            )));
        }
        Ok(())
    }

    /// Replay a teaching link from a snapshot through the same checks as
    /// [`AllocationManager::assign_staff`].
    pub(crate) fn restore_teaching(&mut self, staff_id: &StaffId, code: &ModuleCode) -> Result<()> {
        self.assign_staff(code.as_str(), staff_id.as_str())
    }

    /// Replay an enrolment from a snapshot through the same checks as
    /// [`AllocationManager::enrol`].
    pub(crate) fn restore_enrolment(&mut self, student_id: &StudentId, code: &ModuleCode) -> Result<()> {
        self.enrol(student_id.as_str(), code.as_str())
    }

    // ============================================================
    // Lookup and link helpers
    // ============================================================

    fn student_ref(&self, id: &StudentId) -> Result<&Student> {
        self.students
            .find(id)
            .ok_or_else(|| AllocationError::IdNotRecognised {
                entity: "student",
                id: id.to_string(),
            })
    }

    fn staff_ref(&self, id: &StaffId) -> Result<&Staff> {
        self.staff
            .find(id)
            .ok_or_else(|| AllocationError::IdNotRecognised {
                entity: "staff member",
                id: id.to_string(),
            })
    }

    fn module_ref(&self, code: &ModuleCode) -> Result<&Module> {
        self.modules
            .find(code)
            .ok_or_else(|| AllocationError::IdNotRecognised {
                entity: "module",
                id: code.to_string(),
            })
    }

    fn link_enrolment(&mut self, student_id: &StudentId, code: &ModuleCode) {
        let (Some(student), Some(module)) =
            (self.students.find_mut(student_id), self.modules.find_mut(code))
        else {
            return;
        };
        student.attach_module(code.clone(), module.stage(), module.credits());
        module.attach_student(student_id.clone());
    }

    fn unlink_enrolment(&mut self, student_id: &StudentId, code: &ModuleCode) -> bool {
        let (Some(student), Some(module)) =
            (self.students.find_mut(student_id), self.modules.find_mut(code))
        else {
            return false;
        };
        let from_student = student.detach_module(code, module.stage(), module.credits());
        let from_module = module.detach_student(student_id);
        debug_assert_eq!(from_student, from_module, "enrolment link was one-sided");
        from_student || from_module
    }

    fn link_teaching(&mut self, staff_id: &StaffId, code: &ModuleCode) {
        let (Some(staff), Some(module)) = (self.staff.find_mut(staff_id), self.modules.find_mut(code))
        else {
            return;
        };
        staff.attach_module(code.clone());
        module.attach_staff(staff_id.clone());
    }

    fn unlink_teaching(&mut self, staff_id: &StaffId, code: &ModuleCode) -> bool {
        let (Some(staff), Some(module)) = (self.staff.find_mut(staff_id), self.modules.find_mut(code))
        else {
            return false;
        };
        let from_staff = staff.detach_module(code);
        let from_module = module.detach_staff(staff_id);
        debug_assert_eq!(from_staff, from_module, "teaching link was one-sided");
        from_staff || from_module
    }
}

impl Default for AllocationManager {
    fn default() -> Self {
        Self::new()
    }
}

fn check_capacity(module: &str, capacity: u32) -> Result<()> {
    if capacity < 1 {
        return Err(AllocationError::InvalidCapacity {
            module: module.to_string(),
            capacity,
        });
    }
    Ok(())
}

/// The enrolment rules, in precedence order.
fn check_enrolment(
    student: &Student,
    module: &Module,
    student_id: &StudentId,
    code: &ModuleCode,
) -> Result<()> {
    if module.is_at_capacity() {
        return Err(AllocationError::ModuleAtCapacity {
            module_code: code.to_string(),
            capacity: module.capacity(),
        });
    }

    if u16::from(student.total_credits()) + u16::from(module.credits()) > u16::from(MAX_CREDITS) {
        return Err(AllocationError::InsufficientAvailableCredits {
            student_id: student_id.to_string(),
            module_code: code.to_string(),
            total: student.total_credits(),
            requested: module.credits(),
        });
    }

    if module.is_discontinued() {
        return Err(AllocationError::ModuleDiscontinued {
            module_code: code.to_string(),
        });
    }

    if module.stage() > student.stage() {
        return Err(AllocationError::ModuleStageTooHigh {
            student_id: student_id.to_string(),
            module_code: code.to_string(),
            student_stage: student.stage().get(),
            module_stage: module.stage().get(),
        });
    }

    if module.stage() < student.stage() {
        let would_have = u16::from(module.credits()) + u16::from(student.lower_stage_credits());
        if would_have > u16::from(MAX_LOWER_STAGE_CREDITS) {
            return Err(AllocationError::EnrollingWouldPreventHonours {
                student_id: student_id.to_string(),
                module_code: code.to_string(),
                would_have,
            });
        }
    }

    if student.is_enrolled_on(code) {
        return Err(AllocationError::AlreadyEnrolled {
            student_id: student_id.to_string(),
            module_code: code.to_string(),
        });
    }

    Ok(())
}
