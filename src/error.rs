use thiserror::Error;

/// Every failure the allocation store can report.
///
/// Variants carry the offending values so the rendered message is useful on
/// its own. Use [`AllocationError::kind`] for a stable machine-readable name.
#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("stage {stage} is invalid for {subject}: must be between 1 and 4 inclusive")]
    InvalidStage { subject: String, stage: u8 },

    #[error("credits {credits} are invalid for module '{module}': must be between 0 and 120 inclusive")]
    InvalidCredits { module: String, credits: u8 },

    #[error("capacity {capacity} is invalid for module '{module}': must be at least 1")]
    InvalidCapacity { module: String, capacity: u32 },

    #[error("'{value}' is not a valid {expected}")]
    InvalidId {
        value: String,
        expected: &'static str,
    },

    #[error("{subject} already has identifier {id} and cannot be given another")]
    IdAlreadySet { subject: String, id: String },

    #[error("{subject} has no identifier set")]
    IdNotSet { subject: String },

    #[error("{entity} '{id}' is not recognised")]
    IdNotRecognised { entity: &'static str, id: String },

    #[error("staff member {staff_id} is listed more than once for module '{module}'")]
    DuplicateStaff { module: String, staff_id: String },

    #[error("staff member '{name}' ({staff_id}) is not in the system")]
    StaffNotInSystem { name: String, staff_id: String },

    #[error("staff member {staff_id} does not teach module {module_code}")]
    StaffNotInvolved {
        staff_id: String,
        module_code: String,
    },

    #[error("module '{module}' already has teaching staff attached")]
    StaffAttached { module: String },

    #[error("module {module_code} is discontinued")]
    ModuleDiscontinued { module_code: String },

    #[error("module {module_code} is at its capacity of {capacity}")]
    ModuleAtCapacity { module_code: String, capacity: u32 },

    #[error("module {module_code} (stage {module_stage}) is above the stage of student {student_id} (stage {student_stage})")]
    ModuleStageTooHigh {
        student_id: String,
        module_code: String,
        student_stage: u8,
        module_stage: u8,
    },

    #[error("student {student_id} has {total} credits and cannot take {requested} more from module {module_code}")]
    InsufficientAvailableCredits {
        student_id: String,
        module_code: String,
        total: u8,
        requested: u8,
    },

    #[error("enrolling student {student_id} on module {module_code} would give {would_have} lower-stage credits, preventing honours")]
    EnrollingWouldPreventHonours {
        student_id: String,
        module_code: String,
        would_have: u16,
    },

    #[error("student {student_id} is already enrolled on module {module_code}")]
    AlreadyEnrolled {
        student_id: String,
        module_code: String,
    },

    #[error("no unused {entity} identifier found after {attempts} attempts")]
    IdSpaceExhausted {
        entity: &'static str,
        attempts: usize,
    },

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("snapshot is incompatible: {reason}")]
    IncompatibleSnapshot { reason: String },
}

/// Broad grouping of [`AllocationError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, rejected before anything is looked up.
    Validation,
    /// An identifier was assigned twice, or is missing.
    IdentityState,
    /// A well-formed identifier matched no record.
    Lookup,
    /// A business rule about links between records was violated.
    Relationship,
    Generation,
    Persistence,
}

impl AllocationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidStage { .. } => "invalid_stage",
            Self::InvalidCredits { .. } => "invalid_credits",
            Self::InvalidCapacity { .. } => "invalid_capacity",
            Self::InvalidId { .. } => "invalid_id",
            Self::IdAlreadySet { .. } => "id_already_set",
            Self::IdNotSet { .. } => "id_not_set",
            Self::IdNotRecognised { .. } => "id_not_recognised",
            Self::DuplicateStaff { .. } => "duplicate_staff",
            Self::StaffNotInSystem { .. } => "staff_not_in_system",
            Self::StaffNotInvolved { .. } => "staff_not_involved",
            Self::StaffAttached { .. } => "staff_attached",
            Self::ModuleDiscontinued { .. } => "module_discontinued",
            Self::ModuleAtCapacity { .. } => "module_at_capacity",
            Self::ModuleStageTooHigh { .. } => "module_stage_too_high",
            Self::InsufficientAvailableCredits { .. } => "insufficient_available_credits",
            Self::EnrollingWouldPreventHonours { .. } => "enrolling_would_prevent_honours",
            Self::AlreadyEnrolled { .. } => "already_enrolled",
            Self::IdSpaceExhausted { .. } => "id_space_exhausted",
            Self::Io(_) => "io",
            Self::Storage(_) => "storage",
            Self::IncompatibleSnapshot { .. } => "incompatible_snapshot",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidStage { .. }
            | Self::InvalidCredits { .. }
            | Self::InvalidCapacity { .. }
            | Self::InvalidId { .. } => ErrorCategory::Validation,
            Self::IdAlreadySet { .. } | Self::IdNotSet { .. } => ErrorCategory::IdentityState,
            Self::IdNotRecognised { .. } => ErrorCategory::Lookup,
            Self::DuplicateStaff { .. }
            | Self::StaffNotInSystem { .. }
            | Self::StaffNotInvolved { .. }
            | Self::StaffAttached { .. }
            | Self::ModuleDiscontinued { .. }
            | Self::ModuleAtCapacity { .. }
            | Self::ModuleStageTooHigh { .. }
            | Self::InsufficientAvailableCredits { .. }
            | Self::EnrollingWouldPreventHonours { .. }
            | Self::AlreadyEnrolled { .. } => ErrorCategory::Relationship,
            Self::IdSpaceExhausted { .. } => ErrorCategory::Generation,
            Self::Io(_) | Self::Storage(_) | Self::IncompatibleSnapshot { .. } => {
                ErrorCategory::Persistence
            }
        }
    }

    pub(crate) fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleSnapshot {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AllocationError>;
