//! In-process allocation store for students, staff and modules.
//!
//! [`AllocationManager`] owns three ordered indexes and is the only way to
//! create, link, unlink and remove records. Everything it hands out is an
//! owned snapshot, so later mutation never changes a value a caller already
//! holds.

pub mod api;
pub mod config;
pub mod error;
pub mod idgen;
pub mod ids;
pub mod index;
pub mod manager;
pub mod models;
pub mod snapshot;

pub use error::{AllocationError, ErrorCategory, Result};
pub use ids::{ModuleCode, StaffId, StudentId};
pub use manager::{AllocationManager, ModuleFilter, StoreStats};
pub use models::{Identity, Module, Staff, Stage, Student};
