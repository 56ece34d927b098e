//! Entity records held by the allocation store.
//!
//! # Core Concepts
//!
//! - [`Student`]: enrolled on modules, tracks credits split by stage.
//! - [`Staff`]: teaches modules.
//! - [`Module`]: has a capacity, a stage and a credit weight; can be
//!   permanently discontinued.
//!
//! ## Links
//!
//! Student↔Module and Staff↔Module are many-to-many. Each side stores the
//! other's identifier, never a reference, and only the
//! [`AllocationManager`](crate::AllocationManager) changes links, always on
//! both sides at once. Records built through the constructors are always
//! unlinked. A deserialized record may carry links, but the store never
//! trusts them: `add_existing_*` stores an unlinked copy and rejects a module
//! that arrives with staff attached.
//!
//! ## Identity
//!
//! Every record carries an [`Identity`] that starts `Pending` and is assigned
//! once.

mod identity;
mod module;
mod stage;
mod staff;
mod student;

pub use identity::*;
pub use module::*;
pub use stage::*;
pub use staff::*;
pub use student::*;
