//! Pathway core
//!
//! Keeps a pathway's topic and offer-group associations consistent across
//! writes, and aggregates a student's enrollment statuses into chart data.
//!
//! ## Flow
//!
//! ```text
//! create/update ─► AssociationReconciler ─► LoadPlan ─► PathwayStore::load_pathway
//! read/list     ─► offer-group resolver  ─► GroupsOfOffers
//! chart request ─► EnrollmentAggregator  ─► EnrollmentStatusLookup (fan-out)
//! ```
//!
//! All persistence goes through the [`ports`] traits.

pub mod enrollment;
pub mod error;
pub mod hooks;
pub mod load;
pub mod memory;
pub mod ports;
pub mod services;
pub mod types;

pub use enrollment::EnrollmentStatus;
pub use error::{PathwayError, Result};
pub use hooks::PathwayHooks;
pub use load::{IncludeLoadInstruction, JoinTable, LoadPlan};
pub use memory::MemoryPathwayStore;
pub use ports::{EnrollmentStatusLookup, PathwayStore};
pub use services::{AssociationReconciler, EnrollmentAggregator, LinkPolicy, ReconcilePolicy};
pub use types::*;
