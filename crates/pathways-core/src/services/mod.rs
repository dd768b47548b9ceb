//! Pathway services: association reconciliation, reload, offer-group
//! resolution and enrollment charts.

pub mod chart;
pub mod loader;
pub mod offer_groups;
pub mod reconciler;

pub use chart::{EnrollmentAggregator, StatusStyle, STATUS_STYLES};
pub use loader::merge_load_instructions;
pub use offer_groups::{attach_offer_groups, attach_offer_groups_all, load_offers_pathways};
pub use reconciler::{compact_topics, AssociationReconciler, LinkPolicy, ReconcilePolicy};
