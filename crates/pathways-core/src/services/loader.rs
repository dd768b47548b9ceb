//! Reload after write
//!
//! Combines the load instructions of independent reconciliation steps into a
//! single fetch of the pathway with every requested relation materialized.

use tracing::debug;

use crate::error::{PathwayError, Result};
use crate::load::{IncludeLoadInstruction, LoadPlan};
use crate::ports::PathwayStore;
use crate::types::*;

pub async fn merge_load_instructions(
    store: &dyn PathwayStore,
    pathway: &Pathway,
    instructions: &[IncludeLoadInstruction],
) -> Result<PathwayInstance> {
    let plan = LoadPlan::merge(instructions);
    debug!(pathway_id = pathway.id, ?plan, "Reloading pathway");
    store
        .load_pathway(pathway.id, &plan)
        .await?
        .ok_or_else(|| PathwayError::pathway_not_found(pathway.id))
}
