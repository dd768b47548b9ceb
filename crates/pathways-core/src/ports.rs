//! Port traits for the pathway core.
//!
//! The reconciler, loader and aggregator operate exclusively through these
//! traits, enabling pluggable backends (`MemoryPathwayStore` for tests and
//! local runs, Postgres for production).

use async_trait::async_trait;

use crate::enrollment::EnrollmentStatus;
use crate::error::Result;
use crate::load::{JoinTable, LoadPlan};
use crate::types::*;

#[async_trait]
pub trait PathwayStore: Send + Sync {
    // ── Pathway records ──

    async fn insert_pathway(&self, new: &NewPathway) -> Result<Pathway>;
    /// Returns `None` when the pathway does not exist.
    async fn update_pathway(&self, id: PathwayId, patch: &PathwayPatch)
        -> Result<Option<Pathway>>;
    async fn find_pathway(&self, id: PathwayId) -> Result<Option<Pathway>>;
    async fn list_pathways(&self, limit: i64, offset: i64) -> Result<Vec<Pathway>>;
    /// Remove a pathway with every association it owns. Returns whether a
    /// pathway was removed.
    async fn delete_pathway(&self, id: PathwayId) -> Result<bool>;

    /// Fetch a pathway with every relation named by `plan` materialized.
    async fn load_pathway(&self, id: PathwayId, plan: &LoadPlan)
        -> Result<Option<PathwayInstance>>;

    // ── Datafield join ──

    async fn linked_data_field_ids(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
    ) -> Result<Vec<DataFieldId>>;

    /// Link datafields to a pathway. Linking an already-linked id is a
    /// no-op. Fails with `Validation` when an id names no datafield.
    async fn link_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<()>;

    async fn unlink_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<u64>;

    // ── Offer groups ──

    /// Offer groups of a pathway in iteration (insertion) order, with their
    /// offers attached.
    async fn load_offer_groups(&self, pathway_id: PathwayId) -> Result<Vec<OfferGroup>>;

    /// Delete `remove` and append `add` (in order) as one atomic change.
    /// Fails with `Validation`, leaving the stored groups untouched, when an
    /// added offer id does not resolve. Returns the number of rows removed.
    async fn replace_offer_groups(
        &self,
        pathway_id: PathwayId,
        remove: &[OfferGroupKey],
        add: &[GroupOfOffers],
    ) -> Result<u64>;

    /// Append offer groups, skipping triples already present.
    async fn insert_offer_groups(
        &self,
        pathway_id: PathwayId,
        groups: &[GroupOfOffers],
    ) -> Result<()> {
        self.replace_offer_groups(pathway_id, &[], groups)
            .await
            .map(|_| ())
    }
}

/// Per-student, per-offer enrollment status source.
#[async_trait]
pub trait EnrollmentStatusLookup: Send + Sync {
    /// The student's current status for an offer, `None` if never enrolled.
    /// Failures surface as `ExternalLookup`.
    async fn student_enroll_status(
        &self,
        student_id: StudentId,
        offer_id: OfferId,
    ) -> Result<Option<EnrollmentStatus>>;
}
