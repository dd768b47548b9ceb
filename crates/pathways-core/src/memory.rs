//! In-memory implementation of the pathway ports.
//!
//! Backs unit and HTTP tests, and local runs without a database. Enforces the
//! same uniqueness and reference rules as the Postgres schema.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::enrollment::EnrollmentStatus;
use crate::error::{PathwayError, Result};
use crate::load::{JoinTable, LoadPlan};
use crate::ports::{EnrollmentStatusLookup, PathwayStore};
use crate::types::*;

#[derive(Default)]
struct Inner {
    next_pathway_id: PathwayId,
    pathways: BTreeMap<PathwayId, Pathway>,
    providers: BTreeMap<i64, Provider>,
    pathway_providers: Vec<(PathwayId, i64)>,
    data_fields: BTreeMap<DataFieldId, DataField>,
    joins: HashMap<JoinTable, Vec<(PathwayId, DataFieldId)>>,
    offers: BTreeMap<OfferId, Offer>,
    offer_groups: Vec<OfferGroup>,
    enrollments: HashMap<(StudentId, OfferId), EnrollmentStatus>,
    lookup_failure: Option<String>,
}

impl Inner {
    fn offer_groups_for(&self, pathway_id: PathwayId, with_offers: bool) -> Vec<OfferGroup> {
        self.offer_groups
            .iter()
            .filter(|g| g.pathway_id == pathway_id)
            .map(|g| OfferGroup {
                offer: if with_offers {
                    self.offers.get(&g.offer_id).cloned()
                } else {
                    None
                },
                ..g.clone()
            })
            .collect()
    }

    fn data_fields_for(&self, join: &JoinTable, pathway_id: PathwayId) -> Vec<DataField> {
        self.joins
            .get(join)
            .map(|rows| {
                rows.iter()
                    .filter(|(p, _)| *p == pathway_id)
                    .filter_map(|(_, id)| self.data_fields.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn providers_for(&self, pathway_id: PathwayId) -> Vec<Provider> {
        self.pathway_providers
            .iter()
            .filter(|(p, _)| *p == pathway_id)
            .filter_map(|(_, id)| self.providers.get(id).cloned())
            .collect()
    }
}

/// In-memory pathway store (for testing)
#[derive(Default)]
pub struct MemoryPathwayStore {
    inner: RwLock<Inner>,
}

impl MemoryPathwayStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding for external, read-only entities ──

    pub async fn add_data_field(&self, id: &str, name: Option<&str>) {
        let mut inner = self.inner.write().await;
        inner.data_fields.insert(
            DataFieldId::from(id),
            DataField {
                id: DataFieldId::from(id),
                name: name.map(str::to_string),
            },
        );
    }

    pub async fn add_offer(&self, id: OfferId, name: &str) {
        let mut inner = self.inner.write().await;
        inner.offers.insert(
            id,
            Offer {
                id,
                name: name.to_string(),
            },
        );
    }

    pub async fn add_provider(&self, provider: Provider) {
        let mut inner = self.inner.write().await;
        inner.providers.insert(provider.id, provider);
    }

    pub async fn link_provider(&self, pathway_id: PathwayId, provider_id: i64) {
        let mut inner = self.inner.write().await;
        if !inner.pathway_providers.contains(&(pathway_id, provider_id)) {
            inner.pathway_providers.push((pathway_id, provider_id));
        }
    }

    pub async fn set_enrollment(
        &self,
        student_id: StudentId,
        offer_id: OfferId,
        status: EnrollmentStatus,
    ) {
        let mut inner = self.inner.write().await;
        inner.enrollments.insert((student_id, offer_id), status);
    }

    /// Make every subsequent status lookup fail, as an unreachable
    /// enrollment service would.
    pub async fn fail_lookups(&self, message: &str) {
        let mut inner = self.inner.write().await;
        inner.lookup_failure = Some(message.to_string());
    }
}

#[async_trait]
impl PathwayStore for MemoryPathwayStore {
    async fn insert_pathway(&self, new: &NewPathway) -> Result<Pathway> {
        let mut inner = self.inner.write().await;
        inner.next_pathway_id += 1;
        let now = Utc::now();
        let pathway = Pathway {
            id: inner.next_pathway_id,
            name: new.name.clone(),
            description: new.description.clone(),
            attributes: new.attributes.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.pathways.insert(pathway.id, pathway.clone());
        Ok(pathway)
    }

    async fn update_pathway(
        &self,
        id: PathwayId,
        patch: &PathwayPatch,
    ) -> Result<Option<Pathway>> {
        let mut inner = self.inner.write().await;
        let Some(pathway) = inner.pathways.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            pathway.name = name.clone();
        }
        if let Some(description) = &patch.description {
            pathway.description = Some(description.clone());
        }
        if let Some(attributes) = &patch.attributes {
            pathway.attributes = attributes.clone();
        }
        pathway.updated_at = Utc::now();
        Ok(Some(pathway.clone()))
    }

    async fn find_pathway(&self, id: PathwayId) -> Result<Option<Pathway>> {
        let inner = self.inner.read().await;
        Ok(inner.pathways.get(&id).cloned())
    }

    async fn list_pathways(&self, limit: i64, offset: i64) -> Result<Vec<Pathway>> {
        let inner = self.inner.read().await;
        Ok(inner
            .pathways
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn delete_pathway(&self, id: PathwayId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.pathways.remove(&id).is_none() {
            return Ok(false);
        }
        inner.pathway_providers.retain(|(p, _)| *p != id);
        for rows in inner.joins.values_mut() {
            rows.retain(|(p, _)| *p != id);
        }
        inner.offer_groups.retain(|g| g.pathway_id != id);
        Ok(true)
    }

    async fn load_pathway(
        &self,
        id: PathwayId,
        plan: &LoadPlan,
    ) -> Result<Option<PathwayInstance>> {
        let inner = self.inner.read().await;
        let Some(pathway) = inner.pathways.get(&id).cloned() else {
            return Ok(None);
        };
        Ok(Some(PathwayInstance {
            providers: plan.providers.then(|| inner.providers_for(id)),
            data_fields: plan
                .data_fields
                .as_ref()
                .map(|join| inner.data_fields_for(join, id)),
            groups_of_offers: plan
                .offer_groups
                .map(|with_offers| inner.offer_groups_for(id, with_offers)),
            pathway,
        }))
    }

    async fn linked_data_field_ids(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
    ) -> Result<Vec<DataFieldId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .joins
            .get(join)
            .map(|rows| {
                rows.iter()
                    .filter(|(p, _)| *p == pathway_id)
                    .map(|(_, id)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn link_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(missing) = ids.iter().find(|id| !inner.data_fields.contains_key(*id)) {
            return Err(PathwayError::Validation(format!(
                "datafield '{}' does not exist",
                missing
            )));
        }
        let rows = inner.joins.entry(join.clone()).or_default();
        for id in ids {
            let row = (pathway_id, id.clone());
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        Ok(())
    }

    async fn unlink_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let Some(rows) = inner.joins.get_mut(join) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|(p, id)| !(*p == pathway_id && ids.contains(id)));
        Ok((before - rows.len()) as u64)
    }

    async fn load_offer_groups(&self, pathway_id: PathwayId) -> Result<Vec<OfferGroup>> {
        let inner = self.inner.read().await;
        Ok(inner.offer_groups_for(pathway_id, true))
    }

    async fn replace_offer_groups(
        &self,
        pathway_id: PathwayId,
        remove: &[OfferGroupKey],
        add: &[GroupOfOffers],
    ) -> Result<u64> {
        let mut inner = self.inner.write().await;
        if let Some(missing) = add.iter().find(|g| !inner.offers.contains_key(&g.offer_id)) {
            return Err(PathwayError::Validation(format!(
                "offer {} does not exist",
                missing.offer_id
            )));
        }

        let before = inner.offer_groups.len();
        inner
            .offer_groups
            .retain(|g| !(g.pathway_id == pathway_id && remove.contains(&g.key())));
        let removed = (before - inner.offer_groups.len()) as u64;

        for group in add {
            let key = OfferGroupKey::from(group);
            let exists = inner
                .offer_groups
                .iter()
                .any(|g| g.pathway_id == pathway_id && g.key() == key);
            if !exists {
                inner.offer_groups.push(OfferGroup {
                    pathway_id,
                    offer_id: group.offer_id,
                    group_name: group.group_name.clone(),
                    semester: group.semester.clone(),
                    offer: None,
                });
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl EnrollmentStatusLookup for MemoryPathwayStore {
    async fn student_enroll_status(
        &self,
        student_id: StudentId,
        offer_id: OfferId,
    ) -> Result<Option<EnrollmentStatus>> {
        let inner = self.inner.read().await;
        if let Some(message) = &inner.lookup_failure {
            return Err(PathwayError::ExternalLookup(message.clone()));
        }
        Ok(inner.enrollments.get(&(student_id, offer_id)).copied())
    }
}
