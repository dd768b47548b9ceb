//! Pathway CRUD extension points
//!
//! The record layer calls these around its own writes and reads:
//!
//! - after create/update: reconcile topics and offer groups, then reload
//! - a create whose associations fail is rolled back
//! - before any response: attach the pathway's resolved offer groups

use std::sync::Arc;

use pathways_types::PathwayPayload;
use tracing::warn;

use crate::error::Result;
use crate::load::{IncludeLoadInstruction, JoinTable, LoadPlan};
use crate::ports::PathwayStore;
use crate::services::loader::merge_load_instructions;
use crate::services::offer_groups::{attach_offer_groups, attach_offer_groups_all};
use crate::services::reconciler::{AssociationReconciler, ReconcilePolicy};
use crate::types::*;

#[derive(Clone)]
pub struct PathwayHooks {
    store: Arc<dyn PathwayStore>,
    reconciler: AssociationReconciler,
    topics_join: JoinTable,
}

impl PathwayHooks {
    pub fn new(store: Arc<dyn PathwayStore>, policy: ReconcilePolicy) -> Self {
        Self {
            reconciler: AssociationReconciler::new(Arc::clone(&store), policy),
            store,
            topics_join: JoinTable::pathways_datafields(),
        }
    }

    /// Link topics through a different datafield relation
    pub fn with_topics_join(mut self, join: JoinTable) -> Self {
        self.topics_join = join;
        self
    }

    pub fn store(&self) -> &Arc<dyn PathwayStore> {
        &self.store
    }

    /// Relations a plain read materializes: providers and linked topics.
    pub fn read_plan(&self) -> LoadPlan {
        LoadPlan::merge(&[IncludeLoadInstruction::DataFields {
            through: self.topics_join.clone(),
        }])
    }

    /// A freshly created pathway: absent topics or groups mean none. On
    /// failure the pathway is deleted again and the original error returned.
    pub async fn after_create(
        &self,
        pathway: &Pathway,
        payload: &PathwayPayload,
    ) -> Result<PathwayInstance> {
        let groups = payload.groups_of_offers.as_deref().unwrap_or_default();
        match self.reconcile_and_reload(pathway, payload, Some(groups)).await {
            Ok(instance) => Ok(instance),
            Err(err) => {
                if let Err(cleanup) = self.store.delete_pathway(pathway.id).await {
                    warn!(
                        pathway_id = pathway.id,
                        error = %cleanup,
                        "Failed to remove pathway after rejected create"
                    );
                }
                Err(err)
            }
        }
    }

    /// An updated pathway: absent groups mean "leave them alone".
    pub async fn after_update(
        &self,
        pathway: &Pathway,
        payload: &PathwayPayload,
    ) -> Result<PathwayInstance> {
        self.reconcile_and_reload(pathway, payload, payload.groups_of_offers.as_deref())
            .await
    }

    async fn reconcile_and_reload(
        &self,
        pathway: &Pathway,
        payload: &PathwayPayload,
        groups: Option<&[GroupOfOffers]>,
    ) -> Result<PathwayInstance> {
        let topics = payload.topics.as_deref().unwrap_or_default();

        let (datafields_load, groups_load) = futures::try_join!(
            self.reconciler
                .reconcile_data_fields(pathway, topics, &self.topics_join),
            self.reconciler.reconcile_offer_groups(pathway, groups),
        )?;

        merge_load_instructions(self.store.as_ref(), pathway, &[datafields_load, groups_load])
            .await
    }

    /// Decorate a single create/read/update response.
    pub async fn before_response(&self, instance: &mut PathwayInstance) -> Result<()> {
        attach_offer_groups(self.store.as_ref(), instance).await
    }

    /// Decorate every pathway of a list response.
    pub async fn before_list_response(&self, instances: &mut [PathwayInstance]) -> Result<()> {
        attach_offer_groups_all(self.store.as_ref(), instances).await
    }
}
