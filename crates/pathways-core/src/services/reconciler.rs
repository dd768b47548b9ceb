//! Association reconciliation
//!
//! Brings a pathway's datafield links and offer groups in line with a write
//! payload. Each step diffs the requested set against what is stored, writes
//! only the difference, and returns the load instruction for its relation.

use std::collections::HashSet;
use std::sync::Arc;

use pathways_types::TopicRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PathwayError, Result};
use crate::load::{IncludeLoadInstruction, JoinTable};
use crate::ports::PathwayStore;
use crate::types::*;

/// What happens to stored links absent from a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPolicy {
    /// Unlink anything the payload does not name
    Replace,
    /// Only ever add links
    Append,
}

impl LinkPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
        }
    }
}

impl std::fmt::Display for LinkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LinkPolicy {
    type Err = PathwayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(PathwayError::Validation(format!(
                "unknown link policy '{}', expected 'replace' or 'append'",
                other
            ))),
        }
    }
}

/// Link policy per relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    pub data_fields: LinkPolicy,
    pub offer_groups: LinkPolicy,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            data_fields: LinkPolicy::Append,
            offer_groups: LinkPolicy::Replace,
        }
    }
}

/// Drop `null`, `""` and `0` placeholders and repeated ids, keeping the
/// first occurrence of each.
pub fn compact_topics(topics: &[Option<TopicRef>]) -> Vec<DataFieldId> {
    let mut seen = HashSet::new();
    topics
        .iter()
        .flatten()
        .filter_map(TopicRef::identifier)
        .filter(|id| seen.insert(id.clone()))
        .map(DataFieldId)
        .collect()
}

fn dedupe_groups(groups: &[GroupOfOffers]) -> Vec<GroupOfOffers> {
    let mut seen = HashSet::new();
    groups
        .iter()
        .filter(|g| seen.insert(OfferGroupKey::from(*g)))
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct AssociationReconciler {
    store: Arc<dyn PathwayStore>,
    policy: ReconcilePolicy,
}

impl AssociationReconciler {
    pub fn new(store: Arc<dyn PathwayStore>, policy: ReconcilePolicy) -> Self {
        Self { store, policy }
    }

    /// Link the payload's topics to the pathway through `join`.
    pub async fn reconcile_data_fields(
        &self,
        pathway: &Pathway,
        topics: &[Option<TopicRef>],
        join: &JoinTable,
    ) -> Result<IncludeLoadInstruction> {
        let requested = compact_topics(topics);
        let current: HashSet<DataFieldId> = self
            .store
            .linked_data_field_ids(join, pathway.id)
            .await?
            .into_iter()
            .collect();

        let to_link: Vec<DataFieldId> = requested
            .iter()
            .filter(|id| !current.contains(*id))
            .cloned()
            .collect();
        let to_unlink: Vec<DataFieldId> = match self.policy.data_fields {
            LinkPolicy::Append => Vec::new(),
            LinkPolicy::Replace => {
                let keep: HashSet<&DataFieldId> = requested.iter().collect();
                current.iter().filter(|id| !keep.contains(id)).cloned().collect()
            }
        };

        debug!(
            pathway_id = pathway.id,
            relation = %join,
            policy = %self.policy.data_fields,
            link = to_link.len(),
            unlink = to_unlink.len(),
            "Reconciling datafields"
        );

        if !to_link.is_empty() {
            self.store
                .link_data_fields(join, pathway.id, &to_link)
                .await?;
        }
        if !to_unlink.is_empty() {
            self.store
                .unlink_data_fields(join, pathway.id, &to_unlink)
                .await?;
        }
        if !to_link.is_empty() || !to_unlink.is_empty() {
            info!(
                "Pathway {}: linked {} and unlinked {} datafields via {}",
                pathway.id,
                to_link.len(),
                to_unlink.len(),
                join
            );
        }

        Ok(IncludeLoadInstruction::DataFields {
            through: join.clone(),
        })
    }

    /// Sync the pathway's offer groups with the payload. `None` leaves them
    /// untouched whatever the policy.
    pub async fn reconcile_offer_groups(
        &self,
        pathway: &Pathway,
        groups_of_offers: Option<&[GroupOfOffers]>,
    ) -> Result<IncludeLoadInstruction> {
        let instruction = IncludeLoadInstruction::OfferGroups { with_offers: true };
        let Some(groups) = groups_of_offers else {
            debug!(pathway_id = pathway.id, "No groups_of_offers in payload");
            return Ok(instruction);
        };

        let requested = dedupe_groups(groups);
        let current: HashSet<OfferGroupKey> = self
            .store
            .load_offer_groups(pathway.id)
            .await?
            .iter()
            .map(OfferGroup::key)
            .collect();

        let to_insert: Vec<GroupOfOffers> = requested
            .iter()
            .filter(|g| !current.contains(&OfferGroupKey::from(*g)))
            .cloned()
            .collect();
        let to_delete: Vec<OfferGroupKey> = match self.policy.offer_groups {
            LinkPolicy::Append => Vec::new(),
            LinkPolicy::Replace => {
                let keep: HashSet<OfferGroupKey> =
                    requested.iter().map(|g| OfferGroupKey::from(g)).collect();
                current.difference(&keep).cloned().collect()
            }
        };

        debug!(
            pathway_id = pathway.id,
            policy = %self.policy.offer_groups,
            insert = to_insert.len(),
            delete = to_delete.len(),
            "Reconciling offer groups"
        );

        if !to_insert.is_empty() || !to_delete.is_empty() {
            self.store
                .replace_offer_groups(pathway.id, &to_delete, &to_insert)
                .await?;
            info!(
                "Pathway {}: added {} and removed {} offer groups",
                pathway.id,
                to_insert.len(),
                to_delete.len()
            );
        }

        Ok(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPathwayStore;
    use proptest::prelude::*;

    async fn seeded() -> (Arc<MemoryPathwayStore>, Pathway) {
        let store = Arc::new(MemoryPathwayStore::new());
        for id in ["t1", "t2", "t3"] {
            store.add_data_field(id, None).await;
        }
        store.add_offer(1, "Intro").await;
        store.add_offer(2, "Advanced").await;
        let pathway = store
            .insert_pathway(&NewPathway {
                name: "Data Science".into(),
                description: None,
                attributes: serde_json::json!({}),
            })
            .await
            .unwrap();
        (store, pathway)
    }

    fn topics(ids: &[&str]) -> Vec<Option<TopicRef>> {
        ids.iter().map(|id| Some(TopicRef::from(*id))).collect()
    }

    #[test]
    fn test_compact_drops_placeholders_and_duplicates() {
        let raw = vec![
            Some(TopicRef::from("t1")),
            None,
            Some(TopicRef::from("")),
            Some(TopicRef::Number(0)),
            Some(TopicRef::from("t1")),
            Some(TopicRef::Number(5)),
        ];
        assert_eq!(
            compact_topics(&raw),
            vec![DataFieldId::from("t1"), DataFieldId::from("5")]
        );
    }

    #[test]
    fn test_link_policy_parses_case_insensitively() {
        assert_eq!("Replace".parse::<LinkPolicy>().unwrap(), LinkPolicy::Replace);
        assert_eq!(" append ".parse::<LinkPolicy>().unwrap(), LinkPolicy::Append);
        assert!("merge".parse::<LinkPolicy>().is_err());
    }

    #[tokio::test]
    async fn test_append_keeps_previous_topics() {
        let (store, pathway) = seeded().await;
        let reconciler = AssociationReconciler::new(store.clone(), ReconcilePolicy::default());
        let join = JoinTable::pathways_datafields();

        reconciler
            .reconcile_data_fields(&pathway, &topics(&["t1", "t2"]), &join)
            .await
            .unwrap();
        let instruction = reconciler
            .reconcile_data_fields(&pathway, &topics(&["t2", "t3"]), &join)
            .await
            .unwrap();

        assert_eq!(
            instruction,
            IncludeLoadInstruction::DataFields {
                through: join.clone()
            }
        );
        let linked = store.linked_data_field_ids(&join, pathway.id).await.unwrap();
        assert_eq!(
            linked,
            vec![
                DataFieldId::from("t1"),
                DataFieldId::from("t2"),
                DataFieldId::from("t3")
            ]
        );
    }

    #[tokio::test]
    async fn test_replace_drops_absent_topics() {
        let (store, pathway) = seeded().await;
        let policy = ReconcilePolicy {
            data_fields: LinkPolicy::Replace,
            ..Default::default()
        };
        let reconciler = AssociationReconciler::new(store.clone(), policy);
        let join = JoinTable::pathways_datafields();

        reconciler
            .reconcile_data_fields(&pathway, &topics(&["t1", "t2"]), &join)
            .await
            .unwrap();
        reconciler
            .reconcile_data_fields(&pathway, &topics(&["t2", "t3"]), &join)
            .await
            .unwrap();

        let linked = store.linked_data_field_ids(&join, pathway.id).await.unwrap();
        assert_eq!(linked, vec![DataFieldId::from("t2"), DataFieldId::from("t3")]);
    }

    #[tokio::test]
    async fn test_absent_groups_change_nothing_even_under_replace() {
        let (store, pathway) = seeded().await;
        let reconciler = AssociationReconciler::new(store.clone(), ReconcilePolicy::default());

        reconciler
            .reconcile_offer_groups(&pathway, Some(&[GroupOfOffers::new(1, "A", "F24")][..]))
            .await
            .unwrap();
        let instruction = reconciler
            .reconcile_offer_groups(&pathway, None)
            .await
            .unwrap();

        assert_eq!(
            instruction,
            IncludeLoadInstruction::OfferGroups { with_offers: true }
        );
        assert_eq!(store.load_offer_groups(pathway.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_groups_keeps_survivors_in_place() {
        let (store, pathway) = seeded().await;
        let reconciler = AssociationReconciler::new(store.clone(), ReconcilePolicy::default());

        reconciler
            .reconcile_offer_groups(
                &pathway,
                Some(&[
                    GroupOfOffers::new(1, "A", "F24"),
                    GroupOfOffers::new(2, "A", "S25"),
                ][..]),
            )
            .await
            .unwrap();
        reconciler
            .reconcile_offer_groups(
                &pathway,
                Some(&[
                    GroupOfOffers::new(2, "B", "F25"),
                    GroupOfOffers::new(2, "A", "S25"),
                ][..]),
            )
            .await
            .unwrap();

        let keys: Vec<(i64, String, String)> = store
            .load_offer_groups(pathway.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| (g.offer_id, g.group_name, g.semester))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2, "A".to_string(), "S25".to_string()),
                (2, "B".to_string(), "F25".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_groups_clear_under_replace_only() {
        let (store, pathway) = seeded().await;
        let initial = [GroupOfOffers::new(1, "A", "F24")];

        let append = AssociationReconciler::new(
            store.clone(),
            ReconcilePolicy {
                offer_groups: LinkPolicy::Append,
                ..Default::default()
            },
        );
        append
            .reconcile_offer_groups(&pathway, Some(&initial[..]))
            .await
            .unwrap();
        append
            .reconcile_offer_groups(&pathway, Some(&[][..]))
            .await
            .unwrap();
        assert_eq!(store.load_offer_groups(pathway.id).await.unwrap().len(), 1);

        let replace = AssociationReconciler::new(store.clone(), ReconcilePolicy::default());
        replace
            .reconcile_offer_groups(&pathway, Some(&[][..]))
            .await
            .unwrap();
        assert!(store.load_offer_groups(pathway.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_offer_is_a_validation_error() {
        let (store, pathway) = seeded().await;
        let reconciler = AssociationReconciler::new(store, ReconcilePolicy::default());
        let result = reconciler
            .reconcile_offer_groups(&pathway, Some(&[GroupOfOffers::new(99, "A", "F24")][..]))
            .await;
        assert!(matches!(result, Err(PathwayError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_groups_untouched() {
        let (store, pathway) = seeded().await;
        let reconciler = AssociationReconciler::new(store.clone(), ReconcilePolicy::default());
        reconciler
            .reconcile_offer_groups(&pathway, Some(&[GroupOfOffers::new(1, "A", "F24")][..]))
            .await
            .unwrap();

        let result = reconciler
            .reconcile_offer_groups(&pathway, Some(&[GroupOfOffers::new(99, "B", "S25")][..]))
            .await;
        assert!(matches!(result, Err(PathwayError::Validation(_))));

        let groups = store.load_offer_groups(pathway.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            (groups[0].offer_id, groups[0].group_name.as_str(), groups[0].semester.as_str()),
            (1, "A", "F24")
        );
    }

    proptest! {
        #[test]
        fn compact_keeps_first_seen_real_topics(
            raw in prop::collection::vec(
                prop::option::of(prop_oneof![
                    Just(TopicRef::Text(String::new())),
                    Just(TopicRef::Number(0)),
                    Just(TopicRef::Other(serde_json::Value::Bool(false))),
                    "[a-z0-9]{1,4}".prop_map(TopicRef::Text),
                    (1i64..50).prop_map(TopicRef::Number),
                ]),
                0..20,
            )
        ) {
            let mut expected: Vec<DataFieldId> = Vec::new();
            for topic in raw.iter().flatten() {
                let id = match topic {
                    TopicRef::Number(0) => continue,
                    TopicRef::Text(s) if s.is_empty() => continue,
                    TopicRef::Number(n) => DataFieldId::from(n.to_string().as_str()),
                    TopicRef::Text(s) => DataFieldId::from(s.as_str()),
                    // only `false` is generated
                    TopicRef::Other(_) => continue,
                };
                if !expected.contains(&id) {
                    expected.push(id);
                }
            }

            let ids = compact_topics(&raw);
            prop_assert!(ids.iter().all(|id| !id.as_str().is_empty()));
            prop_assert_eq!(ids, expected);
        }

        #[test]
        fn reconciling_twice_links_the_same_set(
            picks in prop::collection::vec(prop::sample::select(vec!["t1", "t2", "t3"]), 0..8)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let (first, second) = runtime.block_on(async {
                let (store, pathway) = seeded().await;
                let reconciler =
                    AssociationReconciler::new(store.clone(), ReconcilePolicy::default());
                let join = JoinTable::pathways_datafields();
                let payload = topics(&picks);

                reconciler.reconcile_data_fields(&pathway, &payload, &join).await.unwrap();
                let first = store.linked_data_field_ids(&join, pathway.id).await.unwrap();
                reconciler.reconcile_data_fields(&pathway, &payload, &join).await.unwrap();
                let second = store.linked_data_field_ids(&join, pathway.id).await.unwrap();
                (first, second)
            });
            prop_assert_eq!(first, second);
        }
    }
}
