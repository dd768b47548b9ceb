//! Load instructions
//!
//! Reconciliation is a two-step contract: each step writes its own relation
//! and returns an [`IncludeLoadInstruction`] naming what must be eagerly
//! loaded afterwards. The instructions from independent steps are merged
//! into one [`LoadPlan`] and materialized with a single store fetch.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PathwayError, Result};

/// A `(pathway, datafield)` join relation, named by table and by the column
/// holding the pathway id. The datafield column is always `datafield_id`.
///
/// Names are spliced into SQL, so construction validates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinTable {
    table: String,
    column: String,
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("static pattern"))
}

impl JoinTable {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let column = column.into();
        for ident in [&table, &column] {
            if !identifier_pattern().is_match(ident) {
                return Err(PathwayError::Validation(format!(
                    "invalid join identifier '{}'",
                    ident
                )));
            }
        }
        Ok(Self { table, column })
    }

    /// The `pathways_datafields(pathway_id, datafield_id)` relation
    pub fn pathways_datafields() -> Self {
        Self {
            table: "pathways_datafields".to_string(),
            column: "pathway_id".to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl std::fmt::Display for JoinTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// What one reconciliation step needs loaded on the next fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeLoadInstruction {
    DataFields { through: JoinTable },
    OfferGroups { with_offers: bool },
}

/// The union of load instructions for one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadPlan {
    pub providers: bool,
    pub data_fields: Option<JoinTable>,
    /// `Some(true)` loads offer groups with their offers attached
    pub offer_groups: Option<bool>,
}

impl LoadPlan {
    /// Merge instructions. Providers are always part of a materialized
    /// pathway. If two instructions name different datafield relations the
    /// last one wins; offer-group depth is the deepest requested.
    pub fn merge(instructions: &[IncludeLoadInstruction]) -> Self {
        let mut plan = LoadPlan {
            providers: true,
            ..Default::default()
        };
        for instruction in instructions {
            plan.include(instruction);
        }
        plan
    }

    pub fn include(&mut self, instruction: &IncludeLoadInstruction) {
        match instruction {
            IncludeLoadInstruction::DataFields { through } => {
                self.data_fields = Some(through.clone());
            }
            IncludeLoadInstruction::OfferGroups { with_offers } => {
                let deeper = self.offer_groups.unwrap_or(false) || *with_offers;
                self.offer_groups = Some(deeper);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_table_rejects_sql_fragments() {
        assert!(JoinTable::new("pathways_datafields", "pathway_id").is_ok());
        assert!(matches!(
            JoinTable::new("pathways; drop table x", "pathway_id"),
            Err(PathwayError::Validation(_))
        ));
        assert!(JoinTable::new("pathways_datafields", "Pathway-Id").is_err());
        assert!(JoinTable::new("", "pathway_id").is_err());
    }

    #[test]
    fn merge_unions_both_relations() {
        let plan = LoadPlan::merge(&[
            IncludeLoadInstruction::DataFields {
                through: JoinTable::pathways_datafields(),
            },
            IncludeLoadInstruction::OfferGroups { with_offers: true },
        ]);
        assert!(plan.providers);
        assert_eq!(plan.data_fields, Some(JoinTable::pathways_datafields()));
        assert_eq!(plan.offer_groups, Some(true));
    }

    #[test]
    fn merge_keeps_deepest_offer_group_load() {
        let plan = LoadPlan::merge(&[
            IncludeLoadInstruction::OfferGroups { with_offers: true },
            IncludeLoadInstruction::OfferGroups { with_offers: false },
        ]);
        assert_eq!(plan.offer_groups, Some(true));
    }

    #[test]
    fn empty_merge_still_loads_providers() {
        let plan = LoadPlan::merge(&[]);
        assert!(plan.providers);
        assert!(plan.data_fields.is_none());
        assert!(plan.offer_groups.is_none());
    }
}
