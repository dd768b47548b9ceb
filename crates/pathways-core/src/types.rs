//! Domain types for pathways and the entities they link to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use pathways_types::GroupOfOffers;

pub type PathwayId = i64;
pub type OfferId = i64;
pub type StudentId = i64;

// ── Pathway ───────────────────────────────────────────────────

/// A curriculum record. Everything except `id` is opaque to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pathway {
    pub id: PathwayId,
    pub name: String,
    pub description: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPathway {
    pub name: String,
    pub description: Option<String>,
    pub attributes: serde_json::Value,
}

/// Partial update of a pathway's own fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PathwayPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub attributes: Option<serde_json::Value>,
}

// ── Linked entities ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
}

/// Opaque datafield (topic) identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataFieldId(pub String);

impl DataFieldId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DataFieldId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for DataFieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    pub id: DataFieldId,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
}

/// Identity of an offer-group row within one pathway
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OfferGroupKey {
    pub offer_id: OfferId,
    pub group_name: String,
    pub semester: String,
}

impl From<&GroupOfOffers> for OfferGroupKey {
    fn from(g: &GroupOfOffers) -> Self {
        Self {
            offer_id: g.offer_id,
            group_name: g.group_name.clone(),
            semester: g.semester.clone(),
        }
    }
}

/// A `(pathway, offer, group_name, semester)` join row, optionally with its
/// offer materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferGroup {
    pub pathway_id: PathwayId,
    pub offer_id: OfferId,
    pub group_name: String,
    pub semester: String,
    #[serde(rename = "Offer", default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<Offer>,
}

impl OfferGroup {
    pub fn key(&self) -> OfferGroupKey {
        OfferGroupKey {
            offer_id: self.offer_id,
            group_name: self.group_name.clone(),
            semester: self.semester.clone(),
        }
    }
}

// ── Materialized instance ─────────────────────────────────────

/// A pathway plus whichever relations have been loaded or attached.
///
/// Serializes flat, with relation keys named the way API consumers expect
/// (`Providers`, `DataFields`, `GroupsOfOffers`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayInstance {
    #[serde(flatten)]
    pub pathway: Pathway,
    #[serde(rename = "Providers", default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<Provider>>,
    #[serde(rename = "DataFields", default, skip_serializing_if = "Option::is_none")]
    pub data_fields: Option<Vec<DataField>>,
    #[serde(
        rename = "GroupsOfOffers",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub groups_of_offers: Option<Vec<OfferGroup>>,
}

impl PathwayInstance {
    /// An instance with no relations loaded
    pub fn bare(pathway: Pathway) -> Self {
        Self {
            pathway,
            providers: None,
            data_fields: None,
            groups_of_offers: None,
        }
    }

    pub fn id(&self) -> PathwayId {
        self.pathway.id
    }
}
