//! Shared API Types for Pathways
//!
//! This crate is the SINGLE SOURCE OF TRUTH for all types crossing the HTTP
//! boundary of the pathway service.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │  Rust Server     │  JSON   │  Chart front end │
//! │  (Axum)          │ ◄─────► │                  │
//! └──────────────────┘         └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. All API types live here - no inline struct definitions in handlers
//! 2. Field names follow the wire contract the front end already consumes
//!    (`groups_of_offers`, `backgroundColor`), not Rust conventions

use serde::{Deserialize, Serialize};

// ============================================================================
// PATHWAY WRITE PAYLOAD
// ============================================================================

/// One entry of a `topics` list.
///
/// Clients send datafield identifiers either as strings or as bare numbers,
/// and older forms post `null`, `""` or `false` placeholders for removed rows.
/// Anything else JSON can carry lands in `Other` instead of failing the whole
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicRef {
    Number(i64),
    Text(String),
    Other(serde_json::Value),
}

impl TopicRef {
    /// The identifier this entry names, or `None` for a falsy placeholder
    /// (`""`, `0`, `false`, `null`).
    pub fn identifier(&self) -> Option<String> {
        use serde_json::Value;

        match self {
            TopicRef::Number(0) => None,
            TopicRef::Number(n) => Some(n.to_string()),
            TopicRef::Text(s) if s.is_empty() => None,
            TopicRef::Text(s) => Some(s.clone()),
            TopicRef::Other(Value::Null | Value::Bool(false)) => None,
            TopicRef::Other(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            TopicRef::Other(Value::String(s)) if s.is_empty() => None,
            TopicRef::Other(Value::String(s)) => Some(s.clone()),
            // `true`, arrays and objects name no datafield and fail linking
            TopicRef::Other(other) => Some(other.to_string()),
        }
    }
}

impl From<&str> for TopicRef {
    fn from(value: &str) -> Self {
        TopicRef::Text(value.to_string())
    }
}

/// A requested `(offer, group, semester)` link for a pathway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupOfOffers {
    pub offer_id: i64,
    pub group_name: String,
    pub semester: String,
}

impl GroupOfOffers {
    pub fn new(offer_id: i64, group_name: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            offer_id,
            group_name: group_name.into(),
            semester: semester.into(),
        }
    }
}

/// Body of a pathway create or update request.
///
/// `topics` and `groups_of_offers` drive association reconciliation; the
/// remaining fields are stored as-is on the pathway record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathwayPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
    #[serde(default)]
    pub topics: Option<Vec<Option<TopicRef>>>,
    #[serde(default)]
    pub groups_of_offers: Option<Vec<GroupOfOffers>>,
}

/// Query params for pathway listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPathwaysQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ============================================================================
// ENROLLMENT CHART
// ============================================================================

/// Request for a student's per-semester enrollment chart on one pathway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRequest {
    pub student_id: i64,
    pub pathway_id: i64,
    /// Restrict the chart to offer groups with this name
    #[serde(default)]
    pub group_name: Option<String>,
}

/// One colored series of per-semester counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
    pub data: Vec<usize>,
}

/// Chart payload: `labels` is the semester axis, each dataset has one count
/// per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartData {
    /// Look up a dataset by its display label
    pub fn dataset(&self, label: &str) -> Option<&ChartDataset> {
        self.datasets.iter().find(|d| d.label == label)
    }
}
