//! Row shapes decoded straight from sqlx.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use pathways_core::{Offer, OfferGroup, Pathway};

#[derive(Debug, FromRow)]
pub(crate) struct PgPathwayRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgPathwayRow> for Pathway {
    fn from(row: PgPathwayRow) -> Self {
        Pathway {
            id: row.id,
            name: row.name,
            description: row.description,
            attributes: row.attributes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A pathway row plus its relations pre-aggregated as JSON arrays.
/// A relation column is NULL when the load plan did not request it.
#[derive(Debug, FromRow)]
pub(crate) struct PgPathwayInstanceRow {
    #[sqlx(flatten)]
    pub pathway: PgPathwayRow,
    pub providers: Option<serde_json::Value>,
    pub data_fields: Option<serde_json::Value>,
    pub groups_of_offers: Option<serde_json::Value>,
}

#[derive(Debug, FromRow)]
pub(crate) struct PgOfferGroupRow {
    pub pathway_id: i64,
    pub offer_id: i64,
    pub group_name: String,
    pub semester: String,
    pub offer_name: String,
}

impl From<PgOfferGroupRow> for OfferGroup {
    fn from(row: PgOfferGroupRow) -> Self {
        OfferGroup {
            pathway_id: row.pathway_id,
            offer_id: row.offer_id,
            group_name: row.group_name,
            semester: row.semester,
            offer: Some(Offer {
                id: row.offer_id,
                name: row.offer_name,
            }),
        }
    }
}
