//! Postgres implementations of the pathway port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) so the crate builds without a database.
//! Datafield join identifiers are spliced into SQL text; `JoinTable`
//! guarantees they are plain lowercase identifiers.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tracing::debug;

use pathways_core::error::{PathwayError, Result};
use pathways_core::ports::{EnrollmentStatusLookup, PathwayStore};
use pathways_core::{
    DataFieldId, EnrollmentStatus, GroupOfOffers, JoinTable, LoadPlan, NewPathway, OfferGroup,
    OfferGroupKey, OfferId, Pathway, PathwayId, PathwayInstance, PathwayPatch, StudentId,
};

use crate::rows::{PgOfferGroupRow, PgPathwayInstanceRow, PgPathwayRow};

const FOREIGN_KEY_VIOLATION: &str = "23503";

const PATHWAY_COLUMNS: &str = "id, name, description, attributes, created_at, updated_at";

/// Foreign-key violations mean the payload named something that does not
/// exist; everything else is a storage failure.
fn store_error(e: sqlx::Error) -> PathwayError {
    if let Some(db) = e.as_database_error() {
        if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
            return PathwayError::Validation(db.message().to_string());
        }
    }
    PathwayError::Internal(anyhow!(e))
}

fn decode_relation<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Result<Option<Vec<T>>> {
    value
        .map(|v| serde_json::from_value(v).map_err(|e| PathwayError::Internal(anyhow!(e))))
        .transpose()
}

const PROVIDERS_SELECT: &str = r#"
    (SELECT COALESCE(json_agg(json_build_object(
                'id', pr.id, 'name', pr.name, 'location', pr.location) ORDER BY pr.id), '[]'::json)
       FROM pathways_providers pp
       JOIN providers pr ON pr.id = pp.provider_id
      WHERE pp.pathway_id = p.id)"#;

const GROUPS_SELECT: &str = r#"
    (SELECT COALESCE(json_agg(json_build_object(
                'pathway_id', op.pathway_id, 'offer_id', op.offer_id,
                'group_name', op.group_name, 'semester', op.semester) ORDER BY op.id), '[]'::json)
       FROM offers_pathways op
      WHERE op.pathway_id = p.id)"#;

const GROUPS_WITH_OFFERS_SELECT: &str = r#"
    (SELECT COALESCE(json_agg(json_build_object(
                'pathway_id', op.pathway_id, 'offer_id', op.offer_id,
                'group_name', op.group_name, 'semester', op.semester,
                'Offer', json_build_object('id', o.id, 'name', o.name)) ORDER BY op.id), '[]'::json)
       FROM offers_pathways op
       JOIN offers o ON o.id = op.offer_id
      WHERE op.pathway_id = p.id)"#;

fn data_fields_select(join: &JoinTable) -> String {
    format!(
        r#"
    (SELECT COALESCE(json_agg(json_build_object('id', d.id, 'name', d.name) ORDER BY d.id), '[]'::json)
       FROM {table} j
       JOIN datafields d ON d.id = j.datafield_id
      WHERE j.{column} = p.id)"#,
        table = join.table(),
        column = join.column(),
    )
}

/// Build the single-round-trip query that materializes a load plan.
fn load_pathway_sql(plan: &LoadPlan) -> String {
    let providers = if plan.providers {
        PROVIDERS_SELECT.to_string()
    } else {
        "NULL::json".to_string()
    };
    let data_fields = plan
        .data_fields
        .as_ref()
        .map(data_fields_select)
        .unwrap_or_else(|| "NULL::json".to_string());
    let groups = match plan.offer_groups {
        Some(true) => GROUPS_WITH_OFFERS_SELECT,
        Some(false) => GROUPS_SELECT,
        None => "NULL::json",
    };
    format!(
        r#"
        SELECT p.id, p.name, p.description, p.attributes, p.created_at, p.updated_at,
               {providers} AS providers,
               {data_fields} AS data_fields,
               {groups} AS groups_of_offers
          FROM pathways p
         WHERE p.id = $1
        "#
    )
}

// ── PgPathwayStore ────────────────────────────────────────────

pub struct PgPathwayStore {
    pool: PgPool,
}

impl PgPathwayStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PathwayStore for PgPathwayStore {
    async fn insert_pathway(&self, new: &NewPathway) -> Result<Pathway> {
        let row = sqlx::query_as::<_, PgPathwayRow>(&format!(
            "INSERT INTO pathways (name, description, attributes) VALUES ($1, $2, $3) \
             RETURNING {PATHWAY_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.attributes)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.into())
    }

    async fn update_pathway(
        &self,
        id: PathwayId,
        patch: &PathwayPatch,
    ) -> Result<Option<Pathway>> {
        let row = sqlx::query_as::<_, PgPathwayRow>(&format!(
            r#"
            UPDATE pathways
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   attributes = COALESCE($4, attributes),
                   updated_at = now()
             WHERE id = $1
            RETURNING {PATHWAY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(&patch.attributes)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_pathway(&self, id: PathwayId) -> Result<Option<Pathway>> {
        let row = sqlx::query_as::<_, PgPathwayRow>(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM pathways WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_pathways(&self, limit: i64, offset: i64) -> Result<Vec<Pathway>> {
        let rows = sqlx::query_as::<_, PgPathwayRow>(&format!(
            "SELECT {PATHWAY_COLUMNS} FROM pathways ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_pathway(&self, id: PathwayId) -> Result<bool> {
        // Providers, datafield links and offer groups cascade.
        let result = sqlx::query("DELETE FROM pathways WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_pathway(
        &self,
        id: PathwayId,
        plan: &LoadPlan,
    ) -> Result<Option<PathwayInstance>> {
        let sql = load_pathway_sql(plan);
        let row = sqlx::query_as::<_, PgPathwayInstanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(PathwayInstance {
            pathway: row.pathway.into(),
            providers: decode_relation(row.providers)?,
            data_fields: decode_relation(row.data_fields)?,
            groups_of_offers: decode_relation::<OfferGroup>(row.groups_of_offers)?,
        }))
    }

    async fn linked_data_field_ids(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
    ) -> Result<Vec<DataFieldId>> {
        let ids = sqlx::query_scalar::<_, String>(&format!(
            "SELECT datafield_id FROM {} WHERE {} = $1 ORDER BY datafield_id",
            join.table(),
            join.column()
        ))
        .bind(pathway_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(ids.into_iter().map(DataFieldId).collect())
    }

    async fn link_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<&str> = ids.iter().map(DataFieldId::as_str).collect();
        let result = sqlx::query(&format!(
            "INSERT INTO {table} ({column}, datafield_id) \
             SELECT $1, unnest($2::text[]) \
             ON CONFLICT DO NOTHING",
            table = join.table(),
            column = join.column()
        ))
        .bind(pathway_id)
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        debug!(
            pathway_id,
            %join,
            linked = result.rows_affected(),
            "Linked datafields"
        );
        Ok(())
    }

    async fn unlink_data_fields(
        &self,
        join: &JoinTable,
        pathway_id: PathwayId,
        ids: &[DataFieldId],
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<&str> = ids.iter().map(DataFieldId::as_str).collect();
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE {} = $1 AND datafield_id = ANY($2)",
            join.table(),
            join.column()
        ))
        .bind(pathway_id)
        .bind(&ids)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected())
    }

    async fn load_offer_groups(&self, pathway_id: PathwayId) -> Result<Vec<OfferGroup>> {
        let rows = sqlx::query_as::<_, PgOfferGroupRow>(
            r#"
            SELECT op.pathway_id, op.offer_id, op.group_name, op.semester,
                   o.name AS offer_name
              FROM offers_pathways op
              JOIN offers o ON o.id = op.offer_id
             WHERE op.pathway_id = $1
             ORDER BY op.id
            "#,
        )
        .bind(pathway_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn replace_offer_groups(
        &self,
        pathway_id: PathwayId,
        remove: &[OfferGroupKey],
        add: &[GroupOfOffers],
    ) -> Result<u64> {
        if remove.is_empty() && add.is_empty() {
            return Ok(0);
        }
        // Dropping the transaction on any error rolls the delete back.
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let mut removed = 0;
        if !remove.is_empty() {
            let offer_ids: Vec<i64> = remove.iter().map(|k| k.offer_id).collect();
            let group_names: Vec<&str> = remove.iter().map(|k| k.group_name.as_str()).collect();
            let semesters: Vec<&str> = remove.iter().map(|k| k.semester.as_str()).collect();
            removed = sqlx::query(
                r#"
                DELETE FROM offers_pathways op
                 USING UNNEST($2::bigint[], $3::text[], $4::text[]) AS k(offer_id, group_name, semester)
                 WHERE op.pathway_id = $1
                   AND op.offer_id = k.offer_id
                   AND op.group_name = k.group_name
                   AND op.semester = k.semester
                "#,
            )
            .bind(pathway_id)
            .bind(&offer_ids)
            .bind(&group_names)
            .bind(&semesters)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?
            .rows_affected();
        }

        // One row at a time so the serial id follows request order.
        for group in add {
            sqlx::query(
                r#"
                INSERT INTO offers_pathways (pathway_id, offer_id, group_name, semester)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(pathway_id)
            .bind(group.offer_id)
            .bind(&group.group_name)
            .bind(&group.semester)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        debug!(pathway_id, removed, added = add.len(), "Replaced offer groups");
        Ok(removed)
    }
}

// ── PgEnrollmentLookup ────────────────────────────────────────

/// Enrollment statuses read from the `enrollments` table. Every failure,
/// including an unrecognised status string, is an `ExternalLookup`.
pub struct PgEnrollmentLookup {
    pool: PgPool,
}

impl PgEnrollmentLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentStatusLookup for PgEnrollmentLookup {
    async fn student_enroll_status(
        &self,
        student_id: StudentId,
        offer_id: OfferId,
    ) -> Result<Option<EnrollmentStatus>> {
        let status = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status
              FROM enrollments
             WHERE student_id = $1 AND offer_id = $2
             ORDER BY updated_at DESC, id DESC
             LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PathwayError::ExternalLookup(e.to_string()))?;

        status
            .map(|s| {
                s.parse::<EnrollmentStatus>()
                    .map_err(|e| PathwayError::ExternalLookup(e.to_string()))
            })
            .transpose()
    }
}
