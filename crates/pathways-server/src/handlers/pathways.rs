//! Pathway create, read, update and list.
//!
//! Writes run the reconciliation hooks before responding; every response is
//! decorated with the pathway's resolved offer groups.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use futures::future::try_join_all;
use pathways_core::{
    NewPathway, PathwayError, PathwayId, PathwayInstance, PathwayPatch, PathwayStore,
};
use pathways_types::{ListPathwaysQuery, PathwayPayload};
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

pub async fn create_pathway(
    State(state): State<AppState>,
    Json(payload): Json<PathwayPayload>,
) -> Result<(StatusCode, Json<PathwayInstance>), AppError> {
    let name = payload
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| PathwayError::Validation("name is required".into()))?;

    let pathway = state
        .store()
        .insert_pathway(&NewPathway {
            name,
            description: payload.description.clone(),
            attributes: payload
                .attributes
                .clone()
                .unwrap_or_else(|| serde_json::json!({})),
        })
        .await?;
    info!(pathway_id = pathway.id, "Created pathway");

    let mut instance = state.hooks.after_create(&pathway, &payload).await?;
    state.hooks.before_response(&mut instance).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn list_pathways(
    State(state): State<AppState>,
    Query(query): Query<ListPathwaysQuery>,
) -> Result<Json<Vec<PathwayInstance>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);
    if !(0..=MAX_LIMIT).contains(&limit) || offset < 0 {
        return Err(PathwayError::Validation(format!(
            "limit must be within 0..={MAX_LIMIT} and offset non-negative"
        ))
        .into());
    }

    let pathways = state.store().list_pathways(limit, offset).await?;
    let plan = state.hooks.read_plan();
    let loaded = try_join_all(
        pathways
            .iter()
            .map(|pathway| state.store().load_pathway(pathway.id, &plan)),
    )
    .await?;
    // A pathway removed between the list and the load is skipped.
    let mut instances: Vec<PathwayInstance> = loaded.into_iter().flatten().collect();
    state.hooks.before_list_response(&mut instances).await?;
    Ok(Json(instances))
}

pub async fn get_pathway(
    State(state): State<AppState>,
    Path(id): Path<PathwayId>,
) -> Result<Json<PathwayInstance>, AppError> {
    let mut instance = state
        .store()
        .load_pathway(id, &state.hooks.read_plan())
        .await?
        .ok_or_else(|| PathwayError::pathway_not_found(id))?;
    state.hooks.before_response(&mut instance).await?;
    Ok(Json(instance))
}

pub async fn update_pathway(
    State(state): State<AppState>,
    Path(id): Path<PathwayId>,
    Json(payload): Json<PathwayPayload>,
) -> Result<Json<PathwayInstance>, AppError> {
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(PathwayError::Validation("name must not be empty".into()).into());
    }
    let patch = PathwayPatch {
        name: payload.name.clone(),
        description: payload.description.clone(),
        attributes: payload.attributes.clone(),
    };
    let pathway = state
        .store()
        .update_pathway(id, &patch)
        .await?
        .ok_or_else(|| PathwayError::pathway_not_found(id))?;
    info!(pathway_id = pathway.id, "Updated pathway");

    let mut instance = state.hooks.after_update(&pathway, &payload).await?;
    state.hooks.before_response(&mut instance).await?;
    Ok(Json(instance))
}
