//! POST {prefix}/generate_userpathway_chart_data: per-semester enrollment
//! counts of one student on one pathway.

use axum::extract::State;
use axum::Json;
use pathways_types::{ChartData, ChartRequest};

use crate::error::AppError;
use crate::state::AppState;

pub async fn generate_userpathway_chart_data(
    State(state): State<AppState>,
    Json(req): Json<ChartRequest>,
) -> Result<Json<ChartData>, AppError> {
    let chart = state
        .aggregator
        .build_chart_data(req.student_id, req.pathway_id, req.group_name.as_deref())
        .await?;
    Ok(Json(chart))
}
