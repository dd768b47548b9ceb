//! Router construction for the pathways server.

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the full router. Pathway routes live under `prefix`, which must be
/// a non-root path such as `/pathways`.
pub fn build_router(state: AppState, prefix: &str) -> Router {
    let pathways = Router::new()
        .route(
            "/",
            get(handlers::pathways::list_pathways).post(handlers::pathways::create_pathway),
        )
        .route(
            "/generate_userpathway_chart_data",
            post(handlers::chart::generate_userpathway_chart_data),
        )
        .route(
            "/:id",
            get(handlers::pathways::get_pathway).put(handlers::pathways::update_pathway),
        );

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest(prefix, pathways)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}
