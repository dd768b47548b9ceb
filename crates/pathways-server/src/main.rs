//! pathways-server: REST server for pathways and enrollment charts.
//!
//! Configuration is read from the environment (and `.env`); see
//! [`pathways_server::config`].

use std::sync::Arc;

use anyhow::Context;
use pathways_postgres::{DatabaseManager, PgEnrollmentLookup, PgPathwayStore};
use pathways_server::{build_router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pathways_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(
        prefix = %config.prefix,
        topics_policy = %config.policy.data_fields,
        offer_groups_policy = %config.policy.offer_groups,
        topics_join = %config.topics_join,
        "Starting pathways server"
    );

    let db = DatabaseManager::new(&config.database)
        .await
        .context("failed to connect to database")?;
    db.run_migrations().await.context("failed to run migrations")?;
    let pool = db.pool().clone();

    let state = AppState::new(
        Arc::new(PgPathwayStore::new(pool.clone())),
        Arc::new(PgEnrollmentLookup::new(pool)),
        config.policy,
        config.topics_join.clone(),
    );
    let app = build_router(state, &config.prefix);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    info!("pathways-server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
