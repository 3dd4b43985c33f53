use anyhow::Context;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crmserver::api_router::build_router;
use crmserver::config::AppConfig;
use crmserver::shared::state::AppState;
use crmserver::shared::utils::create_conn;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database_url)?;

    {
        let mut conn = pool.get().context("failed to get database connection")?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = Arc::new(AppState::new(config, pool)?);
    let app = build_router(state);

    info!("Starting HTTP server on {host}:{port}");
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
