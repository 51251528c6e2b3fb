use std::sync::Arc;

use lapsight_agent::{providers_from_config, Narrator};
use lapsight_core::config::{AppConfig, ConfigError};
use lapsight_db::{connect_with_settings, migrations, Catalog, DbPool, SqlNarrativeCache};
use thiserror::Error;
use tracing::info;

use crate::api::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    LlmClients(String),
}

#[cfg(test)]
pub async fn bootstrap(
    options: lapsight_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let providers = providers_from_config(&config.llm)
        .map_err(|error| BootstrapError::LlmClients(format!("{error:#}")))?;
    let narrator = Narrator::new(providers, Arc::new(SqlNarrativeCache::new(db_pool.clone())));
    info!(
        event_name = "system.bootstrap.narrator_ready",
        correlation_id = "bootstrap",
        providers = %narrator.provider_names().join(","),
        "narrative providers configured"
    );

    let api = ApiState::new(Catalog::sqlite(db_pool.clone()), narrator, config.catalog.clone());
    Ok(Application { config, db_pool, api })
}
