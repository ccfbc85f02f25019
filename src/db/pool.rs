use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::Config;

/// Pool sizing comes from configuration rather than being baked in here.
pub fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
}

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    pool_options(config).connect(&config.database_url).await
}
