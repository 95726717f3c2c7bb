pub mod error;
pub mod order_repository;
pub mod store;

pub use error::{DatabaseError, DatabaseErrorKind};
pub use order_repository::PgOrderStore;
pub use store::{OrderStore, TransitionRequest};

use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// Initialize the database connection pool.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout));
    if let Some(idle) = config.idle_timeout {
        options = options.idle_timeout(Duration::from_secs(idle));
    }

    let pool = options
        .connect(&config.url)
        .await
        .map_err(DatabaseError::from_sqlx)?;

    info!(
        max_connections = config.max_connections,
        "database connection pool initialized"
    );
    Ok(pool)
}
