use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::error::Result;

pub type DbPool = Pool<Postgres>;

/// Opens the run's connection to the sink. A run holds exactly one
/// connection and closes it when the load finishes.
pub async fn connect(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Connected to database");
    Ok(pool)
}
