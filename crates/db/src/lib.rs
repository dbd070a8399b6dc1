//! Postgres persistence for the calendar booking service: schema bootstrap,
//! row models, and the repositories that apply conflict decisions inside
//! transactions. The one-booking-per-slot rule is ultimately enforced by a
//! uniqueness constraint here, not by application code.

pub mod models;
pub mod repositories;
pub mod schema;

pub mod mock;

use eyre::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

const MAX_CONNECTIONS: u32 = 5;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    Ok(pool)
}
