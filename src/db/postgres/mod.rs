mod store;

use sqlx::{postgres::PgPoolOptions, PgPool};

pub use store::PgStore;

/// Creates a PostgreSQL connection pool and brings the schema up to date
///
/// Establishes a pool of database connections for efficient reuse, then runs
/// the embedded migrations under `migrations/`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!(max_connections, "Database pool ready, migrations applied");

    Ok(pool)
}
