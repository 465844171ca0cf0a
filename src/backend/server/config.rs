//! Server Configuration
//!
//! Environment-driven configuration. The database is mandatory: the store
//! is the single source of truth for conversations and messages, so the
//! server refuses to start without `DATABASE_URL`.

use sqlx::PgPool;

/// Connect to the database and run migrations.
///
/// Migration failures are logged but tolerated; they usually mean the
/// schema is already in place.
pub async fn load_database() -> Result<PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        tracing::error!("DATABASE_URL not set");
        sqlx::Error::Configuration("DATABASE_URL not set".into())
    })?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;
    tracing::info!("Database connection pool created");

    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed"),
        Err(e) => {
            tracing::warn!(error = ?e, "migration run failed, continuing with existing schema");
        }
    }

    Ok(pool)
}

/// Port the server listens on (`SERVER_PORT`, default 3000)
pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}
