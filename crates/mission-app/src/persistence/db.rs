//! Database connection and initialization.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Database connection wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the SQLite database.
///
/// Creates the database file if it doesn't exist, runs migrations,
/// and returns a connection pool. `":memory:"` opens an in-memory database
/// that lives as long as the pool.
pub async fn init_database(db_path: &str, max_connections: u32) -> Result<Database> {
    let db_url = if db_path == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        format!("sqlite:{}?mode=rwc", db_path)
    };

    info!("Connecting to database: {}", db_path);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&db_url)
        .await?;

    run_migrations(&pool).await?;

    Ok(Database { pool })
}

/// Apply the embedded schema. Every statement is `IF NOT EXISTS`, so this is
/// safe to run on each start.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let schema = include_str!("../../migrations/001_init.sql");

    let statements: Vec<String> = schema
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let mut tx = pool.begin().await?;
    for statement in &statements {
        sqlx::query(statement.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration statement failed: {}", statement))?;
    }
    tx.commit().await?;

    info!(statements = statements.len(), "schema up to date");
    Ok(())
}
