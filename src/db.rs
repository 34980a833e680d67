use sqlx::{any::AnyPoolOptions, AnyPool, Executor};
use tracing::info;

use crate::config::{DatabaseBackend, DatabaseConfig};

const SQLITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE CHECK (length(username) <= 191),
        password_hash TEXT NOT NULL,
        created_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL CHECK (length(text) <= 2048),
        status TEXT NOT NULL CHECK (length(status) <= 64),
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos (created_at)",
];

const MYSQL_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(191) NOT NULL UNIQUE,
        password_hash VARCHAR(255) NOT NULL,
        created_at BIGINT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS todos (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        text VARCHAR(2048) NOT NULL,
        status VARCHAR(64) NOT NULL,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL,
        INDEX idx_todos_created_at (created_at)
    )"#,
];

/// Open the shared connection pool.
pub async fn connect(config: &DatabaseConfig) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    info!(backend = ?config.backend, "connected to the database");
    Ok(pool)
}

/// Create the `users` and `todos` tables if they do not exist yet.
pub async fn migrate(pool: &AnyPool, backend: DatabaseBackend) -> Result<(), sqlx::Error> {
    let statements = match backend {
        DatabaseBackend::Sqlite => SQLITE_SCHEMA,
        DatabaseBackend::MySql => MYSQL_SCHEMA,
    };

    for statement in statements {
        pool.execute(*statement).await?;
    }

    info!("database schema is up to date");
    Ok(())
}
