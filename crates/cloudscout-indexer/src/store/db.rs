//! Database setup and schema management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database connection pool type alias
pub type DbPool = SqlitePool;

/// Get the per-user state database path
fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "cloudscout").context("Failed to get project directories")?;

    let state_dir = proj_dirs.data_local_dir();
    fs::create_dir_all(state_dir).context("Failed to create state directory")?;

    Ok(state_dir.join("state.db"))
}

/// Open the state database, creating it if needed.
///
/// `path` overrides the per-user default location.
pub async fn open_db(path: Option<&Path>) -> Result<DbPool> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_db_path()?,
    };
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to open state database")?;

    setup_schema(&pool).await?;

    Ok(pool)
}

/// Setup database schema
async fn setup_schema(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            account_id TEXT PRIMARY KEY,
            display_name TEXT,
            active_regions TEXT NOT NULL,
            last_indexed_at TEXT,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_unauthorized INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            account_id TEXT NOT NULL REFERENCES accounts(account_id),
            taken_at TEXT NOT NULL,
            success INTEGER NOT NULL,
            document TEXT NOT NULL,
            PRIMARY KEY (account_id, taken_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue_reports (
            account_id TEXT NOT NULL,
            taken_at TEXT NOT NULL,
            engine TEXT NOT NULL,
            report TEXT NOT NULL,
            PRIMARY KEY (account_id, taken_at, engine)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fix_history (
            id INTEGER PRIMARY KEY,
            account_id TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            taken_at TEXT NOT NULL,
            engine TEXT NOT NULL,
            category TEXT NOT NULL,
            item_id TEXT NOT NULL,
            success INTEGER NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_account ON snapshots(account_id, taken_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_account ON issue_reports(account_id, taken_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fixes_account ON fix_history(account_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// In-memory pool with the schema applied, for tests
#[cfg(test)]
pub(crate) async fn open_test_db() -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1) // Single connection for in-memory to maintain state
        .connect_with(options)
        .await?;

    setup_schema(&pool).await?;

    Ok(pool)
}
