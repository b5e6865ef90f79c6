//! Account row CRUD and due-account selection

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::db::DbPool;
use crate::policy::{self, AccountIndexState};

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid account timestamp: {raw}"))?
        .with_timezone(&Utc))
}

fn state_from_row(row: &SqliteRow) -> Result<AccountIndexState> {
    let regions_json: String = row.get("active_regions");
    let last_indexed_at: Option<String> = row.get("last_indexed_at");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(AccountIndexState {
        account_id: row.get("account_id"),
        display_name: row.get("display_name"),
        active_regions: serde_json::from_str(&regions_json)
            .context("Invalid active_regions JSON")?,
        last_indexed_at: match last_indexed_at {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        },
        consecutive_failures: row.get("consecutive_failures"),
        is_active: row.get("is_active"),
        is_unauthorized: row.get("is_unauthorized"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Register an account for indexing
pub async fn add_account(
    pool: &DbPool,
    account_id: &str,
    display_name: Option<&str>,
    active_regions: &[String],
) -> Result<()> {
    let regions_json = serde_json::to_string(active_regions)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO accounts
             (account_id, display_name, active_regions, consecutive_failures,
              is_active, is_unauthorized, created_at, updated_at)
         VALUES (?, ?, ?, 0, 1, 0, ?, ?)",
    )
    .bind(account_id)
    .bind(display_name)
    .bind(&regions_json)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_account(pool: &DbPool, account_id: &str) -> Result<Option<AccountIndexState>> {
    let row = sqlx::query("SELECT * FROM accounts WHERE account_id = ?")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(state_from_row).transpose()
}

pub async fn list_accounts(pool: &DbPool) -> Result<Vec<AccountIndexState>> {
    let rows = sqlx::query("SELECT * FROM accounts ORDER BY account_id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(state_from_row).collect()
}

/// Accounts due for indexing, capped at `limit`.
///
/// The SQL filter narrows to enabled accounts; the once-per-UTC-day check
/// runs through the policy so the boundary lives in one place.
pub async fn due_accounts(
    pool: &DbPool,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<AccountIndexState>> {
    let rows = sqlx::query(
        "SELECT * FROM accounts
         WHERE is_active = 1 AND is_unauthorized = 0
         ORDER BY account_id",
    )
    .fetch_all(pool)
    .await?;

    let mut due = Vec::new();
    for row in &rows {
        let state = state_from_row(row)?;
        if policy::is_due(&state, now) {
            due.push(state);
            if due.len() == limit {
                break;
            }
        }
    }
    Ok(due)
}

/// Record a successful run: stamp the index time and clear the failure count
pub async fn mark_indexed(pool: &DbPool, account_id: &str, at: DateTime<Utc>) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE accounts
         SET last_indexed_at = ?, consecutive_failures = 0, updated_at = ?
         WHERE account_id = ?",
    )
    .bind(at.to_rfc3339())
    .bind(&now)
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn bump_failures(pool: &DbPool, account_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE accounts
         SET consecutive_failures = consecutive_failures + 1, updated_at = ?
         WHERE account_id = ?",
    )
    .bind(&now)
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn disable_account(pool: &DbPool, account_id: &str, unauthorized: bool) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE accounts
         SET is_active = 0, is_unauthorized = ?, updated_at = ?
         WHERE account_id = ?",
    )
    .bind(unauthorized)
    .bind(&now)
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Re-enable a disabled account. Clearing the unauthorized flag is an
/// explicit statement that credentials were fixed out of band.
pub async fn enable_account(pool: &DbPool, account_id: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE accounts
         SET is_active = 1, is_unauthorized = 0, consecutive_failures = 0, updated_at = ?
         WHERE account_id = ?",
    )
    .bind(&now)
    .bind(account_id)
    .execute(pool)
    .await?;

    Ok(())
}
