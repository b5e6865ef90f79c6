//! SQLite persistence for accounts, snapshots, and issue reports
//!
//! Uses sqlx for async database access with a connection pool.

mod accounts;
mod db;
mod history;

pub use db::{open_db, DbPool};

pub use accounts::{
    add_account, bump_failures, disable_account, due_accounts, enable_account, get_account,
    list_accounts, mark_indexed,
};

pub use history::{
    latest_reports, put_issue_report, put_snapshot, record_fix, records_by_ids,
    update_issue_category, LocatedRecord,
};

#[cfg(test)]
pub(crate) use db::open_test_db;
