//! cloudscout-indexer: cloud resource inventory and issue reporting
//!
//! This tool indexes registered cloud accounts into point-in-time snapshots,
//! runs the rule engines over them and serves the resulting reports from a
//! local state database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cloudscout_common::{severity_label, EngineKind};
use cloudscout_indexer::config::IndexerConfig;
use cloudscout_indexer::notify::LogNotifier;
use cloudscout_indexer::source::{DataSource, FileSource};
use cloudscout_indexer::{remediate, scheduler, store};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};

#[derive(Parser, Debug)]
#[command(name = "cloudscout-indexer")]
#[command(about = "Cloud resource inventory and issue reporting")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one indexing cycle over the accounts that are due
    Run {
        /// Directory of per-account inventory documents
        #[arg(long)]
        source_dir: PathBuf,

        /// Path to the indexer configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Maximum accounts to index this cycle (defaults to the config value)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Path to the state database (defaults to the platform data dir)
        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },

    /// Manage registered accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsCommand,
    },

    /// Show the latest issue report for an account
    Report {
        /// Account identifier
        account_id: String,

        /// Engine to show (unusedResources, securityIssues, maintenance)
        #[arg(long, default_value = "unusedResources")]
        engine: String,

        /// List individual items instead of category totals
        #[arg(long)]
        items: bool,

        /// Restrict the item view to one category
        #[arg(long)]
        category: Option<String>,

        /// Path to the indexer configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },

    /// Mark a reported item as fixed
    Fix {
        /// Account identifier
        account_id: String,

        /// Category key the item was reported under
        #[arg(long)]
        category: String,

        /// Item identifier as listed in the report
        #[arg(long)]
        item: String,

        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum AccountsCommand {
    /// Register an account for indexing
    Add {
        /// Account identifier
        account_id: String,

        /// Comma-separated regions to inventory
        #[arg(long)]
        regions: String,

        /// Human-readable account name
        #[arg(long)]
        name: Option<String>,

        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },

    /// List registered accounts and their indexing state
    List {
        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },

    /// Re-enable a disabled account after its credentials were fixed
    Enable {
        /// Account identifier
        account_id: String,

        #[arg(long, env = "CLOUDSCOUT_DB")]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<IndexerConfig> {
    match path {
        Some(path) => IndexerConfig::load(path),
        None => Ok(IndexerConfig::default()),
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match args.command {
        Command::Run {
            source_dir,
            config,
            batch_size,
            db,
        } => {
            handle_run(source_dir, config, batch_size, db).await?;
        }

        Command::Accounts { action } => match action {
            AccountsCommand::Add {
                account_id,
                regions,
                name,
                db,
            } => {
                let regions: Vec<String> = regions
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if regions.is_empty() {
                    bail!("at least one region is required");
                }

                let pool = store::open_db(db.as_deref()).await?;
                store::add_account(&pool, &account_id, name.as_deref(), &regions).await?;
                println!("Account {account_id} registered ({} regions).", regions.len());
            }

            AccountsCommand::List { db } => {
                handle_accounts_list(db).await?;
            }

            AccountsCommand::Enable { account_id, db } => {
                let pool = store::open_db(db.as_deref()).await?;
                store::enable_account(&pool, &account_id).await?;
                println!("Account {account_id} re-enabled for indexing.");
            }
        },

        Command::Report {
            account_id,
            engine,
            items,
            category,
            config,
            db,
        } => {
            handle_report(account_id, engine, items, category, config, db).await?;
        }

        Command::Fix {
            account_id,
            category,
            item,
            db,
        } => {
            let pool = store::open_db(db.as_deref()).await?;
            remediate::mark_item_fixed(&pool, &account_id, &category, &item).await?;
            println!("Marked {item} fixed in {category} for account {account_id}.");
        }
    }

    Ok(())
}

/// Handle the run command
async fn handle_run(
    source_dir: PathBuf,
    config_path: Option<PathBuf>,
    batch_size: Option<usize>,
    db: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let pool = store::open_db(db.as_deref()).await?;
    let source: Arc<dyn DataSource> = Arc::new(FileSource::new(&source_dir));
    let notifier = LogNotifier;

    let batch = batch_size.unwrap_or(config.batch_size);
    let summary = scheduler::run_indexing_cycle(&pool, source, &notifier, &config, batch).await?;

    println!(
        "\nIndexed {} of {} due accounts.",
        summary.ran - summary.failures.len(),
        summary.ran
    );
    for failure in &summary.failures {
        println!("  {}: {}", failure.account_id, failure.reason);
    }

    Ok(())
}

/// Handle the accounts list command
async fn handle_accounts_list(db: Option<PathBuf>) -> Result<()> {
    let pool = store::open_db(db.as_deref()).await?;
    let accounts = store::list_accounts(&pool).await?;

    if accounts.is_empty() {
        println!("No accounts registered.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Account"),
            Cell::new("Name"),
            Cell::new("Regions"),
            Cell::new("Last Indexed"),
            Cell::new("Failures"),
            Cell::new("Status"),
        ]);

    for account in &accounts {
        let status = if account.is_unauthorized {
            "unauthorized"
        } else if !account.is_active {
            "disabled"
        } else {
            "active"
        };
        let last_indexed = account
            .last_indexed_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(&account.account_id),
            Cell::new(account.display_name.as_deref().unwrap_or("-")),
            Cell::new(account.active_regions.join(", ")),
            Cell::new(&last_indexed),
            Cell::new(account.consecutive_failures),
            Cell::new(status),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Handle the report command
async fn handle_report(
    account_id: String,
    engine: String,
    items: bool,
    category: Option<String>,
    config_path: Option<PathBuf>,
    db: Option<PathBuf>,
) -> Result<()> {
    let Some(engine) = EngineKind::from_key(&engine) else {
        bail!(
            "unknown engine: {engine} (expected unusedResources, securityIssues or maintenance)"
        );
    };
    let pool = store::open_db(db.as_deref()).await?;

    if items {
        return print_issue_items(&pool, &account_id, engine, category.as_deref()).await;
    }

    let Some((taken_at, reports)) = store::latest_reports(&pool, &account_id).await? else {
        println!("No reports for account {account_id}.");
        return Ok(());
    };
    let Some(report) = reports.get(&engine) else {
        println!("No {} report for account {account_id}.", engine.key());
        return Ok(());
    };

    println!(
        "\n=== {} for {} ({}) ===\n",
        engine_title(engine),
        account_id,
        taken_at.format("%Y-%m-%d %H:%M:%S")
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Category"),
            Cell::new("Finding"),
            Cell::new("Hits"),
            Cell::new("Total"),
            Cell::new("Severity"),
            Cell::new("Est. Savings ($/mo)"),
        ]);

    for (key, cat) in &report.categories {
        // Score-only categories have no counter row
        if cat.count.is_none() && cat.unused.is_none() {
            continue;
        }
        let total = cat
            .total
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        let severity = cat.severity.map(severity_label).unwrap_or("-");
        let savings = cat
            .cost_saving
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(key),
            Cell::new(&cat.label),
            Cell::new(cat.hits()),
            Cell::new(&total),
            Cell::new(severity),
            Cell::new(&savings),
        ]);
    }
    println!("{table}");

    if let Some(policy) = report.category("passwordPolicy") {
        if let Some(score) = policy.score {
            let config = load_config(config_path.as_ref())?;
            let verdict = if score >= config.rules.password_policy_pass_score {
                "pass"
            } else {
                "fail"
            };
            println!("\nPassword policy score: {score}/6 ({verdict})");
        }
    }

    Ok(())
}

/// Print the per-item view of one engine's latest report
async fn print_issue_items(
    pool: &store::DbPool,
    account_id: &str,
    engine: EngineKind,
    category: Option<&str>,
) -> Result<()> {
    let findings = remediate::list_issue_items(pool, account_id, engine, category).await?;
    if findings.is_empty() {
        println!("No reported items.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Category"),
            Cell::new("Item"),
            Cell::new("Severity"),
            Cell::new("Region"),
            Cell::new("Resource"),
        ]);

    for finding in &findings {
        let severity = finding.severity.map(severity_label).unwrap_or("-");
        let (region, resource) = match &finding.located {
            Some(located) => (
                located.region.as_deref().unwrap_or("global").to_string(),
                located.resource_type.display_name().to_string(),
            ),
            None => ("-".to_string(), "-".to_string()),
        };

        table.add_row(vec![
            Cell::new(&finding.category),
            Cell::new(&finding.item_id),
            Cell::new(severity),
            Cell::new(&region),
            Cell::new(&resource),
        ]);
    }

    println!("{table}");
    println!("\nTotal: {} items", findings.len());
    Ok(())
}

fn engine_title(engine: EngineKind) -> &'static str {
    match engine {
        EngineKind::UnusedResources => "Unused Resources",
        EngineKind::SecurityIssues => "Security Issues",
        EngineKind::Maintenance => "Maintenance",
    }
}
