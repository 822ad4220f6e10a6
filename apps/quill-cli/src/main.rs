//! # quill
//!
//! Operator command line for the shop ledger.
//!
//! ```text
//! quill stats                         30-day window and today's tile
//! quill revenue-report -y 2024 -m 3   monthly revenue by day
//! quill purchase-report -y 2024 -m 3  NO_TAX purchases for the month
//! quill commit order.json             record a SALE / IMPORT order
//! quill pay-order <id> 30000          settle part of one order's debt
//! quill sync push | pull              copy between local and remote
//! quill serve-sheet                   run the sheet endpoint locally
//! ```
//!
//! Logs go to stderr, results to stdout (`--json` for machine output).

mod commands;
mod render;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use quill_store::QuillConfig;

const DEFAULT_LOG_FILTER: &str = "info,quill=debug,sqlx=warn";

/// Point-of-sale ledger for a stationery shop.
#[derive(Debug, Parser)]
#[command(name = "quill", author, version, about, long_about = None)]
pub struct Cli {
    /// Config file. Defaults to the platform config dir.
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Trailing 30-day revenue, order count and profit.
    Stats,

    /// Revenue per day for one month.
    RevenueReport(MonthArgs),

    /// NO_TAX purchase lines for one month.
    PurchaseReport(MonthArgs),

    /// Registered vs walk-in revenue per month.
    CustomerSplit {
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Stock value, potential profit and low-stock products.
    Inventory,

    /// Best customers by lifetime spend.
    TopCustomers {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Commit an order read from a JSON file.
    Commit {
        file: PathBuf,

        /// Name for the customer if this sale creates one.
        #[arg(long)]
        quick_name: Option<String>,
    },

    /// Record a payment against a customer's running debt.
    CollectDebt {
        customer_id: String,
        amount: i64,
        #[arg(long)]
        note: Option<String>,
    },

    /// Record a payment against one order's outstanding balance.
    PayOrder {
        order_id: String,
        amount: i64,
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete every product with no stock left (services are kept).
    PurgeOutOfStock,

    /// Compare customer debt with the debt still open on their orders.
    Reconcile,

    /// Show or change the backend settings.
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Copy data between the local and remote stores.
    #[command(subcommand)]
    Sync(SyncCommand),

    /// Check that the remote endpoint answers.
    CheckRemote {
        /// Endpoint to check instead of the configured one.
        #[arg(long)]
        url: Option<String>,
    },

    /// Write the effective configuration to the config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Serve the sheet protocol over HTTP until Ctrl-C.
    ServeSheet {
        /// Listen address. Defaults to `[sheet_server] bind_addr`.
        #[arg(long)]
        bind: Option<String>,

        /// JSON file the sheets are kept in.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct MonthArgs {
    /// Defaults to the current year.
    #[arg(short, long)]
    year: Option<i32>,

    /// 1-12. Defaults to the current month.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        use_remote: Option<bool>,
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Upload every local entity to the remote store.
    Push,
    /// Replace local data with the remote store's.
    Pull,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = QuillConfig::load(cli.config.clone())?;
    init_tracing(&config);

    commands::run(cli, config).await
}

/// `RUST_LOG` wins, then `[logging] filter`, then the built-in default.
fn init_tracing(config: &QuillConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = config.logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pay_order() {
        let cli = Cli::try_parse_from(["quill", "--json", "pay-order", "ord-1", "30000", "--note", "cash"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::PayOrder {
                order_id,
                amount,
                note,
            } => {
                assert_eq!(order_id, "ord-1");
                assert_eq!(amount, 30_000);
                assert_eq!(note.as_deref(), Some("cash"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_month_range_enforced() {
        assert!(Cli::try_parse_from(["quill", "revenue-report", "-y", "2024", "-m", "13"]).is_err());
        assert!(Cli::try_parse_from(["quill", "purchase-report", "-m", "2"]).is_ok());
    }

    #[test]
    fn test_nested_subcommands() {
        let cli = Cli::try_parse_from(["quill", "settings", "set", "--use-remote", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Settings(SettingsCommand::Set {
                use_remote: Some(true),
                url: None
            })
        ));
        assert!(Cli::try_parse_from(["quill", "sync", "sideways"]).is_err());
    }
}
