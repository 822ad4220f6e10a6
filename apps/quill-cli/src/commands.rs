//! Command execution.

use anyhow::{bail, Context};
use chrono::{Datelike, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use quill_core::stats::today_summary;
use quill_core::{Money, Order};
use quill_ledger::Shop;
use quill_store::{
    pull_remote_to_local, push_local_to_remote, select_store, AppSettings, LocalConfig, LocalStore,
    QuillConfig, RemoteStore, SheetServer, SheetServerConfig, SyncProgress,
};

use crate::render;
use crate::{Cli, Command, MonthArgs, SettingsCommand, SyncCommand};

pub async fn run(cli: Cli, config: QuillConfig) -> anyhow::Result<()> {
    let json = cli.json;
    let command = match cli.command {
        Command::ServeSheet { bind, snapshot } => return serve_sheet(&config, bind, snapshot).await,
        Command::InitConfig { force } => return init_config(&config, cli.config.as_deref(), force),
        command => command,
    };

    let local = open_local(&config).await?;
    let result = execute(command, &local, &config, json).await;
    local.close().await;
    result
}

async fn open_local(config: &QuillConfig) -> anyhow::Result<LocalStore> {
    let path = config.database_path();
    LocalStore::open(LocalConfig::new(path.clone()))
        .await
        .with_context(|| format!("opening local store at {}", path.display()))
}

async fn open_shop(local: &LocalStore, config: &QuillConfig) -> anyhow::Result<Shop> {
    let settings = local.load_settings().await?;
    let store = select_store(local, &settings, config)?;
    info!(backend = store.backend(), "Store selected");
    Ok(Shop::new(store))
}

async fn execute(command: Command, local: &LocalStore, config: &QuillConfig, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Stats => {
            let shop = open_shop(local, config).await?;
            let stats = shop.daily_stats().await?;
            if json {
                print_json(&stats)
            } else {
                if let Some(today) = today_summary(&stats) {
                    println!("{}", render::today(today));
                }
                println!("{}", render::daily_stats(&stats));
                Ok(())
            }
        }
        Command::RevenueReport(month) => {
            let (year, month) = resolve_month(&month);
            let report = open_shop(local, config).await?.revenue_report(year, month).await?;
            emit(json, &report, || render::revenue_report(&report))
        }
        Command::PurchaseReport(month) => {
            let (year, month) = resolve_month(&month);
            let report = open_shop(local, config).await?.purchase_report(year, month).await?;
            emit(json, &report, || render::purchase_report(&report))
        }
        Command::CustomerSplit { year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            let split = open_shop(local, config).await?.customer_split(year).await?;
            emit(json, &split, || render::customer_split(year, &split))
        }
        Command::Inventory => {
            let summary = open_shop(local, config).await?.inventory().await?;
            emit(json, &summary, || render::inventory(&summary))
        }
        Command::TopCustomers { limit } => {
            let top = open_shop(local, config).await?.top_customers(limit).await?;
            emit(json, &top, || render::customers(&top))
        }
        Command::Commit { file, quick_name } => {
            let order = read_order(&file).await?;
            let shop = open_shop(local, config).await?;
            let outcome = shop.processor().commit(order, quick_name.as_deref()).await?;
            emit(json, &outcome, || render::commit_outcome(&outcome))
        }
        Command::CollectDebt {
            customer_id,
            amount,
            note,
        } => {
            let shop = open_shop(local, config).await?;
            let receipt = shop
                .debt_ledger()
                .collect_debt(&customer_id, Money::from_dong(amount), note.as_deref())
                .await?;
            emit(json, &receipt, || render::debt_receipt(&receipt))
        }
        Command::PayOrder {
            order_id,
            amount,
            note,
        } => {
            let shop = open_shop(local, config).await?;
            let receipt = shop
                .debt_ledger()
                .pay_order_debt(&order_id, Money::from_dong(amount), note.as_deref())
                .await?;
            emit(json, &receipt, || render::debt_receipt(&receipt))
        }
        Command::PurgeOutOfStock => {
            let removed = open_shop(local, config).await?.catalog().purge_out_of_stock().await?;
            emit(json, &serde_json::json!({ "removed": removed }), || {
                format!("Removed {removed} out-of-stock product(s)")
            })
        }
        Command::Reconcile => {
            let report = open_shop(local, config).await?.reconcile().await?;
            emit(json, &report, || render::reconcile(&report))
        }
        Command::Settings(SettingsCommand::Show) => {
            let settings = local.load_settings().await?;
            emit(json, &settings, || render::settings(&settings))
        }
        Command::Settings(SettingsCommand::Set { use_remote, url }) => {
            let mut settings = local.load_settings().await?;
            if let Some(flag) = use_remote {
                settings.use_remote = flag;
            }
            if let Some(url) = url {
                settings.remote_url = url.trim().to_string();
            }
            settings.validate()?;
            local.save_settings(&settings).await?;
            emit(json, &settings, || render::settings(&settings))
        }
        Command::Sync(direction) => {
            let remote = remote_store(local, config, None).await?;
            let summary = match direction {
                SyncCommand::Push => push_local_to_remote(local, &remote, report_progress).await?,
                SyncCommand::Pull => pull_remote_to_local(&remote, local, report_progress).await?,
            };
            emit(json, &summary, || {
                format!(
                    "Synced {} products, {} customers, {} orders",
                    summary.products, summary.customers, summary.orders
                )
            })
        }
        Command::CheckRemote { url } => {
            let remote = remote_store(local, config, url).await?;
            let products = remote.probe().await?;
            emit(
                json,
                &serde_json::json!({ "url": remote.url(), "products": products }),
                || format!("Connected to {}: {} product(s) visible", remote.url(), products),
            )
        }
        Command::ServeSheet { .. } | Command::InitConfig { .. } => bail!("command does not use the store"),
    }
}

/// The remote endpoint: explicit URL, else settings, else `[remote] url`.
async fn remote_store(
    local: &LocalStore,
    config: &QuillConfig,
    explicit: Option<String>,
) -> anyhow::Result<RemoteStore> {
    let settings: AppSettings = local.load_settings().await?;
    let url = explicit
        .or_else(|| Some(settings.remote_url).filter(|u| !u.trim().is_empty()))
        .or_else(|| config.remote.url.clone());
    let Some(url) = url else {
        bail!("no remote URL configured; run `quill settings set --url <endpoint>`");
    };
    Ok(RemoteStore::new(url, config.remote_timeout())?)
}

async fn serve_sheet(
    config: &QuillConfig,
    bind: Option<String>,
    snapshot: Option<PathBuf>,
) -> anyhow::Result<()> {
    let server_config = SheetServerConfig {
        bind_addr: bind.unwrap_or_else(|| config.sheet_server.bind_addr.clone()),
        snapshot_path: snapshot.or_else(|| config.sheet_server.snapshot_path.clone()),
    };
    let handle = SheetServer::start(server_config).await?;
    println!("Serving sheets at {} (Ctrl-C to stop)", handle.url());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    handle.shutdown().await;
    Ok(())
}

fn init_config(config: &QuillConfig, path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = path
        .map(Path::to_path_buf)
        .or_else(QuillConfig::default_config_path)
        .context("no config path available on this platform")?;
    if target.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }
    config.save(Some(target.clone()))?;
    println!("Wrote {}", target.display());
    Ok(())
}

async fn read_order(path: &Path) -> anyhow::Result<Order> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing order in {}", path.display()))
}

fn resolve_month(args: &MonthArgs) -> (i32, u32) {
    let now = Local::now();
    (args.year.unwrap_or(now.year()), args.month.unwrap_or(now.month()))
}

fn report_progress(progress: &SyncProgress) {
    eprintln!("[{}/{}] {}", progress.done, progress.total, progress.message);
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        print_json(value)
    } else {
        println!("{}", text());
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
