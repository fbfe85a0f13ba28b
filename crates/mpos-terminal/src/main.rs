//! mPOS terminal entry point.
//!
//! Wires the storage, SDK and coordinator together and runs one headless
//! payment against the simulated reader:
//!
//! ```text
//! main()
//!  └─ load_config()                -- TOML operator settings
//!  └─ ConfigStore::new(FileMedium) -- session document, legacy upgrade
//!  └─ SimulatedReader::new()       -- PaymentSdk implementation
//!  └─ Coordinator::spawn()         -- single task owning all state
//!       ├─ scan, connect to the first supported reader
//!       └─ run the transaction, wait for the automatic reset
//! ```
//!
//! A desktop shell would instead keep the [`TerminalHandle`] alive and route
//! its UI commands through `infrastructure::ui_bridge`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mpos_core::{TransactionKind, TransactionStatus};
use mpos_terminal::application::payment_sdk::EventSender;
use mpos_terminal::application::run_transaction::AUTO_RESET_DELAY;
use mpos_terminal::infrastructure::coordinator::{Coordinator, TerminalHandle, TerminalParts};
use mpos_terminal::infrastructure::sdk::simulated::{demo_catalogue, SimulatedReader};
use mpos_terminal::infrastructure::storage::config::{load_config, session_file_path, AppConfig};
use mpos_terminal::infrastructure::storage::medium::FileMedium;
use mpos_terminal::infrastructure::storage::session_store::ConfigStore;

/// Upper bound for each step of the demo run.
const STEP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Parser)]
#[command(name = "mpos-terminal", version, about = "Headless mPOS terminal run against a simulated reader")]
struct Cli {
    /// Path to the TOML config file (defaults to the platform config directory).
    #[arg(long, env = "MPOS_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the session document (overrides the config file).
    #[arg(long, env = "MPOS_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Amount to charge, as typed by a user.
    #[arg(long, default_value = "3.14")]
    amount: String,

    /// Transaction kind: sale, auth or refund.
    #[arg(long, default_value = "sale")]
    kind: TransactionKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config is read before logging exists; a broken file falls back to defaults.
    let (config, config_error) = match load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.terminal.log_level)),
        )
        .init();

    info!("mPOS terminal starting");
    if let Some(e) = config_error {
        warn!("using default configuration: {e}");
    }

    let session_path = match cli.session_file {
        Some(path) => path,
        None => session_file_path(&config).context("no session file location")?,
    };
    info!("session document: {}", session_path.display());

    let (events, inbound) = EventSender::channel();
    let sdk = Arc::new(SimulatedReader::new(events.clone(), demo_catalogue()));
    let (handle, task) = Coordinator::spawn(TerminalParts {
        sdk,
        events,
        inbound,
        store: ConfigStore::new(Arc::new(FileMedium::new(session_path))),
        defaults: config.defaults.to_configurations(),
        device_name_prefix: config.terminal.device_name_prefix.clone(),
    })
    .await;

    tokio::select! {
        result = run_demo(&handle, cli.kind, &cli.amount) => {
            if let Err(e) = &result {
                error!("demo run failed: {e:#}");
            }
            print_activity_log(&handle);
            drop(handle);
            task.await.context("coordinator task panicked")?;
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!("mPOS terminal stopped");
    Ok(())
}

/// Scans, connects to the first supported reader and runs one transaction.
async fn run_demo(handle: &TerminalHandle, kind: TransactionKind, amount: &str) -> anyhow::Result<()> {
    handle.start_scan().await?;
    let found = within(handle.wait_for(|p| !p.discovered_devices.is_empty())).await?;
    let reader = found.discovered_devices[0].clone();
    info!("found reader {}", reader.display_name());

    handle.select_device(reader.device_id).await?;
    let connected = within(handle.wait_for(|p| p.connection_state.is_connected())).await?;
    info!("{}", connected.connection_text);

    let generation = handle.start_transaction(kind, amount).await?;
    info!("{kind} submitted as transaction {generation}");

    let finished = within(handle.wait_for(|p| p.transaction_status.is_terminal())).await?;
    match &finished.transaction_status {
        TransactionStatus::Success(transfer_id) => info!("approved, transfer {transfer_id}"),
        TransactionStatus::Failed(reason) => warn!("declined: {reason}"),
        _ => {}
    }

    within(handle.wait_for(|p| p.transaction_status == TransactionStatus::Idle)).await?;
    info!("status reset to idle after {AUTO_RESET_DELAY:?}");

    handle.disconnect().await?;
    Ok(())
}

async fn within<T, E>(step: impl std::future::Future<Output = Result<T, E>>) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let result = tokio::time::timeout(STEP_TIMEOUT, step)
        .await
        .context("reader did not respond in time")?;
    Ok(result?)
}

fn print_activity_log(handle: &TerminalHandle) {
    for line in handle.projection().log {
        println!("{}  {}", line.at.format("%H:%M:%S%.3f"), line.message);
    }
}
