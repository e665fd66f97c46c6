//! curve-buyer command line
//!
//! Reads the live quote of a bonding-curve token sale, keeps it refreshed,
//! and can run purchases against an in-process simulated wallet.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curve_buyer::{
    endpoints, Config, HttpViewClient, PurchaseAttempt, PurchaseCoordinator, RoundOutcome,
    SimulatedWallet, SkipReason, ViewClient, WalletCapability,
};

type Coordinator = PurchaseCoordinator<dyn ViewClient, dyn WalletCapability>;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch price and supply once and print the quote
    Quote {
        #[arg(short, long, default_value = "1")]
        quantity: String,
    },
    /// Keep the quote refreshed until Ctrl-C
    Watch {
        #[arg(short, long, default_value = "1")]
        quantity: String,
    },
    /// Quote, then submit one purchase
    Buy {
        #[arg(short, long, default_value = "1")]
        quantity: String,

        /// Sign with an in-process simulated wallet; nothing reaches the chain
        #[arg(long)]
        simulate: bool,

        /// Account address reported by the simulated wallet
        #[arg(long, default_value = "0x0000000000000000000000000000000000000000000000000000000000000001")]
        account: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting curve-buyer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    config.validate().context("Invalid configuration")?;
    info!(
        node = %config.node.url,
        contract = %config.contract.address,
        token = %config.contract.token_symbol,
        "Configuration loaded"
    );

    let view: Arc<dyn ViewClient> =
        Arc::new(HttpViewClient::from_config(&config).context("Failed to build HTTP client")?);

    match args.command {
        Command::Quote { quantity } => {
            let coordinator = Coordinator::new(view, Arc::new(SimulatedWallet::new("")), &config);
            coordinator.set_quantity_input(&quantity).await;
            print!("{}", coordinator.snapshot());
        }
        Command::Watch { quantity } => {
            let coordinator = Coordinator::new(view, Arc::new(SimulatedWallet::new("")), &config);
            if config.monitoring.enable_metrics {
                let port = config.monitoring.metrics_port;
                info!("Starting metrics server on port {}", port);
                tokio::spawn(async move {
                    if let Err(e) = endpoints::endpoint_server(port).await {
                        error!("Metrics server error: {}", e);
                    }
                });
            }
            coordinator.set_quantity_input(&quantity).await;
            run_watch_loop(&coordinator, config.purchase.refresh_interval_secs).await?;
        }
        Command::Buy {
            quantity,
            simulate,
            account,
        } => {
            if !simulate {
                bail!("No wallet adapter is available from the command line; rerun with --simulate");
            }
            let wallet: Arc<dyn WalletCapability> = Arc::new(SimulatedWallet::connected(account));
            let coordinator = Coordinator::new(view, wallet, &config);

            if coordinator.set_quantity_input(&quantity).await == RoundOutcome::Unavailable {
                warn!("Quote unavailable, purchase will use the fallback payment");
            }
            match coordinator.buy_current_quantity().await {
                PurchaseAttempt::Succeeded { hash } => info!(hash = %hash, "Purchase submitted"),
                PurchaseAttempt::Failed { message } => error!("{}", message),
                PurchaseAttempt::Skipped(SkipReason::NotConnected) => warn!("Wallet not connected"),
                PurchaseAttempt::Skipped(SkipReason::Busy) => warn!("Another purchase is in flight"),
            }
            print!("{}", coordinator.snapshot());
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "curve_buyer=debug,info"
    } else {
        "curve_buyer=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file, falling back to defaults plus environment
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(Config::from_env())
    }
}

async fn run_watch_loop(coordinator: &Coordinator, interval_secs: u64) -> Result<()> {
    info!("Watching quote every {}s", interval_secs);
    print!("{}", coordinator.snapshot());

    let mut refresh = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    // First tick fires immediately; the initial round already ran
    refresh.tick().await;

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                coordinator.refresh().await;
                print!("{}", coordinator.snapshot());
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}
