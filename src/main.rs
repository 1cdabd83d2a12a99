//! Swap Sender CLI - send signed transactions and query the swap API

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use swap_sender::metrics::MetricsServer;
use swap_sender::{
    LedgerClient, RpcLedgerClient, SendOptions, SerializedTransaction, Settings, SwapApiClient,
    TransactionSender, TransactionSignature,
};

#[derive(Parser)]
#[command(name = "swap-sender")]
#[command(about = "Broadcast signed transactions and wait for confirmation", long_about = None)]
struct Cli {
    /// Config file (defaults to $SWAP_SENDER_CONFIG or config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a signed transaction and wait for it to land
    Send {
        /// Base64 encoded signed transaction
        #[arg(long)]
        tx: String,
        /// Transaction signature (base58)
        #[arg(long)]
        signature: String,
        /// Return after the first accepted submission
        #[arg(long)]
        skip_confirmation: bool,
    },
    /// Fetch a swap quote
    Rate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 10.0)]
        slippage: f64,
    },
    /// Print the current block height of the configured RPC
    Height,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    info!(
        "Loaded configuration with {} RPC endpoint(s)",
        settings.rpc.urls.len()
    );

    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let result = run(cli.command, &settings).await;

    if let Some(h) = metrics_handle {
        h.abort();
    }

    result
}

async fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Send {
            tx,
            signature,
            skip_confirmation,
        } => {
            let ledger = Arc::new(RpcLedgerClient::new(settings.rpc.clone())?);
            let transaction = SerializedTransaction::from_base64(&tx)?;

            let mut options = SendOptions::from(&settings.sender);
            if skip_confirmation {
                options = options.with_skip_confirmation_check(true);
            }

            let expiry = ledger
                .get_latest_blockhash()
                .await
                .context("Failed to fetch latest blockhash")?;

            let sender = TransactionSender::new(ledger);
            let confirmed = sender
                .send(
                    transaction,
                    TransactionSignature::new(signature),
                    expiry,
                    &options,
                )
                .await?;

            println!("{}", confirmed);
        }
        Commands::Rate {
            from,
            to,
            amount,
            slippage,
        } => {
            let api = SwapApiClient::new(&settings.swap_api)?;
            let quote = api.get_rate(&from, &to, amount, slippage).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Commands::Height => {
            let ledger = RpcLedgerClient::new(settings.rpc.clone())?;
            if !ledger.health_check().await {
                anyhow::bail!("RPC endpoint {} is unhealthy", ledger.endpoint());
            }
            let height = ledger.get_block_height().await?;
            println!("{}", height);
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swap_sender=debug,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
