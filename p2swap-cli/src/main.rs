//! `p2swap`: swap tokens through a Permit2 quote service from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Approve Permit2 for the configured sell amount
//! p2swap approve
//!
//! # Quote, sign and broadcast a swap
//! p2swap swap --sell-amount 2500000
//!
//! # Show the account's sell-token balance
//! p2swap --config ./op.toml balance
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `p2swap.toml`)
//! - `P2SWAP_BUY_TOKEN` / `P2SWAP_SELL_AMOUNT` - Override the order section
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded before anything else.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, U256};
use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use p2swap::SwapConfig;
use p2swap_evm::{AlloyChain, ApprovalOutcome, SwapPipeline};
use p2swap_http::QuoteClient;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::Config;

/// Swap tokens through a Permit2 quote service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CONFIG", default_value = "p2swap.toml")]
    config: PathBuf,

    /// Token to buy, overriding the config file
    #[arg(long, env = "P2SWAP_BUY_TOKEN", global = true)]
    buy_token: Option<Address>,

    /// Amount to sell in the token's smallest unit, overriding the config file
    #[arg(long, env = "P2SWAP_SELL_AMOUNT", global = true)]
    sell_amount: Option<U256>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Make sure Permit2 may spend the sell amount, approving it if needed
    Approve,
    /// Quote, sign and broadcast the configured swap
    Swap,
    /// Print the account's balance of the sell token
    Balance,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("p2swap failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_from(&args.config)?;
    config.apply_overrides(args.buy_token, args.sell_amount);

    if config.private_key.is_unresolved() {
        return Err("private_key not resolved (missing env var?)".into());
    }
    if config.quote.api_key.is_unresolved() {
        return Err("quote.api_key not resolved (missing env var?)".into());
    }

    let signer: PrivateKeySigner = config
        .private_key
        .expose()
        .trim()
        .parse()
        .map_err(|e| format!("Invalid private key: {e}"))?;
    let account = signer.address();

    let mut swap_config = SwapConfig::new(config.chain_id, account).with_permit2(config.permit2);
    if let Some(explorer_url) = &config.explorer_url {
        swap_config = swap_config.with_explorer(Some(explorer_url.clone()));
    }
    tracing::info!(
        chain_id = swap_config.chain_id,
        %account,
        command = ?args.command,
        "Loaded configuration"
    );

    let rpc_url: Url = config
        .rpc_url
        .parse()
        .map_err(|e| format!("Invalid RPC URL: {e}"))?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer.clone()))
        .connect_http(rpc_url);
    let chain = AlloyChain::new(provider)
        .with_confirmations(config.confirmations)
        .with_receipt_timeout(config.receipt_timeout_secs.map(Duration::from_secs));

    let mut quotes = QuoteClient::from_base_str(&config.quote.base_url, config.quote.api_key.expose())?;
    if let Some(secs) = config.quote.timeout_secs {
        quotes = quotes.with_timeout(Duration::from_secs(secs));
    }

    let order = swap_config.order(
        config.order.sell_token,
        config.order.buy_token,
        config.order.sell_amount()?,
    );
    let pipeline = SwapPipeline::new(swap_config, quotes, chain, signer);

    match args.command {
        Command::Approve => match pipeline.approve(&order).await? {
            ApprovalOutcome::AlreadySufficient { allowance } => {
                tracing::info!(%allowance, "Sell token already approved for Permit2");
            }
            ApprovalOutcome::Approved(receipt) => {
                tracing::info!(tx = %receipt.transaction_hash, "Permit2 approved");
            }
            ApprovalOutcome::ApprovalFailed(err) => {
                tracing::warn!(error = %err, "Permit2 approval failed; a swap may revert");
            }
        },
        Command::Swap => {
            let report = pipeline.swap(&order).await?;
            match report.explorer_url {
                Some(url) => tracing::info!(
                    tx = %report.receipt.transaction_hash,
                    "See tx details at {url}"
                ),
                None => tracing::info!(tx = %report.receipt.transaction_hash, "Swap confirmed"),
            }
        }
        Command::Balance => {
            let balance = pipeline.balance(order.sell_token).await?;
            tracing::info!(token = %order.sell_token, %account, %balance, "Balance");
        }
    }

    Ok(())
}
