use anyhow::Result;
use clap::{Parser, Subcommand};
use erc20_scan::config::Config;
use erc20_scan::query::commands::{TransferQuery, cmd_balance, cmd_transfers};
use erc20_scan::query::formatters::OutputFormat;
use erc20_scan::rpc::RpcClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Query ERC20 balances and Transfer history from a JSON-RPC node", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Balance {
        contract: String,
        wallet: String,
    },
    Transfers {
        contract: String,

        #[arg(long)]
        from_block: u64,

        /// Defaults to the node's latest block
        #[arg(long)]
        to_block: Option<u64>,

        /// Blocks per eth_getLogs request; defaults to SCAN_WINDOW_SIZE
        #[arg(long)]
        window: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    let config = Config::from_env()?;
    let client = RpcClient::new(&config)?;
    info!("Using RPC endpoint {}", client.url());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping at the current window");
            on_interrupt.cancel();
        }
    });

    let result = match cli.command {
        Commands::Balance { contract, wallet } => {
            cmd_balance(&client, &config, &contract, &wallet, format, &cancel).await
        }
        Commands::Transfers {
            contract,
            from_block,
            to_block,
            window,
        } => {
            let query = TransferQuery {
                contract,
                from_block,
                to_block,
                window_size: window,
            };
            cmd_transfers(&client, &config, query, format, &cancel).await
        }
    };

    if let Err(e) = &result {
        error!("Query failed: {:#}", e);
    }
    result
}
