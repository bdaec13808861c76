use crate::balance::TokenBalanceService;
use crate::config::Config;
use crate::metadata::MetadataResolver;
use crate::query::formatters::{
    OutputFormat, TRANSFER_CSV_HEADER, format_balance, format_transfers, transfer_csv_row,
};
use crate::rpc::ChainReader;
use crate::scanner::TransferScanner;
use alloy_primitives::Address;
use anyhow::Result;
use futures::{StreamExt, pin_mut};
use std::io::Write;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn cmd_balance<R: ChainReader>(
    reader: &R,
    config: &Config,
    contract: &str,
    wallet: &str,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let service = TokenBalanceService::new(reader, config.overrides.clone());
    let balance = service.get_balance(contract, wallet, cancel).await?;
    println!("{}", format_balance(&balance, format));
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TransferQuery {
    pub contract: String,
    pub from_block: u64,
    pub to_block: Option<u64>,
    pub window_size: Option<u64>,
}

pub async fn cmd_transfers<R: ChainReader>(
    reader: &R,
    config: &Config,
    query: TransferQuery,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let contract = Address::from_str(query.contract.trim())
        .map_err(|_| anyhow::anyhow!("Invalid contract address: {}", query.contract))?;

    let to_block = match query.to_block {
        Some(block) => block,
        None => reader.latest_block().await?,
    };
    let window_size = query.window_size.unwrap_or(config.window_size);

    let abi = config.abi()?;
    let scanner = TransferScanner::new(reader, &abi, contract)?;
    let stream = scanner.scan(query.from_block, to_block, window_size, cancel.clone())?;
    pin_mut!(stream);

    // CSV is written as records arrive; the other formats need the whole set.
    if format == OutputFormat::Csv {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(TRANSFER_CSV_HEADER)?;
        while let Some(record) = stream.next().await {
            wtr.write_record(transfer_csv_row(&record?))?;
        }
        wtr.flush()?;
        return Ok(());
    }

    let decimals = match MetadataResolver::new(reader, config.overrides.clone())
        .decimals(contract, cancel)
        .await
    {
        Ok(decimals) => Some(decimals),
        Err(e) => {
            warn!("Showing raw values only: {}", e);
            None
        }
    };

    let mut transfers = Vec::new();
    let mut failure = None;
    while let Some(record) = stream.next().await {
        match record {
            Ok(record) => transfers.push(record),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    info!("Scanned {} transfers", transfers.len());
    println!("{}", format_transfers(&transfers, decimals, format));
    std::io::stdout().flush()?;

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
