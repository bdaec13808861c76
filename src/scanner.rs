use crate::error::{RpcError, ScanError};
use crate::events::TRANSFER_SIGNATURE_HASH;
use crate::rpc::{ChainReader, cancellable};
use alloy::dyn_abi::{DynSolValue, EventExt};
use alloy::json_abi::{Event, JsonAbi};
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, U256};
use futures::Stream;
use futures::stream;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inclusive block range covered by a single `eth_getLogs` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub end: u64,
}

impl Window {
    pub fn contains(&self, block_number: u64) -> bool {
        (self.start..=self.end).contains(&block_number)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Tiles `[from_block, to_block]` into consecutive windows of at most `size` blocks.
#[derive(Debug, Clone)]
pub struct Windows {
    cursor: Option<u64>,
    to_block: u64,
    size: u64,
}

impl Windows {
    pub fn new(from_block: u64, to_block: u64, size: u64) -> Result<Self, ScanError> {
        if size == 0 || from_block > to_block {
            return Err(ScanError::InvalidRange {
                from_block,
                to_block,
                window_size: size,
            });
        }
        Ok(Windows {
            cursor: Some(from_block),
            to_block,
            size,
        })
    }
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let start = self.cursor?;
        let end = start.saturating_add(self.size - 1).min(self.to_block);
        self.cursor = if end == self.to_block { None } else { Some(end + 1) };
        Some(Window { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub block_number: u64,
    pub block_hash: B256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub log_index: Option<u64>,
    pub transaction_hash: Option<B256>,
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{:?},{},{},{}",
            self.block_number, self.block_hash, self.from, self.to, self.value
        )
    }
}

enum ScanState {
    Pending,
    Decoded(VecDeque<TransferRecord>),
    Done,
}

pub struct TransferScanner<'a, R> {
    reader: &'a R,
    event: Event,
    contract: Address,
}

impl<'a, R: ChainReader> TransferScanner<'a, R> {
    pub fn new(reader: &'a R, abi: &JsonAbi, contract: Address) -> Result<Self, ScanError> {
        let event = abi
            .event("Transfer")
            .and_then(|events| {
                events
                    .iter()
                    .find(|event| !event.anonymous && event.selector() == TRANSFER_SIGNATURE_HASH)
            })
            .cloned()
            .ok_or(ScanError::MissingTransferEvent)?;

        Ok(TransferScanner {
            reader,
            event,
            contract,
        })
    }

    /// Lazily scan `[from_block, to_block]` for Transfer events, one window at a time.
    ///
    /// The stream yields records in node order and ends right after the first
    /// error. Each call starts a fresh scan from `from_block`.
    pub fn scan(
        &self,
        from_block: u64,
        to_block: u64,
        window_size: u64,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<TransferRecord, ScanError>> + '_, ScanError> {
        let windows = Windows::new(from_block, to_block, window_size)?;
        info!(
            "Scanning {:?} for transfers in blocks {} to {} (window {})",
            self.contract, from_block, to_block, window_size
        );

        Ok(stream::unfold(
            (windows, ScanState::Pending),
            move |(mut windows, mut state)| {
                let cancel = cancel.clone();
                async move {
                    loop {
                        match state {
                            ScanState::Done => return None,
                            ScanState::Decoded(ref mut records) => {
                                if let Some(record) = records.pop_front() {
                                    return Some((Ok(record), (windows, state)));
                                }
                                state = ScanState::Pending;
                            }
                            ScanState::Pending => {
                                let Some(window) = windows.next() else {
                                    debug!("Scan of {:?} complete", self.contract);
                                    return None;
                                };
                                match self.scan_window(window, &cancel).await {
                                    Ok(records) => state = ScanState::Decoded(records.into()),
                                    Err(e) => return Some((Err(e), (windows, ScanState::Done))),
                                }
                            }
                        }
                    }
                }
            },
        ))
    }

    async fn scan_window(
        &self,
        window: Window,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransferRecord>, ScanError> {
        let logs = self.query_window(window, cancel).await?;
        let records = self.decode_window(window, &logs)?;
        info!(
            "Decoded {} transfers from {} logs in blocks {}",
            records.len(),
            logs.len(),
            window
        );
        Ok(records)
    }

    async fn query_window(
        &self,
        window: Window,
        cancel: &CancellationToken,
    ) -> Result<Vec<Log>, ScanError> {
        if cancel.is_cancelled() {
            return Err(ScanError::ScanInterrupted {
                window,
                source: RpcError::Cancelled,
            });
        }

        cancellable(
            cancel,
            self.reader.filter_logs(window.start, window.end, self.contract),
        )
        .await
        .map_err(|source| {
            warn!("Log query for blocks {} failed: {}", window, source);
            ScanError::ScanInterrupted { window, source }
        })
    }

    fn decode_window(&self, window: Window, logs: &[Log]) -> Result<Vec<TransferRecord>, ScanError> {
        let mut records = Vec::with_capacity(logs.len());
        for log in logs {
            if log.topics().first() != Some(&TRANSFER_SIGNATURE_HASH) {
                continue;
            }
            if let Some(record) = self.decode_transfer(window, log)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn decode_transfer(&self, window: Window, log: &Log) -> Result<Option<TransferRecord>, ScanError> {
        let failed = |reason: String| ScanError::DecodeFailed {
            block_number: log.block_number,
            log_index: log.log_index,
            reason,
        };

        let block_number = log
            .block_number
            .ok_or_else(|| failed("log has no block number".to_string()))?;
        if !window.contains(block_number) {
            warn!(
                "Node returned log from block {} outside requested blocks {}, skipping",
                block_number, window
            );
            return Ok(None);
        }
        let block_hash = log
            .block_hash
            .ok_or_else(|| failed("log has no block hash".to_string()))?;

        let decoded = self
            .event
            .decode_log(log.data())
            .map_err(|e| failed(e.to_string()))?;

        let from = decoded
            .indexed
            .first()
            .and_then(DynSolValue::as_address)
            .ok_or_else(|| failed("missing indexed `from` address".to_string()))?;
        let to = decoded
            .indexed
            .get(1)
            .and_then(DynSolValue::as_address)
            .ok_or_else(|| failed("missing indexed `to` address".to_string()))?;
        let value = decoded
            .body
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_else(|| failed("missing uint256 `value`".to_string()))?;

        Ok(Some(TransferRecord {
            block_number,
            block_hash,
            from,
            to,
            value,
            log_index: log.log_index,
            transaction_hash: log.transaction_hash,
        }))
    }
}
