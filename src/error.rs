use crate::scanner::Window;
use alloy::transports::TransportError;
use alloy_primitives::Address;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request against the node.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("malformed call result: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{method}() unavailable for contract {contract}")]
    MetadataUnavailable {
        contract: Address,
        method: &'static str,
        #[source]
        source: RpcError,
    },

    #[error("{method} failed for {contract}")]
    Call {
        /// Target of the read; the wallet itself for `eth_getBalance`.
        contract: Address,
        method: &'static str,
        #[source]
        source: RpcError,
    },
}

#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to resolve token balance for {contract}")]
    ResolutionFailed {
        contract: Address,
        #[source]
        source: ResolveError,
    },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid scan range {from_block}..={to_block} with window size {window_size}")]
    InvalidRange {
        from_block: u64,
        to_block: u64,
        window_size: u64,
    },

    #[error("ABI does not describe Transfer(address,address,uint256)")]
    MissingTransferEvent,

    #[error("log query failed for blocks {window}")]
    ScanInterrupted {
        window: Window,
        #[source]
        source: RpcError,
    },

    #[error("failed to decode Transfer log (block {block_number:?}, log index {log_index:?}): {reason}")]
    DecodeFailed {
        block_number: Option<u64>,
        log_index: Option<u64>,
        reason: String,
    },
}
