//! In-memory node used by the integration tests.
#![allow(dead_code)]

use alloy::rpc::types::Log;
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use alloy_primitives::{Address, B256, Bytes, LogData, U256};
use erc20_scan::RpcError;
use erc20_scan::events::IERC20;
use erc20_scan::rpc::ChainReader;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const CONTRACT: Address = Address::repeat_byte(0xc0);
pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);

pub fn block_hash(block_number: u64) -> B256 {
    B256::left_padding_from(&block_number.to_be_bytes())
}

pub fn transfer_log(block_number: u64, log_index: u64, from: Address, to: Address, value: u64) -> Log {
    raw_log(
        block_number,
        log_index,
        vec![IERC20::Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
        U256::from(value).abi_encode(),
    )
}

pub fn approval_log(block_number: u64, log_index: u64, owner: Address, spender: Address) -> Log {
    raw_log(
        block_number,
        log_index,
        vec![IERC20::Approval::SIGNATURE_HASH, owner.into_word(), spender.into_word()],
        U256::from(1u64).abi_encode(),
    )
}

pub fn raw_log(block_number: u64, log_index: u64, topics: Vec<B256>, data: Vec<u8>) -> Log {
    Log {
        inner: alloy_primitives::Log {
            address: CONTRACT,
            data: LogData::new_unchecked(topics, data.into()),
        },
        block_hash: Some(block_hash(block_number)),
        block_number: Some(block_number),
        log_index: Some(log_index),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct MockChain {
    logs: Vec<Log>,
    failing_blocks: Vec<u64>,
    ignore_range: bool,
    responses: HashMap<(Address, [u8; 4]), Bytes>,
    native: HashMap<Address, U256>,
    latest: u64,
    queries: Mutex<Vec<(u64, u64)>>,
    calls: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    /// Any log query whose range covers `block_number` fails.
    pub fn failing_at(mut self, block_number: u64) -> Self {
        self.failing_blocks.push(block_number);
        self
    }

    /// Return every log regardless of the requested range, like a misbehaving node.
    pub fn ignoring_range(mut self) -> Self {
        self.ignore_range = true;
        self
    }

    pub fn with_latest(mut self, latest: u64) -> Self {
        self.latest = latest;
        self
    }

    pub fn with_response<C: SolCall>(mut self, contract: Address, output: Vec<u8>) -> Self {
        self.responses.insert((contract, C::SELECTOR), output.into());
        self
    }

    pub fn with_token(self, contract: Address, symbol: &str, decimals: u8) -> Self {
        self.with_response::<IERC20::symbolCall>(contract, symbol.to_string().abi_encode())
            .with_response::<IERC20::decimalsCall>(contract, U256::from(decimals).abi_encode())
    }

    pub fn with_balance(self, contract: Address, balance: U256) -> Self {
        self.with_response::<IERC20::balanceOfCall>(contract, balance.abi_encode())
    }

    pub fn with_native(mut self, wallet: Address, balance: U256) -> Self {
        self.native.insert(wallet, balance);
        self
    }

    pub fn queries(&self) -> Vec<(u64, u64)> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChainReader for MockChain {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| RpcError::Other("short calldata".to_string()))?;
        self.responses
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| RpcError::Other("execution reverted".to_string()))
    }

    async fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> Result<Vec<Log>, RpcError> {
        self.queries.lock().unwrap().push((from_block, to_block));

        if self
            .failing_blocks
            .iter()
            .any(|b| (from_block..=to_block).contains(b))
        {
            return Err(RpcError::Other("query returned more than 10000 results".to_string()));
        }

        Ok(self
            .logs
            .iter()
            .filter(|log| log.address() == address)
            .filter(|log| {
                self.ignore_range
                    || log
                        .block_number
                        .is_some_and(|n| (from_block..=to_block).contains(&n))
            })
            .cloned()
            .collect())
    }

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.native.get(&address).copied().unwrap_or_default())
    }

    async fn latest_block(&self) -> Result<u64, RpcError> {
        Ok(self.latest)
    }
}
