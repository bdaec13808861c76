use crate::config::Config;
use crate::error::RpcError;
use alloy::eips::BlockId;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::transports::TransportError;
use alloy_primitives::{Address, Bytes, U256};
use anyhow::Result;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read-only view of a node that the resolver and scanner run against.
pub trait ChainReader: Send + Sync {
    /// `eth_call` against the latest block.
    fn call(&self, to: Address, input: Bytes)
    -> impl Future<Output = Result<Bytes, RpcError>> + Send;

    /// `eth_getLogs` for one contract over an inclusive block range.
    fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> impl Future<Output = Result<Vec<Log>, RpcError>> + Send;

    fn native_balance(&self, address: Address)
    -> impl Future<Output = Result<U256, RpcError>> + Send;

    fn latest_block(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;
}

/// Race `fut` against `cancel`, returning `RpcError::Cancelled` if the token fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RpcError::Cancelled),
        result = fut => result,
    }
}

#[derive(Clone)]
pub struct RpcClient {
    provider: DynProvider,
    url: String,
    request_timeout: Duration,
    max_retries: usize,
}

impl RpcClient {
    pub fn new(config: &Config) -> Result<Self> {
        let parsed_url = config
            .json_rpc_url
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", config.json_rpc_url))?;
        let provider = ProviderBuilder::new().connect_http(parsed_url).erased();

        Ok(RpcClient {
            provider,
            url: config.json_rpc_url.clone(),
            request_timeout: config.request_timeout,
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    // Yields nothing when retries are disabled, so the request runs exactly once.
    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> + Send + use<> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    async fn request<T, F, Fut>(&self, method: &'static str, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let request_timeout = self.request_timeout;
        let url = self.url.as_str();

        Retry::start(self.get_retry_strategy(), || {
            let fut = op();
            async move {
                match timeout(request_timeout, fut).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => {
                        warn!("RPC error on {} during {}: {}", url, method, e);
                        Err(RpcError::Transport(e))
                    }
                    Err(_) => {
                        warn!(
                            "{} timed out after {} seconds on {}",
                            method,
                            request_timeout.as_secs(),
                            url
                        );
                        Err(RpcError::Timeout(request_timeout))
                    }
                }
            }
        })
        .await
    }
}

impl ChainReader for RpcClient {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default().to(to).input(input.into());
        self.request("eth_call", || {
            self.provider
                .call(tx.clone())
                .block(BlockId::latest())
                .into_future()
        })
        .await
    }

    async fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> Result<Vec<Log>, RpcError> {
        debug!("eth_getLogs {:?} blocks {}-{}", address, from_block, to_block);
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);

        self.request("eth_getLogs", || self.provider.get_logs(&filter).into_future())
            .await
    }

    async fn native_balance(&self, address: Address) -> Result<U256, RpcError> {
        self.request("eth_getBalance", || {
            self.provider.get_balance(address).into_future()
        })
        .await
    }

    async fn latest_block(&self) -> Result<u64, RpcError> {
        self.request("eth_blockNumber", || {
            self.provider.get_block_number().into_future()
        })
        .await
    }
}
