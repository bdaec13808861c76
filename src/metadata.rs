use crate::error::{ResolveError, RpcError};
use crate::events::IERC20::{balanceOfCall, decimalsCall, symbolCall};
use crate::rpc::{ChainReader, cancellable};
use alloy::sol_types::SolCall;
use alloy_primitives::{Address, U256, address};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Static corrections for contracts whose on-chain metadata is missing or broken.
///
/// Symbols listed here replace the `symbol()` call entirely. Decimals listed
/// here are only used when the `decimals()` call fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    symbols: HashMap<Address, String>,
    decimals: HashMap<Address, u8>,
}

impl MetadataOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Known mainnet contracts whose `symbol()` does not ABI-decode as a string.
    pub fn builtin() -> Self {
        Self::empty().with_symbol(address!("0x86Fa049857E0209aa7D9e616F7eb3b3B78ECfdb0"), "EOS")
    }

    pub fn with_symbol(mut self, contract: Address, symbol: impl Into<String>) -> Self {
        self.symbols.insert(contract, symbol.into());
        self
    }

    pub fn with_decimals(mut self, contract: Address, decimals: u8) -> Self {
        self.decimals.insert(contract, decimals);
        self
    }

    pub fn symbol(&self, contract: &Address) -> Option<&str> {
        self.symbols.get(contract).map(String::as_str)
    }

    pub fn decimals(&self, contract: &Address) -> Option<u8> {
        self.decimals.get(contract).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

pub struct MetadataResolver<'a, R> {
    reader: &'a R,
    overrides: MetadataOverrides,
}

async fn call_contract<R, C>(reader: &R, contract: Address, call: C) -> Result<C::Return, RpcError>
where
    R: ChainReader,
    C: SolCall,
{
    let output = reader.call(contract, call.abi_encode().into()).await?;
    Ok(C::abi_decode_returns(&output)?)
}

impl<'a, R: ChainReader> MetadataResolver<'a, R> {
    pub fn new(reader: &'a R, overrides: MetadataOverrides) -> Self {
        Self { reader, overrides }
    }

    pub async fn resolve(
        &self,
        contract: Address,
        cancel: &CancellationToken,
    ) -> Result<TokenMetadata, ResolveError> {
        let symbol = self.symbol(contract, cancel).await?;
        let decimals = self.decimals(contract, cancel).await?;
        info!("Resolved {:?}: symbol={} decimals={}", contract, symbol, decimals);
        Ok(TokenMetadata { symbol, decimals })
    }

    pub async fn symbol(
        &self,
        contract: Address,
        cancel: &CancellationToken,
    ) -> Result<String, ResolveError> {
        if let Some(symbol) = self.overrides.symbol(&contract) {
            debug!("Using symbol override {} for {:?}", symbol, contract);
            return Ok(symbol.to_string());
        }

        cancellable(cancel, call_contract(self.reader, contract, symbolCall {}))
            .await
            .map_err(|source| ResolveError::MetadataUnavailable {
                contract,
                method: "symbol",
                source,
            })
    }

    pub async fn decimals(
        &self,
        contract: Address,
        cancel: &CancellationToken,
    ) -> Result<u8, ResolveError> {
        let reply = cancellable(cancel, call_contract(self.reader, contract, decimalsCall {}))
            .await
            .and_then(|raw| {
                u8::try_from(raw)
                    .map_err(|_| RpcError::Other(format!("decimals() out of range: {raw}")))
            });

        match reply {
            Ok(decimals) => Ok(decimals),
            Err(RpcError::Cancelled) => Err(ResolveError::MetadataUnavailable {
                contract,
                method: "decimals",
                source: RpcError::Cancelled,
            }),
            Err(source) => match self.overrides.decimals(&contract) {
                Some(decimals) => {
                    debug!(
                        "decimals() failed for {:?} ({}), using override {}",
                        contract, source, decimals
                    );
                    Ok(decimals)
                }
                None => Err(ResolveError::MetadataUnavailable {
                    contract,
                    method: "decimals",
                    source,
                }),
            },
        }
    }

    /// Raw `balanceOf(wallet)`. Bounded only by the connection's own request timeout.
    pub async fn balance_of(&self, contract: Address, wallet: Address) -> Result<U256, ResolveError> {
        call_contract(self.reader, contract, balanceOfCall { account: wallet })
            .await
            .map_err(|source| ResolveError::Call {
                contract,
                method: "balanceOf",
                source,
            })
    }

    pub async fn native_balance(&self, wallet: Address) -> Result<U256, ResolveError> {
        self.reader
            .native_balance(wallet)
            .await
            .map_err(|source| ResolveError::Call {
                contract: wallet,
                method: "eth_getBalance",
                source,
            })
    }
}
