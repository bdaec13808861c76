use crate::error::BalanceError;
use crate::format::format_amount;
use crate::metadata::{MetadataOverrides, MetadataResolver};
use crate::rpc::ChainReader;
use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::info;

const ETHER_DECIMALS: u8 = 18;

/// One token balance lookup. Built once per query and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    contract: Address,
    wallet: Address,
    symbol: String,
    decimals: u8,
    balance: U256,
    eth: U256,
}

impl TokenBalance {
    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn wallet(&self) -> Address {
        self.wallet
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Raw balance in the token's smallest unit.
    pub fn balance(&self) -> U256 {
        self.balance
    }

    /// The wallet's native balance in wei.
    pub fn eth(&self) -> U256 {
        self.eth
    }

    pub fn balance_string(&self) -> String {
        format_amount(self.balance, self.decimals)
    }

    pub fn eth_string(&self) -> String {
        format_amount(self.eth, ETHER_DECIMALS)
    }
}

/// Parse and validate a (contract, wallet) pair before touching the network.
pub fn parse_pair(contract: &str, wallet: &str) -> Result<(Address, Address), BalanceError> {
    let contract_address = Address::from_str(contract.trim())
        .map_err(|_| BalanceError::InvalidAddress(format!("contract {contract:?}")))?;
    let wallet_address = Address::from_str(wallet.trim())
        .map_err(|_| BalanceError::InvalidAddress(format!("wallet {wallet:?}")))?;

    if contract_address == wallet_address {
        return Err(BalanceError::InvalidAddress(format!(
            "wallet {wallet_address} is the token contract itself"
        )));
    }

    Ok((contract_address, wallet_address))
}

pub struct TokenBalanceService<'a, R> {
    resolver: MetadataResolver<'a, R>,
}

impl<'a, R: ChainReader> TokenBalanceService<'a, R> {
    pub fn new(reader: &'a R, overrides: MetadataOverrides) -> Self {
        Self {
            resolver: MetadataResolver::new(reader, overrides),
        }
    }

    pub async fn get_balance(
        &self,
        contract: &str,
        wallet: &str,
        cancel: &CancellationToken,
    ) -> Result<TokenBalance, BalanceError> {
        let (contract, wallet) = parse_pair(contract, wallet)?;
        info!("Fetching balance of {:?} for wallet {:?}", contract, wallet);

        let wrap = |source| BalanceError::ResolutionFailed { contract, source };

        let metadata = self.resolver.resolve(contract, cancel).await.map_err(wrap)?;
        let balance = self.resolver.balance_of(contract, wallet).await.map_err(wrap)?;
        let eth = self.resolver.native_balance(wallet).await.map_err(wrap)?;

        Ok(TokenBalance {
            contract,
            wallet,
            symbol: metadata.symbol,
            decimals: metadata.decimals,
            balance,
            eth,
        })
    }
}
