use crate::events::{default_erc20_abi, parse_abi};
use crate::metadata::MetadataOverrides;
use alloy::json_abi::JsonAbi;
use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request
const DEFAULT_WINDOW_SIZE: u64 = 1000; // blocks per eth_getLogs request

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub window_size: u64,
    pub abi_path: Option<PathBuf>,
    pub overrides: MetadataOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            json_rpc_url: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: 0,
            window_size: DEFAULT_WINDOW_SIZE,
            abi_path: None,
            overrides: MetadataOverrides::builtin(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let json_rpc_url =
            std::env::var("JSON_RPC_URL").context("JSON_RPC_URL must be set in .env")?;

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.parse()
                    .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            ),
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };

        let max_retries = match std::env::var("RPC_MAX_RETRIES") {
            Ok(n) => n.parse().context("RPC_MAX_RETRIES must be a number")?,
            Err(_) => 0,
        };

        let window_size = match std::env::var("SCAN_WINDOW_SIZE") {
            Ok(n) => n.parse().context("SCAN_WINDOW_SIZE must be a number")?,
            Err(_) => DEFAULT_WINDOW_SIZE,
        };
        if window_size == 0 {
            anyhow::bail!("SCAN_WINDOW_SIZE must be at least 1");
        }

        let abi_path = std::env::var("ERC20_ABI_PATH").ok().map(PathBuf::from);

        let mut overrides = MetadataOverrides::builtin();
        if let Ok(list) = std::env::var("SYMBOL_OVERRIDES") {
            for (address, symbol) in parse_override_list(&list, "SYMBOL_OVERRIDES")? {
                overrides = overrides.with_symbol(address, symbol);
            }
        }
        if let Ok(list) = std::env::var("DECIMALS_OVERRIDES") {
            for (address, decimals) in parse_override_list(&list, "DECIMALS_OVERRIDES")? {
                let decimals = decimals
                    .parse()
                    .with_context(|| format!("Invalid decimals {decimals:?} in DECIMALS_OVERRIDES"))?;
                overrides = overrides.with_decimals(address, decimals);
            }
        }

        Ok(Config {
            json_rpc_url,
            request_timeout,
            max_retries,
            window_size,
            abi_path,
            overrides,
        })
    }

    /// The ABI descriptor used for decoding logs: the configured file, or the bundled ERC-20 ABI.
    pub fn abi(&self) -> Result<JsonAbi> {
        match &self.abi_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read ABI file {}", path.display()))?;
                parse_abi(&json).with_context(|| format!("Invalid ABI JSON in {}", path.display()))
            }
            None => default_erc20_abi().context("Bundled ERC-20 ABI is invalid"),
        }
    }
}

/// Parse `0xaddr=value,0xaddr=value` into address/value pairs.
pub fn parse_override_list(list: &str, var: &str) -> Result<Vec<(Address, String)>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (address, value) = entry
                .split_once('=')
                .with_context(|| format!("Expected address=value in {var}, got {entry:?}"))?;
            let address = Address::from_str(address.trim())
                .with_context(|| format!("Invalid address {address:?} in {var}"))?;
            Ok((address, value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn parses_override_entries_case_insensitively() {
        let entries = parse_override_list(
            "0x86fa049857e0209aa7d9e616f7eb3b3b78ecfdb0=EOS, 0x1B793E49237758dbd8b752afc9eb4b329d5da016 = MTK",
            "SYMBOL_OVERRIDES",
        )
        .unwrap();

        assert_eq!(
            entries,
            vec![
                (address!("0x86Fa049857E0209aa7D9e616F7eb3b3B78ECfdb0"), "EOS".to_string()),
                (address!("0x1b793e49237758dbd8b752afc9eb4b329d5da016"), "MTK".to_string()),
            ]
        );
    }

    #[test]
    fn empty_override_list_is_empty() {
        assert!(parse_override_list("", "SYMBOL_OVERRIDES").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_override_entries() {
        assert!(parse_override_list("0x86fa049857e0209aa7d9e616f7eb3b3b78ecfdb0", "X").is_err());
        assert!(parse_override_list("0xnothex=EOS", "X").is_err());
    }

    #[test]
    fn default_config_uses_bundled_abi() {
        let abi = Config::default().abi().unwrap();
        assert!(abi.event("Transfer").is_some());
    }

    #[test]
    fn missing_abi_file_is_an_error() {
        let config = Config {
            abi_path: Some(PathBuf::from("/nonexistent/erc20.json")),
            ..Config::default()
        };
        assert!(config.abi().is_err());
    }
}
