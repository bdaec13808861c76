pub mod balance;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod metadata;
pub mod query;
pub mod rpc;
pub mod scanner;

pub use balance::{TokenBalance, TokenBalanceService};
pub use error::{BalanceError, ResolveError, RpcError, ScanError};
pub use format::format_amount;
pub use metadata::{MetadataOverrides, MetadataResolver, TokenMetadata};
pub use rpc::{ChainReader, RpcClient};
pub use scanner::{TransferRecord, TransferScanner, Window};
