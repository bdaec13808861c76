use crate::balance::TokenBalance;
use crate::format::format_amount;
use crate::scanner::TransferRecord;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub const TRANSFER_CSV_HEADER: [&str; 5] = ["block_number", "block_hash", "from", "to", "value"];

pub fn format_balance(balance: &TokenBalance, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["Field", "Value"]);

            table.add_row(vec![Cell::new("Contract"), Cell::new(balance.contract())]);
            table.add_row(vec![Cell::new("Wallet"), Cell::new(balance.wallet())]);
            table.add_row(vec![Cell::new("Symbol"), Cell::new(balance.symbol())]);
            table.add_row(vec![Cell::new("Decimals"), Cell::new(balance.decimals())]);
            table.add_row(vec![Cell::new("Balance"), Cell::new(balance.balance_string())]);
            table.add_row(vec![Cell::new("Balance (raw)"), Cell::new(balance.balance())]);
            table.add_row(vec![Cell::new("ETH"), Cell::new(balance.eth_string())]);
            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "contract": balance.contract().to_string(),
            "wallet": balance.wallet().to_string(),
            "symbol": balance.symbol(),
            "decimals": balance.decimals(),
            "balance": balance.balance_string(),
            "balance_raw": balance.balance().to_string(),
            "eth": balance.eth_string(),
        }))
        .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record([
                "contract", "wallet", "symbol", "decimals", "balance", "balance_raw", "eth",
            ]);
            let _ = wtr.write_record([
                balance.contract().to_string(),
                balance.wallet().to_string(),
                balance.symbol().to_string(),
                balance.decimals().to_string(),
                balance.balance_string(),
                balance.balance().to_string(),
                balance.eth_string(),
            ]);
            String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
        }
    }
}

/// Render transfers; values are shown scaled only when the token's decimals are known.
pub fn format_transfers(
    transfers: &[TransferRecord],
    decimals: Option<u8>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => format_transfers_table(transfers, decimals),
        OutputFormat::Json => format_transfers_json(transfers, decimals),
        OutputFormat::Csv => format_transfers_csv(transfers),
    }
}

fn format_transfers_table(transfers: &[TransferRecord], decimals: Option<u8>) -> String {
    if transfers.is_empty() {
        return "No transfers found.".to_string();
    }

    let mut header = vec!["Block", "Block Hash", "From", "To", "Value (raw)"];
    if decimals.is_some() {
        header.push("Value");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);

    for transfer in transfers {
        let mut row = vec![
            Cell::new(transfer.block_number),
            Cell::new(shorten_hash(&format!("{:?}", transfer.block_hash))),
            Cell::new(transfer.from),
            Cell::new(transfer.to),
            Cell::new(transfer.value),
        ];
        if let Some(decimals) = decimals {
            row.push(Cell::new(format_amount(transfer.value, decimals)));
        }
        table.add_row(row);
    }

    table.to_string()
}

fn format_transfers_json(transfers: &[TransferRecord], decimals: Option<u8>) -> String {
    let json_transfers: Vec<_> = transfers
        .iter()
        .map(|t| {
            json!({
                "block_number": t.block_number,
                "block_hash": format!("{:?}", t.block_hash),
                "transaction_hash": t.transaction_hash.map(|h| format!("{h:?}")),
                "log_index": t.log_index,
                "from": t.from.to_string(),
                "to": t.to.to_string(),
                "value_raw": t.value.to_string(),
                "value": decimals.map(|d| format_amount(t.value, d)),
            })
        })
        .collect();

    serde_json::to_string_pretty(&json_transfers).unwrap_or_else(|_| "[]".to_string())
}

fn format_transfers_csv(transfers: &[TransferRecord]) -> String {
    let mut wtr = Writer::from_writer(vec![]);
    let _ = wtr.write_record(TRANSFER_CSV_HEADER);
    for transfer in transfers {
        let _ = wtr.write_record(transfer_csv_row(transfer));
    }
    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

pub fn transfer_csv_row(transfer: &TransferRecord) -> [String; 5] {
    [
        transfer.block_number.to_string(),
        format!("{:?}", transfer.block_hash),
        transfer.from.to_string(),
        transfer.to.to_string(),
        transfer.value.to_string(),
    ]
}

fn shorten_hash(hash: &str) -> String {
    format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, U256};

    fn record(block_number: u64, value: u64) -> TransferRecord {
        TransferRecord {
            block_number,
            block_hash: B256::repeat_byte(0x0f),
            from: Address::repeat_byte(0xaa),
            to: Address::repeat_byte(0xbb),
            value: U256::from(value),
            log_index: Some(0),
            transaction_hash: None,
        }
    }

    #[test]
    fn output_format_defaults_to_table() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("csv"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from("whatever"), OutputFormat::Table);
    }

    #[test]
    fn csv_rows_follow_record_order() {
        let output = format_transfers(&[record(5, 10), record(6, 20)], Some(18), OutputFormat::Csv);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "block_number,block_hash,from,to,value");
        assert!(lines[1].starts_with("5,0x0f0f"));
        assert!(lines[1].ends_with(",10"));
        assert!(lines[2].starts_with("6,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn json_scales_values_only_with_known_decimals() {
        let transfers = [record(5, 1_500_000)];
        let scaled: serde_json::Value =
            serde_json::from_str(&format_transfers(&transfers, Some(6), OutputFormat::Json)).unwrap();
        assert_eq!(scaled[0]["value"], "1.500000");
        assert_eq!(scaled[0]["value_raw"], "1500000");

        let raw: serde_json::Value =
            serde_json::from_str(&format_transfers(&transfers, None, OutputFormat::Json)).unwrap();
        assert!(raw[0]["value"].is_null());
    }

    #[test]
    fn empty_table_has_placeholder() {
        assert_eq!(format_transfers(&[], None, OutputFormat::Table), "No transfers found.");
    }

    #[test]
    fn shortens_hashes() {
        assert_eq!(shorten_hash("0x0123456789abcdef"), "0x0123...cdef");
    }
}
