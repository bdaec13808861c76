use alloy_primitives::U256;

/// Render a raw on-chain amount as a fixed-point decimal string with
/// `decimals` places. An all-zero fraction collapses to a single `0`,
/// any other fraction is printed with every place kept.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let scale = usize::from(decimals);
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (integer, fraction) = padded.split_at(padded.len() - scale);

    let integer = integer.trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };

    if fraction.bytes().all(|b| b == b'0') {
        format!("{integer}.0")
    } else {
        format!("{integer}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    // Inverse of format_amount: rescale the fixed-point string by 10^decimals.
    fn parse_scaled(s: &str, decimals: u8) -> U256 {
        let (integer, fraction) = s.split_once('.').unwrap_or((s, ""));
        let scale = U256::from(10u8).pow(U256::from(decimals));
        let fraction_scale = U256::from(10u8).pow(U256::from(usize::from(decimals) - fraction.len()));
        let fraction = if fraction.is_empty() { U256::ZERO } else { amount(fraction) };
        amount(integer) * scale + fraction * fraction_scale
    }

    #[test]
    fn zero_decimals_prints_plain_digits() {
        assert_eq!(format_amount(U256::from(123456789u64), 0), "123456789");
        assert_eq!(format_amount(U256::ZERO, 0), "0");
    }

    #[test]
    fn zero_balance_collapses_fraction() {
        assert_eq!(format_amount(U256::ZERO, 18), "0.0");
        assert_eq!(format_amount(U256::ZERO, 1), "0.0");
        assert_eq!(format_amount(U256::ZERO, 6), "0.0");
    }

    #[test]
    fn small_amounts_keep_full_precision() {
        assert_eq!(format_amount(amount("72094368689712"), 18), "0.000072094368689712");
        assert_eq!(format_amount(amount("123"), 18), "0.000000000000000123");
        assert_eq!(format_amount(amount("1142400000000001"), 18), "0.001142400000000001");
    }

    #[test]
    fn whole_amounts_collapse_and_trailing_zeros_survive() {
        assert_eq!(format_amount(amount("1000000000000000000"), 18), "1.0");
        assert_eq!(format_amount(amount("600000000000000000000000"), 18), "600000.0");
        assert_eq!(format_amount(amount("1500000"), 6), "1.500000");
        assert_eq!(format_amount(amount("1020095885777777767"), 18), "1.020095885777777767");
    }

    #[test]
    fn decimals_beyond_digit_count() {
        assert_eq!(format_amount(U256::from(5u8), 3), "0.005");
        assert_eq!(format_amount(U256::MAX, 255).len(), 257);
    }

    #[test]
    fn output_rescales_back_to_input() {
        let cases = [
            ("0", 18),
            ("1", 1),
            ("10", 1),
            ("72094368689712", 18),
            ("1142400000000001", 18),
            ("600000000000000000000000", 18),
            ("123456789", 0),
            ("115792089237316195423570985008687907853269984665640564039457584007913129639935", 18),
        ];
        for (raw, decimals) in cases {
            let formatted = format_amount(amount(raw), decimals);
            assert_eq!(parse_scaled(&formatted, decimals), amount(raw), "{formatted}");
        }
    }
}
