use ethers::types::{Address, U256};
use rust_decimal::{Decimal, RoundingStrategy};

/// Sentinel address standing in for the chain's native currency in
/// balance and order records.
pub const ETHER_ADDRESS: Address = Address::zero();

/// Fixed-point scale shared by ether and the NEX token (18 decimals).
pub const DECIMALS: u64 = 1_000_000_000_000_000_000;

fn scale() -> Decimal {
    Decimal::from(DECIMALS)
}

/// Convert raw wei units to display units.
///
/// A zero input means "no value yet" and passes through as `None`;
/// callers must not rely on telling 0 apart from unset here.
pub fn to_display_units(raw: U256) -> Option<Decimal> {
    if raw.is_zero() {
        return None;
    }
    let wei = Decimal::from_str_exact(&raw.to_string()).ok()?;
    Some(wei / scale())
}

/// Display units rounded to 2 decimal places, for balance tables.
pub fn format_balance(raw: U256) -> Option<Decimal> {
    to_display_units(raw)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Convert display units back to raw wei for transaction submission.
/// Negative amounts have no wei representation.
pub fn to_wei(amount: Decimal) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let scaled = (amount * scale()).trunc();
    U256::from_dec_str(&scaled.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wei(n: u64) -> U256 {
        U256::from(n) * U256::from(DECIMALS)
    }

    #[test]
    fn test_display_units() {
        assert_eq!(to_display_units(wei(3)), Some(dec!(3)));
        assert_eq!(to_display_units(U256::from(DECIMALS / 2)), Some(dec!(0.5)));
        // Zero is the "unset" sentinel, not 0.0
        assert_eq!(to_display_units(U256::zero()), None);
    }

    #[test]
    fn test_format_balance_rounds_to_cents() {
        // 1.238 ether rounds half away from zero
        let raw = U256::from(1_238_000_000_000_000_000u64);
        assert_eq!(format_balance(raw), Some(dec!(1.24)));

        let raw = U256::from(1_234_000_000_000_000_000u64);
        assert_eq!(format_balance(raw), Some(dec!(1.23)));
    }

    #[test]
    fn test_format_balance_matches_scaled_division() {
        for n in [1u64, 7, 42, 1_000, 123_456] {
            let raw = wei(n);
            assert_eq!(format_balance(raw), Some(Decimal::from(n).round_dp(2)));
        }
    }

    #[test]
    fn test_wei_round_trip() {
        assert_eq!(to_wei(dec!(2)), Some(wei(2)));
        assert_eq!(to_wei(dec!(0.5)), Some(U256::from(DECIMALS / 2)));
        assert_eq!(to_wei(dec!(-1)), None);
        assert_eq!(
            to_wei(dec!(1.5)).and_then(to_display_units),
            Some(dec!(1.5))
        );
    }
}
