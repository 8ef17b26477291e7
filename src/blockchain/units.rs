//! Base-unit to display conversion.

use alloy::primitives::U256;

/// Decimals of the native token.
pub const NATIVE_DECIMALS: u32 = 18;

/// Fractional digits kept in formatted balances.
pub const DISPLAY_DECIMALS: u32 = 4;

/// Format a base-unit amount with exactly four decimals, truncating.
pub fn format_balance(wei: U256) -> String {
    let unit = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS));
    let step = U256::from(10u64).pow(U256::from(NATIVE_DECIMALS - DISPLAY_DECIMALS));
    let whole = wei / unit;
    let fraction = (wei % unit) / step;
    format!(
        "{}.{:0width$}",
        whole,
        fraction.to::<u64>(),
        width = DISPLAY_DECIMALS as usize
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(whole: u64, milli: u64) -> U256 {
        U256::from(whole) * U256::from(10u64).pow(U256::from(18)) + U256::from(milli) * U256::from(10u64).pow(U256::from(15))
    }

    #[test]
    fn test_format_balance() {
        assert_eq!(format_balance(U256::ZERO), "0.0000");
        assert_eq!(format_balance(ether(2, 500)), "2.5000");
        assert_eq!(format_balance(ether(1234, 1)), "1234.0010");
        assert_eq!(format_balance(U256::from(1u64)), "0.0000");
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        // 0.99999 ETH
        let wei = U256::from(999_990_000_000_000_000u64);
        assert_eq!(format_balance(wei), "0.9999");
    }

    #[test]
    fn test_large_values() {
        // U256::MAX = ...457584007913129639935 wei
        assert!(format_balance(U256::MAX).ends_with("039457.5840"));
    }
}
