//! Asset amounts
//!
//! All consensus amounts are `i64` shares scaled by the asset's precision.
//! Arithmetic widens to `i128` internally and truncates back with overflow
//! checks; silent wraparound is never allowed in balance math.

use crate::core_types::AssetSymbol;
use crate::error::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Largest share amount a single asset may reach.
pub const MAX_ASSET_SUPPLY: i64 = 1_000_000_000_000_000_000;

/// Native precision: 1 whole unit = 10^8 shares.
pub const BLOCKCHAIN_PRECISION: i64 = 100_000_000;

/// A signed amount of a specific asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Asset {
    pub amount: i64,
    pub symbol: AssetSymbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: impl Into<AssetSymbol>) -> Self {
        Self {
            amount,
            symbol: symbol.into(),
        }
    }

    pub fn zero(symbol: impl Into<AssetSymbol>) -> Self {
        Self::new(0, symbol)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Whole units at native precision, for display only.
    pub fn to_whole(&self) -> f64 {
        self.amount as f64 / BLOCKCHAIN_PRECISION as f64
    }

    fn require_same_symbol(&self, other: &Asset) -> ChainResult {
        if self.symbol != other.symbol {
            return Err(ChainError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: other.symbol.clone(),
            });
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Asset) -> ChainResult<Asset> {
        self.require_same_symbol(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(ChainError::AmountOverflow("asset add"))?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    pub fn checked_sub(&self, other: &Asset) -> ChainResult<Asset> {
        self.require_same_symbol(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(ChainError::AmountOverflow("asset sub"))?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    pub fn negated(&self) -> Asset {
        Asset::new(-self.amount, self.symbol.clone())
    }

    /// `self * num / den`, rounded toward zero, via an i128 intermediate.
    pub fn scaled(&self, num: i64, den: i64) -> ChainResult<Asset> {
        let amount = mul_div_down(self.amount, num, den)?;
        Ok(Asset::new(amount, self.symbol.clone()))
    }

    /// Fixed-point percent of the amount (10_000 = 100%), rounded down.
    pub fn percent(&self, pct: i64) -> ChainResult<Asset> {
        self.scaled(pct, crate::core_types::PERCENT_100)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.symbol == other.symbol {
            self.amount.partial_cmp(&other.amount)
        } else {
            None
        }
    }
}

// ============================================================
// WIDENED HELPERS
// ============================================================

/// `a * b / c` rounded toward negative infinity is not wanted here:
/// amounts in the matching path are non-negative, so truncation equals
/// round-down. Division by zero and i64 overflow surface as errors.
pub fn mul_div_down(a: i64, b: i64, c: i64) -> ChainResult<i64> {
    if c == 0 {
        return Err(ChainError::AmountOverflow("division by zero"));
    }
    let wide = (a as i128) * (b as i128) / (c as i128);
    i64::try_from(wide).map_err(|_| ChainError::AmountOverflow("mul_div_down"))
}

/// `ceil(a * b / c)` for non-negative operands.
pub fn mul_div_up(a: i64, b: i64, c: i64) -> ChainResult<i64> {
    if c == 0 {
        return Err(ChainError::AmountOverflow("division by zero"));
    }
    let prod = (a as i128) * (b as i128);
    let den = c as i128;
    let wide = (prod + den - 1) / den;
    i64::try_from(wide).map_err(|_| ChainError::AmountOverflow("mul_div_up"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(amount: i64) -> Asset {
        Asset::new(amount, "COIN")
    }

    #[test]
    fn test_checked_add_sub() {
        let a = coin(100);
        let b = coin(40);
        assert_eq!(a.checked_add(&b).unwrap().amount, 140);
        assert_eq!(a.checked_sub(&b).unwrap().amount, 60);
    }

    #[test]
    fn test_symbol_mismatch() {
        let a = coin(1);
        let b = Asset::new(1, "USD");
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn test_overflow_detected() {
        let a = coin(i64::MAX);
        assert!(a.checked_add(&coin(1)).is_err());
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div_down(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_up(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_up(9, 1, 3).unwrap(), 3);
        assert!(mul_div_down(1, 1, 0).is_err());
    }

    #[test]
    fn test_percent() {
        // 2.50% of 10_000
        assert_eq!(coin(10_000).percent(250).unwrap().amount, 250);
    }
}
