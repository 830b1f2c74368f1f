//! Price ratios
//!
//! A price is the exchange rate between two assets, expressed as the ratio
//! `base / quote`. Prices participate in ordered indices, so the comparison
//! is a total order: first the symbol pair, then the cross-multiplied ratio
//! (ties between equivalent ratios fall through to the object-id component
//! of the index key).

use crate::amount::{mul_div_down, mul_div_up, Asset, MAX_ASSET_SUPPLY};
use crate::core_types::AssetSymbol;
use crate::error::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Denominator of collateral-ratio fixed point: 1750 / 1000 = 1.75x.
pub const COLLATERAL_RATIO_DENOM: i64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Self { base, quote }
    }

    /// A null price carries no information (no feed published yet).
    pub fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    /// Structural validity: positive amounts, distinct symbols.
    pub fn is_valid(&self) -> bool {
        self.base.amount > 0 && self.quote.amount > 0 && self.base.symbol != self.quote.symbol
    }

    /// Swap base and quote (the `~p` of the matching rules).
    pub fn inverse(&self) -> Price {
        Price::new(self.quote.clone(), self.base.clone())
    }

    /// Upper bound of the ratio space for this ordered symbol pair.
    pub fn max(base: AssetSymbol, quote: AssetSymbol) -> Price {
        Price::new(Asset::new(MAX_ASSET_SUPPLY, base), Asset::new(1, quote))
    }

    /// Lower bound of the ratio space for this ordered symbol pair.
    pub fn min(base: AssetSymbol, quote: AssetSymbol) -> Price {
        Price::new(Asset::new(1, base), Asset::new(MAX_ASSET_SUPPLY, quote))
    }

    /// Scale the ratio by `num/den`, renormalizing to stay in i64 range.
    pub fn scaled(&self, num: i64, den: i64) -> ChainResult<Price> {
        if num <= 0 || den <= 0 {
            return Err(ChainError::invalid("price scale must be positive"));
        }
        let mut b = self.base.amount as i128 * num as i128;
        let mut q = self.quote.amount as i128 * den as i128;
        let g = gcd_i128(b, q);
        if g > 1 {
            b /= g;
            q /= g;
        }
        while b > i64::MAX as i128 || q > i64::MAX as i128 {
            b >>= 1;
            q >>= 1;
        }
        if b == 0 || q == 0 {
            return Err(ChainError::AmountOverflow("price scale"));
        }
        Ok(Price::new(
            Asset::new(b as i64, self.base.symbol.clone()),
            Asset::new(q as i64, self.quote.symbol.clone()),
        ))
    }

    /// Convert `amount` across this price, rounding down.
    ///
    /// The asset must be one side of the pair; the result is the other side.
    pub fn convert(&self, amount: &Asset) -> ChainResult<Asset> {
        if amount.symbol == self.base.symbol {
            let out = mul_div_down(amount.amount, self.quote.amount, self.base.amount)?;
            Ok(Asset::new(out, self.quote.symbol.clone()))
        } else if amount.symbol == self.quote.symbol {
            let out = mul_div_down(amount.amount, self.base.amount, self.quote.amount)?;
            Ok(Asset::new(out, self.base.symbol.clone()))
        } else {
            Err(ChainError::SymbolMismatch {
                expected: self.base.symbol.clone(),
                actual: amount.symbol.clone(),
            })
        }
    }

    /// Convert `amount` across this price, rounding up (standing-order side).
    pub fn convert_round_up(&self, amount: &Asset) -> ChainResult<Asset> {
        if amount.symbol == self.base.symbol {
            let out = mul_div_up(amount.amount, self.quote.amount, self.base.amount)?;
            Ok(Asset::new(out, self.quote.symbol.clone()))
        } else if amount.symbol == self.quote.symbol {
            let out = mul_div_up(amount.amount, self.base.amount, self.quote.amount)?;
            Ok(Asset::new(out, self.base.symbol.clone()))
        } else {
            Err(ChainError::SymbolMismatch {
                expected: self.base.symbol.clone(),
                actual: amount.symbol.clone(),
            })
        }
    }

    /// Ratio comparison ignoring symbols; both prices must share orientation.
    fn ratio_cmp(&self, other: &Price) -> Ordering {
        let lhs = self.base.amount as i128 * other.quote.amount as i128;
        let rhs = other.base.amount as i128 * self.quote.amount as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Price {}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .symbol
            .cmp(&other.base.symbol)
            .then_with(|| self.quote.symbol.cmp(&other.quote.symbol))
            .then_with(|| self.ratio_cmp(other))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}

fn gcd_i128(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(b: i64, q: i64) -> Price {
        Price::new(Asset::new(b, "COIN"), Asset::new(q, "USD"))
    }

    #[test]
    fn test_ordering_by_ratio() {
        // 2 COIN / 1 USD > 3 COIN / 2 USD
        assert!(p(2, 1) > p(3, 2));
        assert_eq!(p(2, 4), p(1, 2));
    }

    #[test]
    fn test_min_max_bound_ratio_space() {
        let any = p(123, 456);
        assert!(any < Price::max("COIN".into(), "USD".into()));
        assert!(any > Price::min("COIN".into(), "USD".into()));
    }

    #[test]
    fn test_convert_round_modes() {
        // 5 COIN for 10 USD: 2 USD per COIN
        let price = p(5, 10);
        let got = price.convert(&Asset::new(3, "COIN")).unwrap();
        assert_eq!(got, Asset::new(6, "USD"));

        // odd division: 10 COIN / 3 USD
        let odd = p(10, 3);
        assert_eq!(odd.convert(&Asset::new(5, "COIN")).unwrap().amount, 1);
        assert_eq!(
            odd.convert_round_up(&Asset::new(5, "COIN")).unwrap().amount,
            2
        );
    }

    #[test]
    fn test_inverse_swaps_sides() {
        let price = p(5, 10);
        let inv = price.inverse();
        assert_eq!(inv.base.symbol, AssetSymbol::new("USD"));
        assert_eq!(inv.quote.symbol, AssetSymbol::new("COIN"));
    }

    #[test]
    fn test_scaled_keeps_ratio_direction() {
        let price = p(10, 10); // 1:1
        let squeezed = price.scaled(COLLATERAL_RATIO_DENOM, 1_100).unwrap();
        // scaled down by 1000/1100: less base per quote
        assert!(squeezed < price);
    }

    #[test]
    fn test_convert_rejects_foreign_symbol() {
        let price = p(1, 1);
        assert!(price.convert(&Asset::new(1, "EQ")).is_err());
    }
}
