//! Market objects
//!
//! Limit orders, collateralized call orders, force-settlement requests and
//! collateral bids. Price-keyed index variants wrap the price in
//! `Reverse` where matching walks best-first, so ascending index order is
//! descending price with ties still broken by ascending object id
//! (price-time priority).

use crate::amount::Asset;
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::price::{Price, COLLATERAL_RATIO_DENOM};
use crate::store::StoreObject;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

// ============================================================
// LIMIT ORDERS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: ObjectId,
    pub seller: AccountName,
    /// Order id within the owner's namespace.
    pub order_id: u64,
    /// Ratio sold/received: base is the sell asset, quote the receive asset.
    pub sell_price: Price,
    /// Remaining amount for sale, in the sell asset.
    pub for_sale: i64,
    /// Interface account credited with the maker-side trading fee share.
    pub interface: AccountName,
    pub created: TimePoint,
    pub expiration: TimePoint,
}

impl LimitOrder {
    pub fn sell_asset(&self) -> &AssetSymbol {
        &self.sell_price.base.symbol
    }

    pub fn receive_asset(&self) -> &AssetSymbol {
        &self.sell_price.quote.symbol
    }

    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.symbol.clone())
    }

    /// What the remainder buys at the order's own price, rounded down.
    pub fn amount_to_receive(&self) -> ChainResult<Asset> {
        self.sell_price.convert(&self.amount_for_sale())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LimitOrderKey {
    /// Descending price walk = ascending key walk.
    ByPrice(Reverse<Price>),
    ByExpiration(TimePoint),
    ByAccount(AccountName, u64),
}

impl StoreObject for LimitOrder {
    type IndexKey = LimitOrderKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<LimitOrderKey> {
        vec![
            LimitOrderKey::ByPrice(Reverse(self.sell_price.clone())),
            LimitOrderKey::ByExpiration(self.expiration),
            LimitOrderKey::ByAccount(self.seller.clone(), self.order_id),
        ]
    }
}

// ============================================================
// CALL ORDERS
// ============================================================

/// A collateralized debt position in a market-issued asset. One call per
/// (borrower, debt asset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOrder {
    pub id: ObjectId,
    pub borrower: AccountName,
    /// Outstanding debt, in the market-issued asset.
    pub debt: Asset,
    /// Posted collateral, in the backing asset.
    pub collateral: Asset,
    /// Optional collateralization (/1000) margin calls cover down to.
    pub target_collateral_ratio: Option<u16>,
}

impl CallOrder {
    pub fn debt_type(&self) -> &AssetSymbol {
        &self.debt.symbol
    }

    pub fn collateral_type(&self) -> &AssetSymbol {
        &self.collateral.symbol
    }

    /// Collateral per debt. Higher is safer.
    pub fn collateralization(&self) -> Price {
        Price::new(self.collateral.clone(), self.debt.clone())
    }

    /// Debt this call must cover when margin called at `match_price`.
    ///
    /// Without a target ratio the whole debt is covered. With one, solve
    /// for the least `x` whose coverage lifts the remaining position back
    /// to the target; products of three 64-bit factors go through `BigInt`.
    ///
    /// `match_price` and `feed_price` are debt/collateral ratios.
    pub fn max_debt_to_cover(
        &self,
        match_price: &Price,
        feed_price: &Price,
        maintenance_collateral_ratio: i64,
        maintenance_collateralization: &Price,
    ) -> ChainResult<i64> {
        if self.collateralization() >= *maintenance_collateralization {
            return Ok(0); // feed protected
        }

        let tcr = match self.target_collateral_ratio {
            None => return Ok(self.debt.amount),
            Some(t) => i64::from(t).max(maintenance_collateral_ratio),
        };

        // Orientations: match_price, feed_price are debt(base)/collateral(quote).
        let (mp_d, mp_c) = (match_price.base.amount, match_price.quote.amount);
        let (fp_d, fp_c) = (feed_price.base.amount, feed_price.quote.amount);
        if mp_d == 0 || fp_d == 0 {
            return Err(ChainError::invalid("null price in margin cover"));
        }

        // Require after covering x at match price:
        //   (collateral - x * mp_c/mp_d) >= (tcr/1000) * (debt - x) * fp_c/fp_d
        // => x * (tcr*fp_c*mp_d - 1000*fp_d*mp_c) >= tcr*debt*fp_c*mp_d - 1000*collateral*fp_d*mp_d
        let big = |v: i64| BigInt::from(v);
        let denom = big(tcr) * big(fp_c) * big(mp_d) - big(COLLATERAL_RATIO_DENOM) * big(fp_d) * big(mp_c);
        if denom <= BigInt::from(0) {
            // covering can never restore the target; close the whole thing
            return Ok(self.debt.amount);
        }
        let numer = big(tcr) * big(self.debt.amount) * big(fp_c) * big(mp_d)
            - big(COLLATERAL_RATIO_DENOM) * big(self.collateral.amount) * big(fp_d) * big(mp_d);
        if numer <= BigInt::from(0) {
            return Ok(0);
        }
        // ceil division, clamped to the full debt
        let x = (&numer + &denom - BigInt::from(1)) / &denom;
        let x: i64 = x.try_into().unwrap_or(i64::MAX);
        Ok(x.min(self.debt.amount))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CallOrderKey {
    /// Ascending collateralization: least-safe calls first.
    ByCollateral(Price),
    ByAccountAsset(AccountName, AssetSymbol),
}

impl StoreObject for CallOrder {
    type IndexKey = CallOrderKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CallOrderKey> {
        vec![
            CallOrderKey::ByCollateral(self.collateralization()),
            CallOrderKey::ByAccountAsset(self.borrower.clone(), self.debt.symbol.clone()),
        ]
    }
}

// ============================================================
// FORCE SETTLEMENTS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceSettlement {
    pub id: ObjectId,
    pub owner: AccountName,
    /// Market-issued amount awaiting settlement.
    pub balance: Asset,
    pub settlement_date: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ForceSettlementKey {
    ByExpiration(TimePoint),
    ByAccount(AccountName),
}

impl StoreObject for ForceSettlement {
    type IndexKey = ForceSettlementKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ForceSettlementKey> {
        vec![
            ForceSettlementKey::ByExpiration(self.settlement_date),
            ForceSettlementKey::ByAccount(self.owner.clone()),
        ]
    }
}

// ============================================================
// COLLATERAL BIDS
// ============================================================

/// A bid to take over debt of a globally-settled asset in exchange for the
/// bidder's collateral plus a slice of the settlement fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralBid {
    pub id: ObjectId,
    pub bidder: AccountName,
    /// Debt the bidder offers to take on (market-issued asset).
    pub debt_covered: Asset,
    /// Additional collateral the bidder commits (backing asset).
    pub collateral_offered: Asset,
}

impl CollateralBid {
    /// collateral / debt: higher bids revive first.
    pub fn inv_swan_price(&self) -> Price {
        Price::new(self.collateral_offered.clone(), self.debt_covered.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CollateralBidKey {
    /// Best (highest collateral per debt) first.
    ByPrice(Reverse<Price>),
    ByAccountAsset(AccountName, AssetSymbol),
}

impl StoreObject for CollateralBid {
    type IndexKey = CollateralBidKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CollateralBidKey> {
        vec![
            CollateralBidKey::ByPrice(Reverse(self.inv_swan_price())),
            CollateralBidKey::ByAccountAsset(self.bidder.clone(), self.debt_covered.symbol.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: ObjectId, sell: i64, receive: i64) -> LimitOrder {
        LimitOrder {
            id,
            seller: "alice".into(),
            order_id: id,
            sell_price: Price::new(Asset::new(sell, "COIN"), Asset::new(receive, "USD")),
            for_sale: sell,
            interface: AccountName::default(),
            created: TimePoint::from_secs(0),
            expiration: TimePoint::from_secs(1_000),
        }
    }

    #[test]
    fn test_limit_order_sides() {
        let o = order(1, 5, 10);
        assert_eq!(o.sell_asset().as_str(), "COIN");
        assert_eq!(o.receive_asset().as_str(), "USD");
        assert_eq!(o.amount_to_receive().unwrap(), Asset::new(10, "USD"));
    }

    #[test]
    fn test_price_key_orders_best_first() {
        // higher ratio (more COIN per USD asked... base/quote) sorts first
        let cheap = LimitOrderKey::ByPrice(Reverse(order(1, 10, 5).sell_price));
        let dear = LimitOrderKey::ByPrice(Reverse(order(2, 10, 20).sell_price));
        // 10/5 = 2 COIN per USD > 10/20: Reverse puts the higher ratio first
        assert!(cheap < dear);
    }

    #[test]
    fn test_collateralization_ordering() {
        let thin = CallOrder {
            id: 1,
            borrower: "bob".into(),
            debt: Asset::new(100, "USD"),
            collateral: Asset::new(150, "COIN"),
            target_collateral_ratio: None,
        };
        let fat = CallOrder {
            id: 2,
            borrower: "carol".into(),
            debt: Asset::new(100, "USD"),
            collateral: Asset::new(400, "COIN"),
            target_collateral_ratio: None,
        };
        assert!(thin.collateralization() < fat.collateralization());
    }

    #[test]
    fn test_max_debt_full_cover_without_target() {
        let call = CallOrder {
            id: 1,
            borrower: "bob".into(),
            debt: Asset::new(100, "USD"),
            collateral: Asset::new(150, "COIN"),
            target_collateral_ratio: None,
        };
        let feed = Price::new(Asset::new(1, "USD"), Asset::new(1, "COIN"));
        let maint = feed.inverse().scaled(1_750, 1_000).unwrap();
        let covered = call
            .max_debt_to_cover(&feed, &feed, 1_750, &maint)
            .unwrap();
        assert_eq!(covered, 100);
    }

    #[test]
    fn test_max_debt_zero_when_safe() {
        let call = CallOrder {
            id: 1,
            borrower: "bob".into(),
            debt: Asset::new(100, "USD"),
            collateral: Asset::new(1_000, "COIN"),
            target_collateral_ratio: None,
        };
        let feed = Price::new(Asset::new(1, "USD"), Asset::new(1, "COIN"));
        let maint = feed.inverse().scaled(1_750, 1_000).unwrap();
        assert_eq!(
            call.max_debt_to_cover(&feed, &feed, 1_750, &maint).unwrap(),
            0
        );
    }

    #[test]
    fn test_max_debt_partial_with_target() {
        let call = CallOrder {
            id: 1,
            borrower: "bob".into(),
            debt: Asset::new(1_000, "USD"),
            collateral: Asset::new(1_600, "COIN"),
            target_collateral_ratio: Some(2_000),
        };
        let feed = Price::new(Asset::new(1, "USD"), Asset::new(1, "COIN"));
        let maint = feed.inverse().scaled(1_750, 1_000).unwrap();
        let covered = call
            .max_debt_to_cover(&feed, &feed, 1_750, &maint)
            .unwrap();
        assert!(covered > 0 && covered < 1_000, "covered = {covered}");
        // after covering, remaining position meets the 2.0x target
        let remaining_debt = 1_000 - covered;
        let remaining_coll = 1_600 - covered; // match price 1:1
        assert!(remaining_coll * 1_000 >= remaining_debt * 2_000);
    }
}
