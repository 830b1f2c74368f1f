//! Asset objects
//!
//! The asset definition, its dynamic supply aggregates, and the bitasset
//! (market-issued) extension carrying feeds and settlement state.

use crate::amount::Asset;
use crate::config;
use crate::core_types::*;
use crate::price::{Price, COLLATERAL_RATIO_DENOM};
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetKind {
    /// The native currency.
    Currency,
    /// Staked dividend-bearing equity.
    Equity,
    /// Collateral-backed market-issued asset (bitasset).
    MarketIssued,
    /// Plain user-issued asset.
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetObject {
    pub id: ObjectId,
    pub symbol: AssetSymbol,
    pub issuer: AccountName,
    pub kind: AssetKind,
    /// Issuer market fee on the receive side of fills (/10_000).
    pub market_fee_percent: i64,
    pub max_market_fee: i64,
    pub created: TimePoint,
}

impl AssetObject {
    pub fn is_market_issued(&self) -> bool {
        self.kind == AssetKind::MarketIssued
    }

    pub fn charges_market_fees(&self) -> bool {
        self.market_fee_percent > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKeyIdx {
    BySymbol(AssetSymbol),
}

impl StoreObject for AssetObject {
    type IndexKey = AssetKeyIdx;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AssetKeyIdx> {
        vec![AssetKeyIdx::BySymbol(self.symbol.clone())]
    }
}

// ============================================================
// DYNAMIC SUPPLY DATA
// ============================================================

/// Per-asset supply aggregates. Each pool total equals the sum of the
/// matching sub-balance over all owners; `pending_supply` holds value
/// parked inside orders and funds rather than any account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDynamicData {
    pub id: ObjectId,
    pub symbol: AssetSymbol,
    pub liquid_supply: i64,
    pub staked_supply: i64,
    pub savings_supply: i64,
    pub reward_supply: i64,
    pub delegated_supply: i64,
    pub receiving_supply: i64,
    pub pending_supply: i64,
    pub accumulated_fees: i64,
    pub burned: i64,
}

impl AssetDynamicData {
    pub fn new(id: ObjectId, symbol: AssetSymbol) -> Self {
        Self {
            id,
            symbol,
            liquid_supply: 0,
            staked_supply: 0,
            savings_supply: 0,
            reward_supply: 0,
            delegated_supply: 0,
            receiving_supply: 0,
            pending_supply: 0,
            accumulated_fees: 0,
            burned: 0,
        }
    }

    /// Outstanding supply across every pool. Delegated/receiving mirror
    /// slices of `staked_supply` and do not add to the total.
    pub fn total_supply(&self) -> i64 {
        self.liquid_supply
            + self.staked_supply
            + self.savings_supply
            + self.reward_supply
            + self.pending_supply
    }
}

impl StoreObject for AssetDynamicData {
    type IndexKey = AssetKeyIdx;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AssetKeyIdx> {
        vec![AssetKeyIdx::BySymbol(self.symbol.clone())]
    }
}

// ============================================================
// PRICE FEED
// ============================================================

/// A producer-published feed for a market-issued asset. The settlement
/// price is quoted debt-per-collateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PriceFeed {
    pub settlement_price: Price,
    /// Required collateralization (/1000).
    pub maintenance_collateral_ratio: i64,
    /// Margin calls pay at most this premium over the feed (/1000).
    pub max_short_squeeze_ratio: i64,
}

impl PriceFeed {
    pub fn is_null(&self) -> bool {
        self.settlement_price.is_null()
    }

    /// Worst price a margin call may pay: the feed scaled down by MSSR.
    /// Quoted like the settlement price (debt / collateral).
    pub fn max_short_squeeze_price(&self) -> Price {
        self.settlement_price
            .scaled(COLLATERAL_RATIO_DENOM, self.max_short_squeeze_ratio)
            .unwrap_or_else(|_| self.settlement_price.clone())
    }

    /// Collateral-per-debt threshold below which a call is margin-called.
    pub fn maintenance_collateralization(&self) -> Price {
        self.settlement_price
            .inverse()
            .scaled(self.maintenance_collateral_ratio, COLLATERAL_RATIO_DENOM)
            .unwrap_or_else(|_| self.settlement_price.inverse())
    }
}

// ============================================================
// BITASSET DATA
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBitassetData {
    pub id: ObjectId,
    pub symbol: AssetSymbol,
    pub backing_asset: AssetSymbol,
    /// Accounts permitted to publish feeds; empty defers to producers.
    pub feed_producers: std::collections::BTreeSet<AccountName>,
    /// Feeds by producer: publication time and the published feed.
    pub feeds: BTreeMap<AccountName, (TimePoint, PriceFeed)>,
    /// Median of the unexpired feeds.
    pub current_feed: PriceFeed,
    pub current_feed_publication_time: TimePoint,
    /// Set while globally settled; the price the fund pays out at.
    pub settlement_price: Price,
    /// Collateral gathered by a global settlement, in the backing asset.
    pub settlement_fund: i64,
    pub force_settled_volume: i64,
    pub is_prediction_market: bool,
}

impl AssetBitassetData {
    pub fn new(id: ObjectId, symbol: AssetSymbol, backing: AssetSymbol) -> Self {
        Self {
            id,
            symbol,
            backing_asset: backing,
            feed_producers: std::collections::BTreeSet::new(),
            feeds: BTreeMap::new(),
            current_feed: PriceFeed::default(),
            current_feed_publication_time: TimePoint::default(),
            settlement_price: Price::default(),
            settlement_fund: 0,
            force_settled_volume: 0,
            is_prediction_market: false,
        }
    }

    /// True after a black swan until the asset is revived.
    pub fn has_settlement(&self) -> bool {
        !self.settlement_price.is_null()
    }

    /// Recompute `current_feed` as the element-wise median of unexpired
    /// feeds. Ordering over `feeds` is a BTreeMap walk, so the median is
    /// deterministic. Returns true if the median changed.
    pub fn update_median_feed(&mut self, now: TimePoint) -> bool {
        let mut live: Vec<&PriceFeed> = self
            .feeds
            .values()
            .filter(|(at, feed)| {
                now.since(*at) < config::MAX_FEED_AGE_SECONDS && !feed.is_null()
            })
            .map(|(_, feed)| feed)
            .collect();

        if live.len() < config::MIN_FEEDS {
            let had_feed = !self.current_feed.is_null();
            self.current_feed = PriceFeed::default();
            return had_feed;
        }

        let mid = live.len() / 2;
        let old = self.current_feed.clone();

        live.sort_by(|a, b| a.settlement_price.cmp(&b.settlement_price));
        let settlement_price = live[mid].settlement_price.clone();
        live.sort_by_key(|f| f.maintenance_collateral_ratio);
        let mcr = live[mid].maintenance_collateral_ratio;
        live.sort_by_key(|f| f.max_short_squeeze_ratio);
        let mssr = live[mid].max_short_squeeze_ratio;

        self.current_feed = PriceFeed {
            settlement_price,
            maintenance_collateral_ratio: mcr,
            max_short_squeeze_ratio: mssr,
        };
        self.current_feed_publication_time = now;
        self.current_feed != old
    }
}

impl StoreObject for AssetBitassetData {
    type IndexKey = AssetKeyIdx;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AssetKeyIdx> {
        vec![AssetKeyIdx::BySymbol(self.symbol.clone())]
    }
}

/// Convenience constructor used at genesis and by tests.
pub fn asset_amount(amount: i64, symbol: &str) -> Asset {
    Asset::new(amount, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Asset;

    fn feed(debt: i64, coll: i64) -> PriceFeed {
        PriceFeed {
            settlement_price: Price::new(Asset::new(debt, "USD"), Asset::new(coll, "COIN")),
            maintenance_collateral_ratio: 1_750,
            max_short_squeeze_ratio: 1_100,
        }
    }

    #[test]
    fn test_max_short_squeeze_price_is_below_feed() {
        let f = feed(10, 10);
        assert!(f.max_short_squeeze_price() < f.settlement_price);
    }

    #[test]
    fn test_maintenance_collateralization_above_inverse_feed() {
        let f = feed(10, 10);
        // 1.75x collateral required: threshold above the raw inverse feed
        assert!(f.maintenance_collateralization() > f.settlement_price.inverse());
    }

    #[test]
    fn test_median_feed_takes_middle() {
        let mut bad = AssetBitassetData::new(1, "USD".into(), "COIN".into());
        let now = TimePoint::from_secs(1_000);
        bad.feeds
            .insert("p1".into(), (now, feed(1, 1)));
        bad.feeds
            .insert("p2".into(), (now, feed(2, 1)));
        bad.feeds
            .insert("p3".into(), (now, feed(4, 1)));
        assert!(bad.update_median_feed(now));
        assert_eq!(
            bad.current_feed.settlement_price,
            feed(2, 1).settlement_price
        );
    }

    #[test]
    fn test_expired_feeds_ignored() {
        let mut bad = AssetBitassetData::new(1, "USD".into(), "COIN".into());
        let old = TimePoint::from_secs(0);
        let now = TimePoint::from_secs(config::MAX_FEED_AGE_SECONDS + 1);
        bad.feeds.insert("p1".into(), (old, feed(1, 1)));
        bad.update_median_feed(now);
        assert!(bad.current_feed.is_null());
    }

    #[test]
    fn test_total_supply_excludes_delegation_mirrors() {
        let mut dyn_data = AssetDynamicData::new(1, "COIN".into());
        dyn_data.liquid_supply = 100;
        dyn_data.staked_supply = 50;
        dyn_data.delegated_supply = 20;
        dyn_data.receiving_supply = 20;
        dyn_data.pending_supply = 5;
        assert_eq!(dyn_data.total_supply(), 155);
    }
}
