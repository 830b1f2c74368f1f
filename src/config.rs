//! Chain configuration
//!
//! Consensus constants plus the tunable `ChainProperties` record. Properties
//! load from YAML for the demo binary; `Default` carries the mainnet values.
//! Constants that index ordering or invariants depend on stay `const`.

use crate::amount::{Asset, BLOCKCHAIN_PRECISION};
use crate::core_types::*;
use serde::{Deserialize, Serialize};

// ============================================================
// SYMBOLS & RESERVED NAMES
// ============================================================

/// Native liquid currency.
pub const SYMBOL_COIN: &str = "COIN";
/// Staked equity asset paying weekly dividends.
pub const SYMBOL_EQUITY: &str = "EQ";
/// Market-issued stable asset backed by COIN.
pub const SYMBOL_USD: &str = "USD";

/// Burn/revenue sink account.
pub const NULL_ACCOUNT: &str = "null";
/// Account representing network-owned funds.
pub const NETWORK_ACCOUNT: &str = "network";

// ============================================================
// INTERVALS & LIMITS
// ============================================================

pub const BLOCK_INTERVAL_SECONDS: i64 = 3;
pub const MAX_TIME_UNTIL_EXPIRATION: i64 = SECONDS_PER_HOUR;

/// Owner authority may rotate at most once per this interval.
pub const OWNER_UPDATE_LIMIT: i64 = SECONDS_PER_HOUR;
/// Owner-authority history retention consulted by account recovery.
pub const OWNER_AUTH_HISTORY_TRACKING_SECONDS: i64 = 30 * SECONDS_PER_DAY;
pub const ACCOUNT_RECOVERY_REQUEST_EXPIRATION: i64 = SECONDS_PER_DAY;

pub const CONNECTION_REQUEST_DURATION: i64 = SECONDS_PER_WEEK;

pub const STAKE_WITHDRAW_INTERVAL_SECONDS: i64 = SECONDS_PER_DAY;
pub const STAKE_WITHDRAW_INTERVALS: i64 = 4;
pub const SAVINGS_WITHDRAW_DELAY_SECONDS: i64 = 3 * SECONDS_PER_DAY;
pub const DELEGATION_RETURN_PERIOD_SECONDS: i64 = SECONDS_PER_DAY;
pub const ESCROW_RATIFICATION_WINDOW_SECONDS: i64 = SECONDS_PER_WEEK;

pub const FEED_INTERVAL_BLOCKS: BlockNum = 20;
pub const EQUITY_INTERVAL_BLOCKS: BlockNum = 201_600; // one week of 3s blocks
pub const GOVERNANCE_INTERVAL_BLOCKS: BlockNum = 1_200; // one hour
pub const CONTENT_REWARD_INTERVAL_BLOCKS: BlockNum = 28_800; // one day
/// Posts cash out this long after creation.
pub const CONTENT_REWARD_DELAY_SECONDS: i64 = SECONDS_PER_WEEK;
/// Author share of a content payout (/10_000); curators take the rest.
pub const AUTHOR_REWARD_PERCENT: i64 = 7_500;
pub const ENTERPRISE_INTERVAL_BLOCKS: BlockNum = 28_800; // one day
pub const MAX_FEED_AGE_SECONDS: i64 = SECONDS_PER_DAY;
pub const MIN_FEEDS: usize = 1;
pub const FEED_HISTORY_WINDOW: usize = 24;

pub const MAX_PROXY_RECURSION_DEPTH: usize = 4;
pub const MAX_SIG_CHECK_DEPTH: usize = 2;

pub const MIN_ACTIVITY_PRODUCERS: u32 = 10;
pub const MIN_RESET_DELAY_DAYS: u16 = 3;

/// Doubling of the account-creation fee applies per character below this.
pub const PREMIUM_NAME_LENGTH: usize = 8;
pub const CREATE_ACCOUNT_DELEGATION_RATIO: i64 = 5;

/// Equity dividend bonus thresholds.
pub const EQUITY_BOOST_PRODUCERS: u32 = 50;
pub const EQUITY_BOOST_ACTIVITY: u32 = 15;
pub const EQUITY_BOOST_BALANCE: i64 = 10 * BLOCKCHAIN_PRECISION;
pub const EQUITY_BOOST_TOP_PERCENT: i64 = 15_000; // 150.00%
pub const EQUITY_ACTIVITY_WINDOW_SECONDS: i64 = 30 * SECONDS_PER_DAY;
pub const MIN_EQUITY_PRODUCERS: u32 = 10;

/// Trading-fee composition (fixed-point, PERCENT_100 = 10_000).
pub const TRADING_FEE_PERCENT: i64 = 100; // 1.00% of receive value
pub const GOVERNANCE_SHARE_PERCENT: i64 = 1_000; // of the trading fee
pub const REFERRAL_SHARE_PERCENT: i64 = 1_000;
pub const MAKER_SHARE_PERCENT: i64 = 3_000; // of the remainder
pub const TAKER_SHARE_PERCENT: i64 = 3_000;
// network keeps the rest

/// Approval thresholds for officer/board/governance roles
/// (fraction of total voting power, fixed-point).
pub const OFFICER_APPROVAL_PERCENT: i64 = 10; // 0.10%
pub const OFFICER_MIN_VOTERS: usize = 5;
pub const EXECUTIVE_APPROVAL_PERCENT: i64 = 50; // 0.50%
pub const EXECUTIVE_MIN_VOTERS: usize = 10;
pub const GOVERNANCE_APPROVAL_PERCENT: i64 = 100; // 1.00%
pub const GOVERNANCE_MIN_SUBSCRIBERS: usize = 10;
pub const ENTERPRISE_APPROVAL_PERCENT: i64 = 10;
pub const ENTERPRISE_MIN_VOTERS: usize = 5;

/// Curation reverse-auction window: votes inside it forfeit weight linearly.
pub const REVERSE_AUCTION_WINDOW_SECONDS: i64 = 10 * SECONDS_PER_MINUTE;

// ============================================================
// CHAIN PROPERTIES
// ============================================================

/// Tunable median chain properties.
///
/// On the live network these are the element-wise medians of producer
/// published values; here they are loaded at genesis and adjusted only
/// through the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainProperties {
    /// Base fee for account creation, in COIN shares.
    pub account_creation_fee: i64,
    /// Maintenance collateral ratio for market-issued assets (/1000).
    pub maintenance_collateral_ratio: i64,
    /// Maximum short-squeeze ratio (/1000).
    pub max_short_squeeze_ratio: i64,
    /// Share of an issuer market fee paid to registrar+referrer (/10_000).
    pub market_fee_share_percent: i64,
    /// Force settlements execute this long after the request.
    pub force_settlement_delay_seconds: i64,
    /// Force-settlement offset below the feed (/10_000).
    pub force_settlement_offset_percent: i64,
    /// Max force-settled volume per maintenance day (/10_000 of supply).
    pub max_force_settlement_volume_percent: i64,
    /// Vote curation curve exponent selector.
    pub sqrt_curation_curve: bool,
}

impl Default for ChainProperties {
    fn default() -> Self {
        Self {
            account_creation_fee: BLOCKCHAIN_PRECISION,
            maintenance_collateral_ratio: 1_750,
            max_short_squeeze_ratio: 1_100,
            market_fee_share_percent: 5_000,
            force_settlement_delay_seconds: SECONDS_PER_DAY,
            force_settlement_offset_percent: 0,
            max_force_settlement_volume_percent: 2_000,
            sqrt_curation_curve: true,
        }
    }
}

impl ChainProperties {
    pub fn account_creation_fee_asset(&self) -> Asset {
        Asset::new(self.account_creation_fee, SYMBOL_COIN)
    }

    /// Load from a YAML file; missing file falls back to defaults.
    pub fn load(path: &str) -> Result<Self, serde_yaml::Error> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_yaml::from_str(&text),
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_properties() {
        let props = ChainProperties::default();
        assert_eq!(props.maintenance_collateral_ratio, 1_750);
        assert_eq!(
            props.account_creation_fee_asset(),
            Asset::new(BLOCKCHAIN_PRECISION, SYMBOL_COIN)
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let props = ChainProperties::default();
        let text = serde_yaml::to_string(&props).unwrap();
        let back: ChainProperties = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.max_short_squeeze_ratio, props.max_short_squeeze_ratio);
    }
}
