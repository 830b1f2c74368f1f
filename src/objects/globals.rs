//! Singleton state objects
//!
//! One-row tables so the undo machinery covers them like everything else:
//! dynamic global properties, the reward funds, rolling comment metrics,
//! and the transaction dedup window.

use crate::amount::Asset;
use crate::config::{SYMBOL_COIN, SYMBOL_EQUITY};
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub id: ObjectId,
    pub head_block_num: BlockNum,
    pub head_block_time: TimePoint,
    /// Network revenue accumulated from burned COIN and network fee shares.
    pub accumulated_network_revenue: Asset,
    /// COIN / EQ hour-median price used to value equity voting power.
    pub equity_coin_price: crate::price::Price,
    pub last_feed_update_block: BlockNum,
    pub last_equity_distribution_block: BlockNum,
    pub last_governance_update_block: BlockNum,
    pub last_enterprise_payout_block: BlockNum,
}

impl DynamicGlobalProperties {
    pub fn genesis(id: ObjectId, genesis_time: TimePoint) -> Self {
        Self {
            id,
            head_block_num: 0,
            head_block_time: genesis_time,
            accumulated_network_revenue: Asset::zero(SYMBOL_COIN),
            equity_coin_price: crate::price::Price::new(
                Asset::new(1, SYMBOL_COIN),
                Asset::new(1, SYMBOL_EQUITY),
            ),
            last_feed_update_block: 0,
            last_equity_distribution_block: 0,
            last_governance_update_block: 0,
            last_enterprise_payout_block: 0,
        }
    }
}

/// Singleton tables index nothing; the unit key keeps the Table machinery
/// uniform.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SingletonKey;

impl StoreObject for DynamicGlobalProperties {
    type IndexKey = SingletonKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<SingletonKey> {
        Vec::new()
    }
}

// ============================================================
// REWARD FUNDS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardFund {
    pub id: ObjectId,
    /// Pays content + curation rewards.
    pub content_reward_balance: Asset,
    /// Distributed pro-rata to qualifying equity stakers each interval.
    pub equity_reward_balance: Asset,
    /// Claimed by the daily activity operation.
    pub activity_reward_balance: Asset,
    /// Running curation constant: recent claims decay over 30 days.
    pub recent_content_claims: u128,
}

impl RewardFund {
    pub fn genesis(id: ObjectId) -> Self {
        Self {
            id,
            content_reward_balance: Asset::zero(SYMBOL_COIN),
            equity_reward_balance: Asset::zero(SYMBOL_COIN),
            activity_reward_balance: Asset::zero(SYMBOL_COIN),
            recent_content_claims: 0,
        }
    }
}

impl StoreObject for RewardFund {
    type IndexKey = SingletonKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<SingletonKey> {
        Vec::new()
    }
}

// ============================================================
// COMMENT METRICS
// ============================================================

/// Rolling medians over recent posts, feeding the activity-reward
/// 10%-of-median predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommentMetrics {
    pub id: ObjectId,
    pub median_vote_count: i64,
    pub median_view_count: i64,
    pub median_vote_power: i64,
    pub median_view_power: i64,
}

impl StoreObject for CommentMetrics {
    type IndexKey = SingletonKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<SingletonKey> {
        Vec::new()
    }
}

// ============================================================
// TRANSACTION DEDUP
// ============================================================

/// Applied-transaction digests retained until expiration; duplicates are
/// rejected while a digest is in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: ObjectId,
    pub digest: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransactionRecordKey {
    ByDigest(String),
    ByExpiration(TimePoint),
}

impl StoreObject for TransactionRecord {
    type IndexKey = TransactionRecordKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<TransactionRecordKey> {
        vec![
            TransactionRecordKey::ByDigest(self.digest.clone()),
            TransactionRecordKey::ByExpiration(self.expiration),
        ]
    }
}
