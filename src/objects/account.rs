//! Account objects
//!
//! The account record, its three weight-threshold authorities, the owner
//! authority history consulted by recovery, and pending recovery requests.

use crate::authority::{Authority, PublicKey};
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum MembershipTier {
    #[default]
    None,
    Standard,
    Mid,
    Top,
}

/// Power meters run 0..=PERCENT_100 and regenerate over time; each
/// qualifying action spends from its meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerMeters {
    pub voting_power: i16,
    pub viewing_power: i16,
    pub sharing_power: i16,
    pub commenting_power: i16,
}

impl Default for PowerMeters {
    fn default() -> Self {
        Self {
            voting_power: PERCENT_100 as i16,
            viewing_power: PERCENT_100 as i16,
            sharing_power: PERCENT_100 as i16,
            commenting_power: PERCENT_100 as i16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: ObjectId,
    pub name: AccountName,
    pub active: bool,

    pub secure_public_key: PublicKey,
    pub connection_public_key: PublicKey,
    pub friend_public_key: PublicKey,
    pub companion_public_key: PublicKey,

    pub registrar: AccountName,
    pub referrer: AccountName,
    /// Empty proxy means the account votes for itself.
    pub proxy: AccountName,
    pub recovery_account: AccountName,
    pub reset_account: AccountName,
    pub reset_delay_days: u16,

    pub details: String,
    pub url: String,
    pub json: String,

    pub membership: MembershipTier,
    pub membership_expiration: TimePoint,
    /// Share of registrar market-fee rewards passed to the referrer (/10_000).
    pub referrer_rewards_percentage: i64,

    pub producer_vote_count: u32,
    pub officer_vote_count: u32,
    pub post_count: u32,
    pub recent_activity_claims: u32,
    pub savings_withdraw_requests: u32,
    pub decline_voting: bool,

    pub powers: PowerMeters,

    pub created: TimePoint,
    pub last_updated: TimePoint,
    pub last_vote_time: TimePoint,
    pub last_view_time: TimePoint,
    pub last_share_time: TimePoint,
    pub last_post: TimePoint,
    pub last_root_post: TimePoint,
    pub last_transfer_time: TimePoint,
    pub last_activity_reward: TimePoint,
    pub last_account_recovery: TimePoint,
}

impl Account {
    /// Fresh account with every timestamp at `now` and full power meters.
    pub fn new(id: ObjectId, name: AccountName, now: TimePoint) -> Self {
        Self {
            id,
            name,
            active: true,
            secure_public_key: PublicKey::default(),
            connection_public_key: PublicKey::default(),
            friend_public_key: PublicKey::default(),
            companion_public_key: PublicKey::default(),
            registrar: AccountName::default(),
            referrer: AccountName::default(),
            proxy: AccountName::default(),
            recovery_account: AccountName::default(),
            reset_account: AccountName::default(),
            reset_delay_days: 7,
            details: String::new(),
            url: String::new(),
            json: String::new(),
            membership: MembershipTier::None,
            membership_expiration: TimePoint::default(),
            referrer_rewards_percentage: 0,
            producer_vote_count: 0,
            officer_vote_count: 0,
            post_count: 0,
            recent_activity_claims: 0,
            savings_withdraw_requests: 0,
            decline_voting: false,
            powers: PowerMeters::default(),
            created: now,
            last_updated: now,
            last_vote_time: now,
            last_view_time: now,
            last_share_time: now,
            last_post: now,
            last_root_post: now,
            last_transfer_time: now,
            last_activity_reward: now,
            last_account_recovery: TimePoint::default(),
        }
    }

    /// Latest moment the account did anything that counts as activity,
    /// used by the reset-account inactivity gate.
    pub fn latest_activity(&self) -> TimePoint {
        [
            self.last_updated,
            self.last_vote_time,
            self.last_view_time,
            self.last_share_time,
            self.last_post,
            self.last_root_post,
            self.last_transfer_time,
            self.last_activity_reward,
        ]
        .into_iter()
        .max()
        .unwrap_or(self.created)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountKey {
    ByName(AccountName),
    /// Groups accounts under their proxy for recursive vote recompute.
    ByProxy(AccountName),
}

impl StoreObject for Account {
    type IndexKey = AccountKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountKey> {
        let mut keys = vec![AccountKey::ByName(self.name.clone())];
        if !self.proxy.is_empty() {
            keys.push(AccountKey::ByProxy(self.proxy.clone()));
        }
        keys
    }
}

// ============================================================
// AUTHORITY RECORD
// ============================================================

/// The three authorities of an account. Owner rotation is rate limited
/// and archived into [`AuthorityHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAuthorityRecord {
    pub id: ObjectId,
    pub account: AccountName,
    pub owner_auth: Authority,
    pub active_auth: Authority,
    pub posting_auth: Authority,
    pub last_owner_update: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountAuthorityKey {
    ByAccount(AccountName),
}

impl StoreObject for AccountAuthorityRecord {
    type IndexKey = AccountAuthorityKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountAuthorityKey> {
        vec![AccountAuthorityKey::ByAccount(self.account.clone())]
    }
}

// ============================================================
// OWNER AUTHORITY HISTORY
// ============================================================

/// A superseded owner authority, retained for the recovery window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityHistory {
    pub id: ObjectId,
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthorityHistoryKey {
    ByAccount(AccountName),
    ByCreated(TimePoint),
}

impl StoreObject for AuthorityHistory {
    type IndexKey = AuthorityHistoryKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AuthorityHistoryKey> {
        vec![
            AuthorityHistoryKey::ByAccount(self.account.clone()),
            AuthorityHistoryKey::ByCreated(self.created),
        ]
    }
}

// ============================================================
// RECOVERY REQUEST
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRequest {
    pub id: ObjectId,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecoveryRequestKey {
    ByAccount(AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for RecoveryRequest {
    type IndexKey = RecoveryRequestKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<RecoveryRequestKey> {
        vec![
            RecoveryRequestKey::ByAccount(self.account_to_recover.clone()),
            RecoveryRequestKey::ByExpiration(self.expiration),
        ]
    }
}

// ============================================================
// FOLLOWING SETS
// ============================================================

/// Follower/following/filtered sets, mutated symmetrically: when A follows
/// B, A's `following` and B's `followers` change in the same operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFollowing {
    pub id: ObjectId,
    pub account: AccountName,
    pub following: BTreeSet<AccountName>,
    pub followers: BTreeSet<AccountName>,
    pub filtered: BTreeSet<AccountName>,
    pub followed_tags: BTreeSet<String>,
    pub filtered_tags: BTreeSet<String>,
    pub last_updated: TimePoint,
}

impl AccountFollowing {
    pub fn is_following(&self, other: &AccountName) -> bool {
        self.following.contains(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountFollowingKey {
    ByAccount(AccountName),
}

impl StoreObject for AccountFollowing {
    type IndexKey = AccountFollowingKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountFollowingKey> {
        vec![AccountFollowingKey::ByAccount(self.account.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_activity_takes_max() {
        let mut acc = Account::new(1, AccountName::new("alice"), TimePoint::from_secs(100));
        acc.last_transfer_time = TimePoint::from_secs(900);
        assert_eq!(acc.latest_activity(), TimePoint::from_secs(900));
        acc.last_vote_time = TimePoint::from_secs(1_000);
        assert_eq!(acc.latest_activity(), TimePoint::from_secs(1_000));
    }

    #[test]
    fn test_proxy_key_only_when_set() {
        let mut acc = Account::new(1, AccountName::new("alice"), TimePoint::default());
        assert_eq!(acc.index_keys().len(), 1);
        acc.proxy = AccountName::new("carol");
        assert_eq!(acc.index_keys().len(), 2);
    }
}
