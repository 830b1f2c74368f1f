//! Balance objects
//!
//! Per (owner, asset) six-pool balances with the unstake schedule, plus the
//! records that move value on a timer: unstake routes, savings withdrawals,
//! and stake delegations with their returning tails.
//!
//! # Invariants (enforced by the ledger, asserted here)
//! - every pool is non-negative
//! - `staked >= delegated + to_unstake - total_unstaked`
//! - the sum of each pool over all owners equals the per-asset supply total

use crate::amount::Asset;
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub id: ObjectId,
    pub owner: AccountName,
    pub symbol: AssetSymbol,

    pub liquid_balance: i64,
    pub staked_balance: i64,
    pub savings_balance: i64,
    pub reward_balance: i64,
    pub delegated_balance: i64,
    pub receiving_balance: i64,

    /// Unstake schedule: `to_unstake` total, paid in `unstake_rate` chunks.
    pub to_unstake: i64,
    pub total_unstaked: i64,
    pub unstake_rate: i64,
    pub next_unstake_time: TimePoint,
}

impl AccountBalance {
    pub fn new(id: ObjectId, owner: AccountName, symbol: AssetSymbol) -> Self {
        Self {
            id,
            owner,
            symbol,
            liquid_balance: 0,
            staked_balance: 0,
            savings_balance: 0,
            reward_balance: 0,
            delegated_balance: 0,
            receiving_balance: 0,
            to_unstake: 0,
            total_unstaked: 0,
            unstake_rate: 0,
            next_unstake_time: TimePoint::maximum(),
        }
    }

    pub fn liquid(&self) -> Asset {
        Asset::new(self.liquid_balance, self.symbol.clone())
    }

    pub fn staked(&self) -> Asset {
        Asset::new(self.staked_balance, self.symbol.clone())
    }

    /// Stake that is neither delegated away nor already scheduled out.
    pub fn unpledged_stake(&self) -> i64 {
        self.staked_balance - self.delegated_balance - self.to_unstake + self.total_unstaked
    }

    /// Voting power contributed by this balance: own stake minus what is
    /// delegated away, plus what is received.
    pub fn voting_shares(&self) -> i64 {
        self.staked_balance - self.delegated_balance + self.receiving_balance
    }

    pub fn all_pools_zero(&self) -> bool {
        self.liquid_balance == 0
            && self.staked_balance == 0
            && self.savings_balance == 0
            && self.reward_balance == 0
            && self.delegated_balance == 0
            && self.receiving_balance == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountBalanceKey {
    ByOwnerSymbol(AccountName, AssetSymbol),
    ByNextUnstake(TimePoint),
    /// (symbol, staked) for staked-descending sweeps via `.rev()`.
    BySymbolStake(AssetSymbol, i64),
}

impl StoreObject for AccountBalance {
    type IndexKey = AccountBalanceKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountBalanceKey> {
        vec![
            AccountBalanceKey::ByOwnerSymbol(self.owner.clone(), self.symbol.clone()),
            AccountBalanceKey::ByNextUnstake(self.next_unstake_time),
            AccountBalanceKey::BySymbolStake(self.symbol.clone(), self.staked_balance),
        ]
    }
}

// ============================================================
// UNSTAKE ROUTES
// ============================================================

/// Splits each unstake chunk: `percent` of it goes to `to_account`, either
/// restaked (`auto_stake`) or as liquid. Percents per from-account sum to
/// at most 100%; the remainder pays out liquid to the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnstakeRoute {
    pub id: ObjectId,
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: i64,
    pub auto_stake: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnstakeRouteKey {
    ByFrom(AccountName),
    ByFromTo(AccountName, AccountName),
}

impl StoreObject for UnstakeRoute {
    type IndexKey = UnstakeRouteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<UnstakeRouteKey> {
        vec![
            UnstakeRouteKey::ByFrom(self.from_account.clone()),
            UnstakeRouteKey::ByFromTo(self.from_account.clone(), self.to_account.clone()),
        ]
    }
}

// ============================================================
// SAVINGS WITHDRAWALS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsWithdraw {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub request_id: u64,
    pub memo: String,
    pub complete: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SavingsWithdrawKey {
    ByFromRequest(AccountName, u64),
    ByComplete(TimePoint),
}

impl StoreObject for SavingsWithdraw {
    type IndexKey = SavingsWithdrawKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<SavingsWithdrawKey> {
        vec![
            SavingsWithdrawKey::ByFromRequest(self.from.clone(), self.request_id),
            SavingsWithdrawKey::ByComplete(self.complete),
        ]
    }
}

// ============================================================
// DELEGATIONS
// ============================================================

/// An active delegation of staked voting power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub amount: Asset,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DelegationKey {
    ByDelegator(AccountName),
    ByPair(AccountName, AccountName),
}

impl StoreObject for Delegation {
    type IndexKey = DelegationKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<DelegationKey> {
        vec![
            DelegationKey::ByDelegator(self.delegator.clone()),
            DelegationKey::ByPair(self.delegator.clone(), self.delegatee.clone()),
        ]
    }
}

/// Shares returning to the delegator after a delegation was reduced or
/// removed; the delegator's `delegated_balance` stays pledged until the
/// expiration passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationExpiration {
    pub id: ObjectId,
    pub delegator: AccountName,
    pub amount: Asset,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DelegationExpirationKey {
    ByExpiration(TimePoint),
}

impl StoreObject for DelegationExpiration {
    type IndexKey = DelegationExpirationKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<DelegationExpirationKey> {
        vec![DelegationExpirationKey::ByExpiration(self.expiration)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpledged_stake() {
        let mut bal = AccountBalance::new(1, "alice".into(), "COIN".into());
        bal.staked_balance = 100;
        bal.delegated_balance = 30;
        bal.to_unstake = 40;
        bal.total_unstaked = 10;
        assert_eq!(bal.unpledged_stake(), 40);
    }

    #[test]
    fn test_voting_shares() {
        let mut bal = AccountBalance::new(1, "alice".into(), "COIN".into());
        bal.staked_balance = 100;
        bal.delegated_balance = 25;
        bal.receiving_balance = 5;
        assert_eq!(bal.voting_shares(), 80);
    }

    #[test]
    fn test_new_balance_parks_unstake_deadline() {
        let bal = AccountBalance::new(1, "alice".into(), "COIN".into());
        assert_eq!(bal.next_unstake_time, TimePoint::maximum());
        assert!(bal.all_pools_zero());
    }
}
