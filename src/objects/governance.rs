//! Governance objects
//!
//! Producers and their rank votes, approval-gated network roles (officers,
//! executive boards, governance accounts), and the auxiliary service roles
//! (supernodes, interfaces, mediators). Approval flags are recomputed every
//! governance maintenance pass from voter power and voter counts.

use crate::amount::Asset;
use crate::core_types::*;
use crate::price::Price;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

// ============================================================
// PRODUCERS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: ObjectId,
    pub owner: AccountName,
    pub active: bool,
    pub details: String,
    pub url: String,
    pub json: String,
    /// Accumulated voting power from producer votes.
    pub voting_power: i64,
    pub vote_count: u32,
    /// Published exchange rate for the stable asset (debt / collateral).
    pub feed: Price,
    pub last_feed_update: TimePoint,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProducerKey {
    ByName(AccountName),
    /// (voting_power, id): iterate `.rev()` for the top producer.
    ByVotes(i64),
}

impl StoreObject for Producer {
    type IndexKey = ProducerKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ProducerKey> {
        vec![
            ProducerKey::ByName(self.owner.clone()),
            ProducerKey::ByVotes(self.voting_power),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub producer: AccountName,
    /// 1-based rank; ranks per account are gap-free.
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProducerVoteKey {
    ByAccountRank(AccountName, u16),
    ByAccountProducer(AccountName, AccountName),
    ByProducer(AccountName),
}

impl StoreObject for ProducerVote {
    type IndexKey = ProducerVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ProducerVoteKey> {
        vec![
            ProducerVoteKey::ByAccountRank(self.account.clone(), self.vote_rank),
            ProducerVoteKey::ByAccountProducer(self.account.clone(), self.producer.clone()),
            ProducerVoteKey::ByProducer(self.producer.clone()),
        ]
    }
}

// ============================================================
// NETWORK OFFICERS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OfficerType {
    Development,
    Marketing,
    Advocacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOfficer {
    pub id: ObjectId,
    pub account: AccountName,
    pub officer_type: OfficerType,
    pub active: bool,
    /// Recomputed each governance pass.
    pub officer_approved: bool,
    pub voting_power: i64,
    pub vote_count: u32,
    pub reward_currency: AssetSymbol,
    pub details: String,
    pub url: String,
    pub json: String,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NetworkOfficerKey {
    ByAccount(AccountName),
    ByTypeVotes(OfficerType, i64),
}

impl StoreObject for NetworkOfficer {
    type IndexKey = NetworkOfficerKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<NetworkOfficerKey> {
        vec![
            NetworkOfficerKey::ByAccount(self.account.clone()),
            NetworkOfficerKey::ByTypeVotes(self.officer_type, self.voting_power),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOfficerVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub officer: AccountName,
    pub officer_type: OfficerType,
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NetworkOfficerVoteKey {
    ByVoterTypeRank(AccountName, OfficerType, u16),
    ByVoterOfficer(AccountName, AccountName),
    ByOfficer(AccountName),
}

impl StoreObject for NetworkOfficerVote {
    type IndexKey = NetworkOfficerVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<NetworkOfficerVoteKey> {
        vec![
            NetworkOfficerVoteKey::ByVoterTypeRank(
                self.account.clone(),
                self.officer_type,
                self.vote_rank,
            ),
            NetworkOfficerVoteKey::ByVoterOfficer(self.account.clone(), self.officer.clone()),
            NetworkOfficerVoteKey::ByOfficer(self.officer.clone()),
        ]
    }
}

// ============================================================
// EXECUTIVE BOARDS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveBoard {
    pub id: ObjectId,
    pub account: AccountName,
    pub active: bool,
    pub board_approved: bool,
    pub voting_power: i64,
    pub vote_count: u32,
    /// Requested daily budget in the reward currency.
    pub budget: Asset,
    pub details: String,
    pub url: String,
    pub json: String,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutiveBoardKey {
    ByAccount(AccountName),
    ByVotes(i64),
}

impl StoreObject for ExecutiveBoard {
    type IndexKey = ExecutiveBoardKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ExecutiveBoardKey> {
        vec![
            ExecutiveBoardKey::ByAccount(self.account.clone()),
            ExecutiveBoardKey::ByVotes(self.voting_power),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveBoardVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub executive_board: AccountName,
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutiveBoardVoteKey {
    ByVoterRank(AccountName, u16),
    ByVoterBoard(AccountName, AccountName),
    ByBoard(AccountName),
}

impl StoreObject for ExecutiveBoardVote {
    type IndexKey = ExecutiveBoardVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ExecutiveBoardVoteKey> {
        vec![
            ExecutiveBoardVoteKey::ByVoterRank(self.account.clone(), self.vote_rank),
            ExecutiveBoardVoteKey::ByVoterBoard(
                self.account.clone(),
                self.executive_board.clone(),
            ),
            ExecutiveBoardVoteKey::ByBoard(self.executive_board.clone()),
        ]
    }
}

// ============================================================
// GOVERNANCE ACCOUNTS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAccount {
    pub id: ObjectId,
    pub account: AccountName,
    pub active: bool,
    pub account_approved: bool,
    pub subscriber_power: i64,
    pub subscriber_count: u32,
    pub details: String,
    pub url: String,
    pub json: String,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GovernanceAccountKey {
    ByAccount(AccountName),
    BySubscribers(i64),
}

impl StoreObject for GovernanceAccount {
    type IndexKey = GovernanceAccountKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<GovernanceAccountKey> {
        vec![
            GovernanceAccountKey::ByAccount(self.account.clone()),
            GovernanceAccountKey::BySubscribers(self.subscriber_power),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSubscription {
    pub id: ObjectId,
    pub account: AccountName,
    pub governance_account: AccountName,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GovernanceSubscriptionKey {
    BySubscriberGovernance(AccountName, AccountName),
    ByGovernance(AccountName),
}

impl StoreObject for GovernanceSubscription {
    type IndexKey = GovernanceSubscriptionKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<GovernanceSubscriptionKey> {
        vec![
            GovernanceSubscriptionKey::BySubscriberGovernance(
                self.account.clone(),
                self.governance_account.clone(),
            ),
            GovernanceSubscriptionKey::ByGovernance(self.governance_account.clone()),
        ]
    }
}

// ============================================================
// SERVICE ROLES
// ============================================================

/// Shared shape of the supernode/interface/mediator service declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceRoleType {
    Supernode,
    Interface,
    Mediator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRole {
    pub id: ObjectId,
    pub account: AccountName,
    pub role: ServiceRoleType,
    pub active: bool,
    pub details: String,
    pub url: String,
    pub json: String,
    /// Mediators pledge stake; zero for the other roles.
    pub mediation_stake: Asset,
    pub created: TimePoint,
    pub last_updated: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceRoleKey {
    ByAccountRole(AccountName, ServiceRoleType),
}

impl StoreObject for ServiceRole {
    type IndexKey = ServiceRoleKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ServiceRoleKey> {
        vec![ServiceRoleKey::ByAccountRole(self.account.clone(), self.role)]
    }
}
