//! Business account objects
//!
//! A business account is an account operated by a membership roster with
//! elected officers and executives. Role checks here back the
//! `signed_for != signatory` delegation path of every evaluator.

use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BusinessType {
    /// Anyone may request membership.
    Open,
    /// Members join by invite or approved request.
    Public,
    /// Members join by invite only.
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBusiness {
    pub id: ObjectId,
    pub account: AccountName,
    pub business_type: BusinessType,
    /// Highest-approved executive; the only role that may rotate owner keys.
    pub chief_executive: AccountName,
    pub executives: BTreeSet<AccountName>,
    pub officers: BTreeSet<AccountName>,
    pub members: BTreeSet<AccountName>,
    pub whitelist: BTreeSet<AccountName>,
    pub blacklist: BTreeSet<AccountName>,
    pub created: TimePoint,
    pub last_updated: TimePoint,
}

impl AccountBusiness {
    pub fn is_member(&self, account: &AccountName) -> bool {
        self.members.contains(account)
    }

    pub fn is_officer(&self, account: &AccountName) -> bool {
        self.officers.contains(account) || self.is_executive(account)
    }

    pub fn is_executive(&self, account: &AccountName) -> bool {
        self.executives.contains(account) || self.chief_executive == *account
    }

    /// General authority: any member in good standing.
    pub fn is_authorized_general(&self, account: &AccountName) -> bool {
        (self.is_member(account) || self.is_officer(account))
            && !self.blacklist.contains(account)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountBusinessKey {
    ByAccount(AccountName),
}

impl StoreObject for AccountBusiness {
    type IndexKey = AccountBusinessKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountBusinessKey> {
        vec![AccountBusinessKey::ByAccount(self.account.clone())]
    }
}

// ============================================================
// MEMBERSHIP REQUESTS / INVITES
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMemberRequest {
    pub id: ObjectId,
    pub account: AccountName,
    pub business_account: AccountName,
    pub message: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BusinessMemberRequestKey {
    ByAccountBusiness(AccountName, AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for BusinessMemberRequest {
    type IndexKey = BusinessMemberRequestKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<BusinessMemberRequestKey> {
        vec![
            BusinessMemberRequestKey::ByAccountBusiness(
                self.account.clone(),
                self.business_account.clone(),
            ),
            BusinessMemberRequestKey::ByExpiration(self.expiration),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMemberInvite {
    pub id: ObjectId,
    pub account: AccountName,
    pub business_account: AccountName,
    pub inviter: AccountName,
    pub message: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BusinessMemberInviteKey {
    ByAccountBusiness(AccountName, AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for BusinessMemberInvite {
    type IndexKey = BusinessMemberInviteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<BusinessMemberInviteKey> {
        vec![
            BusinessMemberInviteKey::ByAccountBusiness(
                self.account.clone(),
                self.business_account.clone(),
            ),
            BusinessMemberInviteKey::ByExpiration(self.expiration),
        ]
    }
}

// ============================================================
// ROLE VOTES
// ============================================================

/// A member's rank vote for a business officer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessOfficerVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub business_account: AccountName,
    pub officer: AccountName,
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BusinessOfficerVoteKey {
    ByVoterBusinessRank(AccountName, AccountName, u16),
    ByVoterOfficer(AccountName, AccountName, AccountName),
    ByBusiness(AccountName),
}

impl StoreObject for BusinessOfficerVote {
    type IndexKey = BusinessOfficerVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<BusinessOfficerVoteKey> {
        vec![
            BusinessOfficerVoteKey::ByVoterBusinessRank(
                self.account.clone(),
                self.business_account.clone(),
                self.vote_rank,
            ),
            BusinessOfficerVoteKey::ByVoterOfficer(
                self.account.clone(),
                self.business_account.clone(),
                self.officer.clone(),
            ),
            BusinessOfficerVoteKey::ByBusiness(self.business_account.clone()),
        ]
    }
}

/// A member's rank vote for a business executive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessExecutiveVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub business_account: AccountName,
    pub executive: AccountName,
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BusinessExecutiveVoteKey {
    ByVoterBusinessRank(AccountName, AccountName, u16),
    ByVoterExecutive(AccountName, AccountName, AccountName),
    ByBusiness(AccountName),
}

impl StoreObject for BusinessExecutiveVote {
    type IndexKey = BusinessExecutiveVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<BusinessExecutiveVoteKey> {
        vec![
            BusinessExecutiveVoteKey::ByVoterBusinessRank(
                self.account.clone(),
                self.business_account.clone(),
                self.vote_rank,
            ),
            BusinessExecutiveVoteKey::ByVoterExecutive(
                self.account.clone(),
                self.business_account.clone(),
                self.executive.clone(),
            ),
            BusinessExecutiveVoteKey::ByBusiness(self.business_account.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_escalation() {
        let mut biz = AccountBusiness {
            id: 1,
            account: "acme".into(),
            business_type: BusinessType::Public,
            chief_executive: "alice".into(),
            executives: BTreeSet::new(),
            officers: BTreeSet::new(),
            members: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            created: TimePoint::default(),
            last_updated: TimePoint::default(),
        };
        biz.members.insert("bob".into());
        biz.officers.insert("carol".into());

        // chief executive holds every role
        assert!(biz.is_executive(&"alice".into()));
        assert!(biz.is_officer(&"alice".into()));
        // officers are not executives
        assert!(biz.is_officer(&"carol".into()));
        assert!(!biz.is_executive(&"carol".into()));
        // plain member
        assert!(biz.is_authorized_general(&"bob".into()));
        assert!(!biz.is_officer(&"bob".into()));
    }

    #[test]
    fn test_blacklist_blocks_general_authority() {
        let mut biz = AccountBusiness {
            id: 1,
            account: "acme".into(),
            business_type: BusinessType::Open,
            chief_executive: "alice".into(),
            executives: BTreeSet::new(),
            officers: BTreeSet::new(),
            members: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            created: TimePoint::default(),
            last_updated: TimePoint::default(),
        };
        biz.members.insert("mallory".into());
        biz.blacklist.insert("mallory".into());
        assert!(!biz.is_authorized_general(&"mallory".into()));
    }
}
