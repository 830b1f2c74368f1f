//! Community objects
//!
//! A community pairs a description record with a member record carrying the
//! role sets. Join requests and invites expire like connection requests;
//! moderator votes are rank-ordered and gap-free per voter.

use crate::authority::PublicKey;
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommunityPrivacy {
    OpenPublic,
    ExclusivePublic,
    OpenPrivate,
    ExclusivePrivate,
}

impl CommunityPrivacy {
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            CommunityPrivacy::OpenPublic | CommunityPrivacy::ExclusivePublic
        )
    }

    /// Anyone may post/vote/share; only the open-public privacy allows it.
    pub fn open_interaction(&self) -> bool {
        *self == CommunityPrivacy::OpenPublic
    }

    /// Non-members may read (and view-count) content.
    pub fn open_viewing(&self) -> bool {
        self.is_public()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: ObjectId,
    pub name: AccountName,
    pub founder: AccountName,
    pub privacy: CommunityPrivacy,
    pub community_public_key: PublicKey,
    pub json: String,
    pub details: String,
    pub url: String,
    pub pinned_author: AccountName,
    pub pinned_permlink: String,
    pub created: TimePoint,
    pub last_updated: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommunityKey {
    ByName(AccountName),
}

impl StoreObject for Community {
    type IndexKey = CommunityKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommunityKey> {
        vec![CommunityKey::ByName(self.name.clone())]
    }
}

// ============================================================
// MEMBER RECORD
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMember {
    pub id: ObjectId,
    pub name: AccountName,
    pub founder: AccountName,
    pub members: BTreeSet<AccountName>,
    pub moderators: BTreeSet<AccountName>,
    pub administrators: BTreeSet<AccountName>,
    pub subscribers: BTreeSet<AccountName>,
    pub blacklist: BTreeSet<AccountName>,
    /// Accumulated moderator vote weight, by moderator.
    pub mod_weight: BTreeMap<AccountName, i64>,
    pub total_mod_weight: i64,
}

impl CommunityMember {
    pub fn new(id: ObjectId, name: AccountName, founder: AccountName) -> Self {
        let mut members = BTreeSet::new();
        members.insert(founder.clone());
        let mut moderators = BTreeSet::new();
        moderators.insert(founder.clone());
        let mut administrators = BTreeSet::new();
        administrators.insert(founder.clone());
        Self {
            id,
            name,
            founder,
            members,
            moderators,
            administrators,
            subscribers: BTreeSet::new(),
            blacklist: BTreeSet::new(),
            mod_weight: BTreeMap::new(),
            total_mod_weight: 0,
        }
    }

    pub fn is_member(&self, account: &AccountName) -> bool {
        self.members.contains(account)
    }

    pub fn is_moderator(&self, account: &AccountName) -> bool {
        self.moderators.contains(account)
    }

    pub fn is_administrator(&self, account: &AccountName) -> bool {
        self.administrators.contains(account)
    }

    pub fn is_blacklisted(&self, account: &AccountName) -> bool {
        self.blacklist.contains(account)
    }

    /// Members in good standing may invite at open privacies; blacklisted
    /// accounts never interact.
    pub fn is_authorized_interact(&self, account: &AccountName) -> bool {
        self.is_member(account) && !self.is_blacklisted(account)
    }
}

impl StoreObject for CommunityMember {
    type IndexKey = CommunityKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommunityKey> {
        vec![CommunityKey::ByName(self.name.clone())]
    }
}

// ============================================================
// JOIN REQUESTS / INVITES
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityJoinRequest {
    pub id: ObjectId,
    pub account: AccountName,
    pub community: AccountName,
    pub message: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommunityJoinRequestKey {
    ByAccountCommunity(AccountName, AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for CommunityJoinRequest {
    type IndexKey = CommunityJoinRequestKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommunityJoinRequestKey> {
        vec![
            CommunityJoinRequestKey::ByAccountCommunity(
                self.account.clone(),
                self.community.clone(),
            ),
            CommunityJoinRequestKey::ByExpiration(self.expiration),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityJoinInvite {
    pub id: ObjectId,
    pub account: AccountName,
    pub community: AccountName,
    pub inviter: AccountName,
    pub message: String,
    /// Community key encrypted to the invitee's secure key.
    pub encrypted_community_key: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommunityJoinInviteKey {
    ByAccountCommunity(AccountName, AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for CommunityJoinInvite {
    type IndexKey = CommunityJoinInviteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommunityJoinInviteKey> {
        vec![
            CommunityJoinInviteKey::ByAccountCommunity(
                self.account.clone(),
                self.community.clone(),
            ),
            CommunityJoinInviteKey::ByExpiration(self.expiration),
        ]
    }
}

// ============================================================
// MODERATOR VOTES
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityModVote {
    pub id: ObjectId,
    pub account: AccountName,
    pub community: AccountName,
    pub moderator: AccountName,
    pub vote_rank: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommunityModVoteKey {
    ByVoterCommunityRank(AccountName, AccountName, u16),
    ByVoterCommunityMod(AccountName, AccountName, AccountName),
    ByCommunityMod(AccountName, AccountName),
}

impl StoreObject for CommunityModVote {
    type IndexKey = CommunityModVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommunityModVoteKey> {
        vec![
            CommunityModVoteKey::ByVoterCommunityRank(
                self.account.clone(),
                self.community.clone(),
                self.vote_rank,
            ),
            CommunityModVoteKey::ByVoterCommunityMod(
                self.account.clone(),
                self.community.clone(),
                self.moderator.clone(),
            ),
            CommunityModVoteKey::ByCommunityMod(self.community.clone(), self.moderator.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_founder_holds_all_roles() {
        let m = CommunityMember::new(1, "rust-fans".into(), "alice".into());
        let alice = AccountName::new("alice");
        assert!(m.is_member(&alice));
        assert!(m.is_moderator(&alice));
        assert!(m.is_administrator(&alice));
        assert!(m.is_authorized_interact(&alice));
    }

    #[test]
    fn test_privacy_gates() {
        assert!(CommunityPrivacy::OpenPublic.open_interaction());
        assert!(CommunityPrivacy::ExclusivePublic.open_viewing());
        assert!(!CommunityPrivacy::ExclusivePublic.open_interaction());
        assert!(!CommunityPrivacy::OpenPrivate.open_viewing());
    }
}
