//! Social graph objects: connections and connection requests
//!
//! A connection is an undirected pair at one of three tiers. The pair key
//! always puts the account with the lower object id first, so both
//! directions resolve to the same row.

use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectionTier {
    Connection,
    Friend,
    Companion,
}

impl ConnectionTier {
    /// Tier that must already exist before this one may be requested.
    pub fn prerequisite(&self) -> Option<ConnectionTier> {
        match self {
            ConnectionTier::Connection => None,
            ConnectionTier::Friend => Some(ConnectionTier::Connection),
            ConnectionTier::Companion => Some(ConnectionTier::Friend),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ObjectId,
    /// Account with the lower object id.
    pub account_a: AccountName,
    pub account_b: AccountName,
    pub tier: ConnectionTier,
    /// Encrypted tier keys exchanged on acceptance, one per side.
    pub encrypted_key_a: String,
    pub encrypted_key_b: String,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionKey {
    ByPair(AccountName, AccountName, ConnectionTier),
    ByAccount(AccountName),
}

impl StoreObject for Connection {
    type IndexKey = ConnectionKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ConnectionKey> {
        vec![
            ConnectionKey::ByPair(self.account_a.clone(), self.account_b.clone(), self.tier),
            ConnectionKey::ByAccount(self.account_a.clone()),
            ConnectionKey::ByAccount(self.account_b.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: ObjectId,
    pub account: AccountName,
    pub requested_account: AccountName,
    pub tier: ConnectionTier,
    pub message: String,
    pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionRequestKey {
    ByPair(AccountName, AccountName),
    ByExpiration(TimePoint),
}

impl StoreObject for ConnectionRequest {
    type IndexKey = ConnectionRequestKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ConnectionRequestKey> {
        vec![
            ConnectionRequestKey::ByPair(self.account.clone(), self.requested_account.clone()),
            ConnectionRequestKey::ByExpiration(self.expiration),
        ]
    }
}

// ============================================================
// VERIFICATIONS
// ============================================================

/// A signed attestation that `verifier_account` knows `verified_account`
/// to be a genuine person or organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountVerification {
    pub id: ObjectId,
    pub verifier_account: AccountName,
    pub verified_account: AccountName,
    /// IPFS reference to the shared verification image.
    pub shared_image: String,
    pub created: TimePoint,
    pub last_updated: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountVerificationKey {
    ByVerifierVerified(AccountName, AccountName),
    ByVerified(AccountName),
}

impl StoreObject for AccountVerification {
    type IndexKey = AccountVerificationKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<AccountVerificationKey> {
        vec![
            AccountVerificationKey::ByVerifierVerified(
                self.verifier_account.clone(),
                self.verified_account.clone(),
            ),
            AccountVerificationKey::ByVerified(self.verified_account.clone()),
        ]
    }
}
