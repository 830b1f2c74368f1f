//! Escrow objects
//!
//! Three-party escrows. Funds leave the sender at creation into pending
//! supply; the agent and recipient must ratify before the deadline or the
//! maintenance pass refunds the sender.

use crate::amount::Asset;
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: ObjectId,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// Sender-scoped identifier.
    pub escrow_id: u64,
    pub balance: Asset,
    /// Agent fee, held alongside the balance until release.
    pub pending_fee: Asset,
    pub ratification_deadline: TimePoint,
    pub escrow_expiration: TimePoint,
    pub to_approved: bool,
    pub agent_approved: bool,
    pub disputed: bool,
}

impl Escrow {
    pub fn is_approved(&self) -> bool {
        self.to_approved && self.agent_approved
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EscrowKey {
    ByFromId(AccountName, u64),
    ByRatification(TimePoint),
}

impl StoreObject for Escrow {
    type IndexKey = EscrowKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<EscrowKey> {
        vec![
            EscrowKey::ByFromId(self.from.clone(), self.escrow_id),
            EscrowKey::ByRatification(self.ratification_deadline),
        ]
    }
}
