//! Transactions and blocks
//!
//! The operation envelope: TaPoS ref-block binding, expiration windows,
//! digest-keyed duplicate rejection, authority-class signature checking,
//! and the two-level undo discipline (one inner session per transaction,
//! one outer session per block).

use crate::authority::{satisfies, AuthorityClass, PublicKey};
use crate::config;
use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::maintenance;
use crate::objects::{TransactionRecord, TransactionRecordKey};
use crate::operations::Operation;
use crate::state::State;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Low 16 bits of the referenced block number (TaPoS).
    pub ref_block_num: u16,
    /// Leading 32 bits of the referenced block id (TaPoS).
    pub ref_block_prefix: u32,
    pub expiration: TimePoint,
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Deterministic content digest keying the dedupe window.
    pub fn digest(&self) -> String {
        let body = serde_json::to_vec(self).expect("transaction serializes");
        hex::encode(Sha256::digest(&body))
    }
}

/// A transaction whose signatures were verified upstream; the envelope
/// carries the set of keys that actually signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub verified_keys: BTreeSet<PublicKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_num: BlockNum,
    pub previous: String,
    pub timestamp: TimePoint,
    pub producer: AccountName,
    pub transactions: Vec<SignedTransaction>,
}

impl Block {
    /// Block id: digest of the header fields.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.block_num.to_le_bytes());
        hasher.update(self.previous.as_bytes());
        hasher.update(self.timestamp.secs().to_le_bytes());
        hasher.update(self.producer.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// TaPoS registration values: (slot, prefix).
    pub fn tapos_slot(&self) -> (u16, u32) {
        let id = self.id();
        let raw = hex::decode(&id[..8]).expect("block id is hex");
        let prefix = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        ((self.block_num & 0xffff) as u16, prefix)
    }
}

/// Applies the ordered block stream to a [`State`]. Owns the TaPoS slot
/// ring, which is consensus metadata updated only on committed blocks.
pub struct Chain {
    pub state: State,
    recent_slots: FxHashMap<u16, u32>,
}

impl Chain {
    pub fn new(state: State) -> Self {
        Self {
            state,
            recent_slots: FxHashMap::default(),
        }
    }

    // ============================================================
    // TRANSACTION CHECKS
    // ============================================================

    fn check_tapos(&self, tx: &Transaction) -> ChainResult {
        // (0, 0) binds to genesis and is always acceptable
        if tx.ref_block_num == 0 && tx.ref_block_prefix == 0 {
            return Ok(());
        }
        match self.recent_slots.get(&tx.ref_block_num) {
            Some(prefix) if *prefix == tx.ref_block_prefix => Ok(()),
            _ => Err(ChainError::precondition(
                "transaction references an unknown or outdated block",
            )),
        }
    }

    fn check_expiration(&self, tx: &Transaction) -> ChainResult {
        let now = self.state.head_block_time();
        ensure!(
            tx.expiration > now,
            ChainError::precondition("transaction has expired")
        );
        ensure!(
            tx.expiration.since(now) <= config::MAX_TIME_UNTIL_EXPIRATION,
            ChainError::precondition("transaction expiration too far in the future")
        );
        Ok(())
    }

    fn check_duplicate(&self, digest: &str) -> ChainResult {
        ensure!(
            self.state
                .transactions
                .find_by_key(TransactionRecordKey::ByDigest(digest.to_string()))
                .is_none(),
            ChainError::precondition("duplicate transaction")
        );
        Ok(())
    }

    /// Signature sufficiency: the verified key set must satisfy an
    /// authority of the operation's class or any stronger class.
    fn check_operation_authority(
        &self,
        op: &Operation,
        keys: &BTreeSet<PublicKey>,
    ) -> ChainResult {
        let signatory = op.signatory();
        let record = self.state.get_account_authority(signatory)?;
        let candidates: &[&crate::authority::Authority] = match op.required_class() {
            AuthorityClass::Posting => {
                &[&record.posting_auth, &record.active_auth, &record.owner_auth]
            }
            AuthorityClass::Active => &[&record.active_auth, &record.owner_auth],
            AuthorityClass::Owner => &[&record.owner_auth],
        };
        for authority in candidates {
            if satisfies(authority, keys, &self.state) {
                return Ok(());
            }
        }
        Err(ChainError::MissingAuthority(format!(
            "signatures do not meet the {:?}-class threshold for {signatory}",
            op.required_class()
        )))
    }

    /// Apply one transaction inside its own undo session.
    pub fn apply_transaction(&mut self, signed: &SignedTransaction) -> ChainResult {
        self.check_expiration(&signed.tx)?;
        self.check_tapos(&signed.tx)?;
        let digest = signed.tx.digest();
        self.check_duplicate(&digest)?;
        ensure!(
            !signed.tx.operations.is_empty(),
            ChainError::invalid("transaction carries no operations")
        );

        self.state.begin_session();
        let result = (|| -> ChainResult {
            for op in &signed.tx.operations {
                self.check_operation_authority(op, &signed.verified_keys)?;
                crate::evaluators::apply_operation(&mut self.state, op)?;
            }
            let expiration = signed.tx.expiration;
            self.state.transactions.create(|id| TransactionRecord {
                id,
                digest: digest.clone(),
                expiration,
            });
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.state.commit_session();
                Ok(())
            }
            Err(err) => {
                debug!(%err, "transaction rejected");
                self.state.undo_session();
                Err(err)
            }
        }
    }

    // ============================================================
    // BLOCK APPLICATION
    // ============================================================

    /// Apply a whole block atomically: every transaction plus the
    /// maintenance passes, or nothing.
    pub fn apply_block(&mut self, block: &Block) -> ChainResult {
        ensure!(
            block.block_num == self.state.head_block_num() + 1,
            ChainError::precondition(format!(
                "block {} does not extend head {}",
                block.block_num,
                self.state.head_block_num()
            ))
        );
        ensure!(
            block.timestamp > self.state.head_block_time(),
            ChainError::precondition("block time must advance")
        );

        self.state.begin_session();
        let result = (|| -> ChainResult {
            self.state.props_modify(|props| {
                props.head_block_num = block.block_num;
                props.head_block_time = block.timestamp;
            });
            for signed in &block.transactions {
                self.apply_transaction(signed)?;
            }
            maintenance::run_maintenance(&mut self.state)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.state.commit_session();
                let (slot, prefix) = block.tapos_slot();
                self.recent_slots.insert(slot, prefix);
                info!(
                    block = block.block_num,
                    txs = block.transactions.len(),
                    "block applied"
                );
                Ok(())
            }
            Err(err) => {
                warn!(block = block.block_num, %err, "block rejected");
                self.state.undo_session();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Asset;
    use crate::config::{ChainProperties, SYMBOL_COIN};
    use crate::operations::Transfer;
    use crate::state::bootstrap_account;

    fn setup() -> Chain {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["alice", "bob"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_liquid_balance(&"alice".into(), &Asset::new(500, SYMBOL_COIN))
            .unwrap();
        Chain::new(state)
    }

    fn default_keys() -> BTreeSet<PublicKey> {
        // bootstrap accounts authorize with the default key
        let mut keys = BTreeSet::new();
        keys.insert(PublicKey::default());
        keys
    }

    fn transfer_tx(amount: i64, expiration: i64) -> SignedTransaction {
        SignedTransaction {
            tx: Transaction {
                ref_block_num: 0,
                ref_block_prefix: 0,
                expiration: TimePoint::from_secs(expiration),
                operations: vec![Operation::Transfer(Transfer {
                    signatory: "alice".into(),
                    from: "alice".into(),
                    to: "bob".into(),
                    amount: Asset::new(amount, SYMBOL_COIN),
                    memo: String::new(),
                })],
            },
            verified_keys: default_keys(),
        }
    }

    fn block(chain: &Chain, transactions: Vec<SignedTransaction>) -> Block {
        Block {
            block_num: chain.state.head_block_num() + 1,
            previous: "genesis".into(),
            timestamp: chain.state.head_block_time().add_secs(3),
            producer: "alice".into(),
            transactions,
        }
    }

    #[test]
    fn test_block_applies_transfer() {
        let mut chain = setup();
        let b = block(&chain, vec![transfer_tx(100, 2_000)]);
        chain.apply_block(&b).unwrap();
        assert_eq!(
            chain
                .state
                .get_liquid_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            100
        );
        assert_eq!(chain.state.head_block_num(), 1);
    }

    #[test]
    fn test_duplicate_transaction_rejected() {
        let mut chain = setup();
        let tx = transfer_tx(10, 2_000);
        let b = block(&chain, vec![tx.clone(), tx]);
        // the second copy dooms the whole block
        assert!(chain.apply_block(&b).is_err());
        // nothing persisted
        assert_eq!(
            chain
                .state
                .get_liquid_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            0
        );
        assert_eq!(chain.state.head_block_num(), 0);
    }

    #[test]
    fn test_failed_block_rolls_back_entirely() {
        let mut chain = setup();
        // second transfer overdraws and fails the block
        let b = block(&chain, vec![transfer_tx(400, 2_000), transfer_tx(400, 2_001)]);
        assert!(chain.apply_block(&b).is_err());
        assert_eq!(
            chain
                .state
                .get_liquid_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            500
        );
        chain.state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_expired_transaction_rejected() {
        let mut chain = setup();
        let b = block(&chain, vec![transfer_tx(10, 900)]);
        assert!(chain.apply_block(&b).is_err());
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut chain = setup();
        let mut tx = transfer_tx(10, 2_000);
        tx.verified_keys.clear();
        let b = block(&chain, vec![tx]);
        let err = chain.apply_block(&b).unwrap_err();
        assert!(matches!(err, ChainError::MissingAuthority(_)));
    }

    #[test]
    fn test_tapos_binding() {
        let mut chain = setup();
        let b = block(&chain, vec![]);
        chain.apply_block(&b).unwrap();
        let (slot, prefix) = b.tapos_slot();

        // bound to the applied block: accepted
        let mut bound = transfer_tx(10, 2_100);
        bound.tx.ref_block_num = slot;
        bound.tx.ref_block_prefix = prefix;
        let b2 = block(&chain, vec![bound]);
        chain.apply_block(&b2).unwrap();

        // bound to a block we never saw: rejected
        let mut stale = transfer_tx(10, 2_200);
        stale.tx.ref_block_num = 9;
        stale.tx.ref_block_prefix = 1234;
        let b3 = block(&chain, vec![stale]);
        assert!(chain.apply_block(&b3).is_err());
    }
}
