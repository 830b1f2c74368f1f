//! Weight-threshold authorities
//!
//! An authority is a threshold plus weighted key and account entries. A
//! signature set satisfies an authority when the weights of the signed keys,
//! plus recursively-satisfied account entries, reach the threshold.
//! Recursion is capped at [`crate::config::MAX_SIG_CHECK_DEPTH`].
//!
//! Signature verification itself happens upstream; the resolver consumes
//! the set of public keys whose signatures were verified.

use crate::config::MAX_SIG_CHECK_DEPTH;
use crate::core_types::AccountName;
use crate::error::{ChainError, ChainResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// An ed25519 public key in authority entries and account key slots.
///
/// Stored as raw bytes with a total order so key maps iterate
/// deterministically; conversion to a dalek `VerifyingKey` validates the
/// point encoding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PublicKey(#[serde(with = "hex_bytes")] pub [u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_verifying_key(&self) -> ChainResult<ed25519_dalek::VerifyingKey> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|_| ChainError::invalid("malformed public key"))
    }
}

impl From<ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(vk: ed25519_dalek::VerifyingKey) -> Self {
        Self(vk.to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(d)?;
        let raw = hex::decode(&text).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

// ============================================================
// AUTHORITY
// ============================================================

/// Operation classes, in escalating order of required authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuthorityClass {
    Posting,
    Active,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Authority {
    pub weight_threshold: u32,
    /// Referenced accounts contribute their own active authority.
    pub account_auths: BTreeMap<AccountName, u16>,
    pub key_auths: BTreeMap<PublicKey, u16>,
}

impl Authority {
    pub fn single_key(key: PublicKey) -> Self {
        let mut key_auths = BTreeMap::new();
        key_auths.insert(key, 1);
        Self {
            weight_threshold: 1,
            account_auths: BTreeMap::new(),
            key_auths,
        }
    }

    /// Sum of all entry weights.
    pub fn total_weight(&self) -> u64 {
        self.account_auths
            .values()
            .chain(self.key_auths.values())
            .map(|w| *w as u64)
            .sum()
    }

    /// An impossible authority can never be satisfied. Rejected everywhere
    /// except as the cancel form of a pending recovery request.
    pub fn is_impossible(&self) -> bool {
        self.total_weight() < self.weight_threshold as u64
    }

    /// Open authorities (zero threshold) authorize anyone; only the
    /// recovery-cancel path accepts them.
    pub fn is_open(&self) -> bool {
        self.weight_threshold == 0
    }

    pub fn validate(&self) -> ChainResult {
        for name in self.account_auths.keys() {
            if !name.is_valid() {
                return Err(ChainError::invalid(format!(
                    "invalid account name in authority: {name}"
                )));
            }
        }
        Ok(())
    }
}

/// Resolves account names to their stored authorities during a check.
pub trait AuthorityLookup {
    fn authority_of(&self, account: &AccountName, class: AuthorityClass) -> Option<Authority>;
}

/// Check whether `signed_keys` satisfies `authority`, expanding account
/// entries recursively via `lookup` down to the depth cap.
pub fn satisfies(
    authority: &Authority,
    signed_keys: &BTreeSet<PublicKey>,
    lookup: &impl AuthorityLookup,
) -> bool {
    satisfies_at_depth(authority, signed_keys, lookup, 0)
}

fn satisfies_at_depth(
    authority: &Authority,
    signed_keys: &BTreeSet<PublicKey>,
    lookup: &impl AuthorityLookup,
    depth: usize,
) -> bool {
    if authority.weight_threshold == 0 {
        return false;
    }
    let mut weight: u64 = 0;
    for (key, w) in &authority.key_auths {
        if signed_keys.contains(key) {
            weight += *w as u64;
            if weight >= authority.weight_threshold as u64 {
                return true;
            }
        }
    }
    if depth >= MAX_SIG_CHECK_DEPTH {
        return false;
    }
    for (name, w) in &authority.account_auths {
        if let Some(inner) = lookup.authority_of(name, AuthorityClass::Active) {
            if satisfies_at_depth(&inner, signed_keys, lookup, depth + 1) {
                weight += *w as u64;
                if weight >= authority.weight_threshold as u64 {
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> PublicKey {
        PublicKey::from_bytes([byte; 32])
    }

    struct MapLookup(BTreeMap<AccountName, Authority>);

    impl AuthorityLookup for MapLookup {
        fn authority_of(&self, account: &AccountName, _class: AuthorityClass) -> Option<Authority> {
            self.0.get(account).cloned()
        }
    }

    fn keys(list: &[PublicKey]) -> BTreeSet<PublicKey> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_single_key_threshold() {
        let auth = Authority::single_key(key(1));
        let lookup = MapLookup(BTreeMap::new());
        assert!(satisfies(&auth, &keys(&[key(1)]), &lookup));
        assert!(!satisfies(&auth, &keys(&[key(2)]), &lookup));
    }

    #[test]
    fn test_weighted_multisig() {
        let mut auth = Authority::default();
        auth.weight_threshold = 2;
        auth.key_auths.insert(key(1), 1);
        auth.key_auths.insert(key(2), 1);
        auth.key_auths.insert(key(3), 2);
        let lookup = MapLookup(BTreeMap::new());

        assert!(!satisfies(&auth, &keys(&[key(1)]), &lookup));
        assert!(satisfies(&auth, &keys(&[key(1), key(2)]), &lookup));
        assert!(satisfies(&auth, &keys(&[key(3)]), &lookup));
    }

    #[test]
    fn test_recursive_account_expansion() {
        let mut outer = Authority::default();
        outer.weight_threshold = 1;
        outer.account_auths.insert(AccountName::new("inner"), 1);

        let mut map = BTreeMap::new();
        map.insert(AccountName::new("inner"), Authority::single_key(key(9)));
        let lookup = MapLookup(map);

        assert!(satisfies(&outer, &keys(&[key(9)]), &lookup));
        assert!(!satisfies(&outer, &keys(&[key(1)]), &lookup));
    }

    #[test]
    fn test_depth_cap() {
        // a -> b -> c -> key, deeper than MAX_SIG_CHECK_DEPTH
        let mut a = Authority::default();
        a.weight_threshold = 1;
        a.account_auths.insert(AccountName::new("b"), 1);
        let mut b = Authority::default();
        b.weight_threshold = 1;
        b.account_auths.insert(AccountName::new("c"), 1);
        let mut c = Authority::default();
        c.weight_threshold = 1;
        c.account_auths.insert(AccountName::new("d"), 1);
        let mut d = Authority::default();
        d.weight_threshold = 1;
        d.key_auths.insert(key(7), 1);

        let mut map = BTreeMap::new();
        map.insert(AccountName::new("b"), b);
        map.insert(AccountName::new("c"), c);
        map.insert(AccountName::new("d"), d);
        let lookup = MapLookup(map);

        assert!(!satisfies(&a, &keys(&[key(7)]), &lookup));
    }

    #[test]
    fn test_impossible_authority() {
        let mut auth = Authority::default();
        auth.weight_threshold = 5;
        auth.key_auths.insert(key(1), 1);
        assert!(auth.is_impossible());
        let lookup = MapLookup(BTreeMap::new());
        assert!(!satisfies(&auth, &keys(&[key(1)]), &lookup));
    }
}
