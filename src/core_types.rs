//! Core types used throughout the chain state machine
//!
//! These are the fundamental identifier and time types shared by all
//! modules. They provide semantic meaning and keep index ordering explicit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Object ID - stable integer identity assigned at creation.
///
/// # Constraints:
/// - **Immutable**: once assigned, NEVER changes
/// - **Sequential**: assigned contiguously per table (1, 2, 3, ...)
/// - **Tie-breaker**: every secondary index orders by (key, ObjectId)
pub type ObjectId = u64;

/// Block number within the chain.
pub type BlockNum = u64;

/// Operation sequence number within a block (for virtual-op attribution).
pub type SeqNum = u64;

/// Fixed-point percentage: 10_000 = 100.00%
pub type Percent = u16;

/// 100% in the fixed-point percent scale.
pub const PERCENT_100: i64 = 10_000;

/// Account name - the primary cross-entity reference key.
///
/// Names are lowercase, 1..=32 chars, `[a-z0-9.-]`, and globally unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AccountName(pub String);

impl AccountName {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Structural validity: length, charset, no leading/trailing separators.
    pub fn is_valid(&self) -> bool {
        let s = self.0.as_str();
        if s.is_empty() || s.len() > 32 {
            return false;
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
        {
            return false;
        }
        !s.starts_with(['.', '-']) && !s.ends_with(['.', '-'])
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Asset symbol - uppercase ticker, 1..=16 chars, leading letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AssetSymbol(pub String);

impl AssetSymbol {
    pub fn new(sym: &str) -> Self {
        Self(sym.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        let s = self.0.as_str();
        !s.is_empty()
            && s.len() <= 16
            && s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            && s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetSymbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================
// TIME
// ============================================================

/// Chain time in whole seconds since the Unix epoch.
///
/// Evaluators never read the wall clock; the only time source is the
/// head-block time carried by `State`. Seconds precision matches the
/// 3-second block interval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimePoint(pub i64);

impl TimePoint {
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Sentinel "never" deadline (unstake schedules park here when done).
    pub const fn maximum() -> Self {
        Self(i64::MAX)
    }

    pub const fn secs(&self) -> i64 {
        self.0
    }

    pub const fn add_secs(&self, secs: i64) -> Self {
        Self(self.0 + secs)
    }

    pub const fn sub_secs(&self, secs: i64) -> Self {
        Self(self.0 - secs)
    }

    /// Signed distance in seconds from `earlier` to self.
    pub const fn since(&self, earlier: TimePoint) -> i64 {
        self.0 - earlier.0
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            None => write!(f, "@{}", self.0),
        }
    }
}

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_WEEK: i64 = 604_800;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_name_validity() {
        assert!(AccountName::new("alice").is_valid());
        assert!(AccountName::new("alice.bob-2").is_valid());
        assert!(!AccountName::new("").is_valid());
        assert!(!AccountName::new("Alice").is_valid());
        assert!(!AccountName::new(".alice").is_valid());
        assert!(!AccountName::new("alice-").is_valid());
        assert!(!AccountName::new(&"a".repeat(33)).is_valid());
    }

    #[test]
    fn test_asset_symbol_validity() {
        assert!(AssetSymbol::new("COIN").is_valid());
        assert!(AssetSymbol::new("USD").is_valid());
        assert!(!AssetSymbol::new("usd").is_valid());
        assert!(!AssetSymbol::new("").is_valid());
        assert!(!AssetSymbol::new("1COIN").is_valid());
    }

    #[test]
    fn test_time_point_arithmetic() {
        let t = TimePoint::from_secs(1_000);
        assert_eq!(t.add_secs(SECONDS_PER_DAY).secs(), 87_400);
        assert_eq!(t.add_secs(60).since(t), 60);
        assert!(TimePoint::maximum() > t);
    }
}
