//! Chain error taxonomy
//!
//! Every evaluator, ledger entry point, and market routine surfaces one of
//! these kinds. Any failure inside an operation aborts the enclosing
//! transaction; the outer undo session rolls the whole block back.

use crate::core_types::{AccountName, AssetSymbol};
use thiserror::Error;

/// Result alias used across the consensus core.
pub type ChainResult<T = ()> = Result<T, ChainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Signature set does not meet the required authority threshold.
    #[error("missing authority: {0}")]
    MissingAuthority(String),

    /// A state-dependent invariant is not satisfied.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// The asset ledger rejected a negative delta.
    #[error("insufficient balance: {owner} has {available} of {symbol}, {required} required")]
    InsufficientBalance {
        owner: AccountName,
        symbol: AssetSymbol,
        available: i64,
        required: i64,
    },

    /// Staked funds are pledged (delegated or unstaking) beyond the request.
    #[error("insufficient stake: {owner} cannot pledge {required} {symbol}")]
    InsufficientStake {
        owner: AccountName,
        symbol: AssetSymbol,
        required: i64,
    },

    /// A referenced entity does not exist.
    #[error("unknown {kind}: {name}")]
    UnknownEntity { kind: &'static str, name: String },

    /// A structural check failed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A state change would force a global settlement the caller disallowed.
    #[error("black swan attempted on asset {0}")]
    BlackSwanAttempted(AssetSymbol),

    /// An interval constraint was hit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Only positive deltas may reach the null sink.
    #[error("invalid sink: null account cannot be debited")]
    InvalidSink,

    /// An amount pair mixed asset symbols.
    #[error("symbol mismatch: expected {expected}, got {actual}")]
    SymbolMismatch {
        expected: AssetSymbol,
        actual: AssetSymbol,
    },

    /// Arithmetic left the representable range.
    #[error("amount overflow in {0}")]
    AmountOverflow(&'static str),
}

impl ChainError {
    pub fn unknown(kind: &'static str, name: impl ToString) -> Self {
        ChainError::UnknownEntity {
            kind,
            name: name.to_string(),
        }
    }

    pub fn precondition(msg: impl ToString) -> Self {
        ChainError::PreconditionViolated(msg.to_string())
    }

    pub fn invalid(msg: impl ToString) -> Self {
        ChainError::InvalidArgument(msg.to_string())
    }
}

/// Shorthand used by evaluators: bail with `PreconditionViolated` unless
/// the condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainError::InsufficientBalance {
            owner: AccountName::new("alice"),
            symbol: AssetSymbol::new("COIN"),
            available: 10,
            required: 25,
        };
        let msg = err.to_string();
        assert!(msg.contains("alice"));
        assert!(msg.contains("25"));
    }

    #[test]
    fn test_unknown_helper() {
        let err = ChainError::unknown("account", "bob");
        assert_eq!(err.to_string(), "unknown account: bob");
    }
}
