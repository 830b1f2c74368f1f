//! civica - deterministic social-economic chain core
//!
//! A replicated state machine: a totally-ordered log of signed operations
//! re-executed by every node to reach bit-identical state.
//!
//! # Modules
//!
//! - [`core_types`] - identifier and time primitives
//! - [`error`] - the chain error taxonomy
//! - [`amount`] / [`price`] - integer asset amounts and price ratios
//! - [`config`] - consensus constants and tunable chain properties
//! - [`store`] - indexed tables with nested undo sessions
//! - [`state`] - the state aggregate handle
//! - [`ledger`] - multi-pool balance accounting against supply totals
//! - [`authority`] - weight-threshold authorities and signature checks
//! - [`objects`] - the entity model
//! - [`operations`] - the closed operation sum type
//! - [`evaluators`] - per-operation state transitions
//! - [`market`] - order book, margin engine, fees
//! - [`rewards`] - curation, activity, and equity rewards
//! - [`maintenance`] - time-gated periodic passes
//! - [`txn`] - transaction/block envelopes and application
//! - [`virtual_ops`] - the audit event sink
//! - [`logging`] - tracing setup for the node binary

pub mod amount;
pub mod authority;
pub mod config;
pub mod core_types;
pub mod error;
pub mod evaluators;
pub mod ledger;
pub mod logging;
pub mod maintenance;
pub mod market;
pub mod objects;
pub mod operations;
pub mod price;
pub mod rewards;
pub mod state;
pub mod store;
pub mod txn;
pub mod virtual_ops;

// Convenient re-exports at crate root
pub use amount::Asset;
pub use authority::{Authority, AuthorityClass, PublicKey};
pub use config::ChainProperties;
pub use core_types::{AccountName, AssetSymbol, BlockNum, ObjectId, TimePoint};
pub use error::{ChainError, ChainResult};
pub use operations::Operation;
pub use price::Price;
pub use state::State;
pub use txn::{Block, Chain, SignedTransaction, Transaction};
pub use virtual_ops::VirtualOperation;
