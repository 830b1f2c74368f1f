//! Virtual operations
//!
//! Non-user-originated audit events emitted by evaluators and maintenance.
//! Consumers reconstruct the audit trail from these without re-executing.

use crate::amount::Asset;
use crate::core_types::*;
use crate::price::Price;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VirtualOperation {
    FillOrder {
        order_id: ObjectId,
        owner: AccountName,
        pays: Asset,
        receives: Asset,
        fees: Asset,
        fill_price: Price,
        is_maker: bool,
    },
    ExecuteBid {
        bidder: AccountName,
        debt: Asset,
        collateral: Asset,
    },
    ReturnDelegation {
        delegator: AccountName,
        amount: Asset,
    },
    FillTransferFromSavings {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        request_id: u64,
        memo: String,
    },
    AssetSettleCancel {
        settlement: ObjectId,
        owner: AccountName,
        amount: Asset,
    },
    BidCollateral {
        bidder: AccountName,
        debt_covered: Asset,
        additional_collateral: Asset,
    },
}

impl VirtualOperation {
    pub fn name(&self) -> &'static str {
        match self {
            VirtualOperation::FillOrder { .. } => "fill_order",
            VirtualOperation::ExecuteBid { .. } => "execute_bid",
            VirtualOperation::ReturnDelegation { .. } => "return_delegation",
            VirtualOperation::FillTransferFromSavings { .. } => "fill_transfer_from_savings",
            VirtualOperation::AssetSettleCancel { .. } => "asset_settle_cancel",
            VirtualOperation::BidCollateral { .. } => "bid_collateral",
        }
    }
}
