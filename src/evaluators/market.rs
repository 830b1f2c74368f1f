//! Market and escrow evaluators
//!
//! Thin shims over the order book and margin engine, plus feed publication
//! and the three-party escrow lifecycle.

use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::state::State;
use tracing::info;

pub fn limit_order_create(state: &mut State, op: &LimitOrderCreate) -> ChainResult {
    state.place_limit_order(
        &op.owner,
        op.order_id,
        &op.amount_to_sell,
        &op.exchange_rate,
        &op.interface,
        op.expiration,
        op.fill_or_kill,
    )?;
    Ok(())
}

pub fn limit_order_cancel(state: &mut State, op: &LimitOrderCancel) -> ChainResult {
    let order_id = state
        .limit_orders
        .find_by_key(LimitOrderKey::ByAccount(op.owner.clone(), op.order_id))
        .map(|o| o.id)
        .ok_or(ChainError::unknown(
            "limit order",
            format!("{}#{}", op.owner, op.order_id),
        ))?;
    state.cancel_limit_order(order_id)
}

pub fn call_order_update(state: &mut State, op: &CallOrderUpdate) -> ChainResult {
    state.update_call_order(
        &op.funding_account,
        &op.delta_collateral,
        &op.delta_debt,
        op.target_collateral_ratio,
    )
}

pub fn bid_collateral(state: &mut State, op: &BidCollateralOp) -> ChainResult {
    state.bid_on_collateral(&op.bidder, &op.debt_covered, &op.additional_collateral)
}

pub fn asset_settle(state: &mut State, op: &AssetSettle) -> ChainResult {
    let now = state.head_block_time();
    let asset = state.get_asset(&op.amount.symbol)?.clone();
    ensure!(
        asset.is_market_issued(),
        ChainError::invalid("only market-issued assets settle")
    );
    let bitasset = state.get_bitasset(&op.amount.symbol)?.clone();

    if bitasset.has_settlement() {
        // settled assets pay out of the fund without delay
        let mut payout = bitasset.settlement_price.convert(&op.amount)?;
        if payout.amount > bitasset.settlement_fund {
            payout.amount = bitasset.settlement_fund;
        }
        state.adjust_liquid_balance(&op.account, &op.amount.negated())?;
        // the redeemed debt simply ceases to exist
        if payout.amount > 0 {
            state.adjust_pending_supply(&payout.negated())?;
            state.adjust_liquid_balance(&op.account, &payout)?;
        }
        let bitasset_id = bitasset.id;
        let paid = payout.amount;
        state.bitassets.modify(bitasset_id, |b| {
            b.settlement_fund -= paid;
        })?;
        return Ok(());
    }

    ensure!(
        !bitasset.current_feed.is_null(),
        ChainError::precondition("cannot settle an asset without a feed")
    );

    // escrow the balance until the settlement delay passes
    state.adjust_liquid_balance(&op.account, &op.amount.negated())?;
    state.adjust_pending_supply(&op.amount)?;
    let delay = state.chain_props.force_settlement_delay_seconds;
    let o = op.clone();
    state.force_settlements.create(|id| ForceSettlement {
        id,
        owner: o.account.clone(),
        balance: o.amount.clone(),
        settlement_date: now.add_secs(delay),
    });
    Ok(())
}

pub fn asset_global_settle(state: &mut State, op: &AssetGlobalSettle) -> ChainResult {
    let asset = state.get_asset(&op.asset_to_settle)?.clone();
    ensure!(
        asset.issuer == op.issuer,
        ChainError::MissingAuthority("only the issuer may globally settle".into())
    );
    ensure!(
        asset.is_market_issued(),
        ChainError::invalid("only market-issued assets settle")
    );
    // settle_price arrives debt/collateral; the engine wants a payout rate
    let payout_rate = op.settle_price.inverse();
    state.globally_settle_asset(&op.asset_to_settle, &payout_rate)
}

pub fn asset_publish_feed(state: &mut State, op: &AssetPublishFeed) -> ChainResult {
    let now = state.head_block_time();
    let asset = state.get_asset(&op.symbol)?.clone();
    ensure!(
        asset.is_market_issued(),
        ChainError::invalid("feeds apply to market-issued assets")
    );
    let bitasset = state.get_bitasset(&op.symbol)?.clone();
    ensure!(
        op.feed.settlement_price.base.symbol == op.symbol
            && op.feed.settlement_price.quote.symbol == bitasset.backing_asset,
        ChainError::invalid("feed must quote debt against the backing asset")
    );

    // publication rights: the configured producer set, or any active block
    // producer when the set is empty
    if bitasset.feed_producers.is_empty() {
        let producer = state.get_producer(&op.publisher)?;
        ensure!(
            producer.active,
            ChainError::precondition("inactive producers cannot publish feeds")
        );
    } else {
        ensure!(
            bitasset.feed_producers.contains(&op.publisher),
            ChainError::MissingAuthority(format!(
                "{} is not a feed producer for {}",
                op.publisher, op.symbol
            ))
        );
    }

    let publisher = op.publisher.clone();
    let feed = op.feed.clone();
    let mut median_changed = false;
    state.bitassets.modify(bitasset.id, |b| {
        b.feeds.insert(publisher, (now, feed));
        median_changed = b.update_median_feed(now);
    })?;

    // mirror the publication onto the producer record
    if let Ok(producer) = state.get_producer(&op.publisher) {
        let producer_id = producer.id;
        let published = op.feed.settlement_price.clone();
        state.producers.modify(producer_id, |p| {
            p.feed = published;
            p.last_feed_update = now;
        })?;
    }

    if median_changed {
        state.check_call_orders(&op.symbol, true, false)?;
    }
    Ok(())
}

pub fn asset_update_feed_producers(
    state: &mut State,
    op: &AssetUpdateFeedProducers,
) -> ChainResult {
    let asset = state.get_asset(&op.symbol)?.clone();
    ensure!(
        asset.issuer == op.issuer,
        ChainError::MissingAuthority("only the issuer updates feed producers".into())
    );
    for producer in &op.new_feed_producers {
        state.get_account(producer)?;
    }
    let bitasset_id = state.get_bitasset(&op.symbol)?.id;
    let now = state.head_block_time();
    let producers: std::collections::BTreeSet<AccountName> =
        op.new_feed_producers.iter().cloned().collect();
    state.bitassets.modify(bitasset_id, |b| {
        b.feed_producers = producers.clone();
        // drop feeds from deposed producers
        b.feeds.retain(|name, _| producers.contains(name));
        b.update_median_feed(now);
    })
}

// ============================================================
// ESCROW
// ============================================================

fn find_escrow(state: &State, from: &AccountName, escrow_id: u64) -> ChainResult<Escrow> {
    state
        .escrows
        .find_by_key(EscrowKey::ByFromId(from.clone(), escrow_id))
        .cloned()
        .ok_or(ChainError::unknown(
            "escrow",
            format!("{from}#{escrow_id}"),
        ))
}

pub fn escrow_transfer(state: &mut State, op: &EscrowTransfer) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.to)?;
    super::touch_account(state, &op.agent)?;
    ensure!(
        op.ratification_deadline > now && op.escrow_expiration > now,
        ChainError::invalid("escrow deadlines must be in the future")
    );
    ensure!(
        state
            .escrows
            .find_by_key(EscrowKey::ByFromId(op.from.clone(), op.escrow_id))
            .is_none(),
        ChainError::precondition(format!("escrow id {} already in use", op.escrow_id))
    );

    let total = op.amount.checked_add(&op.fee)?;
    state.adjust_liquid_balance(&op.from, &total.negated())?;
    state.adjust_pending_supply(&total)?;

    let o = op.clone();
    state.escrows.create(|id| Escrow {
        id,
        from: o.from.clone(),
        to: o.to.clone(),
        agent: o.agent.clone(),
        escrow_id: o.escrow_id,
        balance: o.amount.clone(),
        pending_fee: o.fee.clone(),
        ratification_deadline: o.ratification_deadline,
        escrow_expiration: o.escrow_expiration,
        to_approved: false,
        agent_approved: false,
        disputed: false,
    });
    Ok(())
}

pub fn escrow_approve(state: &mut State, op: &EscrowApprove) -> ChainResult {
    let now = state.head_block_time();
    let escrow = find_escrow(state, &op.from, op.escrow_id)?;
    ensure!(
        now < escrow.ratification_deadline,
        ChainError::precondition("ratification window has closed")
    );
    ensure!(
        op.who == escrow.to || op.who == escrow.agent,
        ChainError::MissingAuthority("only the recipient or agent ratify an escrow".into())
    );

    if !op.approve {
        // any party declining voids the escrow and refunds the sender
        let refund = escrow.balance.checked_add(&escrow.pending_fee)?;
        state.adjust_pending_supply(&refund.negated())?;
        state.adjust_liquid_balance(&escrow.from, &refund)?;
        return state.escrows.remove(escrow.id);
    }

    let was_approved = escrow.is_approved();
    let who = op.who.clone();
    state.escrows.modify(escrow.id, |e| {
        if who == e.to {
            e.to_approved = true;
        } else {
            e.agent_approved = true;
        }
    })?;

    let escrow = find_escrow(state, &op.from, op.escrow_id)?;
    if escrow.is_approved() && !was_approved && escrow.pending_fee.amount > 0 {
        // full ratification releases the agent fee
        state.adjust_pending_supply(&escrow.pending_fee.negated())?;
        state.adjust_liquid_balance(&escrow.agent, &escrow.pending_fee)?;
        state.escrows.modify(escrow.id, |e| {
            e.pending_fee.amount = 0;
        })?;
    }
    Ok(())
}

pub fn escrow_dispute(state: &mut State, op: &EscrowDispute) -> ChainResult {
    let now = state.head_block_time();
    let escrow = find_escrow(state, &op.from, op.escrow_id)?;
    ensure!(
        escrow.is_approved(),
        ChainError::precondition("escrow must be fully ratified before dispute")
    );
    ensure!(
        now < escrow.escrow_expiration,
        ChainError::precondition("escrow has expired")
    );
    ensure!(
        op.who == escrow.from || op.who == escrow.to,
        ChainError::MissingAuthority("only the sender or recipient may dispute".into())
    );
    ensure!(
        !escrow.disputed,
        ChainError::precondition("escrow already disputed")
    );
    state.escrows.modify(escrow.id, |e| {
        e.disputed = true;
    })
}

pub fn escrow_release(state: &mut State, op: &EscrowRelease) -> ChainResult {
    let now = state.head_block_time();
    let escrow = find_escrow(state, &op.from, op.escrow_id)?;
    ensure!(
        escrow.is_approved(),
        ChainError::precondition("escrow must be fully ratified before release")
    );
    ensure!(
        op.receiver == escrow.from || op.receiver == escrow.to,
        ChainError::invalid("funds release only to the sender or recipient")
    );
    ensure!(
        op.amount.symbol == escrow.balance.symbol && op.amount.amount <= escrow.balance.amount,
        ChainError::precondition("release exceeds the escrow balance")
    );

    if escrow.disputed {
        // the agent arbitrates disputed escrows
        ensure!(
            op.who == escrow.agent,
            ChainError::MissingAuthority("disputed escrows release by the agent only".into())
        );
    } else if now >= escrow.escrow_expiration {
        // after expiration either party may pull to either side
        ensure!(
            op.who == escrow.from || op.who == escrow.to,
            ChainError::MissingAuthority("only parties release an expired escrow".into())
        );
    } else {
        // before expiration each party may only release to the other
        if op.who == escrow.from {
            ensure!(
                op.receiver == escrow.to,
                ChainError::precondition("the sender may only release to the recipient")
            );
        } else if op.who == escrow.to {
            ensure!(
                op.receiver == escrow.from,
                ChainError::precondition("the recipient may only refund to the sender")
            );
        } else {
            return Err(ChainError::MissingAuthority(
                "only escrow parties release funds".into(),
            ));
        }
    }

    state.adjust_pending_supply(&op.amount.negated())?;
    state.adjust_liquid_balance(&op.receiver, &op.amount)?;
    let released = op.amount.amount;
    if released == escrow.balance.amount {
        state.escrows.remove(escrow.id)?;
    } else {
        state.escrows.modify(escrow.id, |e| {
            e.balance.amount -= released;
        })?;
    }
    info!(from = %op.from, receiver = %op.receiver, amount = %op.amount, "escrow release");
    Ok(())
}
