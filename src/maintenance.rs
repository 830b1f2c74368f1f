//! Maintenance scheduler
//!
//! Time-gated periodic passes, run in a fixed order after every head-block
//! advance. Everything here iterates time-ordered indices and stops at the
//! head-block time; failures are fatal to the block being applied.

use crate::amount::{mul_div_down, Asset};
use crate::config;
use crate::core_types::*;
use crate::error::ChainResult;
use crate::objects::*;
use crate::state::State;
use crate::virtual_ops::VirtualOperation;
use std::ops::Bound;
use tracing::{debug, info};

/// Run every pass whose deadline the new head time has crossed.
pub fn run_maintenance(state: &mut State) -> ChainResult {
    process_unstaking(state)?;
    process_savings_withdrawals(state)?;
    clear_expired_orders(state)?;
    process_due_settlements(state)?;
    clear_expired_requests(state)?;
    clear_expired_delegations(state)?;
    expire_escrow_ratifications(state)?;
    clear_expired_transactions(state)?;
    prune_authority_history(state)?;

    let block = state.head_block_num();
    if block > 0 {
        if block % config::FEED_INTERVAL_BLOCKS == 0 {
            update_median_feeds(state)?;
        }
        if block % config::EQUITY_INTERVAL_BLOCKS == 0 {
            crate::rewards::process_equity_rewards(state)?;
        }
        if block % config::CONTENT_REWARD_INTERVAL_BLOCKS == 0 {
            crate::rewards::process_comment_rewards(state)?;
        }
        if block % config::GOVERNANCE_INTERVAL_BLOCKS == 0 {
            update_approvals(state)?;
        }
        if block % config::ENTERPRISE_INTERVAL_BLOCKS == 0 {
            pay_enterprise_budgets(state)?;
        }
    }
    Ok(())
}

// ============================================================
// 1. UNSTAKING
// ============================================================

/// Pay out matured unstake chunks, split across withdraw routes.
pub fn process_unstaking(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(balance) = state
            .balances
            .range(
                Bound::Included((AccountBalanceKey::ByNextUnstake(TimePoint::from_secs(i64::MIN)), 0)),
                Bound::Included((AccountBalanceKey::ByNextUnstake(now), ObjectId::MAX)),
            )
            .next()
            .cloned()
        else {
            break;
        };

        let remaining = balance.to_unstake - balance.total_unstaked;
        let chunk = if remaining < balance.unstake_rate {
            // final partial chunk
            balance.staked_balance.min(balance.to_unstake % balance.unstake_rate.max(1))
        } else {
            balance.staked_balance.min(balance.unstake_rate)
        };

        let symbol = balance.symbol.clone();
        let owner = balance.owner.clone();
        let unstaked = Asset::new(chunk, symbol.clone());
        if chunk > 0 {
            state.adjust_staked_balance(&owner, &unstaked.negated())?;
        }

        // routed splits first, the remainder pays the origin liquid
        let routes: Vec<UnstakeRoute> = state
            .unstake_routes
            .with_key(UnstakeRouteKey::ByFrom(owner.clone()))
            .cloned()
            .collect();
        let mut distributed = 0i64;
        for route in routes {
            let slice = mul_div_down(chunk, route.percent, PERCENT_100)?;
            if slice == 0 {
                continue;
            }
            distributed += slice;
            let amount = Asset::new(slice, symbol.clone());
            if route.auto_stake {
                state.adjust_staked_balance(&route.to_account, &amount)?;
            } else {
                state.adjust_liquid_balance(&route.to_account, &amount)?;
            }
        }
        let leftover = chunk - distributed;
        if leftover > 0 {
            state.adjust_liquid_balance(&owner, &Asset::new(leftover, symbol.clone()))?;
        }

        state.balances.modify(balance.id, |b| {
            b.total_unstaked += chunk;
            if b.total_unstaked >= b.to_unstake || b.staked_balance == 0 {
                b.to_unstake = 0;
                b.total_unstaked = 0;
                b.unstake_rate = 0;
                b.next_unstake_time = TimePoint::maximum();
            } else {
                b.next_unstake_time = b
                    .next_unstake_time
                    .add_secs(config::STAKE_WITHDRAW_INTERVAL_SECONDS);
            }
        })?;
        debug!(%owner, chunk, "unstake chunk processed");
    }
    Ok(())
}

// ============================================================
// 2. SAVINGS
// ============================================================

pub fn process_savings_withdrawals(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(withdraw) = state
            .savings_withdraws
            .range(
                Bound::Included((SavingsWithdrawKey::ByComplete(TimePoint::from_secs(i64::MIN)), 0)),
                Bound::Included((SavingsWithdrawKey::ByComplete(now), ObjectId::MAX)),
            )
            .next()
            .cloned()
        else {
            break;
        };

        state.adjust_pending_supply(&withdraw.amount.negated())?;
        state.adjust_liquid_balance(&withdraw.to, &withdraw.amount)?;
        let from_id = state.get_account(&withdraw.from)?.id;
        state.accounts.modify(from_id, |a| {
            a.savings_withdraw_requests = a.savings_withdraw_requests.saturating_sub(1);
        })?;
        state.push_virtual_op(VirtualOperation::FillTransferFromSavings {
            from: withdraw.from.clone(),
            to: withdraw.to.clone(),
            amount: withdraw.amount.clone(),
            request_id: withdraw.request_id,
            memo: withdraw.memo.clone(),
        });
        state.savings_withdraws.remove(withdraw.id)?;
    }
    Ok(())
}

// ============================================================
// 3. EXPIRATIONS
// ============================================================

pub fn clear_expired_orders(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(order_id) = state
            .limit_orders
            .range(
                Bound::Included((LimitOrderKey::ByExpiration(TimePoint::from_secs(i64::MIN)), 0)),
                Bound::Excluded((LimitOrderKey::ByExpiration(now), 0)),
            )
            .next()
            .map(|o| o.id)
        else {
            break;
        };
        debug!(order = order_id, "expiring limit order");
        state.cancel_limit_order(order_id)?;
    }
    Ok(())
}

fn process_due_settlements(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(settle_id) = state
            .force_settlements
            .range(
                Bound::Included((
                    ForceSettlementKey::ByExpiration(TimePoint::from_secs(i64::MIN)),
                    0,
                )),
                Bound::Included((ForceSettlementKey::ByExpiration(now), ObjectId::MAX)),
            )
            .next()
            .map(|s| s.id)
        else {
            break;
        };
        state.execute_settlement(settle_id)?;
    }
    Ok(())
}

macro_rules! clear_expired {
    ($state:ident, $table:ident, $key:path) => {
        loop {
            let now = $state.head_block_time();
            let Some(id) = $state
                .$table
                .range(
                    Bound::Included(($key(TimePoint::from_secs(i64::MIN)), 0)),
                    Bound::Excluded(($key(now), 0)),
                )
                .next()
                .map(|r| r.id())
            else {
                break;
            };
            $state.$table.remove(id)?;
        }
    };
}

pub fn clear_expired_requests(state: &mut State) -> ChainResult {
    use crate::store::StoreObject;
    clear_expired!(state, connection_requests, ConnectionRequestKey::ByExpiration);
    clear_expired!(state, join_requests, CommunityJoinRequestKey::ByExpiration);
    clear_expired!(state, join_invites, CommunityJoinInviteKey::ByExpiration);
    clear_expired!(
        state,
        business_member_requests,
        BusinessMemberRequestKey::ByExpiration
    );
    clear_expired!(
        state,
        business_member_invites,
        BusinessMemberInviteKey::ByExpiration
    );
    clear_expired!(state, recovery_requests, RecoveryRequestKey::ByExpiration);
    Ok(())
}

pub fn clear_expired_delegations(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(expiring) = state
            .delegation_expirations
            .range(
                Bound::Included((
                    DelegationExpirationKey::ByExpiration(TimePoint::from_secs(i64::MIN)),
                    0,
                )),
                Bound::Excluded((DelegationExpirationKey::ByExpiration(now), 0)),
            )
            .next()
            .cloned()
        else {
            break;
        };
        state.adjust_delegated_balance(&expiring.delegator, &expiring.amount.negated())?;
        state.push_virtual_op(VirtualOperation::ReturnDelegation {
            delegator: expiring.delegator.clone(),
            amount: expiring.amount.clone(),
        });
        state.delegation_expirations.remove(expiring.id)?;
    }
    Ok(())
}

// ============================================================
// 4. ESCROW EXPIRY
// ============================================================

pub fn expire_escrow_ratifications(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(escrow) = state
            .escrows
            .range(
                Bound::Included((EscrowKey::ByRatification(TimePoint::from_secs(i64::MIN)), 0)),
                Bound::Excluded((EscrowKey::ByRatification(now), 0)),
            )
            .find(|e| !e.is_approved())
            .cloned()
        else {
            break;
        };
        let refund = escrow.balance.checked_add(&escrow.pending_fee)?;
        state.adjust_pending_supply(&refund.negated())?;
        state.adjust_liquid_balance(&escrow.from, &refund)?;
        state.escrows.remove(escrow.id)?;
        debug!(from = %escrow.from, escrow = escrow.escrow_id, "unratified escrow refunded");
    }
    Ok(())
}

fn clear_expired_transactions(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    loop {
        let Some(id) = state
            .transactions
            .range(
                Bound::Included((
                    TransactionRecordKey::ByExpiration(TimePoint::from_secs(i64::MIN)),
                    0,
                )),
                Bound::Excluded((TransactionRecordKey::ByExpiration(now), 0)),
            )
            .next()
            .map(|t| t.id)
        else {
            break;
        };
        state.transactions.remove(id)?;
    }
    Ok(())
}

fn prune_authority_history(state: &mut State) -> ChainResult {
    let cutoff = state
        .head_block_time()
        .sub_secs(config::OWNER_AUTH_HISTORY_TRACKING_SECONDS);
    loop {
        let Some(id) = state
            .authority_history
            .range(
                Bound::Included((AuthorityHistoryKey::ByCreated(TimePoint::from_secs(i64::MIN)), 0)),
                Bound::Excluded((AuthorityHistoryKey::ByCreated(cutoff), 0)),
            )
            .next()
            .map(|h| h.id)
        else {
            break;
        };
        state.authority_history.remove(id)?;
    }
    Ok(())
}

// ============================================================
// 5. FEEDS
// ============================================================

pub fn update_median_feeds(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    let block = state.head_block_num();
    let symbols: Vec<AssetSymbol> = state.bitassets.iter().map(|b| b.symbol.clone()).collect();
    for symbol in symbols {
        let bitasset_id = state.get_bitasset(&symbol)?.id;
        let mut changed = false;
        state.bitassets.modify(bitasset_id, |b| {
            changed = b.update_median_feed(now);
            // the settled-volume throttle resets with each feed interval
            b.force_settled_volume = 0;
        })?;
        if changed {
            debug!(%symbol, "median feed moved, rechecking calls");
            state.check_call_orders(&symbol, true, false)?;
        }
        state.maybe_revive_bitasset(&symbol)?;
    }
    state.props_modify(|p| p.last_feed_update_block = block);
    Ok(())
}

// ============================================================
// 7. APPROVAL FLAGS
// ============================================================

/// Total stake backing the approval thresholds: staked COIN plus staked
/// equity valued at the median price.
fn total_voting_supply(state: &State) -> i64 {
    let coin = state
        .get_dynamic_data(&config::SYMBOL_COIN.into())
        .map(|d| d.staked_supply)
        .unwrap_or(0);
    let equity = state
        .get_dynamic_data(&config::SYMBOL_EQUITY.into())
        .map(|d| d.staked_supply)
        .unwrap_or(0);
    let price = &state.props().equity_coin_price;
    coin + mul_div_down(equity, price.base.amount, price.quote.amount).unwrap_or(0)
}

pub fn update_approvals(state: &mut State) -> ChainResult {
    let block = state.head_block_num();
    let total = total_voting_supply(state).max(1);

    // producers: refresh tallies from standing votes
    let producers: Vec<AccountName> = state.producers.iter().map(|p| p.owner.clone()).collect();
    for producer in producers {
        crate::evaluators::account::refresh_producer_tally(state, &producer)?;
    }

    // network officers
    let officers: Vec<(ObjectId, i64, u32)> = state
        .network_officers
        .iter()
        .map(|o| (o.id, o.voting_power, o.vote_count))
        .collect();
    for (id, power, count) in officers {
        let approved = power >= mul_div_down(total, config::OFFICER_APPROVAL_PERCENT, PERCENT_100)?
            && count as usize >= config::OFFICER_MIN_VOTERS;
        state
            .network_officers
            .modify(id, |o| o.officer_approved = approved && o.active)?;
    }

    // executive boards
    let boards: Vec<(ObjectId, i64, u32)> = state
        .executive_boards
        .iter()
        .map(|b| (b.id, b.voting_power, b.vote_count))
        .collect();
    for (id, power, count) in boards {
        let approved = power
            >= mul_div_down(total, config::EXECUTIVE_APPROVAL_PERCENT, PERCENT_100)?
            && count as usize >= config::EXECUTIVE_MIN_VOTERS;
        state
            .executive_boards
            .modify(id, |b| b.board_approved = approved && b.active)?;
    }

    // governance accounts
    let governances: Vec<(ObjectId, i64, u32)> = state
        .governance_accounts
        .iter()
        .map(|g| (g.id, g.subscriber_power, g.subscriber_count))
        .collect();
    for (id, power, count) in governances {
        let approved = power
            >= mul_div_down(total, config::GOVERNANCE_APPROVAL_PERCENT, PERCENT_100)?
            && count as usize >= config::GOVERNANCE_MIN_SUBSCRIBERS;
        state
            .governance_accounts
            .modify(id, |g| g.account_approved = approved && g.active)?;
    }

    // enterprises: advance the approval cursor where support suffices
    let enterprises: Vec<(ObjectId, AccountName, String)> = state
        .enterprises
        .iter()
        .filter(|e| e.active)
        .map(|e| (e.id, e.creator.clone(), e.enterprise_id.clone()))
        .collect();
    for (id, creator, enterprise_id) in enterprises {
        let enterprise = state.enterprises.require(id, "enterprise")?.clone();
        if enterprise.approved_milestones + 1 >= enterprise.milestone_count() {
            continue;
        }
        let threshold = mul_div_down(total, config::ENTERPRISE_APPROVAL_PERCENT, PERCENT_100)?;
        if enterprise.approval_power >= threshold
            && enterprise.approval_count as usize >= config::ENTERPRISE_MIN_VOTERS
        {
            state.enterprises.modify(id, |e| {
                e.approved_milestones += 1;
                e.approval_power = 0;
                e.approval_count = 0;
            })?;
            // standing approvals for the decided milestone retire
            let stale: Vec<ObjectId> = state
                .enterprise_approvals
                .with_key(EnterpriseApprovalKey::ByEnterprise(
                    creator.clone(),
                    enterprise_id.clone(),
                ))
                .filter(|a| a.milestone <= enterprise.approved_milestones + 1)
                .map(|a| a.id)
                .collect();
            for approval_id in stale {
                state.enterprise_approvals.remove(approval_id)?;
            }
            info!(%creator, enterprise = %enterprise_id, "milestone approved");
        }
    }

    recompute_comment_metrics(state)?;
    state.props_modify(|p| p.last_governance_update_block = block);
    Ok(())
}

/// Median vote/view counts and powers over recent posts.
fn recompute_comment_metrics(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    let cutoff = now.sub_secs(30 * SECONDS_PER_DAY);
    let mut vote_counts = Vec::new();
    let mut view_counts = Vec::new();
    let mut vote_powers = Vec::new();
    let mut view_powers = Vec::new();
    for comment in state
        .comments
        .range(
            Bound::Included((CommentKey::ByCreated(cutoff), 0)),
            Bound::Included((CommentKey::ByCreated(TimePoint::maximum()), ObjectId::MAX)),
        )
        .filter(|c| !c.deleted)
    {
        vote_counts.push(comment.net_votes as i64);
        view_counts.push(comment.view_count as i64);
        vote_powers.push(comment.vote_power);
        view_powers.push(comment.view_power);
    }
    let median = |mut values: Vec<i64>| -> i64 {
        if values.is_empty() {
            return 0;
        }
        values.sort_unstable();
        values[values.len() / 2]
    };
    let (mvc, mwc, mvp, mwp) = (
        median(vote_counts),
        median(view_counts),
        median(vote_powers),
        median(view_powers),
    );
    state.metrics_modify(|m| {
        m.median_vote_count = mvc;
        m.median_view_count = mwc;
        m.median_vote_power = mvp;
        m.median_view_power = mwp;
    });
    Ok(())
}

// ============================================================
// 8. ENTERPRISE PAYOUTS
// ============================================================

/// Pay daily budgets to enterprises whose approvals keep pace with claims.
/// Budgets draw from accumulated network revenue.
pub fn pay_enterprise_budgets(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    let block = state.head_block_num();
    let enterprises: Vec<ObjectId> = state.enterprises.iter().map(|e| e.id).collect();
    for id in enterprises {
        let enterprise = state.enterprises.require(id, "enterprise")?.clone();
        if !enterprise.payment_due(now) {
            continue;
        }
        let available = state.props().accumulated_network_revenue.amount;
        let payment = enterprise.daily_budget.amount.min(available);
        if payment == 0 {
            continue;
        }
        let payout = Asset::new(payment, enterprise.daily_budget.symbol.clone());
        state.props_modify(|p| {
            p.accumulated_network_revenue.amount -= payment;
        });
        state.adjust_liquid_balance(&enterprise.creator, &payout)?;
        state.enterprises.modify(id, |e| {
            e.days_paid += 1;
            e.total_distributed += payment;
        })?;
        debug!(creator = %enterprise.creator, enterprise = %enterprise.enterprise_id, payment, "enterprise budget paid");
    }
    state.props_modify(|p| p.last_enterprise_payout_block = block);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainProperties, SYMBOL_COIN};
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(1_000_000), ChainProperties::default());
        for name in ["alice", "bob", "carol"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_liquid_balance(&"alice".into(), &Asset::new(1_000, SYMBOL_COIN))
            .unwrap();
        state
    }

    fn advance_days(state: &mut State, days: i64) {
        state.props_modify(|p| {
            p.head_block_time = p.head_block_time.add_secs(days * SECONDS_PER_DAY)
        });
    }

    #[test]
    fn test_unstake_with_routes() {
        let mut state = setup();
        // 100 staked, schedule at 10 per interval with two 50% routes
        state
            .adjust_staked_balance(&"alice".into(), &Asset::new(100, SYMBOL_COIN))
            .unwrap();
        let balance_id = state
            .find_account_balance(&"alice".into(), &SYMBOL_COIN.into())
            .unwrap()
            .id;
        let start = state.head_block_time();
        state
            .balances
            .modify(balance_id, |b| {
                b.to_unstake = 100;
                b.unstake_rate = 10;
                b.next_unstake_time = start.add_secs(config::STAKE_WITHDRAW_INTERVAL_SECONDS);
            })
            .unwrap();
        for (to, auto_stake) in [("bob", true), ("carol", false)] {
            let to = AccountName::new(to);
            state.unstake_routes.create(|id| UnstakeRoute {
                id,
                from_account: "alice".into(),
                to_account: to.clone(),
                percent: 5_000,
                auto_stake,
            });
        }

        for _ in 0..10 {
            advance_days(&mut state, 1);
            process_unstaking(&mut state).unwrap();
        }

        assert_eq!(
            state
                .get_staked_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            0
        );
        assert_eq!(
            state
                .get_staked_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            50
        );
        assert_eq!(
            state
                .get_liquid_balance(&"carol".into(), &SYMBOL_COIN.into())
                .amount,
            50
        );
        // schedule closed
        let balance = state
            .find_account_balance(&"alice".into(), &SYMBOL_COIN.into())
            .unwrap();
        assert_eq!(balance.next_unstake_time, TimePoint::maximum());
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_expired_order_refunds() {
        let mut state = setup();
        let expiry = state.head_block_time().add_secs(100);
        state
            .place_limit_order(
                &"alice".into(),
                1,
                &Asset::new(100, SYMBOL_COIN),
                &crate::price::Price::new(
                    Asset::new(100, SYMBOL_COIN),
                    Asset::new(200, crate::config::SYMBOL_USD),
                ),
                &AccountName::default(),
                expiry,
                false,
            )
            .unwrap();
        advance_days(&mut state, 1);
        clear_expired_orders(&mut state).unwrap();
        assert!(state.limit_orders.is_empty());
        assert_eq!(
            state
                .get_liquid_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            1_000
        );
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_delegation_return() {
        let mut state = setup();
        state
            .adjust_staked_balance(&"alice".into(), &Asset::new(100, SYMBOL_COIN))
            .unwrap();
        state
            .adjust_delegated_balance(&"alice".into(), &Asset::new(40, SYMBOL_COIN))
            .unwrap();
        let expiry = state.head_block_time().add_secs(10);
        state
            .delegation_expirations
            .create(|id| DelegationExpiration {
                id,
                delegator: "alice".into(),
                amount: Asset::new(40, SYMBOL_COIN),
                expiration: expiry,
            });
        advance_days(&mut state, 1);
        clear_expired_delegations(&mut state).unwrap();
        assert_eq!(
            state
                .get_delegated_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            0
        );
        assert!(state
            .virtual_ops()
            .iter()
            .any(|v| matches!(v, VirtualOperation::ReturnDelegation { .. })));
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_enterprise_payout_gating() {
        let mut state = setup();
        // revenue to pay from
        state
            .props_modify(|p| p.accumulated_network_revenue.amount = 10_000);
        let begin = state.head_block_time();
        state.enterprises.create(|id| CommunityEnterprise {
            id,
            creator: "alice".into(),
            enterprise_id: "bridge".into(),
            milestones: vec![
                Milestone { label: "a".into(), percent: 5_000 },
                Milestone { label: "b".into(), percent: 5_000 },
            ],
            approved_milestones: -1,
            claimed_milestones: 1,
            begin,
            duration_days: 14,
            daily_budget: Asset::new(100, SYMBOL_COIN),
            days_paid: 0,
            total_distributed: 0,
            approval_power: 0,
            approval_count: 0,
            details: String::new(),
            url: String::new(),
            json: String::new(),
            active: true,
            created: begin,
        });

        // no approval yet: nothing pays
        pay_enterprise_budgets(&mut state).unwrap();
        let e = state.enterprises.iter().next().unwrap();
        assert_eq!(e.days_paid, 0);

        // initial milestone approved: daily payments flow
        let id = e.id;
        state
            .enterprises
            .modify(id, |e| e.approved_milestones = 0)
            .unwrap();
        pay_enterprise_budgets(&mut state).unwrap();
        pay_enterprise_budgets(&mut state).unwrap();
        let e = state.enterprises.require(id, "enterprise").unwrap();
        assert_eq!(e.days_paid, 2);
        assert_eq!(e.total_distributed, 200);

        // claim ahead of approval: payments stop
        state
            .enterprises
            .modify(id, |e| e.claimed_milestones = 2)
            .unwrap();
        pay_enterprise_budgets(&mut state).unwrap();
        let e = state.enterprises.require(id, "enterprise").unwrap();
        assert_eq!(e.days_paid, 2);

        // approval catches up: payments resume
        state
            .enterprises
            .modify(id, |e| e.approved_milestones = 1)
            .unwrap();
        pay_enterprise_budgets(&mut state).unwrap();
        let e = state.enterprises.require(id, "enterprise").unwrap();
        assert_eq!(e.days_paid, 3);
        state.verify_supply_invariants().unwrap();
    }
}
