//! Transfer and balance evaluators
//!
//! Liquid transfers, staking and scheduled unstaking, withdraw routes,
//! savings with delayed withdrawal, stake delegation, and reward claims.

use crate::amount::Asset;
use crate::config;
use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::state::State;
use tracing::debug;

pub fn transfer(state: &mut State, op: &Transfer) -> ChainResult {
    let now = state.head_block_time();
    let from = state.get_account(&op.from)?.clone();
    super::touch_account(state, &op.to)?;

    state.adjust_liquid_balance(&op.from, &op.amount.negated())?;
    state.adjust_liquid_balance(&op.to, &op.amount)?;
    state.accounts.modify(from.id, |a| {
        a.last_transfer_time = now;
    })?;
    debug!(from = %op.from, to = %op.to, amount = %op.amount, "transfer");
    Ok(())
}

pub fn stake_asset(state: &mut State, op: &StakeAsset) -> ChainResult {
    super::touch_account(state, &op.to)?;
    state.adjust_liquid_balance(&op.from, &op.amount.negated())?;
    state.adjust_staked_balance(&op.to, &op.amount)
}

pub fn unstake_asset(state: &mut State, op: &UnstakeAsset) -> ChainResult {
    let now = state.head_block_time();
    let balance = state
        .find_account_balance(&op.from, &op.amount.symbol)
        .cloned()
        .ok_or(ChainError::unknown("account balance", &op.from))?;

    if op.amount.amount == 0 {
        // cancel a running schedule
        ensure!(
            balance.unstake_rate > 0,
            ChainError::precondition("no unstake schedule to cancel")
        );
        return state.balances.modify(balance.id, |b| {
            b.to_unstake = 0;
            b.total_unstaked = 0;
            b.unstake_rate = 0;
            b.next_unstake_time = TimePoint::maximum();
        });
    }

    ensure!(
        balance.staked_balance - balance.delegated_balance >= op.amount.amount,
        ChainError::InsufficientStake {
            owner: op.from.clone(),
            symbol: op.amount.symbol.clone(),
            required: op.amount.amount,
        }
    );

    let rate = (op.amount.amount / config::STAKE_WITHDRAW_INTERVALS).max(1);
    let total = op.amount.amount;
    state.balances.modify(balance.id, |b| {
        b.to_unstake = total;
        b.total_unstaked = 0;
        b.unstake_rate = rate;
        b.next_unstake_time = now.add_secs(config::STAKE_WITHDRAW_INTERVAL_SECONDS);
    })
}

pub fn unstake_asset_route(state: &mut State, op: &UnstakeAssetRoute) -> ChainResult {
    super::touch_account(state, &op.to)?;

    let existing = state
        .unstake_routes
        .find_by_key(UnstakeRouteKey::ByFromTo(op.from.clone(), op.to.clone()))
        .map(|r| r.id);

    // the sum of route percents may never exceed 100%
    let other_total: i64 = state
        .unstake_routes
        .with_key(UnstakeRouteKey::ByFrom(op.from.clone()))
        .filter(|r| r.to_account != op.to)
        .map(|r| r.percent)
        .sum();
    ensure!(
        other_total + op.percent <= PERCENT_100,
        ChainError::precondition("unstake routes exceed 100%")
    );

    match (existing, op.percent) {
        (Some(id), 0) => state.unstake_routes.remove(id),
        (Some(id), pct) => {
            let auto_stake = op.auto_stake;
            state.unstake_routes.modify(id, |r| {
                r.percent = pct;
                r.auto_stake = auto_stake;
            })
        }
        (None, 0) => Err(ChainError::unknown("unstake route", &op.to)),
        (None, _) => {
            let o = op.clone();
            state.unstake_routes.create(|id| UnstakeRoute {
                id,
                from_account: o.from.clone(),
                to_account: o.to.clone(),
                percent: o.percent,
                auto_stake: o.auto_stake,
            });
            Ok(())
        }
    }
}

pub fn transfer_to_savings(state: &mut State, op: &TransferToSavings) -> ChainResult {
    super::touch_account(state, &op.to)?;
    state.adjust_liquid_balance(&op.from, &op.amount.negated())?;
    state.adjust_savings_balance(&op.to, &op.amount)
}

pub fn transfer_from_savings(state: &mut State, op: &TransferFromSavings) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.to)?;
    let from = state.get_account(&op.from)?.clone();
    ensure!(
        from.savings_withdraw_requests < 100,
        ChainError::precondition("too many pending savings withdrawals")
    );
    ensure!(
        state
            .savings_withdraws
            .find_by_key(SavingsWithdrawKey::ByFromRequest(
                op.from.clone(),
                op.request_id
            ))
            .is_none(),
        ChainError::precondition(format!("request id {} already in use", op.request_id))
    );

    // escrow the withdrawal until the delay passes
    state.adjust_savings_balance(&op.from, &op.amount.negated())?;
    state.adjust_pending_supply(&op.amount)?;

    let o = op.clone();
    state.savings_withdraws.create(|id| SavingsWithdraw {
        id,
        from: o.from.clone(),
        to: o.to.clone(),
        amount: o.amount.clone(),
        request_id: o.request_id,
        memo: o.memo.clone(),
        complete: now.add_secs(config::SAVINGS_WITHDRAW_DELAY_SECONDS),
    });
    state.accounts.modify(from.id, |a| {
        a.savings_withdraw_requests += 1;
    })
}

pub fn cancel_transfer_from_savings(
    state: &mut State,
    op: &CancelTransferFromSavings,
) -> ChainResult {
    let withdraw = state
        .savings_withdraws
        .find_by_key(SavingsWithdrawKey::ByFromRequest(
            op.from.clone(),
            op.request_id,
        ))
        .cloned()
        .ok_or(ChainError::unknown(
            "savings withdrawal",
            format!("{}#{}", op.from, op.request_id),
        ))?;

    state.adjust_pending_supply(&withdraw.amount.negated())?;
    state.adjust_savings_balance(&op.from, &withdraw.amount)?;
    state.savings_withdraws.remove(withdraw.id)?;
    let from_id = state.get_account(&op.from)?.id;
    state.accounts.modify(from_id, |a| {
        a.savings_withdraw_requests = a.savings_withdraw_requests.saturating_sub(1);
    })
}

pub fn delegate_asset(state: &mut State, op: &DelegateAsset) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.delegatee)?;

    let existing = state
        .delegations
        .find_by_key(DelegationKey::ByPair(
            op.delegator.clone(),
            op.delegatee.clone(),
        ))
        .cloned();
    let current = existing.as_ref().map(|d| d.amount.amount).unwrap_or(0);
    let delta = op.amount.amount - current;

    if delta > 0 {
        let balance = state
            .find_account_balance(&op.delegator, &op.amount.symbol)
            .cloned()
            .ok_or(ChainError::unknown("account balance", &op.delegator))?;
        ensure!(
            balance.unpledged_stake() >= delta,
            ChainError::InsufficientStake {
                owner: op.delegator.clone(),
                symbol: op.amount.symbol.clone(),
                required: delta,
            }
        );
        let delta_asset = Asset::new(delta, op.amount.symbol.clone());
        state.adjust_delegated_balance(&op.delegator, &delta_asset)?;
        state.adjust_receiving_balance(&op.delegatee, &delta_asset)?;
    } else if delta < 0 {
        // reduced delegation returns after the security delay; the
        // delegatee loses it immediately
        let returned = Asset::new(-delta, op.amount.symbol.clone());
        state.adjust_receiving_balance(&op.delegatee, &returned.negated())?;
        let delegator = op.delegator.clone();
        let amount = returned.clone();
        state
            .delegation_expirations
            .create(|id| DelegationExpiration {
                id,
                delegator: delegator.clone(),
                amount: amount.clone(),
                expiration: now.add_secs(config::DELEGATION_RETURN_PERIOD_SECONDS),
            });
    } else {
        return Err(ChainError::precondition("delegation unchanged"));
    }

    match existing {
        Some(delegation) if op.amount.amount == 0 => state.delegations.remove(delegation.id),
        Some(delegation) => {
            let amount = op.amount.clone();
            state.delegations.modify(delegation.id, |d| {
                d.amount = amount;
            })
        }
        None => {
            let o = op.clone();
            state.delegations.create(|id| Delegation {
                id,
                delegator: o.delegator.clone(),
                delegatee: o.delegatee.clone(),
                amount: o.amount.clone(),
                created: now,
            });
            Ok(())
        }
    }
}

pub fn claim_reward_balance(state: &mut State, op: &ClaimRewardBalance) -> ChainResult {
    state.adjust_reward_balance(&op.account, &op.reward.negated())?;
    if op.to_stake {
        state.adjust_staked_balance(&op.account, &op.reward)
    } else {
        state.adjust_liquid_balance(&op.account, &op.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainProperties, SYMBOL_COIN};
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["alice", "bob", "carol"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_liquid_balance(&"alice".into(), &Asset::new(1_000, SYMBOL_COIN))
            .unwrap();
        state
    }

    #[test]
    fn test_transfer_moves_liquid() {
        let mut state = setup();
        transfer(
            &mut state,
            &Transfer {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "bob".into(),
                amount: Asset::new(400, SYMBOL_COIN),
                memo: String::new(),
            },
        )
        .unwrap();
        assert_eq!(
            state
                .get_liquid_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            600
        );
        assert_eq!(
            state
                .get_liquid_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            400
        );
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_stake_then_unstake_schedule() {
        let mut state = setup();
        stake_asset(
            &mut state,
            &StakeAsset {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(800, SYMBOL_COIN),
            },
        )
        .unwrap();
        unstake_asset(
            &mut state,
            &UnstakeAsset {
                signatory: "alice".into(),
                from: "alice".into(),
                amount: Asset::new(800, SYMBOL_COIN),
            },
        )
        .unwrap();
        let balance = state
            .find_account_balance(&"alice".into(), &SYMBOL_COIN.into())
            .unwrap();
        assert_eq!(balance.to_unstake, 800);
        assert_eq!(balance.unstake_rate, 200);
        assert!(balance.next_unstake_time < TimePoint::maximum());
    }

    #[test]
    fn test_unstake_respects_delegation() {
        let mut state = setup();
        stake_asset(
            &mut state,
            &StakeAsset {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(500, SYMBOL_COIN),
            },
        )
        .unwrap();
        delegate_asset(
            &mut state,
            &DelegateAsset {
                signatory: "alice".into(),
                delegator: "alice".into(),
                delegatee: "bob".into(),
                amount: Asset::new(400, SYMBOL_COIN),
            },
        )
        .unwrap();
        let err = unstake_asset(
            &mut state,
            &UnstakeAsset {
                signatory: "alice".into(),
                from: "alice".into(),
                amount: Asset::new(200, SYMBOL_COIN),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientStake { .. }));
    }

    #[test]
    fn test_routes_capped_at_hundred_percent() {
        let mut state = setup();
        unstake_asset_route(
            &mut state,
            &UnstakeAssetRoute {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "bob".into(),
                percent: 6_000,
                auto_stake: false,
            },
        )
        .unwrap();
        let err = unstake_asset_route(
            &mut state,
            &UnstakeAssetRoute {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "carol".into(),
                percent: 5_000,
                auto_stake: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_savings_round_trip() {
        let mut state = setup();
        transfer_to_savings(
            &mut state,
            &TransferToSavings {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(300, SYMBOL_COIN),
                memo: String::new(),
            },
        )
        .unwrap();
        transfer_from_savings(
            &mut state,
            &TransferFromSavings {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(300, SYMBOL_COIN),
                request_id: 1,
                memo: String::new(),
            },
        )
        .unwrap();
        cancel_transfer_from_savings(
            &mut state,
            &CancelTransferFromSavings {
                signatory: "alice".into(),
                from: "alice".into(),
                request_id: 1,
            },
        )
        .unwrap();
        assert_eq!(
            state
                .get_savings_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            300
        );
        assert!(state.savings_withdraws.is_empty());
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_delegation_reduction_defers_return() {
        let mut state = setup();
        stake_asset(
            &mut state,
            &StakeAsset {
                signatory: "alice".into(),
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(500, SYMBOL_COIN),
            },
        )
        .unwrap();
        delegate_asset(
            &mut state,
            &DelegateAsset {
                signatory: "alice".into(),
                delegator: "alice".into(),
                delegatee: "bob".into(),
                amount: Asset::new(400, SYMBOL_COIN),
            },
        )
        .unwrap();
        delegate_asset(
            &mut state,
            &DelegateAsset {
                signatory: "alice".into(),
                delegator: "alice".into(),
                delegatee: "bob".into(),
                amount: Asset::new(0, SYMBOL_COIN),
            },
        )
        .unwrap();
        // delegatee lost it at once; the delegator's pledge returns later
        assert_eq!(
            state
                .get_receiving_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            0
        );
        assert_eq!(
            state
                .get_delegated_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            400
        );
        assert_eq!(state.delegation_expirations.len(), 1);
    }
}
