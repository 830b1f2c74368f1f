//! Asset ledger
//!
//! The single choke point for balance mutation. Every pool adjustment
//! updates the owner's sub-balance and the per-asset supply aggregate
//! atomically, so the conservation invariant
//! `Σ owners pool(owner, S) == supply.pool(S)` holds after every call.
//!
//! The null account is a sink: positive COIN deltas accumulate into network
//! revenue, positive deltas of anything else are burned, negative deltas
//! are rejected.

use crate::amount::{mul_div_down, Asset};
use crate::config::{NULL_ACCOUNT, SYMBOL_COIN, SYMBOL_EQUITY};
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::AccountBalance;
use crate::state::State;
use tracing::trace;

/// The six balance pools of an (owner, asset) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    Liquid,
    Staked,
    Savings,
    Reward,
    Delegated,
    Receiving,
}

impl Pool {
    fn of(self, balance: &AccountBalance) -> i64 {
        match self {
            Pool::Liquid => balance.liquid_balance,
            Pool::Staked => balance.staked_balance,
            Pool::Savings => balance.savings_balance,
            Pool::Reward => balance.reward_balance,
            Pool::Delegated => balance.delegated_balance,
            Pool::Receiving => balance.receiving_balance,
        }
    }

    fn of_mut(self, balance: &mut AccountBalance) -> &mut i64 {
        match self {
            Pool::Liquid => &mut balance.liquid_balance,
            Pool::Staked => &mut balance.staked_balance,
            Pool::Savings => &mut balance.savings_balance,
            Pool::Reward => &mut balance.reward_balance,
            Pool::Delegated => &mut balance.delegated_balance,
            Pool::Receiving => &mut balance.receiving_balance,
        }
    }

    fn supply_of_mut(self, dyn_data: &mut crate::objects::AssetDynamicData) -> &mut i64 {
        match self {
            Pool::Liquid => &mut dyn_data.liquid_supply,
            Pool::Staked => &mut dyn_data.staked_supply,
            Pool::Savings => &mut dyn_data.savings_supply,
            Pool::Reward => &mut dyn_data.reward_supply,
            Pool::Delegated => &mut dyn_data.delegated_supply,
            Pool::Receiving => &mut dyn_data.receiving_supply,
        }
    }
}

impl State {
    // ============================================================
    // ADJUSTMENTS
    // ============================================================

    pub fn adjust_liquid_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Liquid)
    }

    pub fn adjust_staked_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Staked)
    }

    pub fn adjust_savings_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Savings)
    }

    pub fn adjust_reward_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Reward)
    }

    pub fn adjust_delegated_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Delegated)
    }

    pub fn adjust_receiving_balance(&mut self, owner: &AccountName, delta: &Asset) -> ChainResult {
        self.adjust_balance(owner, delta, Pool::Receiving)
    }

    fn adjust_balance(&mut self, owner: &AccountName, delta: &Asset, pool: Pool) -> ChainResult {
        if delta.amount == 0 {
            return Ok(());
        }
        if owner.as_str() == NULL_ACCOUNT {
            return self.adjust_null_sink(delta);
        }
        self.get_dynamic_data(&delta.symbol)?;

        trace!(%owner, %delta, ?pool, "adjust balance");

        match self.find_account_balance(owner, &delta.symbol).map(|b| b.id) {
            None => {
                if delta.amount <= 0 {
                    return Err(ChainError::InsufficientBalance {
                        owner: owner.clone(),
                        symbol: delta.symbol.clone(),
                        available: 0,
                        required: -delta.amount,
                    });
                }
                let owner = owner.clone();
                let symbol = delta.symbol.clone();
                let amount = delta.amount;
                self.balances.create(|id| {
                    let mut balance = AccountBalance::new(id, owner.clone(), symbol.clone());
                    *pool.of_mut(&mut balance) = amount;
                    balance
                });
            }
            Some(balance_id) => {
                let current = pool.of(
                    self.balances
                        .get(balance_id)
                        .expect("balance id just resolved"),
                );
                if delta.amount < 0 && current < -delta.amount {
                    return Err(ChainError::InsufficientBalance {
                        owner: owner.clone(),
                        symbol: delta.symbol.clone(),
                        available: current,
                        required: -delta.amount,
                    });
                }
                let amount = delta.amount;
                self.balances.modify(balance_id, |balance| {
                    *pool.of_mut(balance) += amount;
                })?;
            }
        }

        self.adjust_supply(&delta.symbol, delta.amount, pool)
    }

    fn adjust_null_sink(&mut self, delta: &Asset) -> ChainResult {
        if delta.amount <= 0 {
            return Err(ChainError::InvalidSink);
        }
        let dyn_id = self.get_dynamic_data(&delta.symbol)?.id;
        if delta.symbol.as_str() == SYMBOL_COIN {
            let delta = delta.clone();
            self.props_modify(|props| {
                props.accumulated_network_revenue.amount += delta.amount;
            });
        } else {
            self.asset_dynamic.modify(dyn_id, |dyn_data| {
                dyn_data.burned += delta.amount;
            })?;
        }
        Ok(())
    }

    fn adjust_supply(&mut self, symbol: &AssetSymbol, amount: i64, pool: Pool) -> ChainResult {
        let dyn_id = self.get_dynamic_data(symbol)?.id;
        self.asset_dynamic.modify(dyn_id, |dyn_data| {
            *pool.supply_of_mut(dyn_data) += amount;
        })
    }

    /// Value parked in order books, settlement funds, and escrows.
    pub fn adjust_pending_supply(&mut self, delta: &Asset) -> ChainResult {
        let dyn_id = self.get_dynamic_data(&delta.symbol)?.id;
        self.asset_dynamic.modify(dyn_id, |dyn_data| {
            dyn_data.pending_supply += delta.amount;
        })
    }

    /// Issuer market fees accumulate on the asset until claimed.
    pub fn adjust_accumulated_fees(&mut self, symbol: &AssetSymbol, amount: i64) -> ChainResult {
        let dyn_id = self.get_dynamic_data(symbol)?.id;
        self.asset_dynamic.modify(dyn_id, |dyn_data| {
            dyn_data.accumulated_fees += amount;
        })
    }

    /// Burn COIN into accumulated network revenue.
    pub fn pay_network_fees(&mut self, amount: &Asset) -> ChainResult {
        if amount.symbol.as_str() != SYMBOL_COIN {
            return Err(ChainError::SymbolMismatch {
                expected: SYMBOL_COIN.into(),
                actual: amount.symbol.clone(),
            });
        }
        let amount = amount.clone();
        self.props_modify(|props| {
            props.accumulated_network_revenue.amount += amount.amount;
        });
        Ok(())
    }

    // ============================================================
    // QUERIES
    // ============================================================

    pub fn get_liquid_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Liquid)
    }

    pub fn get_staked_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Staked)
    }

    pub fn get_savings_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Savings)
    }

    pub fn get_reward_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Reward)
    }

    pub fn get_delegated_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Delegated)
    }

    pub fn get_receiving_balance(&self, owner: &AccountName, symbol: &AssetSymbol) -> Asset {
        self.pool_balance(owner, symbol, Pool::Receiving)
    }

    fn pool_balance(&self, owner: &AccountName, symbol: &AssetSymbol, pool: Pool) -> Asset {
        let amount = self
            .find_account_balance(owner, symbol)
            .map(|b| pool.of(b))
            .unwrap_or(0);
        Asset::new(amount, symbol.clone())
    }

    /// Voting power: net staked COIN plus net staked equity valued at the
    /// hour-median COIN/EQ price. Absent balances contribute zero.
    pub fn get_voting_power(&self, owner: &AccountName) -> i64 {
        let mut power = self
            .find_account_balance(owner, &SYMBOL_COIN.into())
            .map(|b| b.voting_shares())
            .unwrap_or(0);
        if let Some(equity) = self.find_account_balance(owner, &SYMBOL_EQUITY.into()) {
            let shares = equity.voting_shares();
            let price = &self.props().equity_coin_price;
            // price is COIN / EQ: value equity shares in COIN
            power += mul_div_down(shares, price.base.amount, price.quote.amount).unwrap_or(0);
        }
        power
    }

    /// Conservation audit: every pool total equals the sum over owners.
    /// Test and maintenance hook; a mismatch is a consensus bug.
    pub fn verify_supply_invariants(&self) -> ChainResult {
        for dyn_data in self.asset_dynamic.iter() {
            let mut sums = [0i64; 6];
            for balance in self.balances.iter().filter(|b| b.symbol == dyn_data.symbol) {
                sums[0] += balance.liquid_balance;
                sums[1] += balance.staked_balance;
                sums[2] += balance.savings_balance;
                sums[3] += balance.reward_balance;
                sums[4] += balance.delegated_balance;
                sums[5] += balance.receiving_balance;
            }
            let expected = [
                dyn_data.liquid_supply,
                dyn_data.staked_supply,
                dyn_data.savings_supply,
                dyn_data.reward_supply,
                dyn_data.delegated_supply,
                dyn_data.receiving_supply,
            ];
            if sums != expected {
                return Err(ChainError::precondition(format!(
                    "supply invariant violated for {}: balances {sums:?} vs supply {expected:?}",
                    dyn_data.symbol
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainProperties;
    use crate::state::bootstrap_account;
    use crate::state::State;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(0), ChainProperties::default());
        bootstrap_account(&mut state, "alice");
        state
    }

    fn coin(amount: i64) -> Asset {
        Asset::new(amount, SYMBOL_COIN)
    }

    #[test]
    fn test_credit_creates_balance_and_supply() {
        let mut state = setup();
        state
            .adjust_liquid_balance(&"alice".into(), &coin(100))
            .unwrap();
        assert_eq!(
            state.get_liquid_balance(&"alice".into(), &SYMBOL_COIN.into()),
            coin(100)
        );
        let dyn_data = state.get_dynamic_data(&SYMBOL_COIN.into()).unwrap();
        assert_eq!(dyn_data.liquid_supply, 100);
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_debit_checks_pool() {
        let mut state = setup();
        state
            .adjust_liquid_balance(&"alice".into(), &coin(50))
            .unwrap();
        let err = state
            .adjust_liquid_balance(&"alice".into(), &coin(-80))
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
        // pool isolation: liquid credit does not make stake spendable
        let err = state
            .adjust_staked_balance(&"alice".into(), &coin(-10))
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_debit_to_missing_balance_fails() {
        let mut state = setup();
        let err = state
            .adjust_liquid_balance(&"alice".into(), &coin(-1))
            .unwrap_err();
        assert!(matches!(err, ChainError::InsufficientBalance { .. }));
    }

    #[test]
    fn test_null_sink_burns_and_collects() {
        let mut state = setup();
        state
            .adjust_liquid_balance(&"alice".into(), &coin(100))
            .unwrap();
        state
            .adjust_liquid_balance(&"alice".into(), &coin(-40))
            .unwrap();
        state
            .adjust_liquid_balance(&NULL_ACCOUNT.into(), &coin(40))
            .unwrap();
        assert_eq!(state.props().accumulated_network_revenue.amount, 40);
        // negative deltas never reach the sink
        assert_eq!(
            state.adjust_liquid_balance(&NULL_ACCOUNT.into(), &coin(-1)),
            Err(ChainError::InvalidSink)
        );
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_voting_power_includes_priced_equity() {
        let mut state = setup();
        state
            .adjust_staked_balance(&"alice".into(), &coin(100))
            .unwrap();
        state
            .adjust_staked_balance(&"alice".into(), &Asset::new(10, SYMBOL_EQUITY))
            .unwrap();
        // genesis price 1 COIN / 1 EQ
        assert_eq!(state.get_voting_power(&"alice".into()), 110);
    }
}
