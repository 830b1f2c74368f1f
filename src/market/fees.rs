//! Trading fee distribution
//!
//! Two fee streams come out of every filled receive amount:
//!
//! 1. **Issuer market fee** - `min(V * market_fee_percent, max_market_fee)`.
//!    A configured share becomes a registrar/referrer reward, split by the
//!    seller's `referrer_rewards_percentage`; the rest accrues to the
//!    asset's accumulated fees.
//! 2. **Trading fee** - a fixed network percentage of V partitioned into a
//!    governance share, a referral share, then maker-interface,
//!    taker-interface, and network remainders.
//!
//! The sum of all credits equals the total fee; the net reaches the
//! receiver. Fee shares whose target account is unset fall back to the
//! asset's accumulated fees so no value is silently created or destroyed.

use crate::amount::Asset;
use crate::config::{
    GOVERNANCE_SHARE_PERCENT, MAKER_SHARE_PERCENT, REFERRAL_SHARE_PERCENT, TAKER_SHARE_PERCENT,
    TRADING_FEE_PERCENT,
};
use crate::core_types::*;
use crate::error::ChainResult;
use crate::state::State;
use tracing::trace;

impl State {
    /// Issuer market fee on `receives`, capped by the asset's maximum.
    pub fn calculate_issuer_fee(&self, receives: &Asset) -> ChainResult<Asset> {
        let asset = self.get_asset(&receives.symbol)?;
        if !asset.charges_market_fees() {
            return Ok(Asset::zero(receives.symbol.clone()));
        }
        let mut fee = receives.percent(asset.market_fee_percent)?;
        if fee.amount > asset.max_market_fee {
            fee.amount = asset.max_market_fee;
        }
        Ok(fee)
    }

    /// Charge the issuer market fee on a fill, paying the registrar/referrer
    /// reward share. Returns the total issuer fee taken.
    pub fn pay_issuer_fees(&mut self, seller: &AccountName, receives: &Asset) -> ChainResult<Asset> {
        let issuer_fee = self.calculate_issuer_fee(receives)?;
        if issuer_fee.amount == 0 {
            return Ok(issuer_fee);
        }

        let share_percent = self.chain_props.market_fee_share_percent;
        let mut to_accumulate = issuer_fee.amount;

        let seller_account = self.get_account(seller)?;
        let registrar = seller_account.registrar.clone();
        let referrer = seller_account.referrer.clone();
        let referrer_pct = seller_account.referrer_rewards_percentage;

        if share_percent > 0 && !registrar.is_empty() {
            let reward = issuer_fee.percent(share_percent)?;
            if reward.amount > 0 {
                let mut registrar_reward = reward.clone();
                if !referrer.is_empty() && referrer != registrar {
                    let referrer_reward = reward.percent(referrer_pct)?;
                    if referrer_reward.amount > 0 {
                        registrar_reward.amount -= referrer_reward.amount;
                        self.adjust_reward_balance(&referrer, &referrer_reward)?;
                    }
                }
                if registrar_reward.amount > 0 {
                    self.adjust_reward_balance(&registrar, &registrar_reward)?;
                }
                to_accumulate -= reward.amount;
            }
        }

        self.adjust_accumulated_fees(&receives.symbol, to_accumulate)?;
        trace!(%seller, fee = %issuer_fee, "issuer market fee");
        Ok(issuer_fee)
    }

    /// Charge the network trading fee on a fill. Interface shares pay the
    /// named interface accounts' reward balances; the governance and network
    /// shares, and any unset target, accrue to the asset.
    pub fn pay_trading_fees(
        &mut self,
        seller: &AccountName,
        receives: &Asset,
        maker_interface: &AccountName,
        taker_interface: &AccountName,
    ) -> ChainResult<Asset> {
        let total_fee = receives.percent(TRADING_FEE_PERCENT)?;
        if total_fee.amount == 0 {
            return Ok(total_fee);
        }

        let governance_share = total_fee.percent(GOVERNANCE_SHARE_PERCENT)?;
        let referral_share = total_fee.percent(REFERRAL_SHARE_PERCENT)?;
        let maker_share = total_fee.percent(MAKER_SHARE_PERCENT)?;
        let taker_share = total_fee.percent(TAKER_SHARE_PERCENT)?;
        let network_share = total_fee.amount
            - governance_share.amount
            - referral_share.amount
            - maker_share.amount
            - taker_share.amount;

        let mut accumulated = governance_share.amount + network_share;

        let referrer = self.get_account(seller)?.referrer.clone();
        if !referrer.is_empty() && referral_share.amount > 0 {
            self.adjust_reward_balance(&referrer, &referral_share)?;
        } else {
            accumulated += referral_share.amount;
        }

        for (interface, share) in [(maker_interface, maker_share), (taker_interface, taker_share)] {
            if !interface.is_empty() && self.find_account(interface).is_some() && share.amount > 0 {
                self.adjust_reward_balance(interface, &share)?;
            } else {
                accumulated += share.amount;
            }
        }

        self.adjust_accumulated_fees(&receives.symbol, accumulated)?;
        trace!(%seller, fee = %total_fee, "trading fee");
        Ok(total_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainProperties, SYMBOL_COIN};
    use crate::core_types::TimePoint;
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(0), ChainProperties::default());
        for name in ["alice", "reg", "ref"] {
            bootstrap_account(&mut state, name);
        }
        state
    }

    #[test]
    fn test_trading_fee_conserves_value() {
        let mut state = setup();
        let receives = Asset::new(1_000_000, SYMBOL_COIN);
        let fee = state
            .pay_trading_fees(
                &"alice".into(),
                &receives,
                &AccountName::default(),
                &AccountName::default(),
            )
            .unwrap();
        // 1.00% of 1_000_000
        assert_eq!(fee.amount, 10_000);
        // no interfaces, no referrer: everything accumulated on the asset
        let dyn_data = state.get_dynamic_data(&SYMBOL_COIN.into()).unwrap();
        assert_eq!(dyn_data.accumulated_fees, 10_000);
    }

    #[test]
    fn test_issuer_fee_skipped_for_feeless_asset() {
        let mut state = setup();
        // core asset charges no market fees at genesis
        let fee = state
            .pay_issuer_fees(&"alice".into(), &Asset::new(1_000_000, SYMBOL_COIN))
            .unwrap();
        assert!(fee.is_zero());
    }

    #[test]
    fn test_interface_shares_reach_interfaces() {
        let mut state = setup();
        let receives = Asset::new(1_000_000, SYMBOL_COIN);
        let maker_if = AccountName::new("reg");
        let fee = state
            .pay_trading_fees(&"alice".into(), &receives, &maker_if, &AccountName::default())
            .unwrap();
        let maker_cut = state.get_reward_balance(&maker_if, &SYMBOL_COIN.into());
        // 30% of the 1% fee
        assert_eq!(maker_cut.amount, 3_000);
        let dyn_data = state.get_dynamic_data(&SYMBOL_COIN.into()).unwrap();
        assert_eq!(dyn_data.accumulated_fees + maker_cut.amount, fee.amount);
    }
}
