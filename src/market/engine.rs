//! Margin engine
//!
//! Black-swan detection, the margin-call matching loop, global settlement,
//! collateral bidding and revival, and collateralized position updates.
//!
//! Orientation conventions: feed settlement prices and match prices are
//! debt / collateral; collateralization and payout rates are
//! collateral / debt.

use crate::amount::Asset;
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::{CallOrder, CallOrderKey, CollateralBid, CollateralBidKey, LimitOrderKey};
use crate::price::Price;
use crate::state::State;
use crate::virtual_ops::VirtualOperation;
use std::cmp::Reverse;
use std::ops::Bound;
use tracing::{debug, info, warn};

impl State {
    // ============================================================
    // BLACK SWAN
    // ============================================================

    /// Detect systemic undercollateralization. When detected and allowed,
    /// performs the global settlement and returns true; when detected and
    /// disallowed, fails with `BlackSwanAttempted`.
    pub fn check_for_blackswan(
        &mut self,
        symbol: &AssetSymbol,
        enable_black_swan: bool,
    ) -> ChainResult<bool> {
        let asset = self.get_asset(symbol)?;
        if !asset.is_market_issued() {
            return Ok(false);
        }
        let bitasset = self.get_bitasset(symbol)?;
        if bitasset.is_prediction_market
            || bitasset.has_settlement()
            || bitasset.current_feed.is_null()
        {
            return Ok(false);
        }
        let backing = bitasset.backing_asset.clone();
        let feed = bitasset.current_feed.clone();

        let Some(least_id) = self.least_collateralized_call(&backing, symbol) else {
            return Ok(false);
        };
        let least = self.call_orders.require(least_id, "call order")?.clone();

        // best standing offer to sell the debt asset, debt/collateral
        let mut highest = feed.max_short_squeeze_price();
        if let Some(best) = self
            .limit_orders
            .range(
                Bound::Included((
                    LimitOrderKey::ByPrice(Reverse(Price::max(symbol.clone(), backing.clone()))),
                    0,
                )),
                Bound::Included((
                    LimitOrderKey::ByPrice(Reverse(Price::min(symbol.clone(), backing.clone()))),
                    ObjectId::MAX,
                )),
            )
            .next()
        {
            if best.sell_price > highest {
                highest = best.sell_price.clone();
            }
        }

        // swan iff the least call cannot cover even by spending all its
        // collateral at the best available price
        let least_call_price = least.collateralization().inverse();
        if least_call_price >= highest {
            warn!(%symbol, call = least_id, "black swan detected");
            if !enable_black_swan {
                return Err(ChainError::BlackSwanAttempted(symbol.clone()));
            }
            // settle at the worse of the feed and the least call's own price
            let mut payout_rate = feed.settlement_price.inverse();
            let least_rate = least.collateralization();
            if least_rate < payout_rate {
                payout_rate = least_rate;
            }
            self.globally_settle_asset(symbol, &payout_rate)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Close every call at `payout_rate` (collateral per debt), gathering
    /// collateral into the settlement fund. Outstanding supply is unchanged;
    /// holders redeem from the fund afterwards.
    pub fn globally_settle_asset(
        &mut self,
        symbol: &AssetSymbol,
        payout_rate: &Price,
    ) -> ChainResult {
        let bitasset = self.get_bitasset(symbol)?;
        if bitasset.has_settlement() {
            return Err(ChainError::precondition(
                "asset is already globally settled",
            ));
        }
        let backing = bitasset.backing_asset.clone();
        let bitasset_id = bitasset.id;

        let original_supply = self.get_dynamic_data(symbol)?.total_supply();
        let mut collateral_gathered = Asset::zero(backing.clone());

        loop {
            let Some(call_id) = self.least_collateralized_call(&backing, symbol) else {
                break;
            };
            let call = self.call_orders.require(call_id, "call order")?.clone();
            // round up in favor of the settlement fund, capped by collateral
            let mut pays = payout_rate.convert_round_up(&call.debt)?;
            if pays.amount > call.collateral.amount {
                pays.amount = call.collateral.amount;
            }
            collateral_gathered = collateral_gathered.checked_add(&pays)?;
            let debt = call.debt.clone();
            let fill_price = Price::new(debt.clone(), pays.clone());
            // the retired debt was never escrowed: it lives in holder
            // balances, so re-add what fill_call_order burns from pending
            self.adjust_pending_supply(&debt)?;
            self.fill_call_order(call_id, &pays, &debt, &fill_price, true)?;
        }

        let settlement_price = Price::new(
            Asset::new(original_supply, symbol.clone()),
            collateral_gathered.clone(),
        );
        self.bitassets.modify(bitasset_id, |b| {
            b.settlement_price = settlement_price;
            b.settlement_fund = collateral_gathered.amount;
        })?;
        info!(%symbol, fund = %collateral_gathered, "global settlement complete");
        Ok(())
    }

    // ============================================================
    // MARGIN CALL LOOP
    // ============================================================

    /// Walk undercollateralized calls against the book, least safe first.
    /// Returns true when any margin call executed. With black swans
    /// disallowed, a detected swan surfaces as `BlackSwanAttempted`.
    pub fn check_call_orders(
        &mut self,
        symbol: &AssetSymbol,
        enable_black_swan: bool,
        for_new_limit_order: bool,
    ) -> ChainResult<bool> {
        let asset = self.get_asset(symbol)?;
        if !asset.is_market_issued() {
            return Ok(false);
        }
        if self.check_for_blackswan(symbol, enable_black_swan)? {
            return Ok(false);
        }
        let bitasset = self.get_bitasset(symbol)?;
        if bitasset.is_prediction_market || bitasset.current_feed.is_null() {
            return Ok(false);
        }
        let backing = bitasset.backing_asset.clone();
        let min_price = bitasset.current_feed.max_short_squeeze_price();

        let mut margin_called = false;

        loop {
            if self.check_for_blackswan(symbol, enable_black_swan)? {
                return Ok(true);
            }
            let bitasset = self.get_bitasset(symbol)?;
            let feed = bitasset.current_feed.clone();
            let maintenance = feed.maintenance_collateralization();

            let Some(call_id) = self.least_collateralized_call(&backing, symbol) else {
                break;
            };
            let call = self.call_orders.require(call_id, "call order")?.clone();
            if maintenance < call.collateralization() {
                break; // everything left is adequately collateralized
            }

            // best limit selling the debt asset, stopping at the squeeze
            let Some(limit) = self
                .limit_orders
                .range(
                    Bound::Included((
                        LimitOrderKey::ByPrice(Reverse(Price::max(
                            symbol.clone(),
                            backing.clone(),
                        ))),
                        0,
                    )),
                    Bound::Included((
                        LimitOrderKey::ByPrice(Reverse(min_price.clone())),
                        ObjectId::MAX,
                    )),
                )
                .next()
                .map(|o| (o.id, o.sell_price.clone(), o.amount_for_sale()))
            else {
                break;
            };
            let (limit_id, match_price, usd_for_sale) = limit;

            margin_called = true;

            // can the full debt be covered at this price at all?
            let full_cover = match_price.inverse().convert(&call.debt)?;
            if full_cover.amount > call.collateral.amount {
                warn!(%symbol, "margin call cannot cover debt, forcing settlement");
                if !enable_black_swan {
                    return Err(ChainError::BlackSwanAttempted(symbol.clone()));
                }
                let payout_rate = {
                    let feed_rate = feed.settlement_price.inverse();
                    let least_rate = call.collateralization();
                    if least_rate < feed_rate {
                        least_rate
                    } else {
                        feed_rate
                    }
                };
                self.globally_settle_asset(symbol, &payout_rate)?;
                return Ok(true);
            }

            let to_cover = call.max_debt_to_cover(
                &match_price,
                &feed.settlement_price,
                feed.maintenance_collateral_ratio,
                &maintenance,
            )?;
            if to_cover == 0 {
                break;
            }
            let usd_to_buy = Asset::new(to_cover, symbol.clone());

            let call_receives;
            let order_receives;
            if usd_to_buy.amount > usd_for_sale.amount {
                // fill the limit; round down in favor of the call
                order_receives = match_price.inverse().convert(&usd_for_sale)?;
                if order_receives.amount == 0 {
                    // dust limit: cancel and retry with the next one
                    self.cancel_limit_order(limit_id)?;
                    continue;
                }
                call_receives = match_price.inverse().convert_round_up(&order_receives)?;
            } else {
                // fill the call; round up in favor of the standing limit
                call_receives = usd_to_buy.clone();
                order_receives = match_price.inverse().convert_round_up(&usd_to_buy)?;
            }

            let call_pays = order_receives.clone();
            let order_pays = call_receives.clone();

            self.fill_call_order(
                call_id,
                &call_pays,
                &call_receives,
                &match_price,
                for_new_limit_order,
            )?;
            self.fill_limit_order(
                limit_id,
                &order_pays,
                &order_receives,
                true,
                &match_price,
                !for_new_limit_order,
                &AccountName::default(),
            )?;
            debug!(%symbol, call = call_id, limit = limit_id, "margin call executed");
        }

        Ok(margin_called)
    }

    // ============================================================
    // POSITION UPDATES
    // ============================================================

    /// Open, adjust, or close a collateralized position. Positive debt
    /// deltas mint to the borrower's liquid balance; negative deltas repay
    /// out of it. The resulting position must meet maintenance and must
    /// not uncover a black swan.
    pub fn update_call_order(
        &mut self,
        borrower: &AccountName,
        delta_collateral: &Asset,
        delta_debt: &Asset,
        target_collateral_ratio: Option<u16>,
    ) -> ChainResult {
        let debt_symbol = delta_debt.symbol.clone();
        let collateral_symbol = delta_collateral.symbol.clone();
        let asset = self.get_asset(&debt_symbol)?;
        if !asset.is_market_issued() {
            return Err(ChainError::invalid("debt asset is not market issued"));
        }
        let bitasset = self.get_bitasset(&debt_symbol)?;
        if bitasset.backing_asset != collateral_symbol {
            return Err(ChainError::invalid(
                "collateral does not match the backing asset",
            ));
        }
        if bitasset.has_settlement() {
            return Err(ChainError::precondition(
                "cannot borrow a globally settled asset",
            ));
        }
        if bitasset.current_feed.is_null() {
            return Err(ChainError::precondition("asset has no feed"));
        }
        let maintenance = bitasset.current_feed.maintenance_collateralization();

        let existing = self
            .call_orders
            .find_by_key(CallOrderKey::ByAccountAsset(
                borrower.clone(),
                debt_symbol.clone(),
            ))
            .map(|c| c.id);

        // collateral in
        if delta_collateral.amount > 0 {
            self.adjust_liquid_balance(borrower, &delta_collateral.negated())?;
            self.adjust_pending_supply(delta_collateral)?;
        }
        // debt out
        if delta_debt.amount > 0 {
            self.adjust_liquid_balance(borrower, delta_debt)?;
        } else if delta_debt.amount < 0 {
            let repay = delta_debt.negated();
            self.adjust_liquid_balance(borrower, &repay.negated())?;
        }

        let (new_debt, new_collateral, call_id) = match existing {
            Some(id) => {
                let call = self.call_orders.require(id, "call order")?;
                (
                    call.debt.amount + delta_debt.amount,
                    call.collateral.amount + delta_collateral.amount,
                    Some(id),
                )
            }
            None => {
                if delta_debt.amount <= 0 || delta_collateral.amount <= 0 {
                    return Err(ChainError::invalid(
                        "a new position needs positive debt and collateral",
                    ));
                }
                (delta_debt.amount, delta_collateral.amount, None)
            }
        };
        if new_debt < 0 || new_collateral < 0 {
            return Err(ChainError::invalid("position cannot go negative"));
        }

        if new_debt == 0 {
            // closing out: everything escrowed for this position returns
            let id = call_id.ok_or(ChainError::invalid("no position to close"))?;
            let escrowed = new_collateral + (-delta_collateral.amount).max(0);
            let freed = Asset::new(escrowed, collateral_symbol.clone());
            if freed.amount > 0 {
                self.adjust_pending_supply(&freed.negated())?;
                self.adjust_liquid_balance(borrower, &freed)?;
            }
            return self.call_orders.remove(id);
        }

        let position = CallOrder {
            id: 0,
            borrower: borrower.clone(),
            debt: Asset::new(new_debt, debt_symbol.clone()),
            collateral: Asset::new(new_collateral, collateral_symbol.clone()),
            target_collateral_ratio,
        };
        if position.collateralization() < maintenance {
            return Err(ChainError::precondition(
                "position would fall below maintenance collateralization",
            ));
        }

        match call_id {
            Some(id) => {
                self.call_orders.modify(id, |c| {
                    c.debt.amount = new_debt;
                    c.collateral.amount = new_collateral;
                    c.target_collateral_ratio = target_collateral_ratio;
                })?;
            }
            None => {
                self.call_orders.create(|id| CallOrder {
                    id,
                    ..position.clone()
                });
            }
        }

        // withdrawn collateral leaves escrow once the position checks pass
        if delta_collateral.amount < 0 {
            let withdrawn = delta_collateral.negated();
            self.adjust_pending_supply(&withdrawn.negated())?;
            self.adjust_liquid_balance(borrower, &withdrawn)?;
        }

        // withdrawing collateral or minting debt must not uncover a swan
        self.check_call_orders(&debt_symbol, false, false)?;
        Ok(())
    }

    // ============================================================
    // FORCE SETTLEMENT
    // ============================================================

    /// Execute a matured settlement request against the least
    /// collateralized position, or pay it from the settlement fund.
    pub fn execute_settlement(&mut self, settle_id: ObjectId) -> ChainResult {
        let settle = self
            .force_settlements
            .require(settle_id, "force settlement")?
            .clone();
        let symbol = settle.balance.symbol.clone();
        let bitasset = self.get_bitasset(&symbol)?;
        let backing = bitasset.backing_asset.clone();

        if bitasset.has_settlement() {
            return self.settle_from_fund(settle_id);
        }
        if bitasset.current_feed.is_null() {
            return self.cancel_settle_order(settle_id);
        }

        // settle at the feed less the configured offset
        let offset = self.chain_props.force_settlement_offset_percent;
        let payout_rate = bitasset
            .current_feed
            .settlement_price
            .inverse()
            .scaled(PERCENT_100 - offset, PERCENT_100)?;

        let mut remaining = settle.balance.clone();
        while remaining.amount > 0 {
            let Some(call_id) = self.least_collateralized_call(&backing, &symbol) else {
                // nothing left to settle against; cancel the remainder
                return self.cancel_settle_order(settle_id);
            };
            let call = self.call_orders.require(call_id, "call order")?.clone();

            let call_receives = if remaining.amount < call.debt.amount {
                remaining.clone()
            } else {
                call.debt.clone()
            };
            let mut call_pays = payout_rate.convert(&call_receives)?;
            if call_pays.amount == 0 {
                if call_receives == call.debt {
                    call_pays.amount = 1; // something-for-nothing guard
                } else {
                    return self.cancel_settle_order(settle_id);
                }
            } else if call_receives == call.debt {
                call_pays = payout_rate.convert_round_up(&call_receives)?;
                if call_pays.amount > call.collateral.amount {
                    call_pays.amount = call.collateral.amount;
                }
            }

            let fill_price = Price::new(call_receives.clone(), call_pays.clone());
            self.fill_call_order(call_id, &call_pays, &call_receives, &fill_price, true)?;
            let done =
                self.fill_settle_order(settle_id, &call_receives, &call_pays, &fill_price)?;
            remaining.amount -= call_receives.amount;
            if done {
                break;
            }
        }

        let settled = settle.balance.amount;
        let bitasset_id = self.get_bitasset(&symbol)?.id;
        self.bitassets.modify(bitasset_id, |b| {
            b.force_settled_volume += settled;
        })?;
        Ok(())
    }

    /// Pay a settlement out of the global-settlement fund at the recorded
    /// settlement price.
    fn settle_from_fund(&mut self, settle_id: ObjectId) -> ChainResult {
        let settle = self
            .force_settlements
            .require(settle_id, "force settlement")?
            .clone();
        let symbol = settle.balance.symbol.clone();
        let bitasset = self.get_bitasset(&symbol)?;
        let settlement_price = bitasset.settlement_price.clone();
        let fund = bitasset.settlement_fund;
        let bitasset_id = bitasset.id;

        let mut payout = settlement_price.convert(&settle.balance)?;
        if payout.amount > fund {
            payout.amount = fund;
        }

        // the settled balance is burned out of escrow; the payout leaves
        // the fund (which lives in pending supply)
        self.adjust_pending_supply(&settle.balance.negated())?;
        if payout.amount > 0 {
            self.adjust_pending_supply(&payout.negated())?;
            self.adjust_liquid_balance(&settle.owner, &payout)?;
        }
        self.bitassets.modify(bitasset_id, |b| {
            b.settlement_fund -= payout.amount;
        })?;

        self.push_virtual_op(VirtualOperation::FillOrder {
            order_id: settle_id,
            owner: settle.owner.clone(),
            pays: settle.balance.clone(),
            receives: payout.clone(),
            fees: Asset::zero(payout.symbol.clone()),
            fill_price: settlement_price,
            is_maker: false,
        });
        self.force_settlements.remove(settle_id)
    }

    // ============================================================
    // COLLATERAL BIDS & REVIVAL
    // ============================================================

    /// Place or replace a bid to take over settled debt. A zero bid
    /// cancels an existing one.
    pub fn bid_on_collateral(
        &mut self,
        bidder: &AccountName,
        debt_covered: &Asset,
        additional_collateral: &Asset,
    ) -> ChainResult {
        let symbol = debt_covered.symbol.clone();
        let bitasset = self.get_bitasset(&symbol)?;
        if !bitasset.has_settlement() {
            return Err(ChainError::precondition(
                "collateral bids only apply to settled assets",
            ));
        }
        if bitasset.backing_asset != additional_collateral.symbol {
            return Err(ChainError::invalid(
                "bid collateral must be the backing asset",
            ));
        }

        let existing = self
            .collateral_bids
            .find_by_key(CollateralBidKey::ByAccountAsset(
                bidder.clone(),
                symbol.clone(),
            ))
            .map(|b| b.id);
        if let Some(id) = existing {
            let old = self.collateral_bids.require(id, "collateral bid")?.clone();
            self.adjust_pending_supply(&old.collateral_offered.negated())?;
            self.adjust_liquid_balance(bidder, &old.collateral_offered)?;
            self.collateral_bids.remove(id)?;
        }
        if debt_covered.amount == 0 {
            return Ok(()); // cancel only
        }

        self.adjust_liquid_balance(bidder, &additional_collateral.negated())?;
        self.adjust_pending_supply(additional_collateral)?;
        let bidder = bidder.clone();
        let debt = debt_covered.clone();
        let collateral = additional_collateral.clone();
        self.collateral_bids.create(|id| CollateralBid {
            id,
            bidder: bidder.clone(),
            debt_covered: debt.clone(),
            collateral_offered: collateral.clone(),
        });
        self.push_virtual_op(VirtualOperation::BidCollateral {
            bidder,
            debt_covered: debt,
            additional_collateral: collateral,
        });
        Ok(())
    }

    /// Revive a settled asset when standing bids cover its whole supply:
    /// each bid becomes a fresh call order carrying its slice of the fund.
    pub fn maybe_revive_bitasset(&mut self, symbol: &AssetSymbol) -> ChainResult<bool> {
        let bitasset = self.get_bitasset(symbol)?;
        if !bitasset.has_settlement() {
            return Ok(false);
        }
        let backing = bitasset.backing_asset.clone();
        let bitasset_id = bitasset.id;
        let fund = bitasset.settlement_fund;
        let outstanding = self.get_dynamic_data(symbol)?.total_supply();
        if outstanding == 0 {
            // fully settled away: just clear the flag and refund bids
            return self.clear_settlement(bitasset_id, symbol);
        }

        let total_bid: i64 = self
            .collateral_bids
            .iter()
            .filter(|b| b.debt_covered.symbol == *symbol)
            .map(|b| b.debt_covered.amount)
            .sum();
        if total_bid < outstanding {
            return Ok(false);
        }

        let mut remaining_debt = outstanding;
        let mut remaining_fund = fund;
        loop {
            let Some(bid) = self
                .collateral_bids
                .range(
                    Bound::Included((
                        CollateralBidKey::ByPrice(Reverse(Price::max(
                            backing.clone(),
                            symbol.clone(),
                        ))),
                        0,
                    )),
                    Bound::Included((
                        CollateralBidKey::ByPrice(Reverse(Price::min(
                            backing.clone(),
                            symbol.clone(),
                        ))),
                        ObjectId::MAX,
                    )),
                )
                .next()
                .map(|b| b.clone())
            else {
                break;
            };

            if remaining_debt == 0 {
                // surplus bid: refund
                self.adjust_pending_supply(&bid.collateral_offered.negated())?;
                self.adjust_liquid_balance(&bid.bidder, &bid.collateral_offered)?;
                self.collateral_bids.remove(bid.id)?;
                continue;
            }

            let debt_taken = bid.debt_covered.amount.min(remaining_debt);
            let fund_slice = if remaining_debt == debt_taken {
                remaining_fund
            } else {
                crate::amount::mul_div_down(fund, debt_taken, outstanding)?
            };
            remaining_debt -= debt_taken;
            remaining_fund -= fund_slice;

            let collateral = Asset::new(
                bid.collateral_offered.amount + fund_slice,
                backing.clone(),
            );
            let debt = Asset::new(debt_taken, symbol.clone());
            let bidder = bid.bidder.clone();
            self.call_orders.create(|id| CallOrder {
                id,
                borrower: bidder.clone(),
                debt: debt.clone(),
                collateral: collateral.clone(),
                target_collateral_ratio: None,
            });
            self.push_virtual_op(VirtualOperation::ExecuteBid {
                bidder,
                debt,
                collateral,
            });
            self.collateral_bids.remove(bid.id)?;
        }

        self.bitassets.modify(bitasset_id, |b| {
            b.settlement_price = Price::default();
            b.settlement_fund = 0;
        })?;
        info!(%symbol, "bitasset revived from collateral bids");
        Ok(true)
    }

    fn clear_settlement(&mut self, bitasset_id: ObjectId, symbol: &AssetSymbol) -> ChainResult<bool> {
        let bids: Vec<_> = self
            .collateral_bids
            .iter()
            .filter(|b| b.debt_covered.symbol == *symbol)
            .map(|b| b.id)
            .collect();
        for id in bids {
            let bid = self.collateral_bids.require(id, "collateral bid")?.clone();
            self.adjust_pending_supply(&bid.collateral_offered.negated())?;
            self.adjust_liquid_balance(&bid.bidder, &bid.collateral_offered)?;
            self.collateral_bids.remove(id)?;
        }
        self.bitassets.modify(bitasset_id, |b| {
            b.settlement_price = Price::default();
            b.settlement_fund = 0;
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainProperties, SYMBOL_COIN, SYMBOL_USD};
    use crate::objects::{AssetKeyIdx, PriceFeed};
    use crate::state::bootstrap_account;

    fn feed(debt: i64, coll: i64) -> PriceFeed {
        PriceFeed {
            settlement_price: Price::new(
                Asset::new(debt, SYMBOL_USD),
                Asset::new(coll, SYMBOL_COIN),
            ),
            maintenance_collateral_ratio: 1_750,
            max_short_squeeze_ratio: 1_100,
        }
    }

    fn setup_with_feed(debt: i64, coll: i64) -> State {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["bob", "carol"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_liquid_balance(&"bob".into(), &Asset::new(100_000, SYMBOL_COIN))
            .unwrap();
        state
            .adjust_liquid_balance(&"carol".into(), &Asset::new(100_000, SYMBOL_COIN))
            .unwrap();
        set_feed(&mut state, debt, coll);
        state
    }

    fn set_feed(state: &mut State, debt: i64, coll: i64) {
        let id = state
            .bitassets
            .find_by_key(AssetKeyIdx::BySymbol(SYMBOL_USD.into()))
            .unwrap()
            .id;
        state
            .bitassets
            .modify(id, |b| {
                b.current_feed = feed(debt, coll);
            })
            .unwrap();
    }

    #[test]
    fn test_open_position_mints_debt() {
        let mut state = setup_with_feed(1, 1);
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(2_000, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        assert_eq!(
            state
                .get_liquid_balance(&"bob".into(), &SYMBOL_USD.into())
                .amount,
            1_000
        );
        assert_eq!(state.call_orders.len(), 1);
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_undercollateralized_position_rejected() {
        let mut state = setup_with_feed(1, 1);
        let err = state
            .update_call_order(
                &"bob".into(),
                &Asset::new(1_500, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_close_position_returns_collateral() {
        let mut state = setup_with_feed(1, 1);
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(2_000, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(0, SYMBOL_COIN),
                &Asset::new(-1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        assert!(state.call_orders.is_empty());
        assert_eq!(
            state
                .get_liquid_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            100_000
        );
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_feed_drop_triggers_global_settlement() {
        let mut state = setup_with_feed(1, 1);
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(2_000, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        // price collapses: 1 USD now needs 4 COIN; bob has 2 COIN per USD
        set_feed(&mut state, 1, 4);
        let swanned = state
            .check_for_blackswan(&SYMBOL_USD.into(), true)
            .unwrap();
        assert!(swanned);
        let bitasset = state.get_bitasset(&SYMBOL_USD.into()).unwrap();
        assert!(bitasset.has_settlement());
        // fund captured all of bob's collateral (2 COIN per USD < feed's 4)
        assert_eq!(bitasset.settlement_fund, 2_000);
        assert!(state.call_orders.is_empty());
        // supply unchanged: holders still hold 1_000 USD
        let dyn_data = state.get_dynamic_data(&SYMBOL_USD.into()).unwrap();
        assert_eq!(dyn_data.total_supply(), 1_000);
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_swan_disallowed_errors() {
        let mut state = setup_with_feed(1, 1);
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(2_000, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        set_feed(&mut state, 1, 4);
        let err = state
            .check_for_blackswan(&SYMBOL_USD.into(), false)
            .unwrap_err();
        assert_eq!(err, ChainError::BlackSwanAttempted(SYMBOL_USD.into()));
    }

    #[test]
    fn test_bids_revive_settled_asset() {
        let mut state = setup_with_feed(1, 1);
        state
            .update_call_order(
                &"bob".into(),
                &Asset::new(2_000, SYMBOL_COIN),
                &Asset::new(1_000, SYMBOL_USD),
                None,
            )
            .unwrap();
        set_feed(&mut state, 1, 4);
        state.check_for_blackswan(&SYMBOL_USD.into(), true).unwrap();

        // carol bids to take over the whole supply with fresh collateral
        state
            .bid_on_collateral(
                &"carol".into(),
                &Asset::new(1_000, SYMBOL_USD),
                &Asset::new(4_000, SYMBOL_COIN),
            )
            .unwrap();
        let revived = state.maybe_revive_bitasset(&SYMBOL_USD.into()).unwrap();
        assert!(revived);
        let bitasset = state.get_bitasset(&SYMBOL_USD.into()).unwrap();
        assert!(!bitasset.has_settlement());
        assert_eq!(state.call_orders.len(), 1);
        let call = state.call_orders.iter().next().unwrap();
        assert_eq!(call.borrower, AccountName::new("carol"));
        // her call carries her collateral plus the whole fund
        assert_eq!(call.collateral.amount, 6_000);
        state.verify_supply_invariants().unwrap();
    }
}
