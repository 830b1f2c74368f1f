//! Order book
//!
//! Limit-order placement and the price-time-priority matching walk. New
//! orders match in favor of the taker: better-priced resting limits first,
//! then margin-called positions when the new order is buying collateral,
//! then the remaining overlap. Rounding always favors the standing order;
//! a side that would receive zero is cancelled rather than filled for
//! nothing.

use crate::amount::Asset;
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::{CallOrderKey, LimitOrder, LimitOrderKey};
use crate::price::Price;
use crate::state::State;
use crate::virtual_ops::VirtualOperation;
use std::cmp::Reverse;
use std::ops::Bound;
use tracing::debug;

/// Which sides of a match were completely consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillMask(pub u8);

impl FillMask {
    pub const NONE: FillMask = FillMask(0);
    pub const TAKER: FillMask = FillMask(1);
    pub const MAKER: FillMask = FillMask(2);
    pub const BOTH: FillMask = FillMask(3);

    pub fn taker_filled(&self) -> bool {
        self.0 & 1 != 0
    }

    pub fn maker_filled(&self) -> bool {
        self.0 & 2 != 0
    }
}

impl State {
    // ============================================================
    // PLACEMENT / CANCELLATION
    // ============================================================

    /// Validate, escrow the sale amount, create the order, and run the
    /// matching walk. Returns true when the order filled completely.
    #[allow(clippy::too_many_arguments)]
    pub fn place_limit_order(
        &mut self,
        owner: &AccountName,
        order_id: u64,
        amount_to_sell: &Asset,
        exchange_rate: &Price,
        interface: &AccountName,
        expiration: TimePoint,
        fill_or_kill: bool,
    ) -> ChainResult<bool> {
        let now = self.head_block_time();
        if expiration <= now {
            return Err(ChainError::invalid("order expiration must be in the future"));
        }
        self.get_active_account(owner)?;
        self.get_asset(&exchange_rate.base.symbol)?;
        self.get_asset(&exchange_rate.quote.symbol)?;
        if self
            .limit_orders
            .find_by_key(LimitOrderKey::ByAccount(owner.clone(), order_id))
            .is_some()
        {
            return Err(ChainError::precondition(format!(
                "order id {order_id} already in use for {owner}"
            )));
        }

        self.adjust_liquid_balance(owner, &amount_to_sell.negated())?;
        self.adjust_pending_supply(amount_to_sell)?;

        let sell_price = exchange_rate.clone();
        let owner = owner.clone();
        let interface = interface.clone();
        let amount = amount_to_sell.amount;
        let new_id = self.limit_orders.create(|id| LimitOrder {
            id,
            seller: owner.clone(),
            order_id,
            sell_price: sell_price.clone(),
            for_sale: amount,
            interface: interface.clone(),
            created: now,
            expiration,
        });

        let filled = self.apply_order(new_id)?;
        if fill_or_kill && !filled {
            return Err(ChainError::precondition(
                "fill-or-kill order was not completely filled",
            ));
        }
        Ok(filled)
    }

    /// Refund the unfilled remainder to the owner and drop the order.
    pub fn cancel_limit_order(&mut self, order_id: ObjectId) -> ChainResult {
        let order = self
            .limit_orders
            .require(order_id, "limit order")?
            .clone();
        let remainder = order.amount_for_sale();
        self.adjust_pending_supply(&remainder.negated())?;
        self.adjust_liquid_balance(&order.seller, &remainder)?;
        self.limit_orders.remove(order_id)
    }

    /// Cancel the order when its remainder cannot buy anything at its own
    /// price. Returns true if the order was culled.
    pub fn maybe_cull_small_order(&mut self, order_id: ObjectId) -> ChainResult<bool> {
        let Some(order) = self.limit_orders.get(order_id) else {
            return Ok(true);
        };
        if order.amount_to_receive()?.amount == 0 {
            debug!(order = order_id, "culling dust order");
            self.cancel_limit_order(order_id)?;
            return Ok(true);
        }
        Ok(false)
    }

    // ============================================================
    // MATCHING WALK
    // ============================================================

    /// Match a freshly-created order against the book. Returns true when
    /// the order no longer rests on the book.
    pub fn apply_order(&mut self, new_id: ObjectId) -> ChainResult<bool> {
        let new_order = self
            .limit_orders
            .require(new_id, "limit order")?
            .clone();
        let sell_symbol = new_order.sell_asset().clone();
        let recv_symbol = new_order.receive_asset().clone();

        // Opposite-side orders sell recv for sell; overlap while their
        // price stays at or above the inverse of ours.
        let max_price = new_order.sell_price.inverse();

        // Margin calls participate only when the new order is buying
        // collateral of a live, feeded, non-prediction bitasset.
        let mut call_match_price: Option<Price> = None;
        let sell_asset = self.get_asset(&sell_symbol)?;
        if sell_asset.is_market_issued() {
            let bitasset = self.get_bitasset(&sell_symbol)?;
            if bitasset.backing_asset == recv_symbol
                && !bitasset.is_prediction_market
                && !bitasset.has_settlement()
                && !bitasset.current_feed.is_null()
            {
                let candidate = bitasset.current_feed.max_short_squeeze_price().inverse();
                if max_price <= candidate {
                    call_match_price = Some(candidate);
                }
            }
        }

        let mut finished = false;

        if let Some(call_price) = call_match_price.clone() {
            // resting limits with a strictly better price go first
            while !finished {
                let Some((maker_id, maker_price)) =
                    self.best_opposite_limit(&recv_symbol, &sell_symbol, &max_price)
                else {
                    break;
                };
                if maker_price <= call_price {
                    break;
                }
                let mask = self.match_limit_limit(new_id, maker_id, &maker_price)?;
                finished = mask.taker_filled();
            }

            // then the margin-call queue, least collateralized first
            while !finished {
                let bitasset = self.get_bitasset(&sell_symbol)?;
                let feed = bitasset.current_feed.clone();
                let maintenance = feed.maintenance_collateralization();
                let Some(call_id) = self.least_collateralized_call(&recv_symbol, &sell_symbol)
                else {
                    break;
                };
                let call = self.call_orders.require(call_id, "call order")?.clone();
                if call.collateralization() > maintenance {
                    break; // feed protected
                }
                match self.match_limit_call(new_id, call_id, &call_price, &feed)? {
                    None => break,
                    Some(mask) => {
                        if mask.taker_filled() {
                            finished = true;
                        }
                        // partial cover to target ratio: move on to the
                        // next least-collateralized position
                    }
                }
            }
        }

        // remaining overlap against resting limits
        while !finished {
            let Some((maker_id, maker_price)) =
                self.best_opposite_limit(&recv_symbol, &sell_symbol, &max_price)
            else {
                break;
            };
            let mask = self.match_limit_limit(new_id, maker_id, &maker_price)?;
            finished = mask.taker_filled();
        }

        if self.limit_orders.get(new_id).is_none() {
            return Ok(true);
        }
        self.maybe_cull_small_order(new_id)
    }

    /// Best-priced resting order selling `sell_sym` for `recv_sym` whose
    /// price still overlaps `min_price`.
    fn best_opposite_limit(
        &self,
        sell_sym: &AssetSymbol,
        recv_sym: &AssetSymbol,
        min_price: &Price,
    ) -> Option<(ObjectId, Price)> {
        let pair_best = Price::max(sell_sym.clone(), recv_sym.clone());
        self.limit_orders
            .range(
                Bound::Included((LimitOrderKey::ByPrice(Reverse(pair_best)), 0)),
                Bound::Included((
                    LimitOrderKey::ByPrice(Reverse(min_price.clone())),
                    ObjectId::MAX,
                )),
            )
            .next()
            .map(|o| (o.id, o.sell_price.clone()))
    }

    /// Least-collateralized call order in the (backing, debt) market.
    pub(crate) fn least_collateralized_call(
        &self,
        backing: &AssetSymbol,
        debt: &AssetSymbol,
    ) -> Option<ObjectId> {
        self.call_orders
            .range(
                Bound::Included((
                    CallOrderKey::ByCollateral(Price::min(backing.clone(), debt.clone())),
                    0,
                )),
                Bound::Included((
                    CallOrderKey::ByCollateral(Price::max(backing.clone(), debt.clone())),
                    ObjectId::MAX,
                )),
            )
            .next()
            .map(|c| c.id)
    }

    // ============================================================
    // PAIRWISE MATCHES
    // ============================================================

    /// Match taker against a resting maker at the maker's price.
    pub fn match_limit_limit(
        &mut self,
        taker_id: ObjectId,
        maker_id: ObjectId,
        match_price: &Price,
    ) -> ChainResult<FillMask> {
        let taker = self.limit_orders.require(taker_id, "limit order")?.clone();
        let maker = self.limit_orders.require(maker_id, "limit order")?.clone();
        debug_assert_eq!(taker.sell_asset(), maker.receive_asset());
        debug_assert_eq!(taker.receive_asset(), maker.sell_asset());

        let taker_for_sale = taker.amount_for_sale();
        let maker_for_sale = maker.amount_for_sale();

        let taker_pays;
        let taker_receives;
        let maker_pays;
        let maker_receives;
        let mut cull_taker = false;

        let maker_capacity = match_price.convert(&maker_for_sale)?;
        if taker_for_sale.amount <= maker_capacity.amount {
            // taker fully consumed; round down against the taker
            taker_receives = match_price.convert(&taker_for_sale)?;
            if taker_receives.amount == 0 {
                // partially-filled remainder too small to buy anything
                self.cancel_limit_order(taker_id)?;
                return Ok(FillMask::TAKER);
            }
            maker_receives = match_price.convert_round_up(&taker_receives)?;
            cull_taker = true;
        } else {
            // maker fully consumed; round in favor of the standing order
            maker_receives = match_price.convert(&maker_for_sale)?;
            if maker_receives.amount == 0 {
                self.cancel_limit_order(maker_id)?;
                return Ok(FillMask::MAKER);
            }
            taker_receives = match_price.convert_round_up(&maker_receives)?;
        }
        maker_pays = taker_receives.clone();
        taker_pays = maker_receives.clone();

        let mut mask = 0u8;
        if self.fill_limit_order(
            taker_id,
            &taker_pays,
            &taker_receives,
            cull_taker,
            match_price,
            false,
            &maker.interface,
        )? {
            mask |= 1;
        }
        if self.fill_limit_order(
            maker_id,
            &maker_pays,
            &maker_receives,
            true,
            match_price,
            true,
            &taker.interface,
        )? {
            mask |= 2;
        }
        debug_assert_ne!(mask, 0, "a match must fill at least one side");
        Ok(FillMask(mask))
    }

    /// Match a collateral-buying taker against a margin-called position.
    /// Returns `None` when the call needs no cover at this feed.
    pub fn match_limit_call(
        &mut self,
        taker_id: ObjectId,
        call_id: ObjectId,
        match_price: &Price,
        feed: &crate::objects::PriceFeed,
    ) -> ChainResult<Option<FillMask>> {
        let taker = self.limit_orders.require(taker_id, "limit order")?.clone();
        let call = self.call_orders.require(call_id, "call order")?.clone();
        debug_assert_eq!(*taker.sell_asset(), call.debt.symbol);
        debug_assert_eq!(*taker.receive_asset(), call.collateral.symbol);

        let taker_for_sale = taker.amount_for_sale();
        let to_cover = call.max_debt_to_cover(
            &feed.max_short_squeeze_price(),
            &feed.settlement_price,
            feed.maintenance_collateral_ratio,
            &feed.maintenance_collateralization(),
        )?;
        if to_cover == 0 {
            return Ok(None);
        }
        let taker_to_buy = Asset::new(to_cover, call.debt.symbol.clone());

        let order_receives;
        let call_receives;
        let mut cull_taker = false;

        if taker_to_buy.amount > taker_for_sale.amount {
            // the call swallows the whole order; round against the taker
            order_receives = match_price.convert(&taker_for_sale)?;
            if order_receives.amount == 0 {
                self.cancel_limit_order(taker_id)?;
                return Ok(Some(FillMask::TAKER));
            }
            call_receives = match_price.convert_round_up(&order_receives)?;
            cull_taker = true;
        } else {
            // the order covers the call; round in favor of the limit order
            call_receives = taker_to_buy.clone();
            order_receives = match_price.convert_round_up(&taker_to_buy)?;
        }

        let call_pays = order_receives.clone();
        let order_pays = call_receives.clone();

        let mut mask = 0u8;
        if self.fill_limit_order(
            taker_id,
            &order_pays,
            &order_receives,
            cull_taker,
            match_price,
            false,
            &AccountName::default(),
        )? {
            mask |= 1;
        }
        if self.fill_call_order(call_id, &call_pays, &call_receives, match_price, true)? {
            mask |= 2;
        }
        Ok(Some(FillMask(mask)))
    }

    // ============================================================
    // FILLS
    // ============================================================

    /// Settle one side of a match into the seller's liquid balance, net of
    /// issuer and trading fees. Returns true when the order was removed.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_limit_order(
        &mut self,
        order_id: ObjectId,
        pays: &Asset,
        receives: &Asset,
        cull_if_small: bool,
        fill_price: &Price,
        is_maker: bool,
        counter_interface: &AccountName,
    ) -> ChainResult<bool> {
        let order = self.limit_orders.require(order_id, "limit order")?.clone();
        debug_assert_eq!(*order.sell_asset(), pays.symbol);
        if pays.symbol == receives.symbol {
            return Err(ChainError::invalid("fill must cross two assets"));
        }

        let (maker_interface, taker_interface) = if is_maker {
            (order.interface.clone(), counter_interface.clone())
        } else {
            (counter_interface.clone(), order.interface.clone())
        };

        let issuer_fees = self.pay_issuer_fees(&order.seller, receives)?;
        let trading_fees =
            self.pay_trading_fees(&order.seller, receives, &maker_interface, &taker_interface)?;
        let fees_paid = issuer_fees.checked_add(&trading_fees)?;
        let delta = receives.checked_sub(&fees_paid)?;

        self.adjust_pending_supply(&receives.negated())?;
        self.adjust_liquid_balance(&order.seller, &delta)?;

        self.push_virtual_op(VirtualOperation::FillOrder {
            order_id,
            owner: order.seller.clone(),
            pays: pays.clone(),
            receives: receives.clone(),
            fees: fees_paid,
            fill_price: fill_price.clone(),
            is_maker,
        });

        if pays.amount == order.for_sale {
            self.limit_orders.remove(order_id)?;
            return Ok(true);
        }
        let paid = pays.amount;
        self.limit_orders.modify(order_id, |o| {
            o.for_sale -= paid;
        })?;
        if cull_if_small {
            return self.maybe_cull_small_order(order_id);
        }
        Ok(false)
    }

    /// Reduce a call position. Freed collateral returns to the borrower
    /// when the debt reaches zero; the received debt is retired from
    /// pending supply. Returns true when the position closed.
    pub fn fill_call_order(
        &mut self,
        call_id: ObjectId,
        pays: &Asset,
        receives: &Asset,
        fill_price: &Price,
        is_maker: bool,
    ) -> ChainResult<bool> {
        let call = self.call_orders.require(call_id, "call order")?.clone();
        debug_assert_eq!(call.debt.symbol, receives.symbol);
        debug_assert_eq!(call.collateral.symbol, pays.symbol);
        if pays.amount > call.collateral.amount {
            return Err(ChainError::precondition(
                "call cannot pay more than its collateral",
            ));
        }

        let mut collateral_freed: Option<Asset> = None;
        let pays_amount = pays.amount;
        let receives_amount = receives.amount;
        self.call_orders.modify(call_id, |c| {
            c.debt.amount -= receives_amount;
            c.collateral.amount -= pays_amount;
            if c.debt.amount == 0 {
                collateral_freed = Some(c.collateral.clone());
                c.collateral.amount = 0;
            }
        })?;

        // the covered debt is burned out of order-book escrow
        self.adjust_pending_supply(&receives.negated())?;

        if let Some(freed) = &collateral_freed {
            if freed.amount > 0 {
                self.adjust_pending_supply(&freed.negated())?;
                self.adjust_liquid_balance(&call.borrower, freed)?;
            }
        }

        self.push_virtual_op(VirtualOperation::FillOrder {
            order_id: call_id,
            owner: call.borrower.clone(),
            pays: pays.clone(),
            receives: receives.clone(),
            fees: Asset::zero(pays.symbol.clone()),
            fill_price: fill_price.clone(),
            is_maker,
        });

        if collateral_freed.is_some() {
            self.call_orders.remove(call_id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Pay out a force settlement from call collateral. Returns true when
    /// the settlement request is fully consumed.
    pub fn fill_settle_order(
        &mut self,
        settle_id: ObjectId,
        pays: &Asset,
        receives: &Asset,
        fill_price: &Price,
    ) -> ChainResult<bool> {
        let settle = self
            .force_settlements
            .require(settle_id, "force settlement")?
            .clone();
        debug_assert_eq!(settle.balance.symbol, pays.symbol);

        let issuer_fees = self.pay_issuer_fees(&settle.owner, receives)?;
        let trading_fees = self.pay_trading_fees(
            &settle.owner,
            receives,
            &AccountName::default(),
            &AccountName::default(),
        )?;
        let fees_paid = issuer_fees.checked_add(&trading_fees)?;
        let delta = receives.checked_sub(&fees_paid)?;

        self.adjust_pending_supply(&receives.negated())?;
        self.adjust_liquid_balance(&settle.owner, &delta)?;

        self.push_virtual_op(VirtualOperation::FillOrder {
            order_id: settle_id,
            owner: settle.owner.clone(),
            pays: pays.clone(),
            receives: receives.clone(),
            fees: fees_paid,
            fill_price: fill_price.clone(),
            is_maker: false,
        });

        let filled = pays.amount >= settle.balance.amount;
        if filled {
            self.force_settlements.remove(settle_id)?;
        } else {
            let paid = pays.amount;
            self.force_settlements.modify(settle_id, |s| {
                s.balance.amount -= paid;
            })?;
        }
        Ok(filled)
    }

    /// Cancel a pending force settlement, refunding the escrowed balance.
    pub fn cancel_settle_order(&mut self, settle_id: ObjectId) -> ChainResult {
        let settle = self
            .force_settlements
            .require(settle_id, "force settlement")?
            .clone();
        self.adjust_pending_supply(&settle.balance.negated())?;
        self.adjust_liquid_balance(&settle.owner, &settle.balance)?;
        self.push_virtual_op(VirtualOperation::AssetSettleCancel {
            settlement: settle_id,
            owner: settle.owner.clone(),
            amount: settle.balance.clone(),
        });
        self.force_settlements.remove(settle_id)
    }
}
