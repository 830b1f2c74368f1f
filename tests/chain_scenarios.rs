//! End-to-end scenarios against a full chain state: order-book crosses,
//! black swans, unstake routes, recovery, and enterprise payout gating,
//! plus the round-trip laws and a conservation audit after each one.

use civica::amount::BLOCKCHAIN_PRECISION;
use civica::config::{self, ChainProperties, SYMBOL_COIN, SYMBOL_EQUITY, SYMBOL_USD};
use civica::core_types::{AccountName, SECONDS_PER_DAY};
use civica::evaluators::apply_operation;
use civica::maintenance;
use civica::objects::{AssetKeyIdx, Milestone, PriceFeed, UnstakeRoute};
use civica::operations::*;
use civica::state::bootstrap_account;
use civica::{Asset, ChainError, Operation, Price, State, TimePoint, VirtualOperation};

const T0: i64 = 1_700_000_000;

/// Fresh state with funded accounts and aged timestamps.
fn make_state(accounts: &[&str]) -> State {
    let mut state = State::new(TimePoint::from_secs(T0), ChainProperties::default());
    for name in accounts {
        bootstrap_account(&mut state, name);
        state
            .adjust_liquid_balance(
                &AccountName::new(name),
                &Asset::new(1_000 * BLOCKCHAIN_PRECISION, SYMBOL_COIN),
            )
            .unwrap();
    }
    // age the accounts past creation-time rate limits
    advance(&mut state, SECONDS_PER_DAY);
    state
}

fn advance(state: &mut State, secs: i64) {
    state.props_modify(|p| p.head_block_time = p.head_block_time.add_secs(secs));
}

fn publish_usd_feed(state: &mut State, debt: i64, coll: i64) {
    let id = state
        .bitassets
        .find_by_key(AssetKeyIdx::BySymbol(SYMBOL_USD.into()))
        .unwrap()
        .id;
    let now = state.head_block_time();
    state
        .bitassets
        .modify(id, |b| {
            b.feeds.insert(
                "feeder".into(),
                (
                    now,
                    PriceFeed {
                        settlement_price: Price::new(
                            Asset::new(debt, SYMBOL_USD),
                            Asset::new(coll, SYMBOL_COIN),
                        ),
                        maintenance_collateral_ratio: 1_750,
                        max_short_squeeze_ratio: 1_100,
                    },
                ),
            );
            b.update_median_feed(now);
        })
        .unwrap();
}

fn liquid(state: &State, who: &str, symbol: &str) -> i64 {
    state
        .get_liquid_balance(&AccountName::new(who), &symbol.into())
        .amount
}

fn sell(owner: &str, order_id: u64, sell: (i64, &str), recv: (i64, &str)) -> Operation {
    Operation::LimitOrderCreate(LimitOrderCreate {
        signatory: owner.into(),
        owner: owner.into(),
        order_id,
        amount_to_sell: Asset::new(sell.0, sell.1),
        exchange_rate: Price::new(Asset::new(sell.0, sell.1), Asset::new(recv.0, recv.1)),
        interface: AccountName::default(),
        expiration: TimePoint::from_secs(T0 + 10 * SECONDS_PER_DAY),
        fill_or_kill: false,
    })
}

// ============================================================
// SCENARIO 1: open-book exact fill
// ============================================================

#[test]
fn scenario_open_book_fill() {
    let mut state = make_state(&["alice", "bob"]);
    state
        .adjust_liquid_balance(&"bob".into(), &Asset::new(1_000, SYMBOL_USD))
        .unwrap();

    apply_operation(&mut state, &sell("alice", 1, (5, SYMBOL_COIN), (10, SYMBOL_USD))).unwrap();
    let coin_before = liquid(&state, "bob", SYMBOL_COIN);
    apply_operation(&mut state, &sell("bob", 1, (10, SYMBOL_USD), (5, SYMBOL_COIN))).unwrap();

    // both orders removed, balances crossed
    assert!(state.limit_orders.is_empty());
    assert_eq!(liquid(&state, "alice", SYMBOL_USD), 10);
    assert_eq!(liquid(&state, "bob", SYMBOL_COIN) - coin_before, 5);
    let fills = state
        .virtual_ops()
        .iter()
        .filter(|v| matches!(v, VirtualOperation::FillOrder { .. }))
        .count();
    assert!(fills >= 1, "a fill event must be emitted");
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// SCENARIO 2: partial maker fill with maker-favoring rounding
// ============================================================

#[test]
fn scenario_partial_maker_fill() {
    let mut state = make_state(&["maker", "taker"]);
    state
        .adjust_liquid_balance(&"taker".into(), &Asset::new(1_000, SYMBOL_USD))
        .unwrap();

    // maker sells 10 COIN at 2 USD/COIN
    apply_operation(&mut state, &sell("maker", 1, (10, SYMBOL_COIN), (20, SYMBOL_USD))).unwrap();
    // taker sells 5 USD willing to take 2 COIN (2.5 USD/COIN limit)
    apply_operation(&mut state, &sell("taker", 1, (5, SYMBOL_USD), (2, SYMBOL_COIN))).unwrap();

    // taker receives 5 * 10/20 = 2.5 rounded down to 2 COIN
    assert_eq!(liquid(&state, "taker", SYMBOL_COIN), 2);
    // maker receives the reciprocal rounded up: 4 USD
    assert_eq!(liquid(&state, "maker", SYMBOL_USD), 4);
    // maker's remainder still rests
    let maker_order = state.limit_orders.iter().next().unwrap();
    assert_eq!(maker_order.for_sale, 8);
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// SCENARIO 3: black-swan global settlement
// ============================================================

#[test]
fn scenario_black_swan_settlement() {
    let mut state = make_state(&["borrower", "holder", "feeder"]);
    publish_usd_feed(&mut state, 1, 1);

    // borrower opens a position and hands the debt to a holder
    apply_operation(
        &mut state,
        &Operation::CallOrderUpdate(CallOrderUpdate {
            signatory: "borrower".into(),
            funding_account: "borrower".into(),
            delta_collateral: Asset::new(2_000, SYMBOL_COIN),
            delta_debt: Asset::new(1_000, SYMBOL_USD),
            target_collateral_ratio: None,
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::Transfer(Transfer {
            signatory: "borrower".into(),
            from: "borrower".into(),
            to: "holder".into(),
            amount: Asset::new(1_000, SYMBOL_USD),
            memo: String::new(),
        }),
    )
    .unwrap();

    let supply_before = state
        .get_dynamic_data(&SYMBOL_USD.into())
        .unwrap()
        .total_supply();

    // the feed collapses below every call's swan price
    publish_usd_feed(&mut state, 1, 4);
    let swanned = state.check_for_blackswan(&SYMBOL_USD.into(), true).unwrap();
    assert!(swanned);

    let bitasset = state.get_bitasset(&SYMBOL_USD.into()).unwrap();
    assert!(bitasset.has_settlement());
    // the fund holds all collateral paid in at the settlement price
    assert_eq!(bitasset.settlement_fund, 2_000);
    assert!(state.call_orders.is_empty());
    // total supply unchanged by settlement
    let supply_after = state
        .get_dynamic_data(&SYMBOL_USD.into())
        .unwrap()
        .total_supply();
    assert_eq!(supply_before, supply_after);

    // a subsequent settle draws from the fund without delay
    let coin_before = liquid(&state, "holder", SYMBOL_COIN);
    apply_operation(
        &mut state,
        &Operation::AssetSettle(AssetSettle {
            signatory: "holder".into(),
            account: "holder".into(),
            amount: Asset::new(500, SYMBOL_USD),
            interface: AccountName::default(),
        }),
    )
    .unwrap();
    assert_eq!(liquid(&state, "holder", SYMBOL_USD), 500);
    assert_eq!(liquid(&state, "holder", SYMBOL_COIN) - coin_before, 1_000);
    let bitasset = state.get_bitasset(&SYMBOL_USD.into()).unwrap();
    assert_eq!(bitasset.settlement_fund, 1_000);
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// SCENARIO 4: unstake with routes
// ============================================================

#[test]
fn scenario_unstake_with_routes() {
    let mut state = make_state(&["origin", "bob", "carol"]);
    apply_operation(
        &mut state,
        &Operation::StakeAsset(StakeAsset {
            signatory: "origin".into(),
            from: "origin".into(),
            to: "origin".into(),
            amount: Asset::new(100, SYMBOL_COIN),
        }),
    )
    .unwrap();

    // schedule 100 at 10 per interval with two 50% routes
    let balance_id = state
        .find_account_balance(&"origin".into(), &SYMBOL_COIN.into())
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
            from_account: "origin".into(),
            to_account: to.clone(),
            percent: 5_000,
            auto_stake,
        });
    }

    let carol_liquid_before = liquid(&state, "carol", SYMBOL_COIN);
    for _ in 0..10 {
        advance(&mut state, config::STAKE_WITHDRAW_INTERVAL_SECONDS);
        maintenance::process_unstaking(&mut state).unwrap();
    }

    assert_eq!(
        state
            .get_staked_balance(&"origin".into(), &SYMBOL_COIN.into())
            .amount,
        0
    );
    assert_eq!(
        state
            .get_staked_balance(&"bob".into(), &SYMBOL_COIN.into())
            .amount,
        50
    );
    assert_eq!(liquid(&state, "carol", SYMBOL_COIN) - carol_liquid_before, 50);
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// SCENARIO 5: recovery across authority history
// ============================================================

#[test]
fn scenario_recovery_across_history() {
    let mut state = make_state(&["alice", "guardian"]);

    // alice designates a recovery partner and rotates her owner key
    apply_operation(
        &mut state,
        &Operation::AccountRecoveryUpdate(AccountRecoveryUpdate {
            signatory: "alice".into(),
            account_to_recover: "alice".into(),
            new_recovery_account: "guardian".into(),
        }),
    )
    .unwrap();
    let k1 = state
        .get_account_authority(&"alice".into())
        .unwrap()
        .owner_auth
        .clone();
    let k2 = civica::Authority::single_key(civica::PublicKey::from_bytes([2; 32]));
    advance(&mut state, 2 * config::OWNER_UPDATE_LIMIT);
    apply_operation(
        &mut state,
        &Operation::AccountUpdate(AccountUpdate {
            signatory: "alice".into(),
            account: "alice".into(),
            details: String::new(),
            url: String::new(),
            json: String::new(),
            owner_auth: Some(k2),
            active_auth: None,
            posting_auth: None,
            secure_public_key: None,
            connection_public_key: None,
            friend_public_key: None,
            companion_public_key: None,
        }),
    )
    .unwrap();

    // recovery citing K1 succeeds while the history survives
    let k3 = civica::Authority::single_key(civica::PublicKey::from_bytes([3; 32]));
    advance(&mut state, config::OWNER_UPDATE_LIMIT);
    apply_operation(
        &mut state,
        &Operation::AccountRequestRecovery(AccountRequestRecovery {
            signatory: "guardian".into(),
            recovery_account: "guardian".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: k3.clone(),
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::AccountRecover(AccountRecover {
            signatory: "alice".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: k3.clone(),
            recent_owner_authority: k1.clone(),
        }),
    )
    .unwrap();
    assert_eq!(
        state.get_account_authority(&"alice".into()).unwrap().owner_auth,
        k3
    );

    // thirty days later the history entry is pruned and K1 no longer works
    advance(&mut state, 31 * SECONDS_PER_DAY);
    maintenance::run_maintenance(&mut state).unwrap();
    let k4 = civica::Authority::single_key(civica::PublicKey::from_bytes([4; 32]));
    apply_operation(
        &mut state,
        &Operation::AccountRequestRecovery(AccountRequestRecovery {
            signatory: "guardian".into(),
            recovery_account: "guardian".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: k4.clone(),
        }),
    )
    .unwrap();
    let err = apply_operation(
        &mut state,
        &Operation::AccountRecover(AccountRecover {
            signatory: "alice".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: k4,
            recent_owner_authority: k1,
        }),
    )
    .unwrap_err();
    assert!(matches!(err, ChainError::UnknownEntity { .. }));
}

// ============================================================
// SCENARIO 6: enterprise payout gating
// ============================================================

#[test]
fn scenario_enterprise_payout_gating() {
    let mut state = make_state(&["creator"]);
    state.props_modify(|p| p.accumulated_network_revenue.amount = 10_000);

    let begin = state.head_block_time();
    state.enterprises.create(|id| civica::objects::CommunityEnterprise {
        id,
        creator: "creator".into(),
        enterprise_id: "dam".into(),
        milestones: vec![
            Milestone { label: "half".into(), percent: 5_000 },
            Milestone { label: "rest".into(), percent: 5_000 },
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
    let id = state.enterprises.iter().next().unwrap().id;

    // day 0: initial milestone approved -> day 1 pays
    state.enterprises.modify(id, |e| e.approved_milestones = 0).unwrap();
    maintenance::pay_enterprise_budgets(&mut state).unwrap();
    // day 2: milestone 1 not yet claimed -> still pays
    maintenance::pay_enterprise_budgets(&mut state).unwrap();
    assert_eq!(state.enterprises.require(id, "e").unwrap().days_paid, 2);

    // day 3: creator claims milestone 1 without approval -> payment stops
    state.enterprises.modify(id, |e| e.claimed_milestones = 2).unwrap();
    maintenance::pay_enterprise_budgets(&mut state).unwrap();
    assert_eq!(state.enterprises.require(id, "e").unwrap().days_paid, 2);

    // day 4: milestone 1 approved -> payment resumes
    state.enterprises.modify(id, |e| e.approved_milestones = 1).unwrap();
    maintenance::pay_enterprise_budgets(&mut state).unwrap();
    let enterprise = state.enterprises.require(id, "e").unwrap();
    assert_eq!(enterprise.days_paid, 3);

    // across the whole duration, total paid is bounded by the budget
    for _ in 0..20 {
        maintenance::pay_enterprise_budgets(&mut state).unwrap();
    }
    let enterprise = state.enterprises.require(id, "e").unwrap();
    assert!(enterprise.total_distributed <= 14 * 100);
    assert_eq!(enterprise.days_paid, 14);
}

// ============================================================
// ROUND-TRIP LAWS
// ============================================================

#[test]
fn law_place_then_cancel_restores_balance() {
    let mut state = make_state(&["alice"]);
    let before = liquid(&state, "alice", SYMBOL_COIN);
    apply_operation(&mut state, &sell("alice", 9, (250, SYMBOL_COIN), (500, SYMBOL_USD))).unwrap();
    assert_ne!(liquid(&state, "alice", SYMBOL_COIN), before);
    apply_operation(
        &mut state,
        &Operation::LimitOrderCancel(LimitOrderCancel {
            signatory: "alice".into(),
            owner: "alice".into(),
            order_id: 9,
        }),
    )
    .unwrap();
    assert_eq!(liquid(&state, "alice", SYMBOL_COIN), before);
    state.verify_supply_invariants().unwrap();
}

#[test]
fn law_follow_unfollow_is_identity() {
    let mut state = make_state(&["alice", "bob"]);
    let alice_before = state.get_following(&"alice".into()).unwrap().clone();
    let bob_before = state.get_following(&"bob".into()).unwrap().clone();

    let follow = Operation::AccountFollow(AccountFollow {
        signatory: "alice".into(),
        follower: "alice".into(),
        following: "bob".into(),
        interface: AccountName::default(),
        added: true,
        followed: true,
    });
    apply_operation(&mut state, &follow).unwrap();
    let unfollow = Operation::AccountFollow(AccountFollow {
        signatory: "alice".into(),
        follower: "alice".into(),
        following: "bob".into(),
        interface: AccountName::default(),
        added: false,
        followed: true,
    });
    apply_operation(&mut state, &unfollow).unwrap();

    let alice_after = state.get_following(&"alice".into()).unwrap();
    let bob_after = state.get_following(&"bob".into()).unwrap();
    assert_eq!(alice_after.following, alice_before.following);
    assert_eq!(alice_after.filtered, alice_before.filtered);
    assert_eq!(bob_after.followers, bob_before.followers);
}

#[test]
fn law_connection_lifecycle_leaves_no_residue() {
    let mut state = make_state(&["alice", "bob"]);
    apply_operation(
        &mut state,
        &Operation::AccountConnectionRequest(AccountConnectionRequest {
            signatory: "alice".into(),
            account: "alice".into(),
            requested_account: "bob".into(),
            connection_type: civica::objects::ConnectionTier::Connection,
            message: String::new(),
            requested: true,
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::AccountConnectionAccept(AccountConnectionAccept {
            signatory: "bob".into(),
            account: "bob".into(),
            requesting_account: "alice".into(),
            connection_type: civica::objects::ConnectionTier::Connection,
            encrypted_key: "sealed".into(),
            connected: true,
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::AccountConnectionAccept(AccountConnectionAccept {
            signatory: "bob".into(),
            account: "bob".into(),
            requesting_account: "alice".into(),
            connection_type: civica::objects::ConnectionTier::Connection,
            encrypted_key: String::new(),
            connected: false,
        }),
    )
    .unwrap();
    assert!(state.connections.is_empty());
    assert!(state.connection_requests.is_empty());
}

#[test]
fn law_stake_unstake_restores_liquid() {
    let mut state = make_state(&["alice"]);
    let before = liquid(&state, "alice", SYMBOL_COIN);
    apply_operation(
        &mut state,
        &Operation::StakeAsset(StakeAsset {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "alice".into(),
            amount: Asset::new(400, SYMBOL_COIN),
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::UnstakeAsset(UnstakeAsset {
            signatory: "alice".into(),
            from: "alice".into(),
            amount: Asset::new(400, SYMBOL_COIN),
        }),
    )
    .unwrap();
    // walk every scheduled interval
    for _ in 0..config::STAKE_WITHDRAW_INTERVALS {
        advance(&mut state, config::STAKE_WITHDRAW_INTERVAL_SECONDS);
        maintenance::process_unstaking(&mut state).unwrap();
    }
    assert_eq!(liquid(&state, "alice", SYMBOL_COIN), before);
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// ROUNDING EDGE: SOMETHING FOR NOTHING
// ============================================================

#[test]
fn rounding_never_fills_for_nothing() {
    let mut state = make_state(&["maker", "taker"]);
    state
        .adjust_liquid_balance(&"taker".into(), &Asset::new(1_000, SYMBOL_USD))
        .unwrap();

    // maker offers a price where one unit of USD buys less than one COIN
    apply_operation(&mut state, &sell("maker", 1, (3, SYMBOL_COIN), (1_000, SYMBOL_USD))).unwrap();
    // taker sells a single USD at an overlapping price: the receive amount
    // rounds to zero, so the order must cancel and refund instead of
    // paying for nothing
    let taker_before = liquid(&state, "taker", SYMBOL_USD);
    apply_operation(
        &mut state,
        &Operation::LimitOrderCreate(LimitOrderCreate {
            signatory: "taker".into(),
            owner: "taker".into(),
            order_id: 1,
            amount_to_sell: Asset::new(1, SYMBOL_USD),
            exchange_rate: Price::new(
                Asset::new(1_000, SYMBOL_USD),
                Asset::new(1, SYMBOL_COIN),
            ),
            interface: AccountName::default(),
            expiration: TimePoint::from_secs(T0 + 10 * SECONDS_PER_DAY),
            fill_or_kill: false,
        }),
    )
    .unwrap();

    assert_eq!(liquid(&state, "taker", SYMBOL_USD), taker_before);
    assert_eq!(liquid(&state, "maker", SYMBOL_USD), 0);
    // the maker's order is untouched
    assert_eq!(state.limit_orders.iter().next().unwrap().for_sale, 3);
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// UNDO ATOMICITY
// ============================================================

#[test]
fn undo_session_restores_cross_table_state() {
    let mut state = make_state(&["alice", "bob"]);
    let before_alice = liquid(&state, "alice", SYMBOL_COIN);

    state.begin_session();
    apply_operation(
        &mut state,
        &Operation::Transfer(Transfer {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(123, SYMBOL_COIN),
        memo: String::new(),
        }),
    )
    .unwrap();
    apply_operation(&mut state, &sell("alice", 1, (50, SYMBOL_COIN), (100, SYMBOL_USD))).unwrap();
    state.undo_session();

    assert_eq!(liquid(&state, "alice", SYMBOL_COIN), before_alice);
    assert_eq!(liquid(&state, "bob", SYMBOL_COIN), 1_000 * BLOCKCHAIN_PRECISION);
    assert!(state.limit_orders.is_empty());
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// DELEGATION RETURN + VOTING POWER
// ============================================================

#[test]
fn delegation_returns_after_expiration() {
    let mut state = make_state(&["alice", "bob"]);
    apply_operation(
        &mut state,
        &Operation::StakeAsset(StakeAsset {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "alice".into(),
            amount: Asset::new(500, SYMBOL_COIN),
        }),
    )
    .unwrap();
    apply_operation(
        &mut state,
        &Operation::DelegateAsset(DelegateAsset {
            signatory: "alice".into(),
            delegator: "alice".into(),
            delegatee: "bob".into(),
            amount: Asset::new(200, SYMBOL_COIN),
        }),
    )
    .unwrap();
    // delegated power moves with the delegation
    assert_eq!(state.get_voting_power(&"alice".into()), 300);
    assert_eq!(state.get_voting_power(&"bob".into()), 200);

    apply_operation(
        &mut state,
        &Operation::DelegateAsset(DelegateAsset {
            signatory: "alice".into(),
            delegator: "alice".into(),
            delegatee: "bob".into(),
            amount: Asset::new(0, SYMBOL_COIN),
        }),
    )
    .unwrap();
    advance(&mut state, config::DELEGATION_RETURN_PERIOD_SECONDS + 1);
    maintenance::clear_expired_delegations(&mut state).unwrap();
    assert_eq!(state.get_voting_power(&"alice".into()), 500);
    assert_eq!(state.get_voting_power(&"bob".into()), 0);
    assert!(state
        .virtual_ops()
        .iter()
        .any(|v| matches!(v, VirtualOperation::ReturnDelegation { .. })));
    state.verify_supply_invariants().unwrap();
}

// ============================================================
// EQUITY VOTING POWER
// ============================================================

#[test]
fn equity_counts_toward_voting_power_at_median_price() {
    let mut state = make_state(&["alice"]);
    apply_operation(
        &mut state,
        &Operation::StakeAsset(StakeAsset {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "alice".into(),
            amount: Asset::new(100, SYMBOL_COIN),
        }),
    )
    .unwrap();
    state
        .adjust_staked_balance(&"alice".into(), &Asset::new(40, SYMBOL_EQUITY))
        .unwrap();
    // genesis equity price is 1 COIN per EQ
    assert_eq!(state.get_voting_power(&"alice".into()), 140);
}

