//! Demo node: build a genesis state, apply a scripted block, and print the
//! resulting balances and audit trail.
//!
//! This binary exercises the deterministic core end to end without any
//! networking: the block stream normally arrives from the gossip layer.

use anyhow::Result;
use civica::amount::BLOCKCHAIN_PRECISION;
use civica::config::{ChainProperties, SYMBOL_COIN, SYMBOL_USD};
use civica::logging::{init_logging, LogConfig};
use civica::operations::{LimitOrderCreate, Transfer};
use civica::state::bootstrap_account;
use civica::{
    AccountName, Asset, Block, Chain, Operation, Price, PublicKey, SignedTransaction, State,
    TimePoint, Transaction,
};
use std::collections::BTreeSet;
use tracing::info;

fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let _guard = init_logging(&LogConfig::default());

    let props = ChainProperties::load(&config_path)?;
    let genesis_time = TimePoint::from_secs(1_700_000_000);
    let mut state = State::new(genesis_time, props);
    info!("genesis state created");

    // seed a few accounts with native currency
    for name in ["alice", "bob", "carol"] {
        bootstrap_account(&mut state, name);
        state.adjust_liquid_balance(
            &AccountName::new(name),
            &Asset::new(1_000 * BLOCKCHAIN_PRECISION, SYMBOL_COIN),
        )?;
    }

    let mut chain = Chain::new(state);
    let mut keys = BTreeSet::new();
    keys.insert(PublicKey::default());

    // one block: a transfer and a resting limit order
    let block = Block {
        block_num: 1,
        previous: "genesis".into(),
        timestamp: genesis_time.add_secs(3),
        producer: "alice".into(),
        transactions: vec![SignedTransaction {
            tx: Transaction {
                ref_block_num: 0,
                ref_block_prefix: 0,
                expiration: genesis_time.add_secs(60),
                operations: vec![
                    Operation::Transfer(Transfer {
                        signatory: "alice".into(),
                        from: "alice".into(),
                        to: "bob".into(),
                        amount: Asset::new(25 * BLOCKCHAIN_PRECISION, SYMBOL_COIN),
                        memo: "welcome".into(),
                    }),
                    Operation::LimitOrderCreate(LimitOrderCreate {
                        signatory: "carol".into(),
                        owner: "carol".into(),
                        order_id: 1,
                        amount_to_sell: Asset::new(10 * BLOCKCHAIN_PRECISION, SYMBOL_COIN),
                        exchange_rate: Price::new(
                            Asset::new(10 * BLOCKCHAIN_PRECISION, SYMBOL_COIN),
                            Asset::new(20 * BLOCKCHAIN_PRECISION, SYMBOL_USD),
                        ),
                        interface: AccountName::default(),
                        expiration: genesis_time.add_secs(3_600),
                        fill_or_kill: false,
                    }),
                ],
            },
            verified_keys: keys,
        }],
    };
    chain.apply_block(&block)?;

    println!("head block: {}", chain.state.head_block_num());
    for name in ["alice", "bob", "carol"] {
        let account = AccountName::new(name);
        let liquid = chain.state.get_liquid_balance(&account, &SYMBOL_COIN.into());
        println!("{name:>8}: {:.3} COIN liquid", liquid.to_whole());
    }
    println!("resting limit orders: {}", chain.state.limit_orders.len());
    for vop in chain.state.virtual_ops() {
        println!("virtual op: {}", vop.name());
    }
    chain.state.verify_supply_invariants()?;
    println!("supply invariants hold");
    Ok(())
}
