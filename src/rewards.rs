//! Reward distribution
//!
//! Curation weight curve, the daily activity reward claim, and the weekly
//! equity dividend. Reward pools live in pending supply until they land in
//! account reward balances.

use crate::amount::{mul_div_down, Asset, BLOCKCHAIN_PRECISION};
use crate::config::{self, SYMBOL_COIN, SYMBOL_EQUITY};
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::{Account, AccountBalanceKey, MembershipTier};
use crate::state::State;
use std::ops::Bound;
use tracing::{debug, info};

/// Share of the activity pool paid per claim.
const ACTIVITY_REWARD_DIVISOR: i64 = 100;

/// Curation weight curve W(R). The square-root curve front-loads weight on
/// early score growth; the linear curve is flat.
pub fn curation_curve(score: i64, sqrt_curve: bool) -> u128 {
    let score = score.max(0) as u128;
    if sqrt_curve {
        isqrt(score)
    } else {
        score
    }
}

fn isqrt(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

/// Mint new supply into the reward pools. On the live network this is the
/// per-block issuance schedule; tests and the demo node call it directly.
pub fn fund_reward_pools(
    state: &mut State,
    content: i64,
    equity: i64,
    activity: i64,
) -> ChainResult {
    let total = Asset::new(content + equity + activity, SYMBOL_COIN);
    state.adjust_pending_supply(&total)?;
    state.reward_fund_modify(|fund| {
        fund.content_reward_balance.amount += content;
        fund.equity_reward_balance.amount += equity;
        fund.activity_reward_balance.amount += activity;
    });
    Ok(())
}

/// Pay one activity claim out of the activity pool.
pub fn claim_activity_reward(state: &mut State, account: &Account) -> ChainResult {
    let now = state.head_block_time();
    let pool = state.reward_fund().activity_reward_balance.clone();
    let reward = Asset::new(pool.amount / ACTIVITY_REWARD_DIVISOR, SYMBOL_COIN);
    if reward.amount == 0 {
        return Err(ChainError::precondition("activity reward pool is empty"));
    }

    state.reward_fund_modify(|fund| {
        fund.activity_reward_balance.amount -= reward.amount;
    });
    state.adjust_pending_supply(&reward.negated())?;
    state.adjust_reward_balance(&account.name, &reward)?;

    state.accounts.modify(account.id, |a| {
        a.last_activity_reward = now;
        a.recent_activity_claims += 1;
    })?;
    debug!(account = %account.name, %reward, "activity reward claimed");
    Ok(())
}

/// Dividend share of one equity balance, zero for accounts that fall short
/// of the participation requirements.
pub fn get_equity_shares(state: &State, owner: &AccountName, staked_equity: i64) -> i64 {
    if staked_equity < BLOCKCHAIN_PRECISION {
        return 0;
    }
    let Some(account) = state.find_account(owner) else {
        return 0;
    };
    let now = state.head_block_time();
    if account.producer_vote_count < config::MIN_EQUITY_PRODUCERS
        || now.since(account.last_activity_reward) > config::EQUITY_ACTIVITY_WINDOW_SECONDS
    {
        return 0;
    }

    let mut shares = staked_equity;
    if staked_equity >= config::EQUITY_BOOST_BALANCE
        && account.producer_vote_count >= config::EQUITY_BOOST_PRODUCERS
        && account.recent_activity_claims >= config::EQUITY_BOOST_ACTIVITY
    {
        shares *= 2;
    }
    if account.membership == MembershipTier::Top {
        shares = mul_div_down(shares, config::EQUITY_BOOST_TOP_PERCENT, PERCENT_100).unwrap_or(shares);
    }
    shares
}

/// Distribute the equity reward pool pro-rata over qualifying stakers.
pub fn process_equity_rewards(state: &mut State) -> ChainResult {
    let pool = state.reward_fund().equity_reward_balance.clone();
    if pool.amount <= 0 {
        return Ok(());
    }

    // every equity balance with at least one whole staked unit
    let holders: Vec<(AccountName, i64)> = state
        .balances
        .range(
            Bound::Included((
                AccountBalanceKey::BySymbolStake(SYMBOL_EQUITY.into(), BLOCKCHAIN_PRECISION),
                0,
            )),
            Bound::Included((
                AccountBalanceKey::BySymbolStake(SYMBOL_EQUITY.into(), i64::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|b| (b.owner.clone(), b.staked_balance))
        .collect();

    let mut shares: Vec<(AccountName, i64)> = Vec::with_capacity(holders.len());
    let mut total_shares = 0i64;
    for (owner, staked) in holders {
        let share = get_equity_shares(state, &owner, staked);
        if share > 0 {
            total_shares += share;
            shares.push((owner, share));
        }
    }
    if total_shares == 0 {
        return Ok(());
    }

    state.reward_fund_modify(|fund| {
        fund.equity_reward_balance.amount = 0;
    });
    state.adjust_pending_supply(&pool.negated())?;

    let mut paid = 0i64;
    for (owner, share) in &shares {
        let reward = Asset::new(
            mul_div_down(pool.amount, *share, total_shares)?,
            SYMBOL_COIN,
        );
        if reward.amount > 0 {
            state.adjust_reward_balance(owner, &reward)?;
            paid += reward.amount;
        }
    }
    // rounding dust returns to the pool rather than vanishing
    let dust = pool.amount - paid;
    if dust > 0 {
        state.adjust_pending_supply(&Asset::new(dust, SYMBOL_COIN))?;
        state.reward_fund_modify(|fund| {
            fund.equity_reward_balance.amount += dust;
        });
    }
    info!(pool = pool.amount, recipients = shares.len(), "equity rewards distributed");
    Ok(())
}

/// Cash out matured posts: each takes a pro-rata slice of the content
/// pool by vote score; the author keeps the configured share and curators
/// split the rest by curation weight.
pub fn process_comment_rewards(state: &mut State) -> ChainResult {
    let now = state.head_block_time();
    let pool = state.reward_fund().content_reward_balance.clone();
    if pool.amount <= 0 {
        return Ok(());
    }
    let cutoff = now.sub_secs(config::CONTENT_REWARD_DELAY_SECONDS);

    let matured: Vec<(ObjectId, i64)> = state
        .comments
        .range(
            Bound::Included((
                crate::objects::CommentKey::ByCreated(TimePoint::from_secs(i64::MIN)),
                0,
            )),
            Bound::Included((crate::objects::CommentKey::ByCreated(cutoff), ObjectId::MAX)),
        )
        .filter(|c| !c.deleted && !c.rewarded && c.vote_score > 0)
        .map(|c| (c.id, c.vote_score))
        .collect();
    let total_score: i64 = matured.iter().map(|(_, s)| *s).sum();
    if total_score == 0 {
        return Ok(());
    }

    state.reward_fund_modify(|fund| {
        fund.content_reward_balance.amount = 0;
    });
    state.adjust_pending_supply(&pool.negated())?;

    let mut paid = 0i64;
    for (comment_id, score) in matured {
        let comment = state.comments.require(comment_id, "comment")?.clone();
        let total = mul_div_down(pool.amount, score, total_score)?;
        if total == 0 {
            state.comments.modify(comment_id, |c| c.rewarded = true)?;
            continue;
        }
        let curation_pool = mul_div_down(
            total,
            PERCENT_100 - config::AUTHOR_REWARD_PERCENT,
            PERCENT_100,
        )?;

        // curators split their pool by accumulated vote weight
        let mut curation_paid = 0i64;
        if comment.total_vote_weight > 0 {
            let votes: Vec<(AccountName, u128)> = state
                .comment_votes
                .range(
                    Bound::Included((
                        crate::objects::CommentVoteKey::ByCommentVoter(
                            comment_id,
                            AccountName::new(""),
                        ),
                        0,
                    )),
                    Bound::Excluded((
                        crate::objects::CommentVoteKey::ByCommentVoter(
                            comment_id + 1,
                            AccountName::new(""),
                        ),
                        0,
                    )),
                )
                .map(|v| (v.voter.clone(), v.weight))
                .collect();
            for (voter, weight) in votes {
                if weight == 0 {
                    continue;
                }
                let share = (curation_pool as u128 * weight / comment.total_vote_weight) as i64;
                if share > 0 {
                    state.adjust_reward_balance(&voter, &Asset::new(share, SYMBOL_COIN))?;
                    curation_paid += share;
                }
            }
        }

        // the author takes the configured share plus curation rounding dust
        let author_cut = total - curation_paid;
        if author_cut > 0 {
            state.adjust_reward_balance(&comment.author, &Asset::new(author_cut, SYMBOL_COIN))?;
        }
        paid += total;
        state.comments.modify(comment_id, |c| c.rewarded = true)?;
    }

    // the undistributed remainder rolls into the next interval
    let dust = pool.amount - paid;
    if dust > 0 {
        state.adjust_pending_supply(&Asset::new(dust, SYMBOL_COIN))?;
        state.reward_fund_modify(|fund| {
            fund.content_reward_balance.amount += dust;
        });
    }
    info!(pool = pool.amount, "content rewards distributed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainProperties;
    use crate::state::bootstrap_account;

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(99), 9);
        assert_eq!(isqrt(100), 10);
        assert_eq!(isqrt(1_000_000), 1_000);
    }

    #[test]
    fn test_curation_curve_monotone() {
        let a = curation_curve(100, true);
        let b = curation_curve(400, true);
        assert!(b > a);
        // negative scores contribute nothing
        assert_eq!(curation_curve(-5, true), 0);
    }

    #[test]
    fn test_equity_shares_zero_paths() {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        bootstrap_account(&mut state, "alice");
        // below minimum balance
        assert_eq!(get_equity_shares(&state, &"alice".into(), 1), 0);
        // enough balance but no producer votes
        assert_eq!(
            get_equity_shares(&state, &"alice".into(), BLOCKCHAIN_PRECISION),
            0
        );
    }

    #[test]
    fn test_content_rewards_split_author_and_curators() {
        let mut state = State::new(TimePoint::from_secs(1_000_000), ChainProperties::default());
        for name in ["author", "curator"] {
            bootstrap_account(&mut state, name);
        }
        // a matured post with one full-weight curation vote
        let created = state.head_block_time();
        let comment_id = state.comments.create(|id| crate::objects::Comment {
            id,
            author: "author".into(),
            permlink: "post".into(),
            parent_author: AccountName::default(),
            parent_permlink: String::new(),
            community: AccountName::default(),
            title: String::new(),
            body: "b".into(),
            depth: 0,
            net_votes: 1,
            view_count: 0,
            share_count: 0,
            net_reputation_score: 1_000,
            abs_score: 1_000,
            vote_score: 1_000,
            vote_power: 0,
            view_power: 0,
            total_vote_weight: 100,
            reward_currency: SYMBOL_COIN.into(),
            created,
            last_updated: created,
            deleted: false,
            rewarded: false,
        });
        state.comment_votes.create(|id| crate::objects::CommentVote {
            id,
            voter: "curator".into(),
            comment: comment_id,
            vote_percent: PERCENT_100 as i16,
            weight: 100,
            reward_value: 1_000,
            created,
            last_updated: created,
        });
        fund_reward_pools(&mut state, 1_000, 0, 0).unwrap();
        state.props_modify(|p| {
            p.head_block_time = p
                .head_block_time
                .add_secs(config::CONTENT_REWARD_DELAY_SECONDS + 1)
        });

        process_comment_rewards(&mut state).unwrap();
        // curators take 25%, the author the rest
        assert_eq!(
            state
                .get_reward_balance(&"curator".into(), &SYMBOL_COIN.into())
                .amount,
            250
        );
        assert_eq!(
            state
                .get_reward_balance(&"author".into(), &SYMBOL_COIN.into())
                .amount,
            750
        );
        assert!(state.comments.require(comment_id, "comment").unwrap().rewarded);
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_retracted_vote_forfeits_curation_share() {
        use crate::core_types::{SECONDS_PER_DAY, SECONDS_PER_HOUR};
        use crate::evaluators::content;
        use crate::operations::{CommentOp, VoteOp};

        let mut state = State::new(TimePoint::from_secs(1_000_000), ChainProperties::default());
        for name in ["author", "early", "late"] {
            bootstrap_account(&mut state, name);
            state
                .adjust_staked_balance(&name.into(), &Asset::new(10_000, SYMBOL_COIN))
                .unwrap();
        }
        state.props_modify(|p| p.head_block_time = p.head_block_time.add_secs(SECONDS_PER_DAY));

        content::comment(
            &mut state,
            &CommentOp {
                signatory: "author".into(),
                author: "author".into(),
                permlink: "post".into(),
                parent_author: AccountName::default(),
                parent_permlink: String::new(),
                community: AccountName::default(),
                title: String::new(),
                body: "b".into(),
                reward_currency: SYMBOL_COIN.into(),
                deleted: false,
            },
        )
        .unwrap();
        state.props_modify(|p| p.head_block_time = p.head_block_time.add_secs(SECONDS_PER_HOUR));

        let ballot = |voter: &str, weight: i16| VoteOp {
            signatory: voter.into(),
            voter: voter.into(),
            author: "author".into(),
            permlink: "post".into(),
            weight,
            interface: AccountName::default(),
        };
        content::vote(&mut state, &ballot("early", PERCENT_100 as i16)).unwrap();
        content::vote(&mut state, &ballot("late", PERCENT_100 as i16)).unwrap();
        // the early voter retracts: their weight must leave the pool math
        content::vote(&mut state, &ballot("early", 0)).unwrap();

        let comment = state.get_comment(&"author".into(), "post").unwrap().clone();
        let survivor_weight = state
            .comment_votes
            .find_by_key(crate::objects::CommentVoteKey::ByCommentVoter(
                comment.id,
                "late".into(),
            ))
            .unwrap()
            .weight;
        assert_eq!(comment.total_vote_weight, survivor_weight);

        fund_reward_pools(&mut state, 1_000, 0, 0).unwrap();
        state.props_modify(|p| {
            p.head_block_time = p
                .head_block_time
                .add_secs(config::CONTENT_REWARD_DELAY_SECONDS + 1)
        });
        process_comment_rewards(&mut state).unwrap();

        // the surviving curator collects the whole 25% curation pool and
        // the retracted voter collects nothing
        assert_eq!(
            state
                .get_reward_balance(&"late".into(), &SYMBOL_COIN.into())
                .amount,
            250
        );
        assert_eq!(
            state
                .get_reward_balance(&"early".into(), &SYMBOL_COIN.into())
                .amount,
            0
        );
        assert_eq!(
            state
                .get_reward_balance(&"author".into(), &SYMBOL_COIN.into())
                .amount,
            750
        );
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_equity_distribution_pro_rata() {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["alice", "bob"] {
            bootstrap_account(&mut state, name);
            state
                .adjust_staked_balance(
                    &name.into(),
                    &Asset::new(2 * BLOCKCHAIN_PRECISION, SYMBOL_EQUITY),
                )
                .unwrap();
            let id = state.get_account(&name.into()).unwrap().id;
            state
                .accounts
                .modify(id, |a| a.producer_vote_count = config::MIN_EQUITY_PRODUCERS)
                .unwrap();
        }
        fund_reward_pools(&mut state, 0, 1_000, 0).unwrap();
        process_equity_rewards(&mut state).unwrap();
        assert_eq!(
            state
                .get_reward_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            500
        );
        assert_eq!(
            state
                .get_reward_balance(&"bob".into(), &SYMBOL_COIN.into())
                .amount,
            500
        );
        assert_eq!(state.reward_fund().equity_reward_balance.amount, 0);
        state.verify_supply_invariants().unwrap();
    }
}
