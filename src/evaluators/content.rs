//! Content evaluators
//!
//! Minimal posting surface: comments, votes, views, and shares. Enough
//! state moves through here to drive curation weights, community
//! permission gates, comment metrics, and the activity-reward predicates.

use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::rewards;
use crate::state::State;

/// Seconds for a power meter to regenerate from zero to full.
const POWER_REGEN_SECONDS: i64 = 5 * SECONDS_PER_DAY;
/// Divisor bounding how many full-strength actions drain a full meter.
const POWER_RESERVE: i64 = 50;
/// Minimum interval between root posts.
const ROOT_POST_INTERVAL: i64 = 5 * SECONDS_PER_MINUTE;
/// Minimum interval between replies.
const REPLY_INTERVAL: i64 = 20;

/// Regenerated meter value at `now`, given the last action time.
fn regenerate(current: i16, last_action: TimePoint, now: TimePoint) -> i16 {
    let regen = (now.since(last_action) * PERCENT_100) / POWER_REGEN_SECONDS;
    (current as i64 + regen).min(PERCENT_100) as i16
}

/// Meter cost of an action at `strength` (/10_000 of full).
fn power_cost(meter: i16, strength: i64) -> i64 {
    (meter as i64 * strength) / PERCENT_100 / POWER_RESERVE
}

/// Gate an interaction on the target community's privacy level.
fn check_community_interaction(
    state: &State,
    community: &AccountName,
    account: &AccountName,
    view_only: bool,
) -> ChainResult {
    if community.is_empty() {
        return Ok(());
    }
    let community_obj = state.get_community(community)?;
    let member = state.get_community_member(community)?;
    ensure!(
        !member.is_blacklisted(account),
        ChainError::precondition("account is blacklisted from the community")
    );
    let allowed = if view_only {
        community_obj.privacy.open_viewing() || member.is_member(account)
    } else {
        community_obj.privacy.open_interaction() || member.is_member(account)
    };
    ensure!(
        allowed,
        ChainError::precondition(format!(
            "community {community} does not permit this interaction"
        ))
    );
    Ok(())
}

pub fn comment(state: &mut State, op: &CommentOp) -> ChainResult {
    let now = state.head_block_time();
    let author = state.get_account(&op.author)?.clone();
    check_community_interaction(state, &op.community, &op.author, false)?;
    state.get_asset(&op.reward_currency)?;

    let existing = state
        .comments
        .find_by_key(CommentKey::ByPermlink(op.author.clone(), op.permlink.clone()))
        .map(|c| c.id);

    if op.deleted {
        let id = existing.ok_or(ChainError::unknown("comment", &op.permlink))?;
        let comment = state.comments.require(id, "comment")?;
        ensure!(
            comment.net_votes == 0,
            ChainError::precondition("cannot delete a comment with votes")
        );
        return state.comments.modify(id, |c| {
            c.deleted = true;
            c.last_updated = now;
        });
    }

    if let Some(id) = existing {
        // edit in place
        let o = op.clone();
        return state.comments.modify(id, |c| {
            c.title = o.title.clone();
            c.body = o.body.clone();
            c.deleted = false;
            c.last_updated = now;
        });
    }

    let is_root = op.parent_author.is_empty();
    let mut depth = 0u16;
    if !is_root {
        let parent = state.get_comment(&op.parent_author, &op.parent_permlink)?;
        ensure!(
            !parent.deleted,
            ChainError::precondition("cannot reply to a deleted comment")
        );
        depth = parent.depth + 1;
        ensure!(depth < 255, ChainError::precondition("reply depth exceeded"));
    }

    if is_root {
        ensure!(
            now.since(author.last_root_post) >= ROOT_POST_INTERVAL,
            ChainError::RateLimited("root posts limited to one per five minutes".into())
        );
    } else {
        ensure!(
            now.since(author.last_post) >= REPLY_INTERVAL,
            ChainError::RateLimited("replies limited to one per twenty seconds".into())
        );
    }

    let o = op.clone();
    state.comments.create(|id| Comment {
        id,
        author: o.author.clone(),
        permlink: o.permlink.clone(),
        parent_author: o.parent_author.clone(),
        parent_permlink: o.parent_permlink.clone(),
        community: o.community.clone(),
        title: o.title.clone(),
        body: o.body.clone(),
        depth,
        net_votes: 0,
        view_count: 0,
        share_count: 0,
        net_reputation_score: 0,
        abs_score: 0,
        vote_score: 0,
        vote_power: 0,
        view_power: 0,
        total_vote_weight: 0,
        reward_currency: o.reward_currency.clone(),
        created: now,
        last_updated: now,
        deleted: false,
        rewarded: false,
    });

    state.accounts.modify(author.id, |a| {
        a.post_count += 1;
        a.last_post = now;
        if is_root {
            a.last_root_post = now;
        }
    })
}

pub fn vote(state: &mut State, op: &VoteOp) -> ChainResult {
    let now = state.head_block_time();
    let voter = state.get_account(&op.voter)?.clone();
    let comment = state.get_comment(&op.author, &op.permlink)?.clone();
    ensure!(
        !comment.deleted,
        ChainError::precondition("cannot vote on a deleted comment")
    );
    check_community_interaction(state, &comment.community, &op.voter, false)?;

    let existing = state
        .comment_votes
        .find_by_key(CommentVoteKey::ByCommentVoter(comment.id, op.voter.clone()))
        .map(|v| (v.id, v.reward_value, v.weight));

    if op.weight == 0 {
        // weight zero retracts the vote; its tallies back out and its
        // curation weight leaves the denominator with it
        let (vote_id, old_value, old_weight) =
            existing.ok_or(ChainError::unknown("comment vote", &op.voter))?;
        state.comment_votes.remove(vote_id)?;
        return state.comments.modify(comment.id, |c| {
            c.net_votes -= if old_value >= 0 { 1 } else { -1 };
            c.vote_score -= old_value;
            c.net_reputation_score -= old_value;
            c.abs_score -= old_value.abs();
            c.total_vote_weight = c.total_vote_weight.saturating_sub(old_weight);
        });
    }

    let meter = regenerate(voter.powers.voting_power, voter.last_vote_time, now);
    let strength = (op.weight as i64).abs();
    let used_power = power_cost(meter, strength);
    ensure!(
        used_power > 0,
        ChainError::precondition("voting power too depleted to vote")
    );

    let voting_power = state.get_voting_power(&op.voter);
    let value = crate::amount::mul_div_down(voting_power, op.weight as i64, PERCENT_100)?;

    // curation weight accrues on upvote score growth, discounted inside
    // the reverse-auction window
    let mut curation_weight: u128 = 0;
    if value > 0 {
        let sqrt_curve = state.chain_props.sqrt_curation_curve;
        let before = rewards::curation_curve(comment.vote_score.max(0), sqrt_curve);
        let after = rewards::curation_curve(comment.vote_score.saturating_add(value), sqrt_curve);
        curation_weight = after.saturating_sub(before);
        let age = now.since(comment.created);
        if age < crate::config::REVERSE_AUCTION_WINDOW_SECONDS {
            curation_weight = curation_weight * age as u128
                / crate::config::REVERSE_AUCTION_WINDOW_SECONDS as u128;
        }
    }

    match existing {
        None => {
            let o = op.clone();
            let comment_id = comment.id;
            state.comment_votes.create(|id| CommentVote {
                id,
                voter: o.voter.clone(),
                comment: comment_id,
                vote_percent: o.weight,
                weight: curation_weight,
                reward_value: value,
                created: now,
                last_updated: now,
            });
            state.comments.modify(comment.id, |c| {
                c.net_votes += if value >= 0 { 1 } else { -1 };
                c.vote_score += value;
                c.net_reputation_score += value;
                c.abs_score += value.abs();
                c.vote_power += used_power;
                c.total_vote_weight += curation_weight;
            })?;
        }
        Some((vote_id, old_value, old_weight)) => {
            // an edited vote forfeits its curation weight, which must
            // also leave the comment's running denominator
            let o = op.clone();
            state.comment_votes.modify(vote_id, |v| {
                v.vote_percent = o.weight;
                v.weight = 0;
                v.reward_value = value;
                v.last_updated = now;
            })?;
            state.comments.modify(comment.id, |c| {
                if (old_value >= 0) != (value >= 0) {
                    c.net_votes += if value >= 0 { 2 } else { -2 };
                }
                c.vote_score += value - old_value;
                c.net_reputation_score += value - old_value;
                c.abs_score += value.abs() - old_value.abs();
                c.vote_power += used_power;
                c.total_vote_weight = c.total_vote_weight.saturating_sub(old_weight);
            })?;
        }
    }

    let spent = used_power as i16;
    state.accounts.modify(voter.id, |a| {
        a.powers.voting_power = (meter - spent).max(0);
        a.last_vote_time = now;
    })
}

pub fn view(state: &mut State, op: &ViewOp) -> ChainResult {
    let now = state.head_block_time();
    let viewer = state.get_account(&op.viewer)?.clone();
    let comment = state.get_comment(&op.author, &op.permlink)?.clone();
    ensure!(
        !comment.deleted,
        ChainError::precondition("cannot view a deleted comment")
    );
    check_community_interaction(state, &comment.community, &op.viewer, true)?;

    let existing = state
        .comment_views
        .find_by_key(CommentViewKey::ByCommentViewer(comment.id, op.viewer.clone()))
        .map(|v| v.id);

    if !op.viewed {
        let id = existing.ok_or(ChainError::unknown("comment view", &op.viewer))?;
        state.comment_views.remove(id)?;
        return state.comments.modify(comment.id, |c| {
            c.view_count = c.view_count.saturating_sub(1);
        });
    }
    ensure!(
        existing.is_none(),
        ChainError::precondition("comment already viewed")
    );

    let meter = regenerate(viewer.powers.viewing_power, viewer.last_view_time, now);
    let used_power = power_cost(meter, PERCENT_100);
    let viewer_power = state.get_voting_power(&op.viewer);

    let o = op.clone();
    let comment_id = comment.id;
    state.comment_views.create(|id| CommentView {
        id,
        viewer: o.viewer.clone(),
        comment: comment_id,
        created: now,
    });
    state.comments.modify(comment.id, |c| {
        c.view_count += 1;
        c.view_power += viewer_power / POWER_RESERVE;
    })?;
    let spent = used_power as i16;
    state.accounts.modify(viewer.id, |a| {
        a.powers.viewing_power = (meter - spent).max(0);
        a.last_view_time = now;
    })
}

pub fn share(state: &mut State, op: &ShareOp) -> ChainResult {
    let now = state.head_block_time();
    let sharer = state.get_account(&op.sharer)?.clone();
    let comment = state.get_comment(&op.author, &op.permlink)?.clone();
    ensure!(
        !comment.deleted,
        ChainError::precondition("cannot share a deleted comment")
    );
    check_community_interaction(state, &comment.community, &op.sharer, false)?;

    let existing = state
        .comment_shares
        .find_by_key(CommentShareKey::ByCommentSharer(comment.id, op.sharer.clone()))
        .map(|s| s.id);

    if !op.shared {
        let id = existing.ok_or(ChainError::unknown("comment share", &op.sharer))?;
        state.comment_shares.remove(id)?;
        return state.comments.modify(comment.id, |c| {
            c.share_count = c.share_count.saturating_sub(1);
        });
    }
    ensure!(
        existing.is_none(),
        ChainError::precondition("comment already shared")
    );

    let meter = regenerate(sharer.powers.sharing_power, sharer.last_share_time, now);
    let used_power = power_cost(meter, PERCENT_100);

    let o = op.clone();
    let comment_id = comment.id;
    state.comment_shares.create(|id| CommentShare {
        id,
        sharer: o.sharer.clone(),
        comment: comment_id,
        created: now,
    });
    state.comments.modify(comment.id, |c| {
        c.share_count += 1;
    })?;
    let spent = used_power as i16;
    state.accounts.modify(sharer.id, |a| {
        a.powers.sharing_power = (meter - spent).max(0);
        a.last_share_time = now;
    })
}
