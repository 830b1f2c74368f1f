//! Community evaluators
//!
//! Community lifecycle, role management (founder > administrators >
//! moderators > members), join requests/invites for the four privacy
//! levels, moderator rank votes, blacklists, subscriptions, and ownership
//! transfer.

use crate::config;
use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::state::State;
use tracing::info;

fn get_member_record(state: &State, community: &AccountName) -> ChainResult<CommunityMember> {
    state.get_community_member(community).cloned()
}

pub fn community_create(state: &mut State, op: &CommunityCreate) -> ChainResult {
    let now = state.head_block_time();
    ensure!(
        state.communities
            .find_by_key(CommunityKey::ByName(op.name.clone()))
            .is_none(),
        ChainError::precondition(format!("community {} already exists", op.name))
    );
    ensure!(
        state.find_account(&op.name).is_none(),
        ChainError::precondition("community name collides with an account name")
    );

    let o = op.clone();
    state.communities.create(|id| Community {
        id,
        name: o.name.clone(),
        founder: o.founder.clone(),
        privacy: o.privacy,
        community_public_key: o.community_public_key,
        json: o.json.clone(),
        details: o.details.clone(),
        url: o.url.clone(),
        pinned_author: AccountName::default(),
        pinned_permlink: String::new(),
        created: now,
        last_updated: now,
    });
    let name = op.name.clone();
    let founder = op.founder.clone();
    state
        .community_members
        .create(|id| CommunityMember::new(id, name.clone(), founder.clone()));
    info!(community = %op.name, founder = %op.founder, "community created");
    Ok(())
}

pub fn community_update(state: &mut State, op: &CommunityUpdate) -> ChainResult {
    let now = state.head_block_time();
    let community = state.get_community(&op.community)?.clone();
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_administrator(&op.account),
        ChainError::MissingAuthority("only administrators update the community".into())
    );
    ensure!(
        now > community.last_updated,
        ChainError::RateLimited("community update limited to once per second".into())
    );
    if !op.pinned_author.is_empty() {
        state.get_comment(&op.pinned_author, &op.pinned_permlink)?;
    }

    let o = op.clone();
    state.communities.modify(community.id, |c| {
        c.privacy = o.privacy;
        c.json = o.json.clone();
        c.details = o.details.clone();
        c.url = o.url.clone();
        c.pinned_author = o.pinned_author.clone();
        c.pinned_permlink = o.pinned_permlink.clone();
        c.last_updated = now;
    })
}

pub fn community_add_mod(state: &mut State, op: &CommunityAddMod) -> ChainResult {
    super::touch_account(state, &op.moderator)?;
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_administrator(&op.account),
        ChainError::MissingAuthority("only administrators manage moderators".into())
    );
    ensure!(
        member.is_member(&op.moderator),
        ChainError::precondition("moderators must already be members")
    );
    if op.added {
        ensure!(
            !member.is_moderator(&op.moderator),
            ChainError::precondition("already a moderator")
        );
    } else {
        ensure!(
            member.is_moderator(&op.moderator),
            ChainError::unknown("moderator", &op.moderator)
        );
        ensure!(
            op.moderator != member.founder,
            ChainError::precondition("the founder cannot be demoted")
        );
    }
    let o = op.clone();
    state.community_members.modify(member.id, |m| {
        if o.added {
            m.moderators.insert(o.moderator.clone());
        } else {
            m.moderators.remove(&o.moderator);
        }
    })
}

pub fn community_add_admin(state: &mut State, op: &CommunityAddAdmin) -> ChainResult {
    super::touch_account(state, &op.admin)?;
    let member = get_member_record(state, &op.community)?;
    ensure!(
        op.account == member.founder,
        ChainError::MissingAuthority("only the founder manages administrators".into())
    );
    ensure!(
        member.is_moderator(&op.admin),
        ChainError::precondition("administrators must already be moderators")
    );
    if op.added {
        ensure!(
            !member.is_administrator(&op.admin),
            ChainError::precondition("already an administrator")
        );
    } else {
        ensure!(
            member.is_administrator(&op.admin),
            ChainError::unknown("administrator", &op.admin)
        );
        ensure!(
            op.admin != member.founder,
            ChainError::precondition("the founder cannot be demoted")
        );
    }
    let o = op.clone();
    state.community_members.modify(member.id, |m| {
        if o.added {
            m.administrators.insert(o.admin.clone());
        } else {
            m.administrators.remove(&o.admin);
        }
    })
}

/// Keep per-voter moderator ranks gap-free around an insert or removal.
fn reorder_mod_ranks(
    state: &mut State,
    voter: &AccountName,
    community: &AccountName,
    from_rank: u16,
    delta: i16,
) -> ChainResult {
    let to_shift: Vec<crate::core_types::ObjectId> = state
        .mod_votes
        .range(
            std::ops::Bound::Included((
                CommunityModVoteKey::ByVoterCommunityRank(
                    voter.clone(),
                    community.clone(),
                    from_rank,
                ),
                0,
            )),
            std::ops::Bound::Included((
                CommunityModVoteKey::ByVoterCommunityRank(
                    voter.clone(),
                    community.clone(),
                    u16::MAX,
                ),
                crate::core_types::ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state
            .mod_votes
            .modify(id, |v| v.vote_rank = (v.vote_rank as i16 + delta) as u16)?;
    }
    Ok(())
}

pub fn community_vote_mod(state: &mut State, op: &CommunityVoteMod) -> ChainResult {
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_member(&op.account),
        ChainError::precondition("only members vote for moderators")
    );
    ensure!(
        member.is_moderator(&op.moderator),
        ChainError::unknown("moderator", &op.moderator)
    );

    let existing = state
        .mod_votes
        .find_by_key(CommunityModVoteKey::ByVoterCommunityMod(
            op.account.clone(),
            op.community.clone(),
            op.moderator.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));
    match (existing, op.approved) {
        (None, true) => {
            reorder_mod_ranks(state, &op.account, &op.community, op.vote_rank, 1)?;
            let o = op.clone();
            state.mod_votes.create(|id| CommunityModVote {
                id,
                account: o.account.clone(),
                community: o.community.clone(),
                moderator: o.moderator.clone(),
                vote_rank: o.vote_rank,
            });
        }
        (Some((id, old_rank)), true) => {
            reorder_mod_ranks(state, &op.account, &op.community, old_rank + 1, -1)?;
            reorder_mod_ranks(state, &op.account, &op.community, op.vote_rank, 1)?;
            let rank = op.vote_rank;
            state.mod_votes.modify(id, |v| v.vote_rank = rank)?;
        }
        (Some((id, old_rank)), false) => {
            state.mod_votes.remove(id)?;
            reorder_mod_ranks(state, &op.account, &op.community, old_rank + 1, -1)?;
        }
        (None, false) => return Err(ChainError::unknown("moderator vote", &op.moderator)),
    }
    refresh_mod_weights(state, &op.community)
}

/// Recompute moderator vote weights from standing votes: a voter's power
/// splits across their ranked votes as 1/rank.
fn refresh_mod_weights(state: &mut State, community: &AccountName) -> ChainResult {
    let votes: Vec<(AccountName, AccountName, u16)> = state
        .mod_votes
        .iter()
        .filter(|v| v.community == *community)
        .map(|v| (v.account.clone(), v.moderator.clone(), v.vote_rank))
        .collect();
    let mut weights: std::collections::BTreeMap<AccountName, i64> = Default::default();
    let mut total = 0i64;
    for (voter, moderator, rank) in votes {
        let share = state.get_voting_power(&voter) / rank.max(1) as i64;
        *weights.entry(moderator).or_default() += share;
        total += share;
    }
    let member_id = state.get_community_member(community)?.id;
    state.community_members.modify(member_id, |m| {
        m.mod_weight = weights;
        m.total_mod_weight = total;
    })
}

pub fn community_join_request(state: &mut State, op: &CommunityJoinRequestOp) -> ChainResult {
    let now = state.head_block_time();
    let community = state.get_community(&op.community)?.clone();
    let member = get_member_record(state, &op.community)?;
    ensure!(
        community.privacy.is_public(),
        ChainError::precondition("private communities admit members by invite only")
    );
    ensure!(
        !member.is_member(&op.account),
        ChainError::precondition("already a member")
    );
    ensure!(
        !member.is_blacklisted(&op.account),
        ChainError::precondition("account is blacklisted from the community")
    );

    let existing = state
        .join_requests
        .find_by_key(CommunityJoinRequestKey::ByAccountCommunity(
            op.account.clone(),
            op.community.clone(),
        ))
        .map(|r| r.id);
    match (existing, op.requested) {
        (None, true) => {
            let o = op.clone();
            state.join_requests.create(|id| CommunityJoinRequest {
                id,
                account: o.account.clone(),
                community: o.community.clone(),
                message: o.message.clone(),
                expiration: now.add_secs(config::CONNECTION_REQUEST_DURATION),
            });
            Ok(())
        }
        (Some(id), false) => state.join_requests.remove(id),
        (Some(_), true) => Err(ChainError::precondition("join request already pending")),
        (None, false) => Err(ChainError::unknown("join request", &op.account)),
    }
}

pub fn community_join_invite(state: &mut State, op: &CommunityJoinInviteOp) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.member)?;
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_authorized_interact(&op.account),
        ChainError::MissingAuthority("only members in good standing may invite".into())
    );
    ensure!(
        !member.is_member(&op.member),
        ChainError::precondition("already a member")
    );
    ensure!(
        !member.is_blacklisted(&op.member),
        ChainError::precondition("account is blacklisted from the community")
    );

    let existing = state
        .join_invites
        .find_by_key(CommunityJoinInviteKey::ByAccountCommunity(
            op.member.clone(),
            op.community.clone(),
        ))
        .map(|i| i.id);
    match (existing, op.invited) {
        (None, true) => {
            let o = op.clone();
            state.join_invites.create(|id| CommunityJoinInvite {
                id,
                account: o.member.clone(),
                community: o.community.clone(),
                inviter: o.account.clone(),
                message: o.message.clone(),
                encrypted_community_key: o.encrypted_community_key.clone(),
                expiration: now.add_secs(config::CONNECTION_REQUEST_DURATION),
            });
            Ok(())
        }
        (Some(id), false) => state.join_invites.remove(id),
        (Some(_), true) => Err(ChainError::precondition("invite already pending")),
        (None, false) => Err(ChainError::unknown("join invite", &op.member)),
    }
}

pub fn community_join_accept(state: &mut State, op: &CommunityJoinAccept) -> ChainResult {
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_moderator(&op.account),
        ChainError::MissingAuthority("only moderators approve join requests".into())
    );
    let request_id = state
        .join_requests
        .find_by_key(CommunityJoinRequestKey::ByAccountCommunity(
            op.member.clone(),
            op.community.clone(),
        ))
        .map(|r| r.id)
        .ok_or(ChainError::unknown("join request", &op.member))?;

    state.join_requests.remove(request_id)?;
    if op.accepted {
        let joining = op.member.clone();
        state.community_members.modify(member.id, |m| {
            m.members.insert(joining);
        })?;
    }
    Ok(())
}

pub fn community_invite_accept(state: &mut State, op: &CommunityInviteAccept) -> ChainResult {
    let member = get_member_record(state, &op.community)?;
    let invite_id = state
        .join_invites
        .find_by_key(CommunityJoinInviteKey::ByAccountCommunity(
            op.account.clone(),
            op.community.clone(),
        ))
        .map(|i| i.id)
        .ok_or(ChainError::unknown("join invite", &op.account))?;

    state.join_invites.remove(invite_id)?;
    if op.accepted {
        let joining = op.account.clone();
        state.community_members.modify(member.id, |m| {
            m.members.insert(joining);
        })?;
    }
    Ok(())
}

pub fn community_remove_member(state: &mut State, op: &CommunityRemoveMember) -> ChainResult {
    let member = get_member_record(state, &op.community)?;
    ensure!(
        op.account == op.member || member.is_moderator(&op.account),
        ChainError::MissingAuthority("only moderators remove other members".into())
    );
    ensure!(
        member.is_member(&op.member),
        ChainError::unknown("community member", &op.member)
    );
    ensure!(
        op.member != member.founder,
        ChainError::precondition("the founder cannot be removed")
    );
    if member.is_moderator(&op.member) && op.account != op.member {
        ensure!(
            member.is_administrator(&op.account),
            ChainError::MissingAuthority("only administrators remove moderators".into())
        );
    }
    let leaving = op.member.clone();
    state.community_members.modify(member.id, |m| {
        m.members.remove(&leaving);
        m.moderators.remove(&leaving);
        m.administrators.remove(&leaving);
    })
}

pub fn community_blacklist(state: &mut State, op: &CommunityBlacklist) -> ChainResult {
    super::touch_account(state, &op.member)?;
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_moderator(&op.account),
        ChainError::MissingAuthority("only moderators manage the blacklist".into())
    );
    ensure!(
        op.member != member.founder,
        ChainError::precondition("the founder cannot be blacklisted")
    );
    let o = op.clone();
    state.community_members.modify(member.id, |m| {
        if o.blacklisted {
            m.blacklist.insert(o.member.clone());
            m.members.remove(&o.member);
            m.moderators.remove(&o.member);
            m.administrators.remove(&o.member);
        } else {
            m.blacklist.remove(&o.member);
        }
    })
}

/// Apply or remove a moderator classification on a community post.
pub fn community_mod_tag(state: &mut State, op: &CommunityModTag) -> ChainResult {
    let now = state.head_block_time();
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_moderator(&op.moderator),
        ChainError::MissingAuthority("only moderators tag posts".into())
    );
    let comment = state.get_comment(&op.author, &op.permlink)?.clone();
    ensure!(
        comment.community == op.community,
        ChainError::precondition("post does not belong to this community")
    );

    let existing = state
        .moderation_tags
        .find_by_key(ModerationTagKey::ByCommentModerator(
            comment.id,
            op.moderator.clone(),
        ))
        .map(|t| t.id);
    match (existing, op.applied) {
        (None, true) => {
            let o = op.clone();
            let comment_id = comment.id;
            state.moderation_tags.create(|id| ModerationTag {
                id,
                moderator: o.moderator.clone(),
                comment: comment_id,
                community: o.community.clone(),
                tags: o.tags.clone(),
                filter: o.filter,
                details: o.details.clone(),
                created: now,
            });
            Ok(())
        }
        (Some(id), true) => {
            let o = op.clone();
            state.moderation_tags.modify(id, |t| {
                t.tags = o.tags.clone();
                t.filter = o.filter;
                t.details = o.details.clone();
            })
        }
        (Some(id), false) => state.moderation_tags.remove(id),
        (None, false) => Err(ChainError::unknown("moderation tag", &op.permlink)),
    }
}

pub fn community_subscribe(state: &mut State, op: &CommunitySubscribe) -> ChainResult {
    let community = state.get_community(&op.community)?.clone();
    let member = get_member_record(state, &op.community)?;
    if op.subscribed {
        // private communities only show content to members
        ensure!(
            community.privacy.open_viewing() || member.is_member(&op.account),
            ChainError::precondition("private community content requires membership")
        );
    }
    let o = op.clone();
    state.community_members.modify(member.id, |m| {
        if o.subscribed {
            m.subscribers.insert(o.account.clone());
        } else {
            m.subscribers.remove(&o.account);
        }
    })
}

pub fn community_transfer_ownership(
    state: &mut State,
    op: &CommunityTransferOwnership,
) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.new_founder)?;
    let community = state.get_community(&op.community)?.clone();
    ensure!(
        community.founder == op.account,
        ChainError::MissingAuthority("only the founder transfers ownership".into())
    );
    let member = get_member_record(state, &op.community)?;
    ensure!(
        member.is_member(&op.new_founder),
        ChainError::precondition("the new founder must be a member")
    );

    let new_founder = op.new_founder.clone();
    state.communities.modify(community.id, |c| {
        c.founder = new_founder.clone();
        c.last_updated = now;
    })?;
    let new_founder = op.new_founder.clone();
    state.community_members.modify(member.id, |m| {
        m.founder = new_founder.clone();
        m.moderators.insert(new_founder.clone());
        m.administrators.insert(new_founder.clone());
    })?;
    info!(community = %op.community, new_founder = %op.new_founder, "ownership transferred");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainProperties;
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["founder", "alice", "bob"] {
            bootstrap_account(&mut state, name);
        }
        community_create(
            &mut state,
            &CommunityCreate {
                signatory: "founder".into(),
                founder: "founder".into(),
                name: "rustlang".into(),
                privacy: CommunityPrivacy::OpenPublic,
                community_public_key: Default::default(),
                json: String::new(),
                details: String::new(),
                url: String::new(),
            },
        )
        .unwrap();
        state
    }

    fn join(state: &mut State, who: &str) {
        community_join_request(
            state,
            &CommunityJoinRequestOp {
                signatory: who.into(),
                account: who.into(),
                community: "rustlang".into(),
                message: String::new(),
                requested: true,
            },
        )
        .unwrap();
        community_join_accept(
            state,
            &CommunityJoinAccept {
                signatory: "founder".into(),
                account: "founder".into(),
                community: "rustlang".into(),
                member: who.into(),
                encrypted_community_key: String::new(),
                accepted: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_join_request_lifecycle() {
        let mut state = setup();
        join(&mut state, "alice");
        let member = state.get_community_member(&"rustlang".into()).unwrap();
        assert!(member.is_member(&"alice".into()));
        assert!(state.join_requests.is_empty());
    }

    #[test]
    fn test_role_ladder() {
        let mut state = setup();
        join(&mut state, "alice");
        // member -> moderator by an administrator
        community_add_mod(
            &mut state,
            &CommunityAddMod {
                signatory: "founder".into(),
                account: "founder".into(),
                community: "rustlang".into(),
                moderator: "alice".into(),
                added: true,
            },
        )
        .unwrap();
        // moderator -> administrator by the founder
        community_add_admin(
            &mut state,
            &CommunityAddAdmin {
                signatory: "founder".into(),
                account: "founder".into(),
                community: "rustlang".into(),
                admin: "alice".into(),
                added: true,
            },
        )
        .unwrap();
        let member = state.get_community_member(&"rustlang".into()).unwrap();
        assert!(member.is_administrator(&"alice".into()));
    }

    #[test]
    fn test_non_admin_cannot_add_mod() {
        let mut state = setup();
        join(&mut state, "alice");
        join(&mut state, "bob");
        let err = community_add_mod(
            &mut state,
            &CommunityAddMod {
                signatory: "alice".into(),
                account: "alice".into(),
                community: "rustlang".into(),
                moderator: "bob".into(),
                added: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::MissingAuthority(_)));
    }

    #[test]
    fn test_blacklist_evicts() {
        let mut state = setup();
        join(&mut state, "bob");
        community_blacklist(
            &mut state,
            &CommunityBlacklist {
                signatory: "founder".into(),
                account: "founder".into(),
                community: "rustlang".into(),
                member: "bob".into(),
                blacklisted: true,
            },
        )
        .unwrap();
        let member = state.get_community_member(&"rustlang".into()).unwrap();
        assert!(!member.is_member(&"bob".into()));
        assert!(member.is_blacklisted(&"bob".into()));
    }

    #[test]
    fn test_ownership_transfer() {
        let mut state = setup();
        join(&mut state, "alice");
        community_transfer_ownership(
            &mut state,
            &CommunityTransferOwnership {
                signatory: "founder".into(),
                account: "founder".into(),
                community: "rustlang".into(),
                new_founder: "alice".into(),
            },
        )
        .unwrap();
        let community = state.get_community(&"rustlang".into()).unwrap();
        assert_eq!(community.founder, AccountName::new("alice"));
    }
}
