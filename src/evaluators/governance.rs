//! Governance evaluators
//!
//! Producer declarations, approval-gated network roles (officers,
//! executive boards, governance accounts), service-role declarations, and
//! milestone-bounded community enterprises. Vote operations update the
//! standing tallies; the approval flags themselves are recomputed by the
//! governance maintenance pass.

use crate::amount::Asset;
use crate::core_types::*;
use crate::ensure;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::state::State;
use tracing::info;

pub fn producer_update(state: &mut State, op: &ProducerUpdate) -> ChainResult {
    let now = state.head_block_time();
    let existing = state
        .producers
        .find_by_key(ProducerKey::ByName(op.owner.clone()))
        .map(|p| p.id);
    match existing {
        Some(id) => {
            let o = op.clone();
            state.producers.modify(id, |p| {
                p.details = o.details.clone();
                p.url = o.url.clone();
                p.json = o.json.clone();
                p.active = o.active;
            })
        }
        None => {
            let o = op.clone();
            state.producers.create(|id| Producer {
                id,
                owner: o.owner.clone(),
                active: o.active,
                details: o.details.clone(),
                url: o.url.clone(),
                json: o.json.clone(),
                voting_power: 0,
                vote_count: 0,
                feed: crate::price::Price::default(),
                last_feed_update: TimePoint::default(),
                created: now,
            });
            Ok(())
        }
    }
}

// ============================================================
// NETWORK OFFICERS
// ============================================================

pub fn update_network_officer(state: &mut State, op: &UpdateNetworkOfficer) -> ChainResult {
    let now = state.head_block_time();
    state.get_asset(&op.reward_currency)?;
    let existing = state
        .network_officers
        .find_by_key(NetworkOfficerKey::ByAccount(op.account.clone()))
        .map(|o| o.id);
    match existing {
        Some(id) => {
            let o = op.clone();
            state.network_officers.modify(id, |officer| {
                officer.officer_type = o.officer_type;
                officer.reward_currency = o.reward_currency.clone();
                officer.details = o.details.clone();
                officer.url = o.url.clone();
                officer.json = o.json.clone();
                officer.active = o.active;
            })
        }
        None => {
            let o = op.clone();
            state.network_officers.create(|id| NetworkOfficer {
                id,
                account: o.account.clone(),
                officer_type: o.officer_type,
                active: o.active,
                officer_approved: false,
                voting_power: 0,
                vote_count: 0,
                reward_currency: o.reward_currency.clone(),
                details: o.details.clone(),
                url: o.url.clone(),
                json: o.json.clone(),
                created: now,
            });
            Ok(())
        }
    }
}

fn refresh_officer_tally(state: &mut State, officer: &AccountName) -> ChainResult {
    let voters: Vec<AccountName> = state
        .officer_votes
        .with_key(NetworkOfficerVoteKey::ByOfficer(officer.clone()))
        .map(|v| v.account.clone())
        .collect();
    let count = voters.len() as u32;
    let power: i64 = voters.iter().map(|v| state.get_voting_power(v)).sum();
    let officer_id = state
        .network_officers
        .find_by_key(NetworkOfficerKey::ByAccount(officer.clone()))
        .map(|o| o.id)
        .ok_or(ChainError::unknown("network officer", officer))?;
    state.network_officers.modify(officer_id, |o| {
        o.vote_count = count;
        o.voting_power = power;
    })
}

/// Keep per-voter officer ranks gap-free around an insert or removal.
fn reorder_officer_ranks(
    state: &mut State,
    voter: &AccountName,
    officer_type: OfficerType,
    from_rank: u16,
    delta: i16,
) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .officer_votes
        .range(
            std::ops::Bound::Included((
                NetworkOfficerVoteKey::ByVoterTypeRank(voter.clone(), officer_type, from_rank),
                0,
            )),
            std::ops::Bound::Included((
                NetworkOfficerVoteKey::ByVoterTypeRank(voter.clone(), officer_type, u16::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state
            .officer_votes
            .modify(id, |v| v.vote_rank = (v.vote_rank as i16 + delta) as u16)?;
    }
    Ok(())
}

pub fn network_officer_vote(state: &mut State, op: &NetworkOfficerVoteOp) -> ChainResult {
    let officer = state
        .network_officers
        .find_by_key(NetworkOfficerKey::ByAccount(op.officer.clone()))
        .ok_or(ChainError::unknown("network officer", &op.officer))?
        .clone();
    ensure!(
        officer.active || !op.approved,
        ChainError::precondition("cannot vote for an inactive officer")
    );

    let existing = state
        .officer_votes
        .find_by_key(NetworkOfficerVoteKey::ByVoterOfficer(
            op.account.clone(),
            op.officer.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));
    match (existing, op.approved) {
        (None, true) => {
            reorder_officer_ranks(state, &op.account, officer.officer_type, op.vote_rank, 1)?;
            let o = op.clone();
            let officer_type = officer.officer_type;
            state.officer_votes.create(|id| NetworkOfficerVote {
                id,
                account: o.account.clone(),
                officer: o.officer.clone(),
                officer_type,
                vote_rank: o.vote_rank,
            });
        }
        (Some((id, old_rank)), true) => {
            reorder_officer_ranks(state, &op.account, officer.officer_type, old_rank + 1, -1)?;
            reorder_officer_ranks(state, &op.account, officer.officer_type, op.vote_rank, 1)?;
            let rank = op.vote_rank;
            state.officer_votes.modify(id, |v| v.vote_rank = rank)?;
        }
        (Some((id, old_rank)), false) => {
            state.officer_votes.remove(id)?;
            reorder_officer_ranks(state, &op.account, officer.officer_type, old_rank + 1, -1)?;
        }
        (None, false) => return Err(ChainError::unknown("officer vote", &op.officer)),
    }
    refresh_officer_tally(state, &op.officer)
}

// ============================================================
// EXECUTIVE BOARDS
// ============================================================

pub fn update_executive_board(state: &mut State, op: &UpdateExecutiveBoard) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.executive)?;
    let existing = state
        .executive_boards
        .find_by_key(ExecutiveBoardKey::ByAccount(op.account.clone()))
        .map(|b| b.id);
    match existing {
        Some(id) => {
            let o = op.clone();
            state.executive_boards.modify(id, |b| {
                b.budget = o.budget.clone();
                b.details = o.details.clone();
                b.url = o.url.clone();
                b.json = o.json.clone();
                b.active = o.active;
            })
        }
        None => {
            let o = op.clone();
            state.executive_boards.create(|id| ExecutiveBoard {
                id,
                account: o.account.clone(),
                active: o.active,
                board_approved: false,
                voting_power: 0,
                vote_count: 0,
                budget: o.budget.clone(),
                details: o.details.clone(),
                url: o.url.clone(),
                json: o.json.clone(),
                created: now,
            });
            Ok(())
        }
    }
}

fn refresh_board_tally(state: &mut State, board: &AccountName) -> ChainResult {
    let voters: Vec<AccountName> = state
        .executive_votes
        .with_key(ExecutiveBoardVoteKey::ByBoard(board.clone()))
        .map(|v| v.account.clone())
        .collect();
    let count = voters.len() as u32;
    let power: i64 = voters.iter().map(|v| state.get_voting_power(v)).sum();
    let board_id = state
        .executive_boards
        .find_by_key(ExecutiveBoardKey::ByAccount(board.clone()))
        .map(|b| b.id)
        .ok_or(ChainError::unknown("executive board", board))?;
    state.executive_boards.modify(board_id, |b| {
        b.vote_count = count;
        b.voting_power = power;
    })
}

/// Keep per-voter board ranks gap-free around an insert or removal.
fn reorder_board_ranks(
    state: &mut State,
    voter: &AccountName,
    from_rank: u16,
    delta: i16,
) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .executive_votes
        .range(
            std::ops::Bound::Included((
                ExecutiveBoardVoteKey::ByVoterRank(voter.clone(), from_rank),
                0,
            )),
            std::ops::Bound::Included((
                ExecutiveBoardVoteKey::ByVoterRank(voter.clone(), u16::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state
            .executive_votes
            .modify(id, |v| v.vote_rank = (v.vote_rank as i16 + delta) as u16)?;
    }
    Ok(())
}

pub fn executive_board_vote(state: &mut State, op: &ExecutiveBoardVoteOp) -> ChainResult {
    let board = state
        .executive_boards
        .find_by_key(ExecutiveBoardKey::ByAccount(op.executive_board.clone()))
        .ok_or(ChainError::unknown("executive board", &op.executive_board))?
        .clone();
    ensure!(
        board.active || !op.approved,
        ChainError::precondition("cannot vote for an inactive board")
    );

    let existing = state
        .executive_votes
        .find_by_key(ExecutiveBoardVoteKey::ByVoterBoard(
            op.account.clone(),
            op.executive_board.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));
    match (existing, op.approved) {
        (None, true) => {
            reorder_board_ranks(state, &op.account, op.vote_rank, 1)?;
            let o = op.clone();
            state.executive_votes.create(|id| ExecutiveBoardVote {
                id,
                account: o.account.clone(),
                executive_board: o.executive_board.clone(),
                vote_rank: o.vote_rank,
            });
        }
        (Some((id, old_rank)), true) => {
            reorder_board_ranks(state, &op.account, old_rank + 1, -1)?;
            reorder_board_ranks(state, &op.account, op.vote_rank, 1)?;
            let rank = op.vote_rank;
            state.executive_votes.modify(id, |v| v.vote_rank = rank)?;
        }
        (Some((id, old_rank)), false) => {
            state.executive_votes.remove(id)?;
            reorder_board_ranks(state, &op.account, old_rank + 1, -1)?;
        }
        (None, false) => return Err(ChainError::unknown("board vote", &op.executive_board)),
    }
    refresh_board_tally(state, &op.executive_board)
}

// ============================================================
// GOVERNANCE ACCOUNTS
// ============================================================

pub fn update_governance(state: &mut State, op: &UpdateGovernance) -> ChainResult {
    let now = state.head_block_time();
    let existing = state
        .governance_accounts
        .find_by_key(GovernanceAccountKey::ByAccount(op.account.clone()))
        .map(|g| g.id);
    match existing {
        Some(id) => {
            let o = op.clone();
            state.governance_accounts.modify(id, |g| {
                g.details = o.details.clone();
                g.url = o.url.clone();
                g.json = o.json.clone();
                g.active = o.active;
            })
        }
        None => {
            let o = op.clone();
            state.governance_accounts.create(|id| GovernanceAccount {
                id,
                account: o.account.clone(),
                active: o.active,
                account_approved: false,
                subscriber_power: 0,
                subscriber_count: 0,
                details: o.details.clone(),
                url: o.url.clone(),
                json: o.json.clone(),
                created: now,
            });
            Ok(())
        }
    }
}

fn refresh_governance_tally(state: &mut State, governance: &AccountName) -> ChainResult {
    let subscribers: Vec<AccountName> = state
        .governance_subscriptions
        .with_key(GovernanceSubscriptionKey::ByGovernance(governance.clone()))
        .map(|s| s.account.clone())
        .collect();
    let count = subscribers.len() as u32;
    let power: i64 = subscribers.iter().map(|s| state.get_voting_power(s)).sum();
    let governance_id = state
        .governance_accounts
        .find_by_key(GovernanceAccountKey::ByAccount(governance.clone()))
        .map(|g| g.id)
        .ok_or(ChainError::unknown("governance account", governance))?;
    state.governance_accounts.modify(governance_id, |g| {
        g.subscriber_count = count;
        g.subscriber_power = power;
    })
}

pub fn subscribe_governance(state: &mut State, op: &SubscribeGovernance) -> ChainResult {
    state
        .governance_accounts
        .find_by_key(GovernanceAccountKey::ByAccount(op.governance_account.clone()))
        .ok_or(ChainError::unknown(
            "governance account",
            &op.governance_account,
        ))?;

    let existing = state
        .governance_subscriptions
        .find_by_key(GovernanceSubscriptionKey::BySubscriberGovernance(
            op.account.clone(),
            op.governance_account.clone(),
        ))
        .map(|s| s.id);
    match (existing, op.subscribed) {
        (None, true) => {
            let o = op.clone();
            state
                .governance_subscriptions
                .create(|id| GovernanceSubscription {
                    id,
                    account: o.account.clone(),
                    governance_account: o.governance_account.clone(),
                });
        }
        (Some(id), false) => state.governance_subscriptions.remove(id)?,
        (Some(_), true) => {
            return Err(ChainError::precondition("already subscribed"));
        }
        (None, false) => {
            return Err(ChainError::unknown(
                "governance subscription",
                &op.governance_account,
            ))
        }
    }
    refresh_governance_tally(state, &op.governance_account)
}

// ============================================================
// SERVICE ROLES
// ============================================================

pub fn update_service_role(state: &mut State, op: &UpdateServiceRole) -> ChainResult {
    let now = state.head_block_time();
    let existing = state
        .service_roles
        .find_by_key(ServiceRoleKey::ByAccountRole(op.account.clone(), op.role))
        .map(|r| (r.id, r.mediation_stake.clone()));

    match existing {
        Some((id, old_stake)) => {
            // adjust the pledged mediation stake by the difference
            let delta = op.mediation_stake.amount - old_stake.amount;
            if delta > 0 {
                let pledge = Asset::new(delta, op.mediation_stake.symbol.clone());
                state.adjust_liquid_balance(&op.account, &pledge.negated())?;
                state.adjust_pending_supply(&pledge)?;
            } else if delta < 0 {
                let released = Asset::new(-delta, op.mediation_stake.symbol.clone());
                state.adjust_pending_supply(&released.negated())?;
                state.adjust_liquid_balance(&op.account, &released)?;
            }
            let o = op.clone();
            state.service_roles.modify(id, |r| {
                r.details = o.details.clone();
                r.url = o.url.clone();
                r.json = o.json.clone();
                r.mediation_stake = o.mediation_stake.clone();
                r.active = o.active;
                r.last_updated = now;
            })
        }
        None => {
            if op.mediation_stake.amount > 0 {
                state.adjust_liquid_balance(&op.account, &op.mediation_stake.negated())?;
                state.adjust_pending_supply(&op.mediation_stake)?;
            }
            let o = op.clone();
            state.service_roles.create(|id| ServiceRole {
                id,
                account: o.account.clone(),
                role: o.role,
                active: o.active,
                details: o.details.clone(),
                url: o.url.clone(),
                json: o.json.clone(),
                mediation_stake: o.mediation_stake.clone(),
                created: now,
                last_updated: now,
            });
            Ok(())
        }
    }
}

// ============================================================
// COMMUNITY ENTERPRISES
// ============================================================

pub fn create_community_enterprise(
    state: &mut State,
    op: &CreateCommunityEnterprise,
) -> ChainResult {
    let now = state.head_block_time();
    state.get_asset(&op.daily_budget.symbol)?;
    ensure!(
        op.begin >= now,
        ChainError::invalid("enterprise must begin in the future")
    );
    ensure!(
        state
            .enterprises
            .find_by_key(EnterpriseKey::ByCreatorId(
                op.creator.clone(),
                op.enterprise_id.clone()
            ))
            .is_none(),
        ChainError::precondition(format!("enterprise id {} already in use", op.enterprise_id))
    );

    let o = op.clone();
    state.enterprises.create(|id| CommunityEnterprise {
        id,
        creator: o.creator.clone(),
        enterprise_id: o.enterprise_id.clone(),
        milestones: o
            .milestones
            .iter()
            .map(|(label, pct)| Milestone {
                label: label.clone(),
                percent: *pct,
            })
            .collect(),
        approved_milestones: -1,
        // the first milestone is implicitly claimed: work starts on it
        claimed_milestones: 1,
        begin: o.begin,
        duration_days: o.duration_days,
        daily_budget: o.daily_budget.clone(),
        days_paid: 0,
        total_distributed: 0,
        approval_power: 0,
        approval_count: 0,
        details: o.details.clone(),
        url: o.url.clone(),
        json: o.json.clone(),
        active: true,
        created: now,
    });
    info!(creator = %op.creator, enterprise = %op.enterprise_id, "enterprise created");
    Ok(())
}

fn refresh_enterprise_tally(
    state: &mut State,
    creator: &AccountName,
    enterprise_id: &str,
) -> ChainResult {
    let enterprise = state
        .enterprises
        .find_by_key(EnterpriseKey::ByCreatorId(
            creator.clone(),
            enterprise_id.to_string(),
        ))
        .ok_or(ChainError::unknown("enterprise", enterprise_id))?
        .clone();
    let next = enterprise.approved_milestones + 1;
    let approvals: Vec<AccountName> = state
        .enterprise_approvals
        .with_key(EnterpriseApprovalKey::ByEnterprise(
            creator.clone(),
            enterprise_id.to_string(),
        ))
        .filter(|a| a.milestone == next)
        .map(|a| a.account.clone())
        .collect();
    let count = approvals.len() as u32;
    let power: i64 = approvals.iter().map(|a| state.get_voting_power(a)).sum();
    state.enterprises.modify(enterprise.id, |e| {
        e.approval_count = count;
        e.approval_power = power;
    })
}

pub fn approve_enterprise_milestone(
    state: &mut State,
    op: &ApproveEnterpriseMilestone,
) -> ChainResult {
    let enterprise = state
        .enterprises
        .find_by_key(EnterpriseKey::ByCreatorId(
            op.creator.clone(),
            op.enterprise_id.clone(),
        ))
        .ok_or(ChainError::unknown("enterprise", &op.enterprise_id))?
        .clone();
    ensure!(
        op.milestone < enterprise.milestone_count(),
        ChainError::invalid("milestone index out of range")
    );
    ensure!(
        op.milestone == enterprise.approved_milestones + 1,
        ChainError::precondition("only the next pending milestone accepts approvals")
    );

    let existing = state
        .enterprise_approvals
        .find_by_key(EnterpriseApprovalKey::ByAccountEnterprise(
            op.account.clone(),
            op.creator.clone(),
            op.enterprise_id.clone(),
        ))
        .map(|a| a.id);
    match (existing, op.approved) {
        (None, true) => {
            let o = op.clone();
            state.enterprise_approvals.create(|id| EnterpriseApproval {
                id,
                account: o.account.clone(),
                creator: o.creator.clone(),
                enterprise_id: o.enterprise_id.clone(),
                milestone: o.milestone,
            });
        }
        (Some(id), true) => {
            let milestone = op.milestone;
            state
                .enterprise_approvals
                .modify(id, |a| a.milestone = milestone)?;
        }
        (Some(id), false) => state.enterprise_approvals.remove(id)?,
        (None, false) => return Err(ChainError::unknown("enterprise approval", &op.account)),
    }
    refresh_enterprise_tally(state, &op.creator, &op.enterprise_id)
}

pub fn claim_enterprise_milestone(
    state: &mut State,
    op: &ClaimEnterpriseMilestone,
) -> ChainResult {
    let enterprise = state
        .enterprises
        .find_by_key(EnterpriseKey::ByCreatorId(
            op.creator.clone(),
            op.enterprise_id.clone(),
        ))
        .ok_or(ChainError::unknown("enterprise", &op.enterprise_id))?
        .clone();
    ensure!(
        op.milestone == enterprise.claimed_milestones,
        ChainError::precondition("milestones claim strictly in order")
    );
    ensure!(
        enterprise.claimed_milestones < enterprise.milestone_count(),
        ChainError::precondition("all milestones already claimed")
    );
    ensure!(
        enterprise.approved_milestones >= enterprise.claimed_milestones - 1,
        ChainError::precondition("previous milestone still awaits approval")
    );
    state.enterprises.modify(enterprise.id, |e| {
        e.claimed_milestones += 1;
    })?;
    refresh_enterprise_tally(state, &op.creator, &op.enterprise_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainProperties, SYMBOL_COIN};
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(1_000), ChainProperties::default());
        for name in ["alice", "bob"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_staked_balance(&"bob".into(), &Asset::new(5_000, SYMBOL_COIN))
            .unwrap();
        state
    }

    fn create_enterprise(state: &mut State) {
        create_community_enterprise(
            state,
            &CreateCommunityEnterprise {
                signatory: "alice".into(),
                creator: "alice".into(),
                enterprise_id: "bridge".into(),
                milestones: vec![("half".into(), 5_000), ("rest".into(), 5_000)],
                begin: TimePoint::from_secs(2_000),
                duration_days: 14,
                daily_budget: Asset::new(100, SYMBOL_COIN),
                details: String::new(),
                url: String::new(),
                json: String::new(),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_enterprise_approval_order() {
        let mut state = setup();
        create_enterprise(&mut state);
        // milestone 1 cannot be approved before milestone 0
        let err = approve_enterprise_milestone(
            &mut state,
            &ApproveEnterpriseMilestone {
                signatory: "bob".into(),
                account: "bob".into(),
                creator: "alice".into(),
                enterprise_id: "bridge".into(),
                milestone: 1,
                approved: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));

        approve_enterprise_milestone(
            &mut state,
            &ApproveEnterpriseMilestone {
                signatory: "bob".into(),
                account: "bob".into(),
                creator: "alice".into(),
                enterprise_id: "bridge".into(),
                milestone: 0,
                approved: true,
            },
        )
        .unwrap();
        let e = state
            .enterprises
            .find_by_key(EnterpriseKey::ByCreatorId("alice".into(), "bridge".into()))
            .unwrap();
        assert_eq!(e.approval_power, 5_000);
        assert_eq!(e.approval_count, 1);
    }

    #[test]
    fn test_claim_requires_prior_approval() {
        let mut state = setup();
        create_enterprise(&mut state);
        // claiming milestone 1 needs milestone 0 approved first
        let err = claim_enterprise_milestone(
            &mut state,
            &ClaimEnterpriseMilestone {
                signatory: "alice".into(),
                creator: "alice".into(),
                enterprise_id: "bridge".into(),
                milestone: 1,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_officer_vote_tally() {
        let mut state = setup();
        update_network_officer(
            &mut state,
            &UpdateNetworkOfficer {
                signatory: "alice".into(),
                account: "alice".into(),
                officer_type: OfficerType::Development,
                reward_currency: SYMBOL_COIN.into(),
                details: String::new(),
                url: String::new(),
                json: String::new(),
                active: true,
            },
        )
        .unwrap();
        network_officer_vote(
            &mut state,
            &NetworkOfficerVoteOp {
                signatory: "bob".into(),
                account: "bob".into(),
                officer: "alice".into(),
                vote_rank: 1,
                approved: true,
            },
        )
        .unwrap();
        let officer = state
            .network_officers
            .find_by_key(NetworkOfficerKey::ByAccount("alice".into()))
            .unwrap();
        assert_eq!(officer.voting_power, 5_000);
        assert_eq!(officer.vote_count, 1);
    }

    #[test]
    fn test_governance_subscription_round_trip() {
        let mut state = setup();
        update_governance(
            &mut state,
            &UpdateGovernance {
                signatory: "alice".into(),
                account: "alice".into(),
                details: String::new(),
                url: String::new(),
                json: String::new(),
                active: true,
            },
        )
        .unwrap();
        let subscribe = SubscribeGovernance {
            signatory: "bob".into(),
            account: "bob".into(),
            governance_account: "alice".into(),
            subscribed: true,
        };
        subscribe_governance(&mut state, &subscribe).unwrap();
        subscribe_governance(
            &mut state,
            &SubscribeGovernance {
                subscribed: false,
                ..subscribe
            },
        )
        .unwrap();
        let governance = state
            .governance_accounts
            .find_by_key(GovernanceAccountKey::ByAccount("alice".into()))
            .unwrap();
        assert_eq!(governance.subscriber_count, 0);
        assert_eq!(governance.subscriber_power, 0);
    }

    #[test]
    fn test_mediator_stake_pledged() {
        let mut state = setup();
        state
            .adjust_liquid_balance(&"alice".into(), &Asset::new(1_000, SYMBOL_COIN))
            .unwrap();
        update_service_role(
            &mut state,
            &UpdateServiceRole {
                signatory: "alice".into(),
                account: "alice".into(),
                role: ServiceRoleType::Mediator,
                details: String::new(),
                url: String::new(),
                json: String::new(),
                mediation_stake: Asset::new(600, SYMBOL_COIN),
                active: true,
            },
        )
        .unwrap();
        assert_eq!(
            state
                .get_liquid_balance(&"alice".into(), &SYMBOL_COIN.into())
                .amount,
            400
        );
        state.verify_supply_invariants().unwrap();
    }
}
