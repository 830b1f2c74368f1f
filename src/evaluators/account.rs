//! Account evaluators
//!
//! Creation, updates, verification, business rosters, membership tiers,
//! role votes, producer votes, proxying, recovery/reset, connections,
//! follows, and the daily activity reward claim.

use crate::amount::Asset;
use crate::authority::Authority;
use crate::config::{self, SYMBOL_COIN};
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::operations::*;
use crate::ensure;
use crate::state::State;
use std::ops::Bound;
use tracing::{debug, info};

// ============================================================
// HELPERS
// ============================================================

/// Rotate an account's owner authority, archiving the old one for the
/// recovery window.
pub(crate) fn update_owner_authority(
    state: &mut State,
    account: &AccountName,
    new_authority: Authority,
) -> ChainResult {
    let now = state.head_block_time();
    let record = state.get_account_authority(account)?;
    let record_id = record.id;
    let previous = record.owner_auth.clone();

    let archive_account = account.clone();
    state.authority_history.create(|id| AuthorityHistory {
        id,
        account: archive_account.clone(),
        previous_owner_authority: previous.clone(),
        created: now,
    });
    state.account_authorities.modify(record_id, |r| {
        r.owner_auth = new_authority;
        r.last_owner_update = now;
    })
}

/// Reject proxy chains that loop back or run too deep.
fn check_proxy_cycle(state: &State, account: &AccountName, proxy: &AccountName) -> ChainResult {
    let mut cursor = proxy.clone();
    for _ in 0..config::MAX_PROXY_RECURSION_DEPTH {
        if cursor == *account {
            return Err(ChainError::precondition("proxy chain forms a cycle"));
        }
        match state.find_account(&cursor) {
            Some(acc) if !acc.proxy.is_empty() => cursor = acc.proxy.clone(),
            _ => return Ok(()),
        }
    }
    Err(ChainError::precondition(format!(
        "proxy chain exceeds depth {}",
        config::MAX_PROXY_RECURSION_DEPTH
    )))
}

/// Remove every producer vote an account holds and refresh the affected
/// producers' tallies.
fn clear_producer_votes(state: &mut State, account: &AccountName) -> ChainResult {
    let votes: Vec<(ObjectId, AccountName)> = state
        .producer_votes
        .range(
            Bound::Included((ProducerVoteKey::ByAccountRank(account.clone(), 0), 0)),
            Bound::Included((
                ProducerVoteKey::ByAccountRank(account.clone(), u16::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|v| (v.id, v.producer.clone()))
        .collect();
    for (vote_id, producer) in votes {
        state.producer_votes.remove(vote_id)?;
        refresh_producer_tally(state, &producer)?;
    }
    let account_id = state.get_account(account)?.id;
    state.accounts.modify(account_id, |a| {
        a.producer_vote_count = 0;
    })
}

/// Recompute one producer's vote count and voting power from its votes.
pub(crate) fn refresh_producer_tally(state: &mut State, producer: &AccountName) -> ChainResult {
    let voters: Vec<AccountName> = state
        .producer_votes
        .with_key(ProducerVoteKey::ByProducer(producer.clone()))
        .map(|v| v.account.clone())
        .collect();
    let count = voters.len() as u32;
    let power: i64 = voters.iter().map(|v| state.get_voting_power(v)).sum();
    let producer_id = state.get_producer(producer)?.id;
    state.producers.modify(producer_id, |p| {
        p.vote_count = count;
        p.voting_power = power;
    })
}

/// Gap-free rank insertion: every vote of `account` at `rank` or below
/// moves down one slot to make room.
fn shift_producer_ranks_down(state: &mut State, account: &AccountName, rank: u16) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .producer_votes
        .range(
            Bound::Included((ProducerVoteKey::ByAccountRank(account.clone(), rank), 0)),
            Bound::Included((
                ProducerVoteKey::ByAccountRank(account.clone(), u16::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state.producer_votes.modify(id, |v| v.vote_rank += 1)?;
    }
    Ok(())
}

/// Gap-free rank removal: votes below the removed rank move up one slot.
fn compact_producer_ranks(state: &mut State, account: &AccountName, removed: u16) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .producer_votes
        .range(
            Bound::Included((
                ProducerVoteKey::ByAccountRank(account.clone(), removed + 1),
                0,
            )),
            Bound::Included((
                ProducerVoteKey::ByAccountRank(account.clone(), u16::MAX),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state.producer_votes.modify(id, |v| v.vote_rank -= 1)?;
    }
    Ok(())
}

/// Recompute a business's elected officer and executive sets from its
/// role votes. An account is an officer with 10% of member voting power,
/// an executive with 40%; the strongest executive becomes chief.
fn refresh_business_roles(state: &mut State, business_name: &AccountName) -> ChainResult {
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(business_name.clone()))
        .ok_or(ChainError::unknown("business account", business_name))?
        .clone();

    let member_power: i64 = business
        .members
        .iter()
        .map(|m| state.get_voting_power(m))
        .sum();

    let mut officer_power: std::collections::BTreeMap<AccountName, i64> = Default::default();
    for vote in state
        .business_officer_votes
        .with_key(BusinessOfficerVoteKey::ByBusiness(business_name.clone()))
    {
        *officer_power.entry(vote.officer.clone()).or_default() +=
            state.get_voting_power(&vote.account);
    }
    let mut executive_power: std::collections::BTreeMap<AccountName, i64> = Default::default();
    for vote in state
        .business_executive_votes
        .with_key(BusinessExecutiveVoteKey::ByBusiness(business_name.clone()))
    {
        *executive_power.entry(vote.executive.clone()).or_default() +=
            state.get_voting_power(&vote.account);
    }

    let officer_bar = member_power / 10;
    let executive_bar = member_power * 4 / 10;
    let officers: std::collections::BTreeSet<AccountName> = officer_power
        .iter()
        .filter(|(_, p)| **p > 0 && **p >= officer_bar)
        .map(|(n, _)| n.clone())
        .collect();
    let executives: std::collections::BTreeSet<AccountName> = executive_power
        .iter()
        .filter(|(_, p)| **p > 0 && **p >= executive_bar)
        .map(|(n, _)| n.clone())
        .collect();
    let chief = executives
        .iter()
        .max_by_key(|n| (executive_power.get(*n).copied().unwrap_or(0), std::cmp::Reverse((*n).clone())))
        .cloned()
        .unwrap_or(business.chief_executive.clone());

    state.account_businesses.modify(business.id, |b| {
        b.officers = officers;
        b.executives = executives;
        b.chief_executive = chief;
    })
}

// ============================================================
// CREATE / UPDATE
// ============================================================

pub fn account_create(state: &mut State, op: &AccountCreate) -> ChainResult {
    let now = state.head_block_time();

    if state.find_account(&op.new_account_name).is_some() {
        return Err(ChainError::precondition(format!(
            "account {} already exists",
            op.new_account_name
        )));
    }

    // short names pay double per missing character
    let mut required_fee = state.chain_props.account_creation_fee;
    let name_len = op.new_account_name.as_str().len();
    if name_len < config::PREMIUM_NAME_LENGTH {
        required_fee <<= (config::PREMIUM_NAME_LENGTH - name_len) as u32;
    }
    ensure!(
        op.fee.symbol.as_str() == SYMBOL_COIN && op.fee.amount >= required_fee,
        ChainError::precondition(format!(
            "account creation fee {} below required {required_fee}",
            op.fee
        ))
    );

    let registrar_balance = state
        .find_account_balance(&op.registrar, &SYMBOL_COIN.into())
        .cloned()
        .unwrap_or_else(|| AccountBalance::new(0, op.registrar.clone(), SYMBOL_COIN.into()));
    ensure!(
        registrar_balance.liquid_balance >= op.fee.amount,
        ChainError::InsufficientBalance {
            owner: op.registrar.clone(),
            symbol: SYMBOL_COIN.into(),
            available: registrar_balance.liquid_balance,
            required: op.fee.amount,
        }
    );
    ensure!(
        registrar_balance.unpledged_stake() >= op.delegation.amount,
        ChainError::InsufficientStake {
            owner: op.registrar.clone(),
            symbol: SYMBOL_COIN.into(),
            required: op.delegation.amount,
        }
    );

    let target_delegation = required_fee * config::CREATE_ACCOUNT_DELEGATION_RATIO;
    let current_delegation =
        op.fee.amount * config::CREATE_ACCOUNT_DELEGATION_RATIO + op.delegation.amount;
    ensure!(
        current_delegation >= target_delegation,
        ChainError::precondition(format!(
            "insufficient delegation: {current_delegation} provided, {target_delegation} required"
        ))
    );

    for referenced in [
        &op.referrer,
        &op.proxy,
        &op.recovery_account,
        &op.reset_account,
    ] {
        if !referenced.is_empty() {
            super::touch_account(state, referenced)?;
        }
    }
    for auth in [&op.owner_auth, &op.active_auth, &op.posting_auth] {
        for name in auth.account_auths.keys() {
            state.get_account(name)?;
        }
    }
    if !op.proxy.is_empty() {
        check_proxy_cycle(state, &op.new_account_name, &op.proxy)?;
    }

    state.adjust_liquid_balance(&op.registrar, &op.fee.negated())?;

    let name = op.new_account_name.clone();
    let o = op.clone();
    state.accounts.create(|id| {
        let mut account = Account::new(id, name.clone(), now);
        account.registrar = o.registrar.clone();
        account.referrer = o.referrer.clone();
        account.proxy = o.proxy.clone();
        account.recovery_account = o.recovery_account.clone();
        account.reset_account = o.reset_account.clone();
        account.details = o.details.clone();
        account.url = o.url.clone();
        account.json = o.json.clone();
        account.secure_public_key = o.secure_public_key;
        account.connection_public_key = o.connection_public_key;
        account.friend_public_key = o.friend_public_key;
        account.companion_public_key = o.companion_public_key;
        account
    });

    let name = op.new_account_name.clone();
    let owner = op.owner_auth.clone();
    let active = op.active_auth.clone();
    let posting = op.posting_auth.clone();
    state.account_authorities.create(|id| AccountAuthorityRecord {
        id,
        account: name.clone(),
        owner_auth: owner.clone(),
        active_auth: active.clone(),
        posting_auth: posting.clone(),
        last_owner_update: now,
    });
    let name = op.new_account_name.clone();
    state.followings.create(|id| AccountFollowing {
        id,
        account: name.clone(),
        following: Default::default(),
        followers: Default::default(),
        filtered: Default::default(),
        followed_tags: Default::default(),
        filtered_tags: Default::default(),
        last_updated: now,
    });

    // the fee funds the new account's opening stake
    state.adjust_staked_balance(&op.new_account_name, &op.fee)?;

    if op.delegation.amount > 0 {
        state.adjust_delegated_balance(&op.registrar, &op.delegation)?;
        state.adjust_receiving_balance(&op.new_account_name, &op.delegation)?;
        let delegator = op.registrar.clone();
        let delegatee = op.new_account_name.clone();
        let amount = op.delegation.clone();
        state.delegations.create(|id| Delegation {
            id,
            delegator: delegator.clone(),
            delegatee: delegatee.clone(),
            amount: amount.clone(),
            created: now,
        });
    }

    info!(account = %op.new_account_name, registrar = %op.registrar, "account created");
    Ok(())
}

pub fn account_update(state: &mut State, op: &AccountUpdate) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();

    ensure!(
        now > account.last_updated,
        ChainError::RateLimited("account update limited to once per second".into())
    );

    if let Some(owner_auth) = &op.owner_auth {
        let record = state.get_account_authority(&op.account)?;
        ensure!(
            now.since(record.last_owner_update) >= config::OWNER_UPDATE_LIMIT,
            ChainError::RateLimited("owner authority updates limited to once per hour".into())
        );
        update_owner_authority(state, &op.account, owner_auth.clone())?;
    }
    if op.active_auth.is_some() || op.posting_auth.is_some() {
        let record_id = state.get_account_authority(&op.account)?.id;
        let active = op.active_auth.clone();
        let posting = op.posting_auth.clone();
        state.account_authorities.modify(record_id, |r| {
            if let Some(a) = active {
                r.active_auth = a;
            }
            if let Some(p) = posting {
                r.posting_auth = p;
            }
        })?;
    }

    let o = op.clone();
    state.accounts.modify(account.id, |a| {
        if !o.details.is_empty() {
            a.details = o.details.clone();
        }
        if !o.url.is_empty() {
            a.url = o.url.clone();
        }
        if !o.json.is_empty() {
            a.json = o.json.clone();
        }
        if let Some(k) = o.secure_public_key {
            a.secure_public_key = k;
        }
        if let Some(k) = o.connection_public_key {
            a.connection_public_key = k;
        }
        if let Some(k) = o.friend_public_key {
            a.friend_public_key = k;
        }
        if let Some(k) = o.companion_public_key {
            a.companion_public_key = k;
        }
        a.last_updated = now;
    })
}

pub fn account_verify(state: &mut State, op: &AccountVerify) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.verified_account)?;

    let existing = state
        .account_verifications
        .find_by_key(AccountVerificationKey::ByVerifierVerified(
            op.verifier_account.clone(),
            op.verified_account.clone(),
        ))
        .map(|v| v.id);

    match (existing, op.verified) {
        (None, true) => {
            let o = op.clone();
            state.account_verifications.create(|id| AccountVerification {
                id,
                verifier_account: o.verifier_account.clone(),
                verified_account: o.verified_account.clone(),
                shared_image: o.shared_image.clone(),
                created: now,
                last_updated: now,
            });
            Ok(())
        }
        (Some(id), true) => {
            let image = op.shared_image.clone();
            state.account_verifications.modify(id, |v| {
                v.shared_image = image;
                v.last_updated = now;
            })
        }
        (Some(id), false) => state.account_verifications.remove(id),
        (None, false) => Err(ChainError::unknown(
            "account verification",
            format!("{} -> {}", op.verifier_account, op.verified_account),
        )),
    }
}

pub fn account_business(state: &mut State, op: &AccountBusinessOp) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.init_chief_executive)?;

    let existing = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.account.clone()))
        .map(|b| b.id);
    match existing {
        None => {
            ensure!(
                op.active,
                ChainError::precondition("cannot deactivate a non-existent business")
            );
            let o = op.clone();
            state.account_businesses.create(|id| {
                let mut business = AccountBusiness {
                    id,
                    account: o.account.clone(),
                    business_type: o.business_type,
                    chief_executive: o.init_chief_executive.clone(),
                    executives: Default::default(),
                    officers: Default::default(),
                    members: Default::default(),
                    whitelist: Default::default(),
                    blacklist: Default::default(),
                    created: now,
                    last_updated: now,
                };
                business.members.insert(o.init_chief_executive.clone());
                business.executives.insert(o.init_chief_executive.clone());
                business
            });
            Ok(())
        }
        Some(id) => {
            let o = op.clone();
            state.account_businesses.modify(id, |b| {
                b.business_type = o.business_type;
                b.last_updated = now;
            })
        }
    }
}

pub fn account_membership(state: &mut State, op: &AccountMembershipOp) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();

    let monthly_fee = match op.membership_type {
        MembershipTier::None => 0,
        MembershipTier::Standard => crate::amount::BLOCKCHAIN_PRECISION,
        MembershipTier::Mid => 10 * crate::amount::BLOCKCHAIN_PRECISION,
        MembershipTier::Top => 100 * crate::amount::BLOCKCHAIN_PRECISION,
    };
    let total_fee = Asset::new(monthly_fee * op.months as i64, SYMBOL_COIN);

    state.adjust_liquid_balance(&op.account, &total_fee.negated())?;

    // half rewards the selling interface, the rest is network revenue
    let mut network_cut = total_fee.clone();
    if !op.interface.is_empty() && state.find_account(&op.interface).is_some() {
        let interface_cut = total_fee.percent(5_000)?;
        if interface_cut.amount > 0 {
            state.adjust_reward_balance(&op.interface, &interface_cut)?;
            network_cut.amount -= interface_cut.amount;
        }
    }
    state.pay_network_fees(&network_cut)?;

    let tier = op.membership_type;
    let expiration = now.add_secs(30 * SECONDS_PER_DAY * op.months as i64);
    state.accounts.modify(account.id, |a| {
        a.membership = tier;
        a.membership_expiration = expiration;
        a.last_updated = now;
    })
}

// ============================================================
// BUSINESS ROSTER
// ============================================================

/// Keep a voter's business-role ranks gap-free around changes.
fn reorder_business_executive_ranks(
    state: &mut State,
    voter: &AccountName,
    business: &AccountName,
    from_rank: u16,
    delta: i16,
) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .business_executive_votes
        .range(
            Bound::Included((
                BusinessExecutiveVoteKey::ByVoterBusinessRank(
                    voter.clone(),
                    business.clone(),
                    from_rank,
                ),
                0,
            )),
            Bound::Included((
                BusinessExecutiveVoteKey::ByVoterBusinessRank(
                    voter.clone(),
                    business.clone(),
                    u16::MAX,
                ),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state
            .business_executive_votes
            .modify(id, |v| v.vote_rank = (v.vote_rank as i16 + delta) as u16)?;
    }
    Ok(())
}

fn reorder_business_officer_ranks(
    state: &mut State,
    voter: &AccountName,
    business: &AccountName,
    from_rank: u16,
    delta: i16,
) -> ChainResult {
    let to_shift: Vec<ObjectId> = state
        .business_officer_votes
        .range(
            Bound::Included((
                BusinessOfficerVoteKey::ByVoterBusinessRank(
                    voter.clone(),
                    business.clone(),
                    from_rank,
                ),
                0,
            )),
            Bound::Included((
                BusinessOfficerVoteKey::ByVoterBusinessRank(
                    voter.clone(),
                    business.clone(),
                    u16::MAX,
                ),
                ObjectId::MAX,
            )),
        )
        .map(|v| v.id)
        .collect();
    for id in to_shift {
        state
            .business_officer_votes
            .modify(id, |v| v.vote_rank = (v.vote_rank as i16 + delta) as u16)?;
    }
    Ok(())
}

pub fn account_vote_executive(state: &mut State, op: &AccountVoteExecutive) -> ChainResult {
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        business.is_member(&op.account),
        ChainError::precondition("only members vote for executives")
    );
    ensure!(
        business.is_member(&op.executive_account),
        ChainError::precondition("executive candidates must be members")
    );

    let existing = state
        .business_executive_votes
        .find_by_key(BusinessExecutiveVoteKey::ByVoterExecutive(
            op.account.clone(),
            op.business_account.clone(),
            op.executive_account.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));

    match (existing, op.approved) {
        (None, true) => {
            reorder_business_executive_ranks(
                state,
                &op.account,
                &op.business_account,
                op.vote_rank,
                1,
            )?;
            let o = op.clone();
            state
                .business_executive_votes
                .create(|id| BusinessExecutiveVote {
                    id,
                    account: o.account.clone(),
                    business_account: o.business_account.clone(),
                    executive: o.executive_account.clone(),
                    vote_rank: o.vote_rank,
                });
        }
        (Some((id, old_rank)), true) => {
            reorder_business_executive_ranks(
                state,
                &op.account,
                &op.business_account,
                old_rank + 1,
                -1,
            )?;
            reorder_business_executive_ranks(
                state,
                &op.account,
                &op.business_account,
                op.vote_rank,
                1,
            )?;
            let rank = op.vote_rank;
            state
                .business_executive_votes
                .modify(id, |v| v.vote_rank = rank)?;
        }
        (Some((id, old_rank)), false) => {
            state.business_executive_votes.remove(id)?;
            reorder_business_executive_ranks(
                state,
                &op.account,
                &op.business_account,
                old_rank + 1,
                -1,
            )?;
        }
        (None, false) => {
            return Err(ChainError::unknown("executive vote", &op.executive_account))
        }
    }
    refresh_business_roles(state, &op.business_account)
}

pub fn account_vote_officer(state: &mut State, op: &AccountVoteOfficer) -> ChainResult {
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        business.is_member(&op.account),
        ChainError::precondition("only members vote for officers")
    );
    ensure!(
        business.is_member(&op.officer_account),
        ChainError::precondition("officer candidates must be members")
    );

    let existing = state
        .business_officer_votes
        .find_by_key(BusinessOfficerVoteKey::ByVoterOfficer(
            op.account.clone(),
            op.business_account.clone(),
            op.officer_account.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));

    match (existing, op.approved) {
        (None, true) => {
            reorder_business_officer_ranks(
                state,
                &op.account,
                &op.business_account,
                op.vote_rank,
                1,
            )?;
            let o = op.clone();
            state.business_officer_votes.create(|id| BusinessOfficerVote {
                id,
                account: o.account.clone(),
                business_account: o.business_account.clone(),
                officer: o.officer_account.clone(),
                vote_rank: o.vote_rank,
            });
        }
        (Some((id, old_rank)), true) => {
            reorder_business_officer_ranks(
                state,
                &op.account,
                &op.business_account,
                old_rank + 1,
                -1,
            )?;
            reorder_business_officer_ranks(
                state,
                &op.account,
                &op.business_account,
                op.vote_rank,
                1,
            )?;
            let rank = op.vote_rank;
            state
                .business_officer_votes
                .modify(id, |v| v.vote_rank = rank)?;
        }
        (Some((id, old_rank)), false) => {
            state.business_officer_votes.remove(id)?;
            reorder_business_officer_ranks(
                state,
                &op.account,
                &op.business_account,
                old_rank + 1,
                -1,
            )?;
        }
        (None, false) => return Err(ChainError::unknown("officer vote", &op.officer_account)),
    }
    refresh_business_roles(state, &op.business_account)
}

pub fn account_member_request(state: &mut State, op: &AccountMemberRequest) -> ChainResult {
    let now = state.head_block_time();
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        business.business_type != BusinessType::Private,
        ChainError::precondition("private businesses admit members by invite only")
    );
    ensure!(
        !business.is_member(&op.account),
        ChainError::precondition("already a member")
    );
    ensure!(
        !business.blacklist.contains(&op.account),
        ChainError::precondition("account is blacklisted by the business")
    );

    let existing = state
        .business_member_requests
        .find_by_key(BusinessMemberRequestKey::ByAccountBusiness(
            op.account.clone(),
            op.business_account.clone(),
        ))
        .map(|r| r.id);
    match (existing, op.requested) {
        (None, true) => {
            let o = op.clone();
            state
                .business_member_requests
                .create(|id| BusinessMemberRequest {
                    id,
                    account: o.account.clone(),
                    business_account: o.business_account.clone(),
                    message: o.message.clone(),
                    expiration: now.add_secs(config::CONNECTION_REQUEST_DURATION),
                });
            Ok(())
        }
        (Some(id), false) => state.business_member_requests.remove(id),
        (Some(_), true) => Err(ChainError::precondition("request already pending")),
        (None, false) => Err(ChainError::unknown("member request", &op.account)),
    }
}

pub fn account_member_invite(state: &mut State, op: &AccountMemberInvite) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.member)?;
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        business.is_officer(&op.account),
        ChainError::MissingAuthority("only officers may invite members".into())
    );
    ensure!(
        !business.is_member(&op.member),
        ChainError::precondition("already a member")
    );

    let existing = state
        .business_member_invites
        .find_by_key(BusinessMemberInviteKey::ByAccountBusiness(
            op.member.clone(),
            op.business_account.clone(),
        ))
        .map(|i| i.id);
    match (existing, op.invited) {
        (None, true) => {
            let o = op.clone();
            state
                .business_member_invites
                .create(|id| BusinessMemberInvite {
                    id,
                    account: o.member.clone(),
                    business_account: o.business_account.clone(),
                    inviter: o.account.clone(),
                    message: o.message.clone(),
                    expiration: now.add_secs(config::CONNECTION_REQUEST_DURATION),
                });
            Ok(())
        }
        (Some(id), false) => state.business_member_invites.remove(id),
        (Some(_), true) => Err(ChainError::precondition("invite already pending")),
        (None, false) => Err(ChainError::unknown("member invite", &op.member)),
    }
}

pub fn account_accept_request(state: &mut State, op: &AccountAcceptRequest) -> ChainResult {
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        business.is_officer(&op.account),
        ChainError::MissingAuthority("only officers may approve member requests".into())
    );
    let request_id = state
        .business_member_requests
        .find_by_key(BusinessMemberRequestKey::ByAccountBusiness(
            op.member.clone(),
            op.business_account.clone(),
        ))
        .map(|r| r.id)
        .ok_or(ChainError::unknown("member request", &op.member))?;

    state.business_member_requests.remove(request_id)?;
    if op.accepted {
        let member = op.member.clone();
        state.account_businesses.modify(business.id, |b| {
            b.members.insert(member);
        })?;
    }
    Ok(())
}

pub fn account_accept_invite(state: &mut State, op: &AccountAcceptInvite) -> ChainResult {
    let invite_id = state
        .business_member_invites
        .find_by_key(BusinessMemberInviteKey::ByAccountBusiness(
            op.account.clone(),
            op.business_account.clone(),
        ))
        .map(|i| i.id)
        .ok_or(ChainError::unknown("member invite", &op.account))?;
    let business_id = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .map(|b| b.id)
        .ok_or(ChainError::unknown("business account", &op.business_account))?;

    state.business_member_invites.remove(invite_id)?;
    if op.accepted {
        let member = op.account.clone();
        state.account_businesses.modify(business_id, |b| {
            b.members.insert(member);
        })?;
    }
    Ok(())
}

pub fn account_remove_member(state: &mut State, op: &AccountRemoveMember) -> ChainResult {
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.business_account.clone()))
        .ok_or(ChainError::unknown("business account", &op.business_account))?
        .clone();
    ensure!(
        op.account == op.member || business.is_officer(&op.account),
        ChainError::MissingAuthority("only officers may remove other members".into())
    );
    ensure!(
        business.is_member(&op.member),
        ChainError::unknown("business member", &op.member)
    );
    ensure!(
        !business.is_executive(&op.member),
        ChainError::precondition("executives must be voted out before removal")
    );
    let member = op.member.clone();
    state.account_businesses.modify(business.id, |b| {
        b.members.remove(&member);
        b.officers.remove(&member);
    })
}

pub fn account_update_list(state: &mut State, op: &AccountUpdateList) -> ChainResult {
    super::touch_account(state, &op.listed_account)?;

    if let Some(business) = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(op.account.clone()))
        .map(|b| b.id)
    {
        let o = op.clone();
        return state.account_businesses.modify(business, |b| {
            if o.blacklisted {
                b.blacklist.insert(o.listed_account.clone());
                b.whitelist.remove(&o.listed_account);
                b.members.remove(&o.listed_account);
            } else {
                b.blacklist.remove(&o.listed_account);
            }
            if o.whitelisted {
                b.whitelist.insert(o.listed_account.clone());
            } else {
                b.whitelist.remove(&o.listed_account);
            }
        });
    }

    // plain accounts keep a personal filter list
    let following_id = state.get_following(&op.account)?.id;
    let now = state.head_block_time();
    let o = op.clone();
    state.followings.modify(following_id, |f| {
        if o.blacklisted {
            f.filtered.insert(o.listed_account.clone());
        } else {
            f.filtered.remove(&o.listed_account);
        }
        f.last_updated = now;
    })
}

// ============================================================
// PRODUCER VOTES / PROXY
// ============================================================

pub fn account_producer_vote(state: &mut State, op: &AccountProducerVote) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();
    ensure!(
        !account.decline_voting,
        ChainError::precondition("account has declined voting rights")
    );
    ensure!(
        account.proxy.is_empty(),
        ChainError::precondition("proxied accounts cannot vote directly")
    );
    let producer = state.get_producer(&op.producer)?;
    ensure!(
        producer.active || !op.approved,
        ChainError::precondition("cannot vote for an inactive producer")
    );

    let existing = state
        .producer_votes
        .find_by_key(ProducerVoteKey::ByAccountProducer(
            op.account.clone(),
            op.producer.clone(),
        ))
        .map(|v| (v.id, v.vote_rank));

    match (existing, op.approved) {
        (None, true) => {
            shift_producer_ranks_down(state, &op.account, op.vote_rank)?;
            let o = op.clone();
            state.producer_votes.create(|id| ProducerVote {
                id,
                account: o.account.clone(),
                producer: o.producer.clone(),
                vote_rank: o.vote_rank,
            });
            state.accounts.modify(account.id, |a| {
                a.producer_vote_count += 1;
                a.last_vote_time = now;
            })?;
        }
        (Some((vote_id, old_rank)), true) => {
            compact_producer_ranks(state, &op.account, old_rank)?;
            shift_producer_ranks_down(state, &op.account, op.vote_rank)?;
            let rank = op.vote_rank;
            state.producer_votes.modify(vote_id, |v| v.vote_rank = rank)?;
        }
        (Some((vote_id, old_rank)), false) => {
            state.producer_votes.remove(vote_id)?;
            compact_producer_ranks(state, &op.account, old_rank)?;
            state.accounts.modify(account.id, |a| {
                a.producer_vote_count = a.producer_vote_count.saturating_sub(1);
                a.last_vote_time = now;
            })?;
        }
        (None, false) => return Err(ChainError::unknown("producer vote", &op.producer)),
    }
    refresh_producer_tally(state, &op.producer)
}

pub fn account_update_proxy(state: &mut State, op: &AccountUpdateProxy) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();

    if !op.proxy.is_empty() {
        super::touch_account(state, &op.proxy)?;
        check_proxy_cycle(state, &op.account, &op.proxy)?;
        ensure!(
            account.proxy != op.proxy,
            ChainError::precondition("proxy already set to this account")
        );
        // direct votes and proxied votes are mutually exclusive
        clear_producer_votes(state, &op.account)?;
    }

    let proxy = op.proxy.clone();
    state.accounts.modify(account.id, |a| {
        a.proxy = proxy;
        a.last_updated = now;
    })
}

// ============================================================
// RECOVERY / RESET
// ============================================================

pub fn account_request_recovery(state: &mut State, op: &AccountRequestRecovery) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account_to_recover)?.clone();

    if !account.recovery_account.is_empty() {
        ensure!(
            account.recovery_account == op.recovery_account,
            ChainError::precondition(
                "recovery must be initiated by the designated recovery account"
            )
        );
    } else {
        // unset recovery partner defaults to the top producer
        let top = state
            .top_producer()
            .map(|p| p.owner.clone())
            .ok_or(ChainError::unknown("producer", "none registered"))?;
        ensure!(
            top == op.recovery_account,
            ChainError::precondition("only the top producer may recover this account")
        );
    }

    let existing = state
        .recovery_requests
        .find_by_key(RecoveryRequestKey::ByAccount(op.account_to_recover.clone()))
        .map(|r| r.id);

    match existing {
        None => {
            ensure!(
                !op.new_owner_authority.is_impossible() && !op.new_owner_authority.is_open(),
                ChainError::invalid("cannot recover to an impossible or open authority")
            );
            for name in op.new_owner_authority.account_auths.keys() {
                state.get_account(name)?;
            }
            let o = op.clone();
            state.recovery_requests.create(|id| RecoveryRequest {
                id,
                account_to_recover: o.account_to_recover.clone(),
                new_owner_authority: o.new_owner_authority.clone(),
                expiration: now.add_secs(config::ACCOUNT_RECOVERY_REQUEST_EXPIRATION),
            });
            Ok(())
        }
        Some(id) if op.new_owner_authority.is_open() => {
            // open authority is the cancel form
            state.recovery_requests.remove(id)
        }
        Some(id) => {
            ensure!(
                !op.new_owner_authority.is_impossible(),
                ChainError::invalid("cannot recover to an impossible authority")
            );
            for name in op.new_owner_authority.account_auths.keys() {
                state.get_account(name)?;
            }
            let authority = op.new_owner_authority.clone();
            let expiration = now.add_secs(config::ACCOUNT_RECOVERY_REQUEST_EXPIRATION);
            state.recovery_requests.modify(id, |r| {
                r.new_owner_authority = authority;
                r.expiration = expiration;
            })
        }
    }
}

pub fn account_recover(state: &mut State, op: &AccountRecover) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account_to_recover)?.clone();
    ensure!(
        now.since(account.last_account_recovery) >= config::OWNER_UPDATE_LIMIT,
        ChainError::RateLimited("owner authority can only be recovered once an hour".into())
    );

    let request = state
        .recovery_requests
        .find_by_key(RecoveryRequestKey::ByAccount(op.account_to_recover.clone()))
        .ok_or(ChainError::unknown(
            "recovery request",
            &op.account_to_recover,
        ))?
        .clone();
    ensure!(
        request.new_owner_authority == op.new_owner_authority,
        ChainError::precondition("new owner authority does not match the recovery request")
    );

    let found = state
        .authority_history
        .with_key(AuthorityHistoryKey::ByAccount(op.account_to_recover.clone()))
        .any(|h| h.previous_owner_authority == op.recent_owner_authority);
    if !found {
        return Err(ChainError::unknown(
            "authority history entry",
            &op.account_to_recover,
        ));
    }

    state.recovery_requests.remove(request.id)?;
    update_owner_authority(state, &op.account_to_recover, op.new_owner_authority.clone())?;
    state.accounts.modify(account.id, |a| {
        a.last_account_recovery = now;
        a.last_updated = now;
    })?;
    info!(account = %op.account_to_recover, "account recovered");
    Ok(())
}

pub fn account_reset(state: &mut State, op: &AccountReset) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account_to_reset)?.clone();
    ensure!(
        account.reset_account == op.reset_account,
        ChainError::precondition("reset account does not match")
    );
    let delay = SECONDS_PER_DAY * account.reset_delay_days as i64;
    ensure!(
        now.since(account.latest_activity()) > delay,
        ChainError::precondition(format!(
            "account must be inactive for {} days before reset",
            account.reset_delay_days
        ))
    );
    update_owner_authority(state, &op.account_to_reset, op.new_owner_authority.clone())
}

pub fn account_reset_update(state: &mut State, op: &AccountResetUpdate) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.new_reset_account)?;
    let account_id = state.get_account(&op.account)?.id;
    let o = op.clone();
    state.accounts.modify(account_id, |a| {
        a.reset_account = o.new_reset_account.clone();
        a.reset_delay_days = o.reset_delay_days;
        a.last_updated = now;
    })
}

pub fn account_recovery_update(state: &mut State, op: &AccountRecoveryUpdate) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.new_recovery_account)?;
    let account_id = state.get_account(&op.account_to_recover)?.id;

    // a change of recovery partner voids any in-flight request
    if let Some(request_id) = state
        .recovery_requests
        .find_by_key(RecoveryRequestKey::ByAccount(op.account_to_recover.clone()))
        .map(|r| r.id)
    {
        state.recovery_requests.remove(request_id)?;
    }
    let recovery = op.new_recovery_account.clone();
    state.accounts.modify(account_id, |a| {
        a.recovery_account = recovery;
        a.last_updated = now;
    })
}

pub fn account_decline_voting(state: &mut State, op: &AccountDeclineVoting) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();
    ensure!(
        account.decline_voting != op.declined,
        ChainError::precondition("voting preference unchanged")
    );
    if op.declined {
        clear_producer_votes(state, &op.account)?;
    }
    let declined = op.declined;
    state.accounts.modify(account.id, |a| {
        a.decline_voting = declined;
        a.last_updated = now;
    })
}

// ============================================================
// CONNECTIONS
// ============================================================

/// Canonical pair ordering: the account with the lower object id is A.
fn connection_pair(
    state: &State,
    a: &AccountName,
    b: &AccountName,
) -> ChainResult<(AccountName, AccountName)> {
    let acc_a = state.get_account(a)?;
    let acc_b = state.get_account(b)?;
    if acc_a.id < acc_b.id {
        Ok((a.clone(), b.clone()))
    } else {
        Ok((b.clone(), a.clone()))
    }
}

fn find_connection(
    state: &State,
    a: &AccountName,
    b: &AccountName,
    tier: ConnectionTier,
) -> Option<ObjectId> {
    state
        .connections
        .find_by_key(ConnectionKey::ByPair(a.clone(), b.clone(), tier))
        .map(|c| c.id)
}

pub fn account_connection_request(
    state: &mut State,
    op: &AccountConnectionRequest,
) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.requested_account)?;
    let (a, b) = connection_pair(state, &op.account, &op.requested_account)?;

    let existing_request = state
        .connection_requests
        .find_by_key(ConnectionRequestKey::ByPair(
            op.account.clone(),
            op.requested_account.clone(),
        ))
        .map(|r| r.id)
        .or_else(|| {
            state
                .connection_requests
                .find_by_key(ConnectionRequestKey::ByPair(
                    op.requested_account.clone(),
                    op.account.clone(),
                ))
                .map(|r| r.id)
        });

    if let Some(request_id) = existing_request {
        ensure!(
            !op.requested,
            ChainError::precondition("request already pending, set requested=false to cancel")
        );
        return state.connection_requests.remove(request_id);
    }
    ensure!(
        op.requested,
        ChainError::unknown("connection request", &op.requested_account)
    );

    match op.connection_type.prerequisite() {
        None => {
            ensure!(
                find_connection(state, &a, &b, ConnectionTier::Connection).is_none(),
                ChainError::precondition(
                    "connection already exists, request a tier increase instead"
                )
            );
        }
        Some(prior_tier) => {
            let prior = find_connection(state, &a, &b, prior_tier)
                .ok_or(ChainError::precondition(format!(
                    "{:?} connection requires the prior tier first",
                    op.connection_type
                )))?;
            ensure!(
                find_connection(state, &a, &b, op.connection_type).is_none(),
                ChainError::precondition("this tier already exists")
            );
            let prior_created = state.connections.require(prior, "connection")?.created;
            ensure!(
                now.since(prior_created) >= config::CONNECTION_REQUEST_DURATION,
                ChainError::RateLimited(
                    "tier upgrades require a week at the current tier".into()
                )
            );
        }
    }

    let o = op.clone();
    state.connection_requests.create(|id| ConnectionRequest {
        id,
        account: o.account.clone(),
        requested_account: o.requested_account.clone(),
        tier: o.connection_type,
        message: o.message.clone(),
        expiration: now.add_secs(config::CONNECTION_REQUEST_DURATION),
    });
    debug!(from = %op.account, to = %op.requested_account, "connection requested");
    Ok(())
}

pub fn account_connection_accept(state: &mut State, op: &AccountConnectionAccept) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.requesting_account)?;
    let (a, b) = connection_pair(state, &op.account, &op.requesting_account)?;

    let existing = find_connection(state, &a, &b, op.connection_type);

    if let Some(connection_id) = existing {
        // severing an existing connection
        ensure!(
            !op.connected,
            ChainError::precondition("connection already exists")
        );
        return state.connections.remove(connection_id);
    }
    ensure!(
        op.connected,
        ChainError::unknown("connection", &op.requesting_account)
    );

    let request = state
        .connection_requests
        .find_by_key(ConnectionRequestKey::ByPair(
            op.requesting_account.clone(),
            op.account.clone(),
        ))
        .ok_or(ChainError::unknown(
            "connection request",
            &op.requesting_account,
        ))?
        .clone();
    ensure!(
        request.tier == op.connection_type,
        ChainError::precondition("acceptance tier must match the request")
    );

    let is_account_a = a == op.account;
    let encrypted = op.encrypted_key.clone();
    let tier = op.connection_type;
    let (pair_a, pair_b) = (a.clone(), b.clone());
    state.connections.create(|id| Connection {
        id,
        account_a: pair_a.clone(),
        account_b: pair_b.clone(),
        tier,
        encrypted_key_a: if is_account_a {
            encrypted.clone()
        } else {
            String::new()
        },
        encrypted_key_b: if is_account_a {
            String::new()
        } else {
            encrypted.clone()
        },
        created: now,
    });
    state.connection_requests.remove(request.id)?;

    // both parties implicitly follow each other at first connection
    if tier == ConnectionTier::Connection {
        follow_pair(state, &a, &b, now)?;
        follow_pair(state, &b, &a, now)?;
    }
    Ok(())
}

fn follow_pair(
    state: &mut State,
    follower: &AccountName,
    followed: &AccountName,
    now: TimePoint,
) -> ChainResult {
    let follower_id = state.get_following(follower)?.id;
    let followed_name = followed.clone();
    state.followings.modify(follower_id, |f| {
        f.following.insert(followed_name);
        f.last_updated = now;
    })?;
    let followed_id = state.get_following(followed)?.id;
    let follower_name = follower.clone();
    state.followings.modify(followed_id, |f| {
        f.followers.insert(follower_name);
        f.last_updated = now;
    })
}

pub fn account_follow(state: &mut State, op: &AccountFollow) -> ChainResult {
    let now = state.head_block_time();
    super::touch_account(state, &op.following)?;

    let follower_id = state.get_following(&op.follower)?.id;
    let followed_id = state.get_following(&op.following)?.id;
    let o = op.clone();

    state.followings.modify(follower_id, |f| {
        if o.followed {
            if o.added {
                f.following.insert(o.following.clone());
                f.filtered.remove(&o.following);
            } else {
                f.following.remove(&o.following);
            }
        } else if o.added {
            f.filtered.insert(o.following.clone());
            f.following.remove(&o.following);
        } else {
            f.filtered.remove(&o.following);
        }
        f.last_updated = now;
    })?;

    let o = op.clone();
    state.followings.modify(followed_id, |f| {
        if o.followed {
            if o.added {
                f.followers.insert(o.follower.clone());
            } else {
                f.followers.remove(&o.follower);
            }
        }
        f.last_updated = now;
    })
}

pub fn account_follow_tag(state: &mut State, op: &AccountFollowTag) -> ChainResult {
    let now = state.head_block_time();
    let following_id = state.get_following(&op.follower)?.id;
    let o = op.clone();
    state.followings.modify(following_id, |f| {
        let set = if o.followed {
            &mut f.followed_tags
        } else {
            &mut f.filtered_tags
        };
        if o.added {
            set.insert(o.tag.clone());
        } else {
            set.remove(&o.tag);
        }
        f.last_updated = now;
    })
}

// ============================================================
// ACTIVITY REWARD
// ============================================================

pub fn account_activity(state: &mut State, op: &AccountActivity) -> ChainResult {
    let now = state.head_block_time();
    let account = state.get_account(&op.account)?.clone();
    ensure!(
        now.since(account.last_activity_reward) >= SECONDS_PER_DAY,
        ChainError::RateLimited("activity reward claimable once per 24 hours".into())
    );
    ensure!(
        account.producer_vote_count >= config::MIN_ACTIVITY_PRODUCERS,
        ChainError::precondition(format!(
            "at least {} producer votes required, have {}",
            config::MIN_ACTIVITY_PRODUCERS,
            account.producer_vote_count
        ))
    );

    let comment = state.get_comment(&op.account, &op.permlink)?.clone();
    ensure!(
        now.since(comment.created) <= SECONDS_PER_DAY,
        ChainError::precondition("qualifying post must be from the last 24 hours")
    );

    let metrics = state.metrics().clone();
    ensure!(
        comment.net_votes as i64 * 10 >= metrics.median_vote_count,
        ChainError::precondition("post needs at least 10% of the median vote count")
    );
    ensure!(
        comment.view_count as i64 * 10 >= metrics.median_view_count,
        ChainError::precondition("post needs at least 10% of the median view count")
    );
    ensure!(
        comment.vote_power * 10 >= metrics.median_vote_power,
        ChainError::precondition("post needs at least 10% of the median vote power")
    );
    ensure!(
        comment.view_power * 10 >= metrics.median_view_power,
        ChainError::precondition("post needs at least 10% of the median view power")
    );

    let recent_vote = state
        .comment_votes
        .range(
            Bound::Included((
                CommentVoteKey::ByVoterRecent(op.account.clone(), TimePoint::default()),
                0,
            )),
            Bound::Included((
                CommentVoteKey::ByVoterRecent(op.account.clone(), TimePoint::maximum()),
                ObjectId::MAX,
            )),
        )
        .next_back()
        .map(|v| v.created)
        .ok_or(ChainError::precondition(
            "a comment vote is required before claiming",
        ))?;
    ensure!(
        now.since(recent_vote) <= SECONDS_PER_DAY,
        ChainError::precondition("most recent vote must be within 24 hours")
    );
    let recent_view = state
        .comment_views
        .range(
            Bound::Included((
                CommentViewKey::ByViewerRecent(op.account.clone(), TimePoint::default()),
                0,
            )),
            Bound::Included((
                CommentViewKey::ByViewerRecent(op.account.clone(), TimePoint::maximum()),
                ObjectId::MAX,
            )),
        )
        .next_back()
        .map(|v| v.created)
        .ok_or(ChainError::precondition(
            "a comment view is required before claiming",
        ))?;
    ensure!(
        now.since(recent_view) <= SECONDS_PER_DAY,
        ChainError::precondition("most recent view must be within 24 hours")
    );

    crate::rewards::claim_activity_reward(state, &account)?;

    // the claim re-weighs the account's top-ranked producer
    if let Some(top_vote) = state
        .producer_votes
        .find_by_key(ProducerVoteKey::ByAccountRank(op.account.clone(), 1))
        .map(|v| v.producer.clone())
    {
        refresh_producer_tally(state, &top_vote)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainProperties;
    use crate::price::Price;
    use crate::state::bootstrap_account;

    fn setup() -> State {
        let mut state = State::new(TimePoint::from_secs(1_000_000), ChainProperties::default());
        for name in ["registrar", "alice", "bob"] {
            bootstrap_account(&mut state, name);
        }
        state
            .adjust_liquid_balance(
                &"registrar".into(),
                &Asset::new(100 * crate::amount::BLOCKCHAIN_PRECISION, SYMBOL_COIN),
            )
            .unwrap();
        state
    }

    fn create_op(name: &str, fee_multiplier: i64) -> AccountCreate {
        let auth = Authority::single_key(crate::authority::PublicKey::from_bytes([9; 32]));
        AccountCreate {
            signatory: "registrar".into(),
            registrar: "registrar".into(),
            new_account_name: name.into(),
            referrer: AccountName::default(),
            proxy: AccountName::default(),
            recovery_account: "registrar".into(),
            reset_account: "registrar".into(),
            details: String::new(),
            url: String::new(),
            json: String::new(),
            owner_auth: auth.clone(),
            active_auth: auth.clone(),
            posting_auth: auth,
            secure_public_key: Default::default(),
            connection_public_key: Default::default(),
            friend_public_key: Default::default(),
            companion_public_key: Default::default(),
            fee: Asset::new(
                fee_multiplier * crate::amount::BLOCKCHAIN_PRECISION,
                SYMBOL_COIN,
            ),
            delegation: Asset::zero(SYMBOL_COIN),
        }
    }

    #[test]
    fn test_account_create_moves_fee_to_stake() {
        let mut state = setup();
        account_create(&mut state, &create_op("newperson", 1)).unwrap();
        let staked = state.get_staked_balance(&"newperson".into(), &SYMBOL_COIN.into());
        assert_eq!(staked.amount, crate::amount::BLOCKCHAIN_PRECISION);
        assert!(state.get_account_authority(&"newperson".into()).is_ok());
        assert!(state.get_following(&"newperson".into()).is_ok());
        state.verify_supply_invariants().unwrap();
    }

    #[test]
    fn test_short_name_fee_doubles() {
        let mut state = setup();
        // 5 chars: fee doubles 3 times = 8x
        let err = account_create(&mut state, &create_op("short", 7)).unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
        account_create(&mut state, &create_op("short", 8)).unwrap();
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut state = setup();
        account_create(&mut state, &create_op("newperson", 1)).unwrap();
        let err = account_create(&mut state, &create_op("newperson", 1)).unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_proxy_cycle_rejected() {
        let mut state = setup();
        // alice -> bob
        account_update_proxy(
            &mut state,
            &AccountUpdateProxy {
                signatory: "alice".into(),
                account: "alice".into(),
                proxy: "bob".into(),
            },
        )
        .unwrap();
        // bob -> alice would close the loop
        let err = account_update_proxy(
            &mut state,
            &AccountUpdateProxy {
                signatory: "bob".into(),
                account: "bob".into(),
                proxy: "alice".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_follow_unfollow_round_trip() {
        let mut state = setup();
        let before_alice = state.get_following(&"alice".into()).unwrap().clone();
        let before_bob = state.get_following(&"bob".into()).unwrap().clone();

        let follow = AccountFollow {
            signatory: "alice".into(),
            follower: "alice".into(),
            following: "bob".into(),
            interface: AccountName::default(),
            added: true,
            followed: true,
        };
        account_follow(&mut state, &follow).unwrap();
        assert!(state
            .get_following(&"alice".into())
            .unwrap()
            .is_following(&"bob".into()));
        assert!(state
            .get_following(&"bob".into())
            .unwrap()
            .followers
            .contains(&"alice".into()));

        let unfollow = AccountFollow {
            added: false,
            ..follow
        };
        account_follow(&mut state, &unfollow).unwrap();
        let after_alice = state.get_following(&"alice".into()).unwrap();
        let after_bob = state.get_following(&"bob".into()).unwrap();
        assert_eq!(after_alice.following, before_alice.following);
        assert_eq!(after_bob.followers, before_bob.followers);
    }

    #[test]
    fn test_connection_handshake_and_teardown() {
        let mut state = setup();
        account_connection_request(
            &mut state,
            &AccountConnectionRequest {
                signatory: "alice".into(),
                account: "alice".into(),
                requested_account: "bob".into(),
                connection_type: ConnectionTier::Connection,
                message: "hi".into(),
                requested: true,
            },
        )
        .unwrap();
        account_connection_accept(
            &mut state,
            &AccountConnectionAccept {
                signatory: "bob".into(),
                account: "bob".into(),
                requesting_account: "alice".into(),
                connection_type: ConnectionTier::Connection,
                encrypted_key: "sealed".into(),
                connected: true,
            },
        )
        .unwrap();
        assert_eq!(state.connections.len(), 1);
        assert!(state.connection_requests.is_empty());

        // deleting the connection leaves no residue
        account_connection_accept(
            &mut state,
            &AccountConnectionAccept {
                signatory: "bob".into(),
                account: "bob".into(),
                requesting_account: "alice".into(),
                connection_type: ConnectionTier::Connection,
                encrypted_key: String::new(),
                connected: false,
            },
        )
        .unwrap();
        assert!(state.connections.is_empty());
    }

    #[test]
    fn test_friend_tier_requires_connection_and_cooldown() {
        let mut state = setup();
        let err = account_connection_request(
            &mut state,
            &AccountConnectionRequest {
                signatory: "alice".into(),
                account: "alice".into(),
                requested_account: "bob".into(),
                connection_type: ConnectionTier::Friend,
                message: String::new(),
                requested: true,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::PreconditionViolated(_)));
    }

    #[test]
    fn test_recovery_flow() {
        let mut state = setup();
        // rotate alice's owner key so history exists
        let original = state
            .get_account_authority(&"alice".into())
            .unwrap()
            .owner_auth
            .clone();
        let rotated = Authority::single_key(crate::authority::PublicKey::from_bytes([7; 32]));
        update_owner_authority(&mut state, &"alice".into(), rotated).unwrap();

        // alice's recovery partner is empty; make registrar top producer
        state.producers.create(|id| Producer {
            id,
            owner: "registrar".into(),
            active: true,
            details: String::new(),
            url: String::new(),
            json: String::new(),
            voting_power: 10,
            vote_count: 1,
            feed: Price::default(),
            last_feed_update: TimePoint::default(),
            created: TimePoint::default(),
        });

        let fresh = Authority::single_key(crate::authority::PublicKey::from_bytes([8; 32]));
        account_request_recovery(
            &mut state,
            &AccountRequestRecovery {
                signatory: "registrar".into(),
                recovery_account: "registrar".into(),
                account_to_recover: "alice".into(),
                new_owner_authority: fresh.clone(),
            },
        )
        .unwrap();

        account_recover(
            &mut state,
            &AccountRecover {
                signatory: "alice".into(),
                account_to_recover: "alice".into(),
                new_owner_authority: fresh.clone(),
                recent_owner_authority: original,
            },
        )
        .unwrap();
        assert_eq!(
            state
                .get_account_authority(&"alice".into())
                .unwrap()
                .owner_auth,
            fresh
        );
        assert!(state.recovery_requests.is_empty());
    }

    #[test]
    fn test_recover_unknown_history_fails() {
        let mut state = setup();
        state.producers.create(|id| Producer {
            id,
            owner: "registrar".into(),
            active: true,
            details: String::new(),
            url: String::new(),
            json: String::new(),
            voting_power: 10,
            vote_count: 1,
            feed: Price::default(),
            last_feed_update: TimePoint::default(),
            created: TimePoint::default(),
        });
        let fresh = Authority::single_key(crate::authority::PublicKey::from_bytes([8; 32]));
        account_request_recovery(
            &mut state,
            &AccountRequestRecovery {
                signatory: "registrar".into(),
                recovery_account: "registrar".into(),
                account_to_recover: "alice".into(),
                new_owner_authority: fresh.clone(),
            },
        )
        .unwrap();
        let bogus = Authority::single_key(crate::authority::PublicKey::from_bytes([99; 32]));
        let err = account_recover(
            &mut state,
            &AccountRecover {
                signatory: "alice".into(),
                account_to_recover: "alice".into(),
                new_owner_authority: fresh,
                recent_owner_authority: bogus,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ChainError::UnknownEntity { .. }));
    }
}
