//! Operation evaluators
//!
//! One evaluator per operation variant, dispatched by discriminator. The
//! shared contract:
//!
//! 1. structural validation already ran (`Operation::validate`)
//! 2. resolve the signatory and assert it is active
//! 3. when `signatory != signed_for`, the signatory must hold the
//!    operation's required role on the principal business account
//! 4. apply preconditions, then mutate through the ledger and store
//! 5. emit virtual operations for anything a consumer must audit

pub mod account;
pub mod community;
pub mod content;
pub mod governance;
pub mod market;
pub mod transfer;

use crate::core_types::AccountName;
use crate::error::{ChainError, ChainResult};
use crate::objects::AccountBusinessKey;
use crate::operations::{BusinessRole, Operation};
use crate::state::State;
use tracing::trace;

/// Assert the signatory may act for the operation's principal.
pub(crate) fn check_signatory(state: &State, op: &Operation) -> ChainResult {
    let signatory = op.signatory();
    state.get_active_account(signatory)?;

    let signed_for = op.signed_for();
    if signatory == signed_for {
        return Ok(());
    }
    state.get_active_account(signed_for)?;
    let business = state
        .account_businesses
        .find_by_key(AccountBusinessKey::ByAccount(signed_for.clone()))
        .ok_or_else(|| {
            ChainError::MissingAuthority(format!(
                "{signatory} cannot sign for non-business account {signed_for}"
            ))
        })?;
    let authorized = match op.required_role() {
        BusinessRole::General => business.is_authorized_general(signatory),
        BusinessRole::Officer => business.is_officer(signatory),
        BusinessRole::Executive => business.is_executive(signatory),
    };
    if !authorized {
        return Err(ChainError::MissingAuthority(format!(
            "{signatory} lacks the required role on {signed_for}"
        )));
    }
    Ok(())
}

/// Route an operation to its evaluator. The caller wraps this in a
/// transaction session; failures roll the whole transaction back.
pub fn apply_operation(state: &mut State, op: &Operation) -> ChainResult {
    trace!(op = op.name(), signatory = %op.signatory(), "apply");
    op.validate()?;
    check_signatory(state, op)?;

    match op {
        Operation::AccountCreate(o) => account::account_create(state, o),
        Operation::AccountUpdate(o) => account::account_update(state, o),
        Operation::AccountVerify(o) => account::account_verify(state, o),
        Operation::AccountBusiness(o) => account::account_business(state, o),
        Operation::AccountMembership(o) => account::account_membership(state, o),
        Operation::AccountVoteExecutive(o) => account::account_vote_executive(state, o),
        Operation::AccountVoteOfficer(o) => account::account_vote_officer(state, o),
        Operation::AccountMemberRequest(o) => account::account_member_request(state, o),
        Operation::AccountMemberInvite(o) => account::account_member_invite(state, o),
        Operation::AccountAcceptRequest(o) => account::account_accept_request(state, o),
        Operation::AccountAcceptInvite(o) => account::account_accept_invite(state, o),
        Operation::AccountRemoveMember(o) => account::account_remove_member(state, o),
        Operation::AccountUpdateList(o) => account::account_update_list(state, o),
        Operation::AccountProducerVote(o) => account::account_producer_vote(state, o),
        Operation::AccountUpdateProxy(o) => account::account_update_proxy(state, o),
        Operation::AccountRequestRecovery(o) => account::account_request_recovery(state, o),
        Operation::AccountRecover(o) => account::account_recover(state, o),
        Operation::AccountReset(o) => account::account_reset(state, o),
        Operation::AccountResetUpdate(o) => account::account_reset_update(state, o),
        Operation::AccountRecoveryUpdate(o) => account::account_recovery_update(state, o),
        Operation::AccountDeclineVoting(o) => account::account_decline_voting(state, o),
        Operation::AccountConnectionRequest(o) => account::account_connection_request(state, o),
        Operation::AccountConnectionAccept(o) => account::account_connection_accept(state, o),
        Operation::AccountFollow(o) => account::account_follow(state, o),
        Operation::AccountFollowTag(o) => account::account_follow_tag(state, o),
        Operation::AccountActivity(o) => account::account_activity(state, o),
        Operation::CommunityCreate(o) => community::community_create(state, o),
        Operation::CommunityUpdate(o) => community::community_update(state, o),
        Operation::CommunityAddMod(o) => community::community_add_mod(state, o),
        Operation::CommunityAddAdmin(o) => community::community_add_admin(state, o),
        Operation::CommunityVoteMod(o) => community::community_vote_mod(state, o),
        Operation::CommunityJoinRequest(o) => community::community_join_request(state, o),
        Operation::CommunityJoinInvite(o) => community::community_join_invite(state, o),
        Operation::CommunityJoinAccept(o) => community::community_join_accept(state, o),
        Operation::CommunityInviteAccept(o) => community::community_invite_accept(state, o),
        Operation::CommunityRemoveMember(o) => community::community_remove_member(state, o),
        Operation::CommunityBlacklist(o) => community::community_blacklist(state, o),
        Operation::CommunityModTag(o) => community::community_mod_tag(state, o),
        Operation::CommunitySubscribe(o) => community::community_subscribe(state, o),
        Operation::CommunityTransferOwnership(o) => {
            community::community_transfer_ownership(state, o)
        }
        Operation::Comment(o) => content::comment(state, o),
        Operation::Vote(o) => content::vote(state, o),
        Operation::View(o) => content::view(state, o),
        Operation::Share(o) => content::share(state, o),
        Operation::Transfer(o) => transfer::transfer(state, o),
        Operation::StakeAsset(o) => transfer::stake_asset(state, o),
        Operation::UnstakeAsset(o) => transfer::unstake_asset(state, o),
        Operation::UnstakeAssetRoute(o) => transfer::unstake_asset_route(state, o),
        Operation::TransferToSavings(o) => transfer::transfer_to_savings(state, o),
        Operation::TransferFromSavings(o) => transfer::transfer_from_savings(state, o),
        Operation::CancelTransferFromSavings(o) => {
            transfer::cancel_transfer_from_savings(state, o)
        }
        Operation::DelegateAsset(o) => transfer::delegate_asset(state, o),
        Operation::ClaimRewardBalance(o) => transfer::claim_reward_balance(state, o),
        Operation::LimitOrderCreate(o) => market::limit_order_create(state, o),
        Operation::LimitOrderCancel(o) => market::limit_order_cancel(state, o),
        Operation::CallOrderUpdate(o) => market::call_order_update(state, o),
        Operation::BidCollateral(o) => market::bid_collateral(state, o),
        Operation::AssetSettle(o) => market::asset_settle(state, o),
        Operation::AssetGlobalSettle(o) => market::asset_global_settle(state, o),
        Operation::AssetPublishFeed(o) => market::asset_publish_feed(state, o),
        Operation::AssetUpdateFeedProducers(o) => market::asset_update_feed_producers(state, o),
        Operation::EscrowTransfer(o) => market::escrow_transfer(state, o),
        Operation::EscrowApprove(o) => market::escrow_approve(state, o),
        Operation::EscrowDispute(o) => market::escrow_dispute(state, o),
        Operation::EscrowRelease(o) => market::escrow_release(state, o),
        Operation::ProducerUpdate(o) => governance::producer_update(state, o),
        Operation::UpdateNetworkOfficer(o) => governance::update_network_officer(state, o),
        Operation::NetworkOfficerVote(o) => governance::network_officer_vote(state, o),
        Operation::UpdateExecutiveBoard(o) => governance::update_executive_board(state, o),
        Operation::ExecutiveBoardVote(o) => governance::executive_board_vote(state, o),
        Operation::UpdateGovernance(o) => governance::update_governance(state, o),
        Operation::SubscribeGovernance(o) => governance::subscribe_governance(state, o),
        Operation::UpdateServiceRole(o) => governance::update_service_role(state, o),
        Operation::CreateCommunityEnterprise(o) => {
            governance::create_community_enterprise(state, o)
        }
        Operation::ApproveEnterpriseMilestone(o) => {
            governance::approve_enterprise_milestone(state, o)
        }
        Operation::ClaimEnterpriseMilestone(o) => {
            governance::claim_enterprise_milestone(state, o)
        }
    }
}

/// Existence + activity check used all over the evaluators.
pub(crate) fn touch_account(state: &State, name: &AccountName) -> ChainResult {
    state.get_active_account(name).map(|_| ())
}
