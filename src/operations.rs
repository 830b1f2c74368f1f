//! Operation set
//!
//! The closed sum of every signed operation the state machine accepts.
//! Each payload struct carries a `validate()` performing the structural
//! checks (`InvalidArgument` class): non-empty names, positive amounts,
//! in-range percents, distinct symbols. State-dependent checks live in the
//! evaluators.
//!
//! Every operation names a `signatory` (the account whose signature
//! authorized it) and a principal (`signed_for`). When the two differ, the
//! signatory must hold the operation's required role on the principal
//! business account.

use crate::amount::Asset;
use crate::authority::{Authority, AuthorityClass, PublicKey};
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::{BusinessType, CommunityPrivacy, ConnectionTier, MembershipTier, OfficerType};
use crate::price::Price;
use serde::{Deserialize, Serialize};

/// Role the signatory needs on the principal when signing for a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusinessRole {
    General,
    Officer,
    Executive,
}

fn require(cond: bool, msg: &str) -> ChainResult {
    if cond {
        Ok(())
    } else {
        Err(ChainError::invalid(msg))
    }
}

fn valid_name(name: &AccountName, what: &str) -> ChainResult {
    require(name.is_valid(), &format!("invalid {what}: {name}"))
}

fn valid_symbol(symbol: &AssetSymbol) -> ChainResult {
    require(symbol.is_valid(), &format!("invalid asset symbol: {symbol}"))
}

fn positive(asset: &Asset, what: &str) -> ChainResult {
    valid_symbol(&asset.symbol)?;
    require(asset.amount > 0, &format!("{what} must be positive"))
}

fn non_negative(asset: &Asset, what: &str) -> ChainResult {
    valid_symbol(&asset.symbol)?;
    require(asset.amount >= 0, &format!("{what} must be non-negative"))
}

// ============================================================
// ACCOUNT OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCreate {
    pub signatory: AccountName,
    pub registrar: AccountName,
    pub new_account_name: AccountName,
    pub referrer: AccountName,
    pub proxy: AccountName,
    pub recovery_account: AccountName,
    pub reset_account: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    pub owner_auth: Authority,
    pub active_auth: Authority,
    pub posting_auth: Authority,
    pub secure_public_key: PublicKey,
    pub connection_public_key: PublicKey,
    pub friend_public_key: PublicKey,
    pub companion_public_key: PublicKey,
    pub fee: Asset,
    pub delegation: Asset,
}

impl AccountCreate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.new_account_name, "new account name")?;
        valid_name(&self.registrar, "registrar")?;
        positive(&self.fee, "account creation fee")?;
        non_negative(&self.delegation, "delegation")?;
        require(!self.owner_auth.is_impossible(), "impossible owner authority")?;
        require(!self.active_auth.is_impossible(), "impossible active authority")?;
        require(
            !self.posting_auth.is_impossible(),
            "impossible posting authority",
        )?;
        self.owner_auth.validate()?;
        self.active_auth.validate()?;
        self.posting_auth.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub signatory: AccountName,
    pub account: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    pub owner_auth: Option<Authority>,
    pub active_auth: Option<Authority>,
    pub posting_auth: Option<Authority>,
    pub secure_public_key: Option<PublicKey>,
    pub connection_public_key: Option<PublicKey>,
    pub friend_public_key: Option<PublicKey>,
    pub companion_public_key: Option<PublicKey>,
}

impl AccountUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        for auth in [&self.owner_auth, &self.active_auth, &self.posting_auth]
            .into_iter()
            .flatten()
        {
            require(!auth.is_impossible(), "impossible authority")?;
            auth.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountVerify {
    pub signatory: AccountName,
    pub verifier_account: AccountName,
    pub verified_account: AccountName,
    pub shared_image: String,
    /// False removes an existing verification.
    pub verified: bool,
}

impl AccountVerify {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.verifier_account, "verifier")?;
        valid_name(&self.verified_account, "verified account")?;
        require(
            self.verifier_account != self.verified_account,
            "cannot verify self",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBusinessOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_type: BusinessType,
    /// Initial chief executive of the roster.
    pub init_chief_executive: AccountName,
    pub active: bool,
}

impl AccountBusinessOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "business account")?;
        valid_name(&self.init_chief_executive, "chief executive")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMembershipOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub membership_type: MembershipTier,
    pub months: u16,
    pub interface: AccountName,
}

impl AccountMembershipOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        require(self.months >= 1 && self.months <= 120, "months out of range")?;
        require(
            self.membership_type != MembershipTier::None,
            "cannot purchase the none tier",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountVoteExecutive {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub executive_account: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl AccountVoteExecutive {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.business_account, "business account")?;
        valid_name(&self.executive_account, "executive")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountVoteOfficer {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub officer_account: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl AccountVoteOfficer {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.business_account, "business account")?;
        valid_name(&self.officer_account, "officer")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMemberRequest {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub message: String,
    pub requested: bool,
}

impl AccountMemberRequest {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.business_account, "business account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMemberInvite {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub member: AccountName,
    pub message: String,
    pub invited: bool,
}

impl AccountMemberInvite {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "inviter")?;
        valid_name(&self.business_account, "business account")?;
        valid_name(&self.member, "invited member")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAcceptRequest {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub member: AccountName,
    pub accepted: bool,
}

impl AccountAcceptRequest {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "approver")?;
        valid_name(&self.business_account, "business account")?;
        valid_name(&self.member, "member")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountAcceptInvite {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub accepted: bool,
}

impl AccountAcceptInvite {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.business_account, "business account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRemoveMember {
    pub signatory: AccountName,
    pub account: AccountName,
    pub business_account: AccountName,
    pub member: AccountName,
}

impl AccountRemoveMember {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "remover")?;
        valid_name(&self.business_account, "business account")?;
        valid_name(&self.member, "member")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateList {
    pub signatory: AccountName,
    pub account: AccountName,
    pub listed_account: AccountName,
    pub blacklisted: bool,
    pub whitelisted: bool,
}

impl AccountUpdateList {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.listed_account, "listed account")?;
        require(
            !(self.blacklisted && self.whitelisted),
            "cannot blacklist and whitelist at once",
        )?;
        require(self.account != self.listed_account, "cannot list self")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProducerVote {
    pub signatory: AccountName,
    pub account: AccountName,
    pub producer: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl AccountProducerVote {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.producer, "producer")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateProxy {
    pub signatory: AccountName,
    pub account: AccountName,
    /// Empty proxy clears the setting.
    pub proxy: AccountName,
}

impl AccountUpdateProxy {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        if !self.proxy.is_empty() {
            valid_name(&self.proxy, "proxy")?;
            require(self.account != self.proxy, "cannot proxy to self")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRequestRecovery {
    pub signatory: AccountName,
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

impl AccountRequestRecovery {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.recovery_account, "recovery account")?;
        valid_name(&self.account_to_recover, "account to recover")
        // open authority = cancel form, validated in the evaluator
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecover {
    pub signatory: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

impl AccountRecover {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account_to_recover, "account to recover")?;
        require(
            !self.new_owner_authority.is_impossible(),
            "impossible new owner authority",
        )?;
        require(
            self.new_owner_authority != self.recent_owner_authority,
            "new owner authority must differ from the recent one",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReset {
    pub signatory: AccountName,
    pub reset_account: AccountName,
    pub account_to_reset: AccountName,
    pub new_owner_authority: Authority,
}

impl AccountReset {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.reset_account, "reset account")?;
        valid_name(&self.account_to_reset, "account to reset")?;
        require(
            !self.new_owner_authority.is_impossible() && !self.new_owner_authority.is_open(),
            "invalid new owner authority",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResetUpdate {
    pub signatory: AccountName,
    pub account: AccountName,
    pub new_reset_account: AccountName,
    pub reset_delay_days: u16,
}

impl AccountResetUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.new_reset_account, "reset account")?;
        require(
            self.reset_delay_days >= crate::config::MIN_RESET_DELAY_DAYS,
            "reset delay below minimum",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecoveryUpdate {
    pub signatory: AccountName,
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

impl AccountRecoveryUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account_to_recover, "account")?;
        valid_name(&self.new_recovery_account, "recovery account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDeclineVoting {
    pub signatory: AccountName,
    pub account: AccountName,
    pub declined: bool,
}

impl AccountDeclineVoting {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConnectionRequest {
    pub signatory: AccountName,
    pub account: AccountName,
    pub requested_account: AccountName,
    pub connection_type: ConnectionTier,
    pub message: String,
    pub requested: bool,
}

impl AccountConnectionRequest {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.requested_account, "requested account")?;
        require(
            self.account != self.requested_account,
            "cannot connect to self",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConnectionAccept {
    pub signatory: AccountName,
    pub account: AccountName,
    pub requesting_account: AccountName,
    pub connection_type: ConnectionTier,
    /// Tier key of the accepting side, encrypted to the counterparty.
    pub encrypted_key: String,
    pub connected: bool,
}

impl AccountConnectionAccept {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.requesting_account, "requesting account")?;
        require(
            self.account != self.requesting_account,
            "cannot connect to self",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFollow {
    pub signatory: AccountName,
    pub follower: AccountName,
    pub following: AccountName,
    /// Interface that delivered the event.
    pub interface: AccountName,
    pub added: bool,
    /// True = follow set, false = filter set.
    pub followed: bool,
}

impl AccountFollow {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.follower, "follower")?;
        valid_name(&self.following, "followed account")?;
        require(self.follower != self.following, "cannot follow self")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFollowTag {
    pub signatory: AccountName,
    pub follower: AccountName,
    pub tag: String,
    pub added: bool,
    pub followed: bool,
}

impl AccountFollowTag {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.follower, "follower")?;
        require(!self.tag.is_empty() && self.tag.len() <= 32, "invalid tag")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub signatory: AccountName,
    pub account: AccountName,
    /// The account's qualifying recent post.
    pub permlink: String,
    pub interface: AccountName,
}

impl AccountActivity {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        require(!self.permlink.is_empty(), "permlink must not be empty")
    }
}

// ============================================================
// COMMUNITY OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityCreate {
    pub signatory: AccountName,
    pub founder: AccountName,
    pub name: AccountName,
    pub privacy: CommunityPrivacy,
    pub community_public_key: PublicKey,
    pub json: String,
    pub details: String,
    pub url: String,
}

impl CommunityCreate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.founder, "founder")?;
        valid_name(&self.name, "community name")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityUpdate {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub privacy: CommunityPrivacy,
    pub json: String,
    pub details: String,
    pub url: String,
    pub pinned_author: AccountName,
    pub pinned_permlink: String,
}

impl CommunityUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAddMod {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub moderator: AccountName,
    pub added: bool,
}

impl CommunityAddMod {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.moderator, "moderator")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityAddAdmin {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub admin: AccountName,
    pub added: bool,
}

impl CommunityAddAdmin {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.admin, "administrator")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityVoteMod {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub moderator: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl CommunityVoteMod {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.moderator, "moderator")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityJoinRequestOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub message: String,
    pub requested: bool,
}

impl CommunityJoinRequestOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityJoinInviteOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub member: AccountName,
    pub message: String,
    pub encrypted_community_key: String,
    pub invited: bool,
}

impl CommunityJoinInviteOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "inviter")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.member, "invited member")?;
        require(self.account != self.member, "cannot invite self")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityJoinAccept {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub member: AccountName,
    pub encrypted_community_key: String,
    pub accepted: bool,
}

impl CommunityJoinAccept {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "approver")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.member, "member")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInviteAccept {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub accepted: bool,
}

impl CommunityInviteAccept {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityRemoveMember {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub member: AccountName,
}

impl CommunityRemoveMember {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "remover")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.member, "member")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityBlacklist {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub member: AccountName,
    pub blacklisted: bool,
}

impl CommunityBlacklist {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "moderator")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.member, "member")?;
        require(self.account != self.member, "cannot blacklist self")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityModTag {
    pub signatory: AccountName,
    pub moderator: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub community: AccountName,
    pub tags: Vec<String>,
    pub filter: bool,
    pub details: String,
    pub applied: bool,
}

impl CommunityModTag {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.moderator, "moderator")?;
        valid_name(&self.author, "author")?;
        valid_name(&self.community, "community")?;
        require(!self.permlink.is_empty(), "permlink must not be empty")?;
        require(self.tags.len() <= 10, "too many tags")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySubscribe {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub interface: AccountName,
    pub subscribed: bool,
}

impl CommunitySubscribe {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        valid_name(&self.community, "community")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityTransferOwnership {
    pub signatory: AccountName,
    pub account: AccountName,
    pub community: AccountName,
    pub new_founder: AccountName,
}

impl CommunityTransferOwnership {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "founder")?;
        valid_name(&self.community, "community")?;
        valid_name(&self.new_founder, "new founder")?;
        require(self.account != self.new_founder, "ownership is already held")
    }
}

// ============================================================
// CONTENT OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOp {
    pub signatory: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: AccountName,
    pub parent_permlink: String,
    pub community: AccountName,
    pub title: String,
    pub body: String,
    pub reward_currency: AssetSymbol,
    pub deleted: bool,
}

impl CommentOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.author, "author")?;
        require(
            !self.permlink.is_empty() && self.permlink.len() <= 256,
            "invalid permlink",
        )?;
        valid_symbol(&self.reward_currency)?;
        if !self.deleted {
            require(!self.body.is_empty(), "comment body must not be empty")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOp {
    pub signatory: AccountName,
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    /// Signed vote strength (/10_000).
    pub weight: i16,
    pub interface: AccountName,
}

impl VoteOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.voter, "voter")?;
        valid_name(&self.author, "author")?;
        require(
            (self.weight as i64).abs() <= PERCENT_100,
            "vote weight out of range",
        )?;
        require(!self.permlink.is_empty(), "permlink must not be empty")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewOp {
    pub signatory: AccountName,
    pub viewer: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub interface: AccountName,
    pub viewed: bool,
}

impl ViewOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.viewer, "viewer")?;
        valid_name(&self.author, "author")?;
        require(!self.permlink.is_empty(), "permlink must not be empty")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareOp {
    pub signatory: AccountName,
    pub sharer: AccountName,
    pub author: AccountName,
    pub permlink: String,
    pub interface: AccountName,
    pub shared: bool,
}

impl ShareOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.sharer, "sharer")?;
        valid_name(&self.author, "author")?;
        require(!self.permlink.is_empty(), "permlink must not be empty")
    }
}

// ============================================================
// TRANSFER / BALANCE OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl Transfer {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.to, "recipient")?;
        positive(&self.amount, "transfer amount")?;
        require(self.memo.len() <= 2_048, "memo too long")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeAsset {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
}

impl StakeAsset {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.to, "recipient")?;
        positive(&self.amount, "stake amount")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnstakeAsset {
    pub signatory: AccountName,
    pub from: AccountName,
    /// Total to unstake; zero cancels a running schedule.
    pub amount: Asset,
}

impl UnstakeAsset {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "account")?;
        non_negative(&self.amount, "unstake amount")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnstakeAssetRoute {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub percent: i64,
    pub auto_stake: bool,
}

impl UnstakeAssetRoute {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "origin")?;
        valid_name(&self.to, "destination")?;
        require(
            self.percent >= 0 && self.percent <= PERCENT_100,
            "route percent out of range",
        )?;
        require(self.from != self.to, "route must leave the origin account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferToSavings {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

impl TransferToSavings {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.to, "recipient")?;
        positive(&self.amount, "savings amount")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFromSavings {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub request_id: u64,
    pub memo: String,
}

impl TransferFromSavings {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.to, "recipient")?;
        positive(&self.amount, "withdrawal amount")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelTransferFromSavings {
    pub signatory: AccountName,
    pub from: AccountName,
    pub request_id: u64,
}

impl CancelTransferFromSavings {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateAsset {
    pub signatory: AccountName,
    pub delegator: AccountName,
    pub delegatee: AccountName,
    /// New total delegation; zero removes it.
    pub amount: Asset,
}

impl DelegateAsset {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.delegator, "delegator")?;
        valid_name(&self.delegatee, "delegatee")?;
        non_negative(&self.amount, "delegation amount")?;
        require(self.delegator != self.delegatee, "cannot delegate to self")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRewardBalance {
    pub signatory: AccountName,
    pub account: AccountName,
    pub reward: Asset,
    /// True stakes the claim instead of paying it liquid.
    pub to_stake: bool,
}

impl ClaimRewardBalance {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        positive(&self.reward, "reward claim")
    }
}

// ============================================================
// MARKET OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCreate {
    pub signatory: AccountName,
    pub owner: AccountName,
    pub order_id: u64,
    pub amount_to_sell: Asset,
    pub exchange_rate: Price,
    pub interface: AccountName,
    pub expiration: TimePoint,
    /// Reject instead of resting if nothing matches immediately.
    pub fill_or_kill: bool,
}

impl LimitOrderCreate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.owner, "owner")?;
        positive(&self.amount_to_sell, "sale amount")?;
        require(self.exchange_rate.is_valid(), "invalid exchange rate")?;
        require(
            self.amount_to_sell.symbol == self.exchange_rate.base.symbol,
            "sale amount and exchange rate base must match",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCancel {
    pub signatory: AccountName,
    pub owner: AccountName,
    pub order_id: u64,
}

impl LimitOrderCancel {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.owner, "owner")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOrderUpdate {
    pub signatory: AccountName,
    pub funding_account: AccountName,
    pub delta_collateral: Asset,
    pub delta_debt: Asset,
    pub target_collateral_ratio: Option<u16>,
}

impl CallOrderUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.funding_account, "funding account")?;
        valid_symbol(&self.delta_collateral.symbol)?;
        valid_symbol(&self.delta_debt.symbol)?;
        require(
            self.delta_collateral.symbol != self.delta_debt.symbol,
            "collateral and debt must differ",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidCollateralOp {
    pub signatory: AccountName,
    pub bidder: AccountName,
    pub debt_covered: Asset,
    pub additional_collateral: Asset,
}

impl BidCollateralOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.bidder, "bidder")?;
        non_negative(&self.debt_covered, "debt covered")?;
        non_negative(&self.additional_collateral, "additional collateral")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSettle {
    pub signatory: AccountName,
    pub account: AccountName,
    pub amount: Asset,
    pub interface: AccountName,
}

impl AssetSettle {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        positive(&self.amount, "settlement amount")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetGlobalSettle {
    pub signatory: AccountName,
    pub issuer: AccountName,
    pub asset_to_settle: AssetSymbol,
    pub settle_price: Price,
}

impl AssetGlobalSettle {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.issuer, "issuer")?;
        valid_symbol(&self.asset_to_settle)?;
        require(self.settle_price.is_valid(), "invalid settle price")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPublishFeed {
    pub signatory: AccountName,
    pub publisher: AccountName,
    pub symbol: AssetSymbol,
    pub feed: crate::objects::PriceFeed,
}

impl AssetPublishFeed {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.publisher, "publisher")?;
        valid_symbol(&self.symbol)?;
        require(
            !self.feed.settlement_price.is_null(),
            "feed settlement price must not be null",
        )?;
        require(
            self.feed.maintenance_collateral_ratio >= crate::price::COLLATERAL_RATIO_DENOM,
            "maintenance ratio below 1x",
        )?;
        require(
            self.feed.max_short_squeeze_ratio >= crate::price::COLLATERAL_RATIO_DENOM,
            "short squeeze ratio below 1x",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetUpdateFeedProducers {
    pub signatory: AccountName,
    pub issuer: AccountName,
    pub symbol: AssetSymbol,
    pub new_feed_producers: Vec<AccountName>,
}

impl AssetUpdateFeedProducers {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.issuer, "issuer")?;
        valid_symbol(&self.symbol)?;
        for producer in &self.new_feed_producers {
            valid_name(producer, "feed producer")?;
        }
        Ok(())
    }
}

// ============================================================
// ESCROW OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransfer {
    pub signatory: AccountName,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub escrow_id: u64,
    pub amount: Asset,
    pub fee: Asset,
    pub ratification_deadline: TimePoint,
    pub escrow_expiration: TimePoint,
    pub json: String,
}

impl EscrowTransfer {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.to, "recipient")?;
        valid_name(&self.agent, "agent")?;
        positive(&self.amount, "escrow amount")?;
        non_negative(&self.fee, "escrow fee")?;
        require(
            self.fee.symbol == self.amount.symbol,
            "fee and amount must share an asset",
        )?;
        require(
            self.ratification_deadline < self.escrow_expiration,
            "ratification must precede expiration",
        )?;
        require(
            self.from != self.to && self.from != self.agent && self.to != self.agent,
            "escrow parties must be distinct",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowApprove {
    pub signatory: AccountName,
    pub from: AccountName,
    pub escrow_id: u64,
    /// The ratifying party (recipient or agent).
    pub who: AccountName,
    pub approve: bool,
}

impl EscrowApprove {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.who, "ratifier")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowDispute {
    pub signatory: AccountName,
    pub from: AccountName,
    pub escrow_id: u64,
    pub who: AccountName,
}

impl EscrowDispute {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.who, "disputant")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowRelease {
    pub signatory: AccountName,
    pub from: AccountName,
    pub escrow_id: u64,
    pub who: AccountName,
    pub receiver: AccountName,
    pub amount: Asset,
}

impl EscrowRelease {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.from, "sender")?;
        valid_name(&self.who, "releasing party")?;
        valid_name(&self.receiver, "receiver")?;
        positive(&self.amount, "release amount")
    }
}

// ============================================================
// GOVERNANCE OPERATIONS
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerUpdate {
    pub signatory: AccountName,
    pub owner: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    pub active: bool,
}

impl ProducerUpdate {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.owner, "producer")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateNetworkOfficer {
    pub signatory: AccountName,
    pub account: AccountName,
    pub officer_type: OfficerType,
    pub reward_currency: AssetSymbol,
    pub details: String,
    pub url: String,
    pub json: String,
    pub active: bool,
}

impl UpdateNetworkOfficer {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "officer account")?;
        valid_symbol(&self.reward_currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOfficerVoteOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub officer: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl NetworkOfficerVoteOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.officer, "officer")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExecutiveBoard {
    pub signatory: AccountName,
    pub account: AccountName,
    pub executive: AccountName,
    pub budget: Asset,
    pub details: String,
    pub url: String,
    pub json: String,
    pub active: bool,
}

impl UpdateExecutiveBoard {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "board account")?;
        valid_name(&self.executive, "executive")?;
        positive(&self.budget, "board budget")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveBoardVoteOp {
    pub signatory: AccountName,
    pub account: AccountName,
    pub executive_board: AccountName,
    pub vote_rank: u16,
    pub approved: bool,
}

impl ExecutiveBoardVoteOp {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "voter")?;
        valid_name(&self.executive_board, "executive board")?;
        require(self.vote_rank >= 1 && self.vote_rank <= 100, "rank out of range")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateGovernance {
    pub signatory: AccountName,
    pub account: AccountName,
    pub details: String,
    pub url: String,
    pub json: String,
    pub active: bool,
}

impl UpdateGovernance {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "governance account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeGovernance {
    pub signatory: AccountName,
    pub account: AccountName,
    pub governance_account: AccountName,
    pub subscribed: bool,
}

impl SubscribeGovernance {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "subscriber")?;
        valid_name(&self.governance_account, "governance account")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateServiceRole {
    pub signatory: AccountName,
    pub account: AccountName,
    pub role: crate::objects::ServiceRoleType,
    pub details: String,
    pub url: String,
    pub json: String,
    /// Mediators pledge stake; must be zero for other roles.
    pub mediation_stake: Asset,
    pub active: bool,
}

impl UpdateServiceRole {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "account")?;
        non_negative(&self.mediation_stake, "mediation stake")?;
        if self.role != crate::objects::ServiceRoleType::Mediator {
            require(
                self.mediation_stake.is_zero(),
                "only mediators pledge stake",
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommunityEnterprise {
    pub signatory: AccountName,
    pub creator: AccountName,
    pub enterprise_id: String,
    pub milestones: Vec<(String, i64)>,
    pub begin: TimePoint,
    pub duration_days: u16,
    pub daily_budget: Asset,
    pub details: String,
    pub url: String,
    pub json: String,
}

impl CreateCommunityEnterprise {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.creator, "creator")?;
        require(
            !self.enterprise_id.is_empty() && self.enterprise_id.len() <= 64,
            "invalid enterprise id",
        )?;
        require(
            !self.milestones.is_empty() && self.milestones.len() <= 32,
            "milestone count out of range",
        )?;
        let total: i64 = self.milestones.iter().map(|(_, pct)| *pct).sum();
        require(total == PERCENT_100, "milestone percents must sum to 100%")?;
        for (label, pct) in &self.milestones {
            require(!label.is_empty(), "milestone label must not be empty")?;
            require(*pct > 0, "milestone percent must be positive")?;
        }
        require(self.duration_days >= 1, "duration must be at least one day")?;
        positive(&self.daily_budget, "daily budget")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveEnterpriseMilestone {
    pub signatory: AccountName,
    pub account: AccountName,
    pub creator: AccountName,
    pub enterprise_id: String,
    pub milestone: i16,
    pub approved: bool,
}

impl ApproveEnterpriseMilestone {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.account, "approver")?;
        valid_name(&self.creator, "creator")?;
        require(self.milestone >= 0, "milestone index must be non-negative")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimEnterpriseMilestone {
    pub signatory: AccountName,
    pub creator: AccountName,
    pub enterprise_id: String,
    pub milestone: i16,
}

impl ClaimEnterpriseMilestone {
    pub fn validate(&self) -> ChainResult {
        valid_name(&self.creator, "creator")?;
        require(self.milestone >= 1, "only milestones past the first are claimed")
    }
}

// ============================================================
// THE OPERATION SUM
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    // account
    AccountCreate(AccountCreate),
    AccountUpdate(AccountUpdate),
    AccountVerify(AccountVerify),
    AccountBusiness(AccountBusinessOp),
    AccountMembership(AccountMembershipOp),
    AccountVoteExecutive(AccountVoteExecutive),
    AccountVoteOfficer(AccountVoteOfficer),
    AccountMemberRequest(AccountMemberRequest),
    AccountMemberInvite(AccountMemberInvite),
    AccountAcceptRequest(AccountAcceptRequest),
    AccountAcceptInvite(AccountAcceptInvite),
    AccountRemoveMember(AccountRemoveMember),
    AccountUpdateList(AccountUpdateList),
    AccountProducerVote(AccountProducerVote),
    AccountUpdateProxy(AccountUpdateProxy),
    AccountRequestRecovery(AccountRequestRecovery),
    AccountRecover(AccountRecover),
    AccountReset(AccountReset),
    AccountResetUpdate(AccountResetUpdate),
    AccountRecoveryUpdate(AccountRecoveryUpdate),
    AccountDeclineVoting(AccountDeclineVoting),
    AccountConnectionRequest(AccountConnectionRequest),
    AccountConnectionAccept(AccountConnectionAccept),
    AccountFollow(AccountFollow),
    AccountFollowTag(AccountFollowTag),
    AccountActivity(AccountActivity),
    // community
    CommunityCreate(CommunityCreate),
    CommunityUpdate(CommunityUpdate),
    CommunityAddMod(CommunityAddMod),
    CommunityAddAdmin(CommunityAddAdmin),
    CommunityVoteMod(CommunityVoteMod),
    CommunityJoinRequest(CommunityJoinRequestOp),
    CommunityJoinInvite(CommunityJoinInviteOp),
    CommunityJoinAccept(CommunityJoinAccept),
    CommunityInviteAccept(CommunityInviteAccept),
    CommunityRemoveMember(CommunityRemoveMember),
    CommunityBlacklist(CommunityBlacklist),
    CommunityModTag(CommunityModTag),
    CommunitySubscribe(CommunitySubscribe),
    CommunityTransferOwnership(CommunityTransferOwnership),
    // content
    Comment(CommentOp),
    Vote(VoteOp),
    View(ViewOp),
    Share(ShareOp),
    // transfers & balances
    Transfer(Transfer),
    StakeAsset(StakeAsset),
    UnstakeAsset(UnstakeAsset),
    UnstakeAssetRoute(UnstakeAssetRoute),
    TransferToSavings(TransferToSavings),
    TransferFromSavings(TransferFromSavings),
    CancelTransferFromSavings(CancelTransferFromSavings),
    DelegateAsset(DelegateAsset),
    ClaimRewardBalance(ClaimRewardBalance),
    // market
    LimitOrderCreate(LimitOrderCreate),
    LimitOrderCancel(LimitOrderCancel),
    CallOrderUpdate(CallOrderUpdate),
    BidCollateral(BidCollateralOp),
    AssetSettle(AssetSettle),
    AssetGlobalSettle(AssetGlobalSettle),
    AssetPublishFeed(AssetPublishFeed),
    AssetUpdateFeedProducers(AssetUpdateFeedProducers),
    // escrow
    EscrowTransfer(EscrowTransfer),
    EscrowApprove(EscrowApprove),
    EscrowDispute(EscrowDispute),
    EscrowRelease(EscrowRelease),
    // governance
    ProducerUpdate(ProducerUpdate),
    UpdateNetworkOfficer(UpdateNetworkOfficer),
    NetworkOfficerVote(NetworkOfficerVoteOp),
    UpdateExecutiveBoard(UpdateExecutiveBoard),
    ExecutiveBoardVote(ExecutiveBoardVoteOp),
    UpdateGovernance(UpdateGovernance),
    SubscribeGovernance(SubscribeGovernance),
    UpdateServiceRole(UpdateServiceRole),
    CreateCommunityEnterprise(CreateCommunityEnterprise),
    ApproveEnterpriseMilestone(ApproveEnterpriseMilestone),
    ClaimEnterpriseMilestone(ClaimEnterpriseMilestone),
}

macro_rules! with_payload {
    ($self:ident, $op:ident => $body:expr) => {
        match $self {
            Operation::AccountCreate($op) => $body,
            Operation::AccountUpdate($op) => $body,
            Operation::AccountVerify($op) => $body,
            Operation::AccountBusiness($op) => $body,
            Operation::AccountMembership($op) => $body,
            Operation::AccountVoteExecutive($op) => $body,
            Operation::AccountVoteOfficer($op) => $body,
            Operation::AccountMemberRequest($op) => $body,
            Operation::AccountMemberInvite($op) => $body,
            Operation::AccountAcceptRequest($op) => $body,
            Operation::AccountAcceptInvite($op) => $body,
            Operation::AccountRemoveMember($op) => $body,
            Operation::AccountUpdateList($op) => $body,
            Operation::AccountProducerVote($op) => $body,
            Operation::AccountUpdateProxy($op) => $body,
            Operation::AccountRequestRecovery($op) => $body,
            Operation::AccountRecover($op) => $body,
            Operation::AccountReset($op) => $body,
            Operation::AccountResetUpdate($op) => $body,
            Operation::AccountRecoveryUpdate($op) => $body,
            Operation::AccountDeclineVoting($op) => $body,
            Operation::AccountConnectionRequest($op) => $body,
            Operation::AccountConnectionAccept($op) => $body,
            Operation::AccountFollow($op) => $body,
            Operation::AccountFollowTag($op) => $body,
            Operation::AccountActivity($op) => $body,
            Operation::CommunityCreate($op) => $body,
            Operation::CommunityUpdate($op) => $body,
            Operation::CommunityAddMod($op) => $body,
            Operation::CommunityAddAdmin($op) => $body,
            Operation::CommunityVoteMod($op) => $body,
            Operation::CommunityJoinRequest($op) => $body,
            Operation::CommunityJoinInvite($op) => $body,
            Operation::CommunityJoinAccept($op) => $body,
            Operation::CommunityInviteAccept($op) => $body,
            Operation::CommunityRemoveMember($op) => $body,
            Operation::CommunityBlacklist($op) => $body,
            Operation::CommunityModTag($op) => $body,
            Operation::CommunitySubscribe($op) => $body,
            Operation::CommunityTransferOwnership($op) => $body,
            Operation::Comment($op) => $body,
            Operation::Vote($op) => $body,
            Operation::View($op) => $body,
            Operation::Share($op) => $body,
            Operation::Transfer($op) => $body,
            Operation::StakeAsset($op) => $body,
            Operation::UnstakeAsset($op) => $body,
            Operation::UnstakeAssetRoute($op) => $body,
            Operation::TransferToSavings($op) => $body,
            Operation::TransferFromSavings($op) => $body,
            Operation::CancelTransferFromSavings($op) => $body,
            Operation::DelegateAsset($op) => $body,
            Operation::ClaimRewardBalance($op) => $body,
            Operation::LimitOrderCreate($op) => $body,
            Operation::LimitOrderCancel($op) => $body,
            Operation::CallOrderUpdate($op) => $body,
            Operation::BidCollateral($op) => $body,
            Operation::AssetSettle($op) => $body,
            Operation::AssetGlobalSettle($op) => $body,
            Operation::AssetPublishFeed($op) => $body,
            Operation::AssetUpdateFeedProducers($op) => $body,
            Operation::EscrowTransfer($op) => $body,
            Operation::EscrowApprove($op) => $body,
            Operation::EscrowDispute($op) => $body,
            Operation::EscrowRelease($op) => $body,
            Operation::ProducerUpdate($op) => $body,
            Operation::UpdateNetworkOfficer($op) => $body,
            Operation::NetworkOfficerVote($op) => $body,
            Operation::UpdateExecutiveBoard($op) => $body,
            Operation::ExecutiveBoardVote($op) => $body,
            Operation::UpdateGovernance($op) => $body,
            Operation::SubscribeGovernance($op) => $body,
            Operation::UpdateServiceRole($op) => $body,
            Operation::CreateCommunityEnterprise($op) => $body,
            Operation::ApproveEnterpriseMilestone($op) => $body,
            Operation::ClaimEnterpriseMilestone($op) => $body,
        }
    };
}

impl Operation {
    /// Structural validation (the `InvalidArgument` class).
    pub fn validate(&self) -> ChainResult {
        with_payload!(self, op => op.validate())
    }

    /// The signatory account whose signature authorized the operation.
    pub fn signatory(&self) -> &AccountName {
        with_payload!(self, op => &op.signatory)
    }

    /// The principal account whose authority the operation requires.
    pub fn signed_for(&self) -> &AccountName {
        match self {
            Operation::AccountCreate(op) => &op.registrar,
            Operation::AccountUpdate(op) => &op.account,
            Operation::AccountVerify(op) => &op.verifier_account,
            Operation::AccountBusiness(op) => &op.account,
            Operation::AccountMembership(op) => &op.account,
            Operation::AccountVoteExecutive(op) => &op.account,
            Operation::AccountVoteOfficer(op) => &op.account,
            Operation::AccountMemberRequest(op) => &op.account,
            Operation::AccountMemberInvite(op) => &op.account,
            Operation::AccountAcceptRequest(op) => &op.account,
            Operation::AccountAcceptInvite(op) => &op.account,
            Operation::AccountRemoveMember(op) => &op.account,
            Operation::AccountUpdateList(op) => &op.account,
            Operation::AccountProducerVote(op) => &op.account,
            Operation::AccountUpdateProxy(op) => &op.account,
            Operation::AccountRequestRecovery(op) => &op.recovery_account,
            Operation::AccountRecover(op) => &op.account_to_recover,
            Operation::AccountReset(op) => &op.reset_account,
            Operation::AccountResetUpdate(op) => &op.account,
            Operation::AccountRecoveryUpdate(op) => &op.account_to_recover,
            Operation::AccountDeclineVoting(op) => &op.account,
            Operation::AccountConnectionRequest(op) => &op.account,
            Operation::AccountConnectionAccept(op) => &op.account,
            Operation::AccountFollow(op) => &op.follower,
            Operation::AccountFollowTag(op) => &op.follower,
            Operation::AccountActivity(op) => &op.account,
            Operation::CommunityCreate(op) => &op.founder,
            Operation::CommunityUpdate(op) => &op.account,
            Operation::CommunityAddMod(op) => &op.account,
            Operation::CommunityAddAdmin(op) => &op.account,
            Operation::CommunityVoteMod(op) => &op.account,
            Operation::CommunityJoinRequest(op) => &op.account,
            Operation::CommunityJoinInvite(op) => &op.account,
            Operation::CommunityJoinAccept(op) => &op.account,
            Operation::CommunityInviteAccept(op) => &op.account,
            Operation::CommunityRemoveMember(op) => &op.account,
            Operation::CommunityBlacklist(op) => &op.account,
            Operation::CommunityModTag(op) => &op.moderator,
            Operation::CommunitySubscribe(op) => &op.account,
            Operation::CommunityTransferOwnership(op) => &op.account,
            Operation::Comment(op) => &op.author,
            Operation::Vote(op) => &op.voter,
            Operation::View(op) => &op.viewer,
            Operation::Share(op) => &op.sharer,
            Operation::Transfer(op) => &op.from,
            Operation::StakeAsset(op) => &op.from,
            Operation::UnstakeAsset(op) => &op.from,
            Operation::UnstakeAssetRoute(op) => &op.from,
            Operation::TransferToSavings(op) => &op.from,
            Operation::TransferFromSavings(op) => &op.from,
            Operation::CancelTransferFromSavings(op) => &op.from,
            Operation::DelegateAsset(op) => &op.delegator,
            Operation::ClaimRewardBalance(op) => &op.account,
            Operation::LimitOrderCreate(op) => &op.owner,
            Operation::LimitOrderCancel(op) => &op.owner,
            Operation::CallOrderUpdate(op) => &op.funding_account,
            Operation::BidCollateral(op) => &op.bidder,
            Operation::AssetSettle(op) => &op.account,
            Operation::AssetGlobalSettle(op) => &op.issuer,
            Operation::AssetPublishFeed(op) => &op.publisher,
            Operation::AssetUpdateFeedProducers(op) => &op.issuer,
            Operation::EscrowTransfer(op) => &op.from,
            Operation::EscrowApprove(op) => &op.who,
            Operation::EscrowDispute(op) => &op.who,
            Operation::EscrowRelease(op) => &op.who,
            Operation::ProducerUpdate(op) => &op.owner,
            Operation::UpdateNetworkOfficer(op) => &op.account,
            Operation::NetworkOfficerVote(op) => &op.account,
            Operation::UpdateExecutiveBoard(op) => &op.account,
            Operation::ExecutiveBoardVote(op) => &op.account,
            Operation::UpdateGovernance(op) => &op.account,
            Operation::SubscribeGovernance(op) => &op.account,
            Operation::UpdateServiceRole(op) => &op.account,
            Operation::CreateCommunityEnterprise(op) => &op.creator,
            Operation::ApproveEnterpriseMilestone(op) => &op.account,
            Operation::ClaimEnterpriseMilestone(op) => &op.creator,
        }
    }

    /// Minimum authority class that may authorize the operation.
    pub fn required_class(&self) -> AuthorityClass {
        match self {
            // posting-class: content and social graph
            Operation::Comment(_)
            | Operation::Vote(_)
            | Operation::View(_)
            | Operation::Share(_)
            | Operation::AccountFollow(_)
            | Operation::AccountFollowTag(_)
            | Operation::CommunityJoinRequest(_)
            | Operation::CommunitySubscribe(_) => AuthorityClass::Posting,
            // owner-class: authority rotation and recovery
            Operation::AccountRecover(_)
            | Operation::AccountReset(_)
            | Operation::AccountResetUpdate(_)
            | Operation::AccountRecoveryUpdate(_)
            | Operation::AccountDeclineVoting(_) => AuthorityClass::Owner,
            _ => AuthorityClass::Active,
        }
    }

    /// Role required of a business signatory acting for the principal.
    pub fn required_role(&self) -> BusinessRole {
        match self {
            Operation::AccountRequestRecovery(_)
            | Operation::AccountRecover(_)
            | Operation::AccountReset(_)
            | Operation::AccountResetUpdate(_)
            | Operation::AccountRecoveryUpdate(_)
            | Operation::AccountBusiness(_)
            | Operation::AccountUpdate(_) => BusinessRole::Executive,
            Operation::AccountActivity(_)
            | Operation::AccountMemberInvite(_)
            | Operation::AccountAcceptRequest(_)
            | Operation::AccountRemoveMember(_)
            | Operation::AccountUpdateList(_) => BusinessRole::Officer,
            _ => BusinessRole::General,
        }
    }

    /// Discriminator name for logs and dispatch metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AccountCreate(_) => "account_create",
            Operation::AccountUpdate(_) => "account_update",
            Operation::AccountVerify(_) => "account_verify",
            Operation::AccountBusiness(_) => "account_business",
            Operation::AccountMembership(_) => "account_membership",
            Operation::AccountVoteExecutive(_) => "account_vote_executive",
            Operation::AccountVoteOfficer(_) => "account_vote_officer",
            Operation::AccountMemberRequest(_) => "account_member_request",
            Operation::AccountMemberInvite(_) => "account_member_invite",
            Operation::AccountAcceptRequest(_) => "account_accept_request",
            Operation::AccountAcceptInvite(_) => "account_accept_invite",
            Operation::AccountRemoveMember(_) => "account_remove_member",
            Operation::AccountUpdateList(_) => "account_update_list",
            Operation::AccountProducerVote(_) => "account_producer_vote",
            Operation::AccountUpdateProxy(_) => "account_update_proxy",
            Operation::AccountRequestRecovery(_) => "account_request_recovery",
            Operation::AccountRecover(_) => "account_recover",
            Operation::AccountReset(_) => "account_reset",
            Operation::AccountResetUpdate(_) => "account_reset_update",
            Operation::AccountRecoveryUpdate(_) => "account_recovery_update",
            Operation::AccountDeclineVoting(_) => "account_decline_voting",
            Operation::AccountConnectionRequest(_) => "account_connection_request",
            Operation::AccountConnectionAccept(_) => "account_connection_accept",
            Operation::AccountFollow(_) => "account_follow",
            Operation::AccountFollowTag(_) => "account_follow_tag",
            Operation::AccountActivity(_) => "account_activity",
            Operation::CommunityCreate(_) => "community_create",
            Operation::CommunityUpdate(_) => "community_update",
            Operation::CommunityAddMod(_) => "community_add_mod",
            Operation::CommunityAddAdmin(_) => "community_add_admin",
            Operation::CommunityVoteMod(_) => "community_vote_mod",
            Operation::CommunityJoinRequest(_) => "community_join_request",
            Operation::CommunityJoinInvite(_) => "community_join_invite",
            Operation::CommunityJoinAccept(_) => "community_join_accept",
            Operation::CommunityInviteAccept(_) => "community_invite_accept",
            Operation::CommunityRemoveMember(_) => "community_remove_member",
            Operation::CommunityBlacklist(_) => "community_blacklist",
            Operation::CommunityModTag(_) => "community_moderation_tag",
            Operation::CommunitySubscribe(_) => "community_subscribe",
            Operation::CommunityTransferOwnership(_) => "community_transfer_ownership",
            Operation::Comment(_) => "comment",
            Operation::Vote(_) => "vote",
            Operation::View(_) => "view",
            Operation::Share(_) => "share",
            Operation::Transfer(_) => "transfer",
            Operation::StakeAsset(_) => "stake_asset",
            Operation::UnstakeAsset(_) => "unstake_asset",
            Operation::UnstakeAssetRoute(_) => "unstake_asset_route",
            Operation::TransferToSavings(_) => "transfer_to_savings",
            Operation::TransferFromSavings(_) => "transfer_from_savings",
            Operation::CancelTransferFromSavings(_) => "cancel_transfer_from_savings",
            Operation::DelegateAsset(_) => "delegate_asset",
            Operation::ClaimRewardBalance(_) => "claim_reward_balance",
            Operation::LimitOrderCreate(_) => "limit_order_create",
            Operation::LimitOrderCancel(_) => "limit_order_cancel",
            Operation::CallOrderUpdate(_) => "call_order_update",
            Operation::BidCollateral(_) => "bid_collateral",
            Operation::AssetSettle(_) => "asset_settle",
            Operation::AssetGlobalSettle(_) => "asset_global_settle",
            Operation::AssetPublishFeed(_) => "asset_publish_feed",
            Operation::AssetUpdateFeedProducers(_) => "asset_update_feed_producers",
            Operation::EscrowTransfer(_) => "escrow_transfer",
            Operation::EscrowApprove(_) => "escrow_approve",
            Operation::EscrowDispute(_) => "escrow_dispute",
            Operation::EscrowRelease(_) => "escrow_release",
            Operation::ProducerUpdate(_) => "producer_update",
            Operation::UpdateNetworkOfficer(_) => "update_network_officer",
            Operation::NetworkOfficerVote(_) => "network_officer_vote",
            Operation::UpdateExecutiveBoard(_) => "update_executive_board",
            Operation::ExecutiveBoardVote(_) => "executive_board_vote",
            Operation::UpdateGovernance(_) => "update_governance",
            Operation::SubscribeGovernance(_) => "subscribe_governance",
            Operation::UpdateServiceRole(_) => "update_service_role",
            Operation::CreateCommunityEnterprise(_) => "create_community_enterprise",
            Operation::ApproveEnterpriseMilestone(_) => "approve_enterprise_milestone",
            Operation::ClaimEnterpriseMilestone(_) => "claim_enterprise_milestone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_validation() {
        let mut op = Transfer {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(10, "COIN"),
            memo: String::new(),
        };
        assert!(op.validate().is_ok());
        op.amount.amount = 0;
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_limit_order_symbol_pairing() {
        let op = LimitOrderCreate {
            signatory: "alice".into(),
            owner: "alice".into(),
            order_id: 1,
            amount_to_sell: Asset::new(5, "COIN"),
            exchange_rate: Price::new(Asset::new(5, "USD"), Asset::new(10, "COIN")),
            interface: AccountName::default(),
            expiration: TimePoint::from_secs(100),
            fill_or_kill: false,
        };
        // sale amount is COIN but exchange rate base is USD
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_milestones_must_sum() {
        let mut op = CreateCommunityEnterprise {
            signatory: "alice".into(),
            creator: "alice".into(),
            enterprise_id: "bridge".into(),
            milestones: vec![("a".into(), 5_000), ("b".into(), 4_000)],
            begin: TimePoint::from_secs(0),
            duration_days: 14,
            daily_budget: Asset::new(100, "COIN"),
            details: String::new(),
            url: String::new(),
            json: String::new(),
        };
        assert!(op.validate().is_err());
        op.milestones[1].1 = 5_000;
        assert!(op.validate().is_ok());
    }

    #[test]
    fn test_class_escalation() {
        let vote = Operation::Vote(VoteOp {
            signatory: "alice".into(),
            voter: "alice".into(),
            author: "bob".into(),
            permlink: "post".into(),
            weight: 100,
            interface: AccountName::default(),
        });
        assert_eq!(vote.required_class(), AuthorityClass::Posting);

        let recover = Operation::AccountRecover(AccountRecover {
            signatory: "alice".into(),
            account_to_recover: "alice".into(),
            new_owner_authority: Authority::default(),
            recent_owner_authority: Authority::default(),
        });
        assert_eq!(recover.required_class(), AuthorityClass::Owner);
    }

    #[test]
    fn test_serde_round_trip() {
        let op = Operation::Transfer(Transfer {
            signatory: "alice".into(),
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(10, "COIN"),
            memo: "hi".into(),
        });
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"transfer\""));
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
