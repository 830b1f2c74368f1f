//! Chain state
//!
//! The single mutable home of every entity table, the dynamic global
//! properties, and the virtual-operation sink. All access from evaluators
//! and maintenance goes through this handle; there is no thread-local or
//! global state anywhere else.
//!
//! # Sessions
//!
//! `begin_session` / `commit_session` / `undo_session` fan out to every
//! table (and the virtual-op sink) in declaration order. A block opens the
//! outer session; each transaction opens an inner one.

use crate::authority::{Authority, AuthorityClass, AuthorityLookup};
use crate::config::{self, ChainProperties, SYMBOL_COIN, SYMBOL_EQUITY, SYMBOL_USD};
use crate::core_types::*;
use crate::error::{ChainError, ChainResult};
use crate::objects::*;
use crate::store::Table;
use crate::virtual_ops::VirtualOperation;
use tracing::debug;

macro_rules! for_each_table {
    ($self:ident, $method:ident) => {
        $self.accounts.$method();
        $self.account_authorities.$method();
        $self.authority_history.$method();
        $self.recovery_requests.$method();
        $self.account_verifications.$method();
        $self.account_businesses.$method();
        $self.business_member_requests.$method();
        $self.business_member_invites.$method();
        $self.business_officer_votes.$method();
        $self.business_executive_votes.$method();
        $self.followings.$method();
        $self.connections.$method();
        $self.connection_requests.$method();
        $self.balances.$method();
        $self.unstake_routes.$method();
        $self.savings_withdraws.$method();
        $self.delegations.$method();
        $self.delegation_expirations.$method();
        $self.assets.$method();
        $self.asset_dynamic.$method();
        $self.bitassets.$method();
        $self.limit_orders.$method();
        $self.call_orders.$method();
        $self.force_settlements.$method();
        $self.collateral_bids.$method();
        $self.communities.$method();
        $self.community_members.$method();
        $self.join_requests.$method();
        $self.join_invites.$method();
        $self.mod_votes.$method();
        $self.comments.$method();
        $self.comment_votes.$method();
        $self.comment_views.$method();
        $self.comment_shares.$method();
        $self.moderation_tags.$method();
        $self.producers.$method();
        $self.producer_votes.$method();
        $self.network_officers.$method();
        $self.officer_votes.$method();
        $self.executive_boards.$method();
        $self.executive_votes.$method();
        $self.governance_accounts.$method();
        $self.governance_subscriptions.$method();
        $self.service_roles.$method();
        $self.enterprises.$method();
        $self.enterprise_approvals.$method();
        $self.escrows.$method();
        $self.globals.$method();
        $self.reward_funds.$method();
        $self.comment_metrics.$method();
        $self.transactions.$method();
    };
}

pub struct State {
    pub chain_props: ChainProperties,

    pub accounts: Table<Account>,
    pub account_authorities: Table<AccountAuthorityRecord>,
    pub authority_history: Table<AuthorityHistory>,
    pub recovery_requests: Table<RecoveryRequest>,
    pub account_verifications: Table<AccountVerification>,
    pub account_businesses: Table<AccountBusiness>,
    pub business_member_requests: Table<BusinessMemberRequest>,
    pub business_member_invites: Table<BusinessMemberInvite>,
    pub business_officer_votes: Table<BusinessOfficerVote>,
    pub business_executive_votes: Table<BusinessExecutiveVote>,
    pub followings: Table<AccountFollowing>,
    pub connections: Table<Connection>,
    pub connection_requests: Table<ConnectionRequest>,

    pub balances: Table<AccountBalance>,
    pub unstake_routes: Table<UnstakeRoute>,
    pub savings_withdraws: Table<SavingsWithdraw>,
    pub delegations: Table<Delegation>,
    pub delegation_expirations: Table<DelegationExpiration>,

    pub assets: Table<AssetObject>,
    pub asset_dynamic: Table<AssetDynamicData>,
    pub bitassets: Table<AssetBitassetData>,

    pub limit_orders: Table<LimitOrder>,
    pub call_orders: Table<CallOrder>,
    pub force_settlements: Table<ForceSettlement>,
    pub collateral_bids: Table<CollateralBid>,

    pub communities: Table<Community>,
    pub community_members: Table<CommunityMember>,
    pub join_requests: Table<CommunityJoinRequest>,
    pub join_invites: Table<CommunityJoinInvite>,
    pub mod_votes: Table<CommunityModVote>,

    pub comments: Table<Comment>,
    pub comment_votes: Table<CommentVote>,
    pub comment_views: Table<CommentView>,
    pub comment_shares: Table<CommentShare>,
    pub moderation_tags: Table<ModerationTag>,

    pub producers: Table<Producer>,
    pub producer_votes: Table<ProducerVote>,
    pub network_officers: Table<NetworkOfficer>,
    pub officer_votes: Table<NetworkOfficerVote>,
    pub executive_boards: Table<ExecutiveBoard>,
    pub executive_votes: Table<ExecutiveBoardVote>,
    pub governance_accounts: Table<GovernanceAccount>,
    pub governance_subscriptions: Table<GovernanceSubscription>,
    pub service_roles: Table<ServiceRole>,

    pub enterprises: Table<CommunityEnterprise>,
    pub enterprise_approvals: Table<EnterpriseApproval>,
    pub escrows: Table<Escrow>,

    pub globals: Table<DynamicGlobalProperties>,
    pub reward_funds: Table<RewardFund>,
    pub comment_metrics: Table<CommentMetrics>,
    pub transactions: Table<TransactionRecord>,

    virtual_ops: Vec<VirtualOperation>,
    virtual_op_marks: Vec<usize>,
    globals_id: ObjectId,
    reward_fund_id: ObjectId,
    comment_metrics_id: ObjectId,
}

impl State {
    /// Fresh state with the three core assets and the singleton rows.
    pub fn new(genesis_time: TimePoint, chain_props: ChainProperties) -> Self {
        let mut state = Self {
            chain_props,
            accounts: Table::new(),
            account_authorities: Table::new(),
            authority_history: Table::new(),
            recovery_requests: Table::new(),
            account_verifications: Table::new(),
            account_businesses: Table::new(),
            business_member_requests: Table::new(),
            business_member_invites: Table::new(),
            business_officer_votes: Table::new(),
            business_executive_votes: Table::new(),
            followings: Table::new(),
            connections: Table::new(),
            connection_requests: Table::new(),
            balances: Table::new(),
            unstake_routes: Table::new(),
            savings_withdraws: Table::new(),
            delegations: Table::new(),
            delegation_expirations: Table::new(),
            assets: Table::new(),
            asset_dynamic: Table::new(),
            bitassets: Table::new(),
            limit_orders: Table::new(),
            call_orders: Table::new(),
            force_settlements: Table::new(),
            collateral_bids: Table::new(),
            communities: Table::new(),
            community_members: Table::new(),
            join_requests: Table::new(),
            join_invites: Table::new(),
            mod_votes: Table::new(),
            comments: Table::new(),
            comment_votes: Table::new(),
            comment_views: Table::new(),
            comment_shares: Table::new(),
            moderation_tags: Table::new(),
            producers: Table::new(),
            producer_votes: Table::new(),
            network_officers: Table::new(),
            officer_votes: Table::new(),
            executive_boards: Table::new(),
            executive_votes: Table::new(),
            governance_accounts: Table::new(),
            governance_subscriptions: Table::new(),
            service_roles: Table::new(),
            enterprises: Table::new(),
            enterprise_approvals: Table::new(),
            escrows: Table::new(),
            globals: Table::new(),
            reward_funds: Table::new(),
            comment_metrics: Table::new(),
            transactions: Table::new(),
            virtual_ops: Vec::new(),
            virtual_op_marks: Vec::new(),
            globals_id: 0,
            reward_fund_id: 0,
            comment_metrics_id: 0,
        };

        state.globals_id = state
            .globals
            .create(|id| DynamicGlobalProperties::genesis(id, genesis_time));
        state.reward_fund_id = state.reward_funds.create(RewardFund::genesis);
        state.comment_metrics_id = state.comment_metrics.create(|id| CommentMetrics {
            id,
            ..CommentMetrics::default()
        });

        state.register_asset(SYMBOL_COIN, NETWORK, AssetKind::Currency);
        state.register_asset(SYMBOL_EQUITY, NETWORK, AssetKind::Equity);
        state.register_asset(SYMBOL_USD, NETWORK, AssetKind::MarketIssued);
        state
    }

    fn register_asset(&mut self, symbol: &str, issuer: &str, kind: AssetKind) {
        let created = self.head_block_time();
        self.assets.create(|id| AssetObject {
            id,
            symbol: symbol.into(),
            issuer: issuer.into(),
            kind,
            market_fee_percent: 0,
            max_market_fee: i64::MAX,
            created,
        });
        self.asset_dynamic
            .create(|id| AssetDynamicData::new(id, symbol.into()));
        if kind == AssetKind::MarketIssued {
            self.bitassets
                .create(|id| AssetBitassetData::new(id, symbol.into(), SYMBOL_COIN.into()));
        }
    }

    // ============================================================
    // GLOBALS
    // ============================================================

    pub fn props(&self) -> &DynamicGlobalProperties {
        self.globals
            .get(self.globals_id)
            .expect("global properties row exists from genesis")
    }

    pub fn props_modify(&mut self, f: impl FnOnce(&mut DynamicGlobalProperties)) {
        self.globals
            .modify(self.globals_id, f)
            .expect("global properties row exists from genesis");
    }

    pub fn head_block_time(&self) -> TimePoint {
        self.props().head_block_time
    }

    pub fn head_block_num(&self) -> BlockNum {
        self.props().head_block_num
    }

    pub fn reward_fund(&self) -> &RewardFund {
        self.reward_funds
            .get(self.reward_fund_id)
            .expect("reward fund row exists from genesis")
    }

    pub fn reward_fund_modify(&mut self, f: impl FnOnce(&mut RewardFund)) {
        self.reward_funds
            .modify(self.reward_fund_id, f)
            .expect("reward fund row exists from genesis");
    }

    pub fn metrics(&self) -> &CommentMetrics {
        self.comment_metrics
            .get(self.comment_metrics_id)
            .expect("comment metrics row exists from genesis")
    }

    pub fn metrics_modify(&mut self, f: impl FnOnce(&mut CommentMetrics)) {
        self.comment_metrics
            .modify(self.comment_metrics_id, f)
            .expect("comment metrics row exists from genesis");
    }

    // ============================================================
    // LOOKUPS
    // ============================================================

    pub fn find_account(&self, name: &AccountName) -> Option<&Account> {
        self.accounts.find_by_key(AccountKey::ByName(name.clone()))
    }

    pub fn get_account(&self, name: &AccountName) -> ChainResult<&Account> {
        self.find_account(name)
            .ok_or(ChainError::unknown("account", name))
    }

    /// Account that must be active to act at all.
    pub fn get_active_account(&self, name: &AccountName) -> ChainResult<&Account> {
        let account = self.get_account(name)?;
        if !account.active {
            return Err(ChainError::precondition(format!(
                "account {name} must be active to broadcast"
            )));
        }
        Ok(account)
    }

    pub fn get_account_authority(
        &self,
        name: &AccountName,
    ) -> ChainResult<&AccountAuthorityRecord> {
        self.account_authorities
            .find_by_key(AccountAuthorityKey::ByAccount(name.clone()))
            .ok_or(ChainError::unknown("account authority", name))
    }

    pub fn get_following(&self, name: &AccountName) -> ChainResult<&AccountFollowing> {
        self.followings
            .find_by_key(AccountFollowingKey::ByAccount(name.clone()))
            .ok_or(ChainError::unknown("account following", name))
    }

    pub fn get_asset(&self, symbol: &AssetSymbol) -> ChainResult<&AssetObject> {
        self.assets
            .find_by_key(AssetKeyIdx::BySymbol(symbol.clone()))
            .ok_or(ChainError::unknown("asset", symbol))
    }

    pub fn get_dynamic_data(&self, symbol: &AssetSymbol) -> ChainResult<&AssetDynamicData> {
        self.asset_dynamic
            .find_by_key(AssetKeyIdx::BySymbol(symbol.clone()))
            .ok_or(ChainError::unknown("asset dynamic data", symbol))
    }

    pub fn get_bitasset(&self, symbol: &AssetSymbol) -> ChainResult<&AssetBitassetData> {
        self.bitassets
            .find_by_key(AssetKeyIdx::BySymbol(symbol.clone()))
            .ok_or(ChainError::unknown("bitasset", symbol))
    }

    pub fn find_account_balance(
        &self,
        owner: &AccountName,
        symbol: &AssetSymbol,
    ) -> Option<&AccountBalance> {
        self.balances
            .find_by_key(AccountBalanceKey::ByOwnerSymbol(
                owner.clone(),
                symbol.clone(),
            ))
    }

    pub fn get_community(&self, name: &AccountName) -> ChainResult<&Community> {
        self.communities
            .find_by_key(CommunityKey::ByName(name.clone()))
            .ok_or(ChainError::unknown("community", name))
    }

    pub fn get_community_member(&self, name: &AccountName) -> ChainResult<&CommunityMember> {
        self.community_members
            .find_by_key(CommunityKey::ByName(name.clone()))
            .ok_or(ChainError::unknown("community member record", name))
    }

    pub fn get_producer(&self, name: &AccountName) -> ChainResult<&Producer> {
        self.producers
            .find_by_key(ProducerKey::ByName(name.clone()))
            .ok_or(ChainError::unknown("producer", name))
    }

    pub fn get_comment(&self, author: &AccountName, permlink: &str) -> ChainResult<&Comment> {
        self.comments
            .find_by_key(CommentKey::ByPermlink(author.clone(), permlink.to_string()))
            .ok_or(ChainError::unknown("comment", format!("{author}/{permlink}")))
    }

    /// Highest-voted producer, ties by id.
    pub fn top_producer(&self) -> Option<&Producer> {
        self.producers
            .range(
                std::ops::Bound::Included((ProducerKey::ByVotes(i64::MIN), 0)),
                std::ops::Bound::Included((ProducerKey::ByVotes(i64::MAX), ObjectId::MAX)),
            )
            .next_back()
    }

    // ============================================================
    // VIRTUAL OPERATIONS
    // ============================================================

    pub fn push_virtual_op(&mut self, op: VirtualOperation) {
        debug!(op = op.name(), "virtual operation");
        self.virtual_ops.push(op);
    }

    pub fn virtual_ops(&self) -> &[VirtualOperation] {
        &self.virtual_ops
    }

    pub fn drain_virtual_ops(&mut self) -> Vec<VirtualOperation> {
        std::mem::take(&mut self.virtual_ops)
    }

    // ============================================================
    // SESSIONS
    // ============================================================

    pub fn begin_session(&mut self) {
        for_each_table!(self, begin_session);
        self.virtual_op_marks.push(self.virtual_ops.len());
    }

    pub fn commit_session(&mut self) {
        for_each_table!(self, commit_session);
        self.virtual_op_marks.pop();
    }

    pub fn undo_session(&mut self) {
        for_each_table!(self, undo_session);
        let mark = self.virtual_op_marks.pop().unwrap_or(0);
        self.virtual_ops.truncate(mark);
    }
}

/// Authority expansion for signature checking reads stored active
/// authorities.
impl AuthorityLookup for State {
    fn authority_of(&self, account: &AccountName, class: AuthorityClass) -> Option<Authority> {
        let record = self
            .account_authorities
            .find_by_key(AccountAuthorityKey::ByAccount(account.clone()))?;
        Some(match class {
            AuthorityClass::Owner => record.owner_auth.clone(),
            AuthorityClass::Active => record.active_auth.clone(),
            AuthorityClass::Posting => record.posting_auth.clone(),
        })
    }
}

const NETWORK: &str = config::NETWORK_ACCOUNT;

/// Test/demo helper: register an account with single-key authorities,
/// following record, and nothing else. Production accounts go through the
/// `account_create` evaluator.
pub fn bootstrap_account(state: &mut State, name: &str) -> AccountName {
    let account_name = AccountName::new(name);
    let now = state.head_block_time();
    let existing = state.find_account(&account_name).map(|a| a.name.clone());
    if existing.is_some() {
        return account_name;
    }
    state
        .accounts
        .create(|id| Account::new(id, account_name.clone(), now));
    let auth = Authority::single_key(crate::authority::PublicKey::default());
    state.account_authorities.create(|id| AccountAuthorityRecord {
        id,
        account: account_name.clone(),
        owner_auth: auth.clone(),
        active_auth: auth.clone(),
        posting_auth: auth.clone(),
        last_owner_update: now,
    });
    state.followings.create(|id| AccountFollowing {
        id,
        account: account_name.clone(),
        following: Default::default(),
        followers: Default::default(),
        filtered: Default::default(),
        followed_tags: Default::default(),
        filtered_tags: Default::default(),
        last_updated: now,
    });
    account_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Asset;

    #[test]
    fn test_genesis_assets_exist() {
        let state = State::new(TimePoint::from_secs(0), ChainProperties::default());
        assert!(state.get_asset(&SYMBOL_COIN.into()).is_ok());
        assert!(state.get_asset(&SYMBOL_EQUITY.into()).is_ok());
        assert!(state.get_bitasset(&SYMBOL_USD.into()).is_ok());
        assert_eq!(state.head_block_num(), 0);
    }

    #[test]
    fn test_session_rolls_back_across_tables() {
        let mut state = State::new(TimePoint::from_secs(0), ChainProperties::default());
        state.begin_session();
        bootstrap_account(&mut state, "alice");
        state.push_virtual_op(VirtualOperation::ReturnDelegation {
            delegator: "alice".into(),
            amount: Asset::new(1, SYMBOL_COIN),
        });
        state.undo_session();
        assert!(state.find_account(&"alice".into()).is_none());
        assert!(state.virtual_ops().is_empty());
    }

    #[test]
    fn test_commit_keeps_changes() {
        let mut state = State::new(TimePoint::from_secs(0), ChainProperties::default());
        state.begin_session();
        bootstrap_account(&mut state, "alice");
        state.commit_session();
        assert!(state.find_account(&"alice".into()).is_some());
    }
}
