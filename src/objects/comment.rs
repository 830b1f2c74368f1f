//! Comment objects
//!
//! Minimal post records: enough structure to drive curation weights,
//! community permission checks, moderation tags, and the activity-reward
//! predicates. Long-form content concerns (bodies, beneficiaries, payout
//! windows) stay out of the consensus core.

use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ObjectId,
    pub author: AccountName,
    pub permlink: String,
    pub parent_author: AccountName,
    pub parent_permlink: String,
    /// Empty when posted to the author's own feed.
    pub community: AccountName,
    pub title: String,
    pub body: String,

    pub depth: u16,
    pub net_votes: i32,
    pub view_count: u32,
    pub share_count: u32,

    /// Signed sum of vote reputation contributions.
    pub net_reputation_score: i64,
    /// Unsigned sum (controversy measure).
    pub abs_score: i64,
    /// Stake-weighted vote tally.
    pub vote_score: i64,

    pub vote_power: i64,
    pub view_power: i64,
    /// Running curation weight denominator.
    pub total_vote_weight: u128,

    pub reward_currency: AssetSymbol,
    pub created: TimePoint,
    pub last_updated: TimePoint,
    pub deleted: bool,
    /// Set once the cashout pass has paid this post.
    pub rewarded: bool,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentKey {
    ByPermlink(AccountName, String),
    ByCreated(TimePoint),
}

impl StoreObject for Comment {
    type IndexKey = CommentKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommentKey> {
        vec![
            CommentKey::ByPermlink(self.author.clone(), self.permlink.clone()),
            CommentKey::ByCreated(self.created),
        ]
    }
}

// ============================================================
// VOTES / VIEWS / SHARES
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentVote {
    pub id: ObjectId,
    pub voter: AccountName,
    pub comment: ObjectId,
    /// Signed strength in percent of the voter's power (/10_000).
    pub vote_percent: i16,
    /// Curation weight: W(R_n) - W(R_{n-1}), discounted in the auction window.
    pub weight: u128,
    pub reward_value: i64,
    pub created: TimePoint,
    pub last_updated: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentVoteKey {
    ByCommentVoter(ObjectId, AccountName),
    ByVoterRecent(AccountName, TimePoint),
}

impl StoreObject for CommentVote {
    type IndexKey = CommentVoteKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommentVoteKey> {
        vec![
            CommentVoteKey::ByCommentVoter(self.comment, self.voter.clone()),
            CommentVoteKey::ByVoterRecent(self.voter.clone(), self.created),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: ObjectId,
    pub viewer: AccountName,
    pub comment: ObjectId,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentViewKey {
    ByCommentViewer(ObjectId, AccountName),
    ByViewerRecent(AccountName, TimePoint),
}

impl StoreObject for CommentView {
    type IndexKey = CommentViewKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommentViewKey> {
        vec![
            CommentViewKey::ByCommentViewer(self.comment, self.viewer.clone()),
            CommentViewKey::ByViewerRecent(self.viewer.clone(), self.created),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentShare {
    pub id: ObjectId,
    pub sharer: AccountName,
    pub comment: ObjectId,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommentShareKey {
    ByCommentSharer(ObjectId, AccountName),
    BySharerRecent(AccountName, TimePoint),
}

impl StoreObject for CommentShare {
    type IndexKey = CommentShareKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<CommentShareKey> {
        vec![
            CommentShareKey::ByCommentSharer(self.comment, self.sharer.clone()),
            CommentShareKey::BySharerRecent(self.sharer.clone(), self.created),
        ]
    }
}

// ============================================================
// MODERATION TAGS
// ============================================================

/// A moderator-applied classification on a post within a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationTag {
    pub id: ObjectId,
    pub moderator: AccountName,
    pub comment: ObjectId,
    pub community: AccountName,
    pub tags: Vec<String>,
    /// Moderators may request content be filtered from community views.
    pub filter: bool,
    pub details: String,
    pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModerationTagKey {
    ByCommentModerator(ObjectId, AccountName),
    ByCommunity(AccountName),
}

impl StoreObject for ModerationTag {
    type IndexKey = ModerationTagKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<ModerationTagKey> {
        vec![
            ModerationTagKey::ByCommentModerator(self.comment, self.moderator.clone()),
            ModerationTagKey::ByCommunity(self.community.clone()),
        ]
    }
}
