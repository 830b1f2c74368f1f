//! Community enterprise objects
//!
//! Milestone-bounded funding commitments. Payout runs daily while the
//! approval cursor keeps pace with claims:
//! `approved_milestones >= claimed_milestones - 1` and
//! `days_paid < duration`.

use crate::amount::Asset;
use crate::core_types::*;
use crate::store::StoreObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub label: String,
    /// Share of the total budget (/10_000); all milestones sum to 100%.
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityEnterprise {
    pub id: ObjectId,
    pub creator: AccountName,
    /// Creator-scoped identifier string.
    pub enterprise_id: String,
    pub milestones: Vec<Milestone>,
    /// Highest approved milestone index; -1 until the initial approval.
    pub approved_milestones: i16,
    /// Number of milestones the creator has claimed (0..=N).
    pub claimed_milestones: i16,
    pub begin: TimePoint,
    pub duration_days: u16,
    pub daily_budget: Asset,
    pub days_paid: u16,
    pub total_distributed: i64,
    /// Voting support for the next pending approval step.
    pub approval_power: i64,
    pub approval_count: u32,
    pub details: String,
    pub url: String,
    pub json: String,
    pub active: bool,
    pub created: TimePoint,
}

impl CommunityEnterprise {
    /// Whether the daily payment runs at `now`.
    pub fn payment_due(&self, now: TimePoint) -> bool {
        self.active
            && now >= self.begin
            && self.days_paid < self.duration_days
            && self.approved_milestones >= self.claimed_milestones - 1
    }

    pub fn milestone_count(&self) -> i16 {
        self.milestones.len() as i16
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnterpriseKey {
    ByCreatorId(AccountName, String),
    ByBegin(TimePoint),
}

impl StoreObject for CommunityEnterprise {
    type IndexKey = EnterpriseKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<EnterpriseKey> {
        vec![
            EnterpriseKey::ByCreatorId(self.creator.clone(), self.enterprise_id.clone()),
            EnterpriseKey::ByBegin(self.begin),
        ]
    }
}

/// An account's approval of a specific milestone of an enterprise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseApproval {
    pub id: ObjectId,
    pub account: AccountName,
    pub creator: AccountName,
    pub enterprise_id: String,
    pub milestone: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EnterpriseApprovalKey {
    ByAccountEnterprise(AccountName, AccountName, String),
    ByEnterprise(AccountName, String),
}

impl StoreObject for EnterpriseApproval {
    type IndexKey = EnterpriseApprovalKey;

    fn id(&self) -> ObjectId {
        self.id
    }

    fn index_keys(&self) -> Vec<EnterpriseApprovalKey> {
        vec![
            EnterpriseApprovalKey::ByAccountEnterprise(
                self.account.clone(),
                self.creator.clone(),
                self.enterprise_id.clone(),
            ),
            EnterpriseApprovalKey::ByEnterprise(self.creator.clone(), self.enterprise_id.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enterprise() -> CommunityEnterprise {
        CommunityEnterprise {
            id: 1,
            creator: "alice".into(),
            enterprise_id: "bridge".into(),
            milestones: vec![
                Milestone {
                    label: "half".into(),
                    percent: 5_000,
                },
                Milestone {
                    label: "rest".into(),
                    percent: 5_000,
                },
            ],
            approved_milestones: -1,
            claimed_milestones: 1,
            begin: TimePoint::from_secs(0),
            duration_days: 14,
            daily_budget: Asset::new(100, "COIN"),
            days_paid: 0,
            total_distributed: 0,
            approval_power: 0,
            approval_count: 0,
            details: String::new(),
            url: String::new(),
            json: String::new(),
            active: true,
            created: TimePoint::from_secs(0),
        }
    }

    #[test]
    fn test_payment_gating() {
        let mut e = enterprise();
        let now = TimePoint::from_secs(100);
        // nothing approved yet: no payment
        assert!(!e.payment_due(now));

        // the initial milestone approved: payment runs
        e.approved_milestones = 0;
        assert!(e.payment_due(now));

        // creator claims the next milestone before its approval: stops
        e.claimed_milestones = 2;
        assert!(!e.payment_due(now));

        // approval catches up: resumes
        e.approved_milestones = 1;
        assert!(e.payment_due(now));

        e.days_paid = 14;
        assert!(!e.payment_due(now));
    }
}
