use crate::model::{ChargeState, LocalCampaign, LocalPost, ModerationState};

/// Payment and moderation predicates owned by other subsystems.
pub trait ApprovalSource: Send + Sync {
    fn charge_confirmed(&self, campaign: &LocalCampaign) -> bool;
    fn accepted(&self, post: &LocalPost) -> bool;
}

/// Reads the charge and moderation state already stored on the records.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordApprovals;

impl ApprovalSource for RecordApprovals {
    fn charge_confirmed(&self, campaign: &LocalCampaign) -> bool {
        campaign.charge == ChargeState::Charged
    }

    fn accepted(&self, post: &LocalPost) -> bool {
        post.moderation == ModerationState::Accepted
    }
}

pub struct EligibilityGate<'a> {
    source: &'a dyn ApprovalSource,
}

impl<'a> EligibilityGate<'a> {
    pub fn new(source: &'a dyn ApprovalSource) -> Self {
        Self { source }
    }

    pub fn eligible(&self, post: &LocalPost, campaign: &LocalCampaign) -> bool {
        self.source.charge_confirmed(campaign) && self.source.accepted(post)
    }
}
