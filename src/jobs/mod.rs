//! One module per CLI job. Jobs plan by default and only write with `--apply`.

pub mod deactivate;
pub mod mirror;
pub mod status;
pub mod sync;
pub mod update;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;

use crate::config::{PlatformSettings, RetryPolicy};
use crate::eligibility::{EligibilityGate, RecordApprovals};
use crate::mapper::{campaign_name, creative_title, flight_name};
use crate::model::{LocalCampaign, LocalPost};
use crate::reconcile::Reconciler;
use crate::remote::{AdServer, HttpAdServer};
use crate::store::PgStore;

/// Collaborators shared by every job.
pub struct JobEnv {
    pub store: PgStore,
    pub settings: PlatformSettings,
    pub retry: RetryPolicy,
    pub approvals: RecordApprovals,
}

impl JobEnv {
    pub fn from_env(pool: &PgPool) -> Self {
        Self {
            store: PgStore::new(pool.clone()),
            settings: PlatformSettings::from_env(),
            retry: RetryPolicy::from_env(),
            approvals: RecordApprovals,
        }
    }

    pub fn remote(&self) -> Result<HttpAdServer> {
        HttpAdServer::new(&self.settings).context("build ad server client")
    }

    pub fn gate(&self) -> EligibilityGate<'_> {
        EligibilityGate::new(&self.approvals)
    }

    pub fn reconciler<'a>(&'a self, remote: &'a dyn AdServer) -> Reconciler<'a> {
        Reconciler::new(remote, &self.store, &self.settings)
            .with_retry(self.retry.clone())
            .with_approvals(&self.approvals)
    }
}

#[derive(Debug, Serialize)]
pub struct StoredIds {
    pub campaign: Option<i64>,
    pub creative: Option<i64>,
    pub flight: Option<i64>,
    pub map: Option<i64>,
}

/// What a job would do for one pair, without touching the ad server.
#[derive(Debug, Serialize)]
pub struct PairPlan {
    pub post_id: String,
    pub campaign_id: String,
    pub eligible: bool,
    pub campaign_name: String,
    pub creative_title: String,
    pub flight_name: String,
    pub stored: StoredIds,
}

impl PairPlan {
    pub fn new(gate: &EligibilityGate<'_>, post: &LocalPost, campaign: &LocalCampaign) -> Self {
        Self {
            post_id: post.post_id.clone(),
            campaign_id: campaign.campaign_id.clone(),
            eligible: gate.eligible(post, campaign),
            campaign_name: campaign_name(post),
            creative_title: creative_title(post, campaign),
            flight_name: flight_name(campaign),
            stored: StoredIds {
                campaign: post.adzerk_campaign_id,
                creative: campaign.adzerk_creative_id,
                flight: campaign.adzerk_flight_id,
                map: campaign.adzerk_map_id,
            },
        }
    }

    /// Every stored pointer present, so a sync is updates only.
    pub fn fully_linked(&self) -> bool {
        let s = &self.stored;
        s.campaign.is_some() && s.creative.is_some() && s.flight.is_some() && s.map.is_some()
    }
}
