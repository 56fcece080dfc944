use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SyncResult;
use crate::model::{LocalCampaign, LocalPost, RemoteKind};

mod pg;
#[cfg(test)]
pub mod memory;

pub use pg::PgStore;

/// Local record a remote id is stored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    Post(&'a str),
    Campaign(&'a str),
}

impl LinkTarget<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            LinkTarget::Post(_) => "post",
            LinkTarget::Campaign(_) => "campaign",
        }
    }
}

/// Source of truth for posts and campaigns.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn post(&self, post_id: &str) -> SyncResult<LocalPost>;
    async fn campaign(&self, campaign_id: &str) -> SyncResult<LocalCampaign>;
    async fn campaigns_for_post(&self, post_id: &str) -> SyncResult<Vec<LocalCampaign>>;
    /// Every (post, campaign) whose run window covers `day`, ordered by campaign id.
    async fn scheduled_pairs(&self, day: NaiveDate) -> SyncResult<Vec<(LocalPost, LocalCampaign)>>;
    /// Persist one remote id in a single write.
    async fn set_remote_id(&self, target: LinkTarget<'_>, kind: RemoteKind, id: i64) -> SyncResult<()>;
}
