use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{SyncError, SyncResult};
use crate::model::{LocalCampaign, LocalPost, RemoteKind};

use super::{LinkTarget, LocalStore};

/// In-memory record store for tests.
#[derive(Default)]
pub struct MemoryStore {
    posts: Mutex<BTreeMap<String, LocalPost>>,
    campaigns: Mutex<BTreeMap<String, LocalCampaign>>,
    writes: Mutex<Vec<(String, RemoteKind, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: LocalPost, campaigns: Vec<LocalCampaign>) {
        self.posts.lock().unwrap().insert(post.post_id.clone(), post);
        let mut all = self.campaigns.lock().unwrap();
        for c in campaigns {
            all.insert(c.campaign_id.clone(), c);
        }
    }

    pub fn writes(&self) -> Vec<(String, RemoteKind, i64)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn post(&self, post_id: &str) -> SyncResult<LocalPost> {
        self.posts
            .lock()
            .unwrap()
            .get(post_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownRecord { what: "post", id: post_id.to_string() })
    }

    async fn campaign(&self, campaign_id: &str) -> SyncResult<LocalCampaign> {
        self.campaigns
            .lock()
            .unwrap()
            .get(campaign_id)
            .cloned()
            .ok_or_else(|| SyncError::UnknownRecord { what: "campaign", id: campaign_id.to_string() })
    }

    async fn campaigns_for_post(&self, post_id: &str) -> SyncResult<Vec<LocalCampaign>> {
        Ok(self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn scheduled_pairs(&self, day: NaiveDate) -> SyncResult<Vec<(LocalPost, LocalCampaign)>> {
        let campaigns: Vec<LocalCampaign> = self
            .campaigns
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.runs_on(day))
            .cloned()
            .collect();
        let mut out = Vec::with_capacity(campaigns.len());
        for c in campaigns {
            let post = self.post(&c.post_id).await?;
            out.push((post, c));
        }
        Ok(out)
    }

    async fn set_remote_id(&self, target: LinkTarget<'_>, kind: RemoteKind, id: i64) -> SyncResult<()> {
        match (target, kind) {
            (LinkTarget::Post(key), RemoteKind::Campaign) => {
                let mut posts = self.posts.lock().unwrap();
                let post = posts
                    .get_mut(key)
                    .ok_or_else(|| SyncError::UnknownRecord { what: "post", id: key.to_string() })?;
                post.adzerk_campaign_id = Some(id);
            }
            (LinkTarget::Campaign(key), RemoteKind::Creative | RemoteKind::Flight | RemoteKind::Map) => {
                let mut campaigns = self.campaigns.lock().unwrap();
                let c = campaigns
                    .get_mut(key)
                    .ok_or_else(|| SyncError::UnknownRecord { what: "campaign", id: key.to_string() })?;
                match kind {
                    RemoteKind::Creative => c.adzerk_creative_id = Some(id),
                    RemoteKind::Flight => c.adzerk_flight_id = Some(id),
                    _ => c.adzerk_map_id = Some(id),
                }
            }
            (target, kind) => return Err(SyncError::InvalidLink { kind, target: target.name() }),
        }
        let key = match target {
            LinkTarget::Post(k) | LinkTarget::Campaign(k) => k.to_string(),
        };
        self.writes.lock().unwrap().push((key, kind, id));
        Ok(())
    }
}
