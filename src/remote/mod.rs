use async_trait::async_trait;

use crate::error::SyncResult;
use crate::model::{RemoteCampaign, RemoteCreative, RemoteFlight, RemoteMap};

mod http;
#[cfg(test)]
pub mod memory;

pub use http::HttpAdServer;

/// Ad server capability: list/get/create/update per entity kind.
///
/// `get_*` returns `Ok(None)` when the id does not exist. Maps are addressed
/// through their parent flight.
#[async_trait]
pub trait AdServer: Send + Sync {
    async fn list_advertisers(&self) -> SyncResult<Vec<i64>>;

    async fn list_campaigns(&self) -> SyncResult<Vec<RemoteCampaign>>;
    async fn get_campaign(&self, id: i64) -> SyncResult<Option<RemoteCampaign>>;
    async fn create_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<RemoteCampaign>;
    async fn update_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<()>;

    async fn list_creatives(&self, advertiser_id: i64) -> SyncResult<Vec<RemoteCreative>>;
    async fn get_creative(&self, id: i64) -> SyncResult<Option<RemoteCreative>>;
    async fn create_creative(&self, creative: &RemoteCreative) -> SyncResult<RemoteCreative>;
    async fn update_creative(&self, creative: &RemoteCreative) -> SyncResult<()>;

    async fn list_flights(&self) -> SyncResult<Vec<RemoteFlight>>;
    async fn get_flight(&self, id: i64) -> SyncResult<Option<RemoteFlight>>;
    async fn create_flight(&self, flight: &RemoteFlight) -> SyncResult<RemoteFlight>;
    async fn update_flight(&self, flight: &RemoteFlight) -> SyncResult<()>;

    async fn list_maps(&self, flight_id: i64) -> SyncResult<Vec<RemoteMap>>;
    async fn get_map(&self, flight_id: i64, id: i64) -> SyncResult<Option<RemoteMap>>;
    async fn create_map(&self, flight_id: i64, map: &RemoteMap) -> SyncResult<RemoteMap>;
    async fn update_map(&self, map: &RemoteMap) -> SyncResult<()>;
}
