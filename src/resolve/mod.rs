//! Create-or-update resolvers, one per remote entity kind.
//!
//! Every resolver recomputes the full desired attribute set from local data,
//! looks the entity up (stored id first, snapshot natural key second) and then
//! issues exactly one update or one create. Running one twice with unchanged
//! input leaves the remote state as it was.

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::cache::{RemoteCache, RemoteSnapshot};
use crate::config::PlatformSettings;
use crate::error::{SyncError, SyncResult};
use crate::mapper::EntityMapper;
use crate::model::{Named, RemoteCampaign, RemoteCreative, RemoteFlight};
use crate::remote::AdServer;

pub mod campaign;
pub mod creative;
pub mod flight;
pub mod map;

/// Collaborators every resolver needs.
#[derive(Clone, Copy)]
pub struct ResolveCtx<'a> {
    pub remote: &'a dyn AdServer,
    pub mapper: EntityMapper<'a>,
    pub cache: &'a RemoteCache,
    pub settings: &'a PlatformSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Created,
    Updated,
}

#[derive(Clone, Debug)]
pub struct Upserted<T> {
    pub entity: T,
    pub action: Action,
}

/// Named entities that can be fetched by id and found in the snapshot by key.
#[async_trait]
trait Resolvable: Named + Clone + Send + Sync + Sized + 'static {
    async fn fetch(remote: &dyn AdServer, id: i64) -> SyncResult<Option<Self>>;
    fn cached<'s>(snapshot: &'s RemoteSnapshot, key: &str) -> Option<&'s Self>;
}

#[async_trait]
impl Resolvable for RemoteCampaign {
    async fn fetch(remote: &dyn AdServer, id: i64) -> SyncResult<Option<Self>> {
        remote.get_campaign(id).await
    }
    fn cached<'s>(snapshot: &'s RemoteSnapshot, key: &str) -> Option<&'s Self> {
        snapshot.campaign_by_name(key)
    }
}

#[async_trait]
impl Resolvable for RemoteCreative {
    async fn fetch(remote: &dyn AdServer, id: i64) -> SyncResult<Option<Self>> {
        remote.get_creative(id).await
    }
    fn cached<'s>(snapshot: &'s RemoteSnapshot, key: &str) -> Option<&'s Self> {
        snapshot.creative_by_title(key)
    }
}

#[async_trait]
impl Resolvable for RemoteFlight {
    async fn fetch(remote: &dyn AdServer, id: i64) -> SyncResult<Option<Self>> {
        remote.get_flight(id).await
    }
    fn cached<'s>(snapshot: &'s RemoteSnapshot, key: &str) -> Option<&'s Self> {
        snapshot.flight_by_name(key)
    }
}

/// Resolve the existing entity for `key`.
///
/// A stored id that the server no longer knows, or no stored id at all, falls
/// through to the snapshot, which is loaded here on first use. A stored id
/// whose entity carries another key is corruption and fails.
async fn lookup<E: Resolvable>(ctx: &ResolveCtx<'_>, stored: Option<i64>, key: &str) -> SyncResult<Option<E>> {
    if let Some(id) = stored {
        match E::fetch(ctx.remote, id).await? {
            Some(found) if found.natural_key() == key => return Ok(Some(found)),
            Some(found) => {
                return Err(SyncError::NaturalKeyMismatch {
                    kind: E::KIND,
                    id,
                    expected: key.to_string(),
                    found: found.natural_key().to_string(),
                })
            }
            None => {
                let kind = E::KIND;
                warn!(%kind, id, key, "stored id not found on ad server");
            }
        }
    }
    let snapshot = ctx.cache.load(ctx.remote).await?;
    Ok(E::cached(&snapshot, key).cloned())
}
