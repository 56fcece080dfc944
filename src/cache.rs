//! Bulk snapshot of ad server state with lookup indexes.
//!
//! The snapshot is loaded lazily on the first natural-key lookup and never
//! partially: any failed list call fails the whole load. Once loaded it is
//! read-only; stored id pointers on local records stay the primary lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::model::{Named, RemoteCampaign, RemoteCreative, RemoteFlight, RemoteKind, RemoteMap};
use crate::remote::AdServer;

#[derive(Debug, Default)]
pub struct RemoteSnapshot {
    campaigns: Vec<RemoteCampaign>,
    creatives: Vec<RemoteCreative>,
    flights: Vec<RemoteFlight>,
    maps: Vec<RemoteMap>,

    campaigns_by_name: HashMap<String, usize>,
    creatives_by_title: HashMap<String, usize>,
    flights_by_name: HashMap<String, usize>,

    campaigns_by_id: HashMap<i64, usize>,
    creatives_by_id: HashMap<i64, usize>,
    flights_by_id: HashMap<i64, usize>,

    flights_by_campaign: HashMap<i64, Vec<usize>>,
    maps_by_flight: HashMap<i64, Vec<usize>>,
    map_lookup: HashMap<(i64, i64), usize>,
}

impl RemoteSnapshot {
    /// List every entity from the ad server and index it.
    pub async fn load(remote: &dyn AdServer) -> SyncResult<Self> {
        let campaigns = remote.list_campaigns().await?;

        let mut creatives = Vec::new();
        for advertiser_id in remote.list_advertisers().await? {
            let page = remote.list_creatives(advertiser_id).await?;
            debug!(advertiser_id, creatives = page.len(), "listed creatives");
            creatives.extend(page);
        }

        let flights = remote.list_flights().await?;

        let mut maps = Vec::new();
        for flight in &flights {
            let Some(flight_id) = flight.id else { continue };
            maps.extend(remote.list_maps(flight_id).await?);
        }

        let snapshot = Self::from_parts(campaigns, creatives, flights, maps)?;
        info!(
            campaigns = snapshot.campaigns.len(),
            creatives = snapshot.creatives.len(),
            flights = snapshot.flights.len(),
            maps = snapshot.maps.len(),
            "remote snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn from_parts(
        campaigns: Vec<RemoteCampaign>,
        creatives: Vec<RemoteCreative>,
        flights: Vec<RemoteFlight>,
        maps: Vec<RemoteMap>,
    ) -> SyncResult<Self> {
        let campaigns_by_name = index_by_key(&campaigns, |c| c.is_deleted)?;
        let creatives_by_title = index_by_key(&creatives, |c| c.is_deleted)?;
        let flights_by_name = index_by_key(&flights, |f| f.is_deleted)?;

        let campaigns_by_id = index_by_id(campaigns.iter().map(|c| c.id));
        let creatives_by_id = index_by_id(creatives.iter().map(|c| c.id));
        let flights_by_id = index_by_id(flights.iter().map(|f| f.id));
        let flights_by_campaign = group_by(flights.iter().map(|f| f.campaign_id));
        let maps_by_flight = group_by(maps.iter().map(|m| m.flight_id));

        let mut map_lookup: HashMap<(i64, i64), usize> = HashMap::new();
        for (i, m) in maps.iter().enumerate() {
            let pair = (m.flight_id, m.creative.id);
            if map_lookup.insert(pair, i).is_some() {
                let count = maps
                    .iter()
                    .filter(|o| (o.flight_id, o.creative.id) == pair)
                    .count();
                return Err(SyncError::AmbiguousNaturalKey {
                    kind: RemoteKind::Map,
                    key: format!("flight {} / creative {}", pair.0, pair.1),
                    count,
                });
            }
        }

        Ok(Self {
            campaigns,
            creatives,
            flights,
            maps,
            campaigns_by_name,
            creatives_by_title,
            flights_by_name,
            campaigns_by_id,
            creatives_by_id,
            flights_by_id,
            flights_by_campaign,
            maps_by_flight,
            map_lookup,
        })
    }

    pub fn campaigns(&self) -> &[RemoteCampaign] { &self.campaigns }
    pub fn creatives(&self) -> &[RemoteCreative] { &self.creatives }
    pub fn flights(&self) -> &[RemoteFlight] { &self.flights }
    pub fn maps(&self) -> &[RemoteMap] { &self.maps }

    pub fn campaign_by_name(&self, name: &str) -> Option<&RemoteCampaign> {
        self.campaigns_by_name.get(name).map(|&i| &self.campaigns[i])
    }

    pub fn creative_by_title(&self, title: &str) -> Option<&RemoteCreative> {
        self.creatives_by_title.get(title).map(|&i| &self.creatives[i])
    }

    pub fn flight_by_name(&self, name: &str) -> Option<&RemoteFlight> {
        self.flights_by_name.get(name).map(|&i| &self.flights[i])
    }

    pub fn campaign(&self, id: i64) -> Option<&RemoteCampaign> {
        self.campaigns_by_id.get(&id).map(|&i| &self.campaigns[i])
    }

    pub fn creative(&self, id: i64) -> Option<&RemoteCreative> {
        self.creatives_by_id.get(&id).map(|&i| &self.creatives[i])
    }

    pub fn flight(&self, id: i64) -> Option<&RemoteFlight> {
        self.flights_by_id.get(&id).map(|&i| &self.flights[i])
    }

    pub fn flights_for_campaign(&self, campaign_id: i64) -> impl Iterator<Item = &RemoteFlight> {
        children(&self.flights_by_campaign, campaign_id).map(|&i| &self.flights[i])
    }

    pub fn maps_for_flight(&self, flight_id: i64) -> impl Iterator<Item = &RemoteMap> {
        children(&self.maps_by_flight, flight_id).map(|&i| &self.maps[i])
    }

    /// The map joining `flight_id` and `creative_id`, active or not.
    pub fn find_map(&self, flight_id: i64, creative_id: i64) -> Option<&RemoteMap> {
        self.map_lookup.get(&(flight_id, creative_id)).map(|&i| &self.maps[i])
    }
}

fn index_by_key<E: Named>(items: &[E], deleted: impl Fn(&E) -> bool) -> SyncResult<HashMap<String, usize>> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut dupes: HashMap<&str, usize> = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        if deleted(item) {
            continue;
        }
        let key = item.natural_key();
        if index.insert(key.to_string(), i).is_some() {
            *dupes.entry(key).or_insert(1) += 1;
        }
    }
    if let Some((key, count)) = dupes.into_iter().next() {
        return Err(SyncError::AmbiguousNaturalKey { kind: E::KIND, key: key.to_string(), count });
    }
    Ok(index)
}

fn index_by_id(ids: impl Iterator<Item = Option<i64>>) -> HashMap<i64, usize> {
    ids.enumerate()
        .filter_map(|(i, id)| id.map(|id| (id, i)))
        .collect()
}

fn group_by(parents: impl Iterator<Item = i64>) -> HashMap<i64, Vec<usize>> {
    let mut groups: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, parent) in parents.enumerate() {
        groups.entry(parent).or_default().push(i);
    }
    groups
}

fn children(index: &HashMap<i64, Vec<usize>>, parent: i64) -> std::slice::Iter<'_, usize> {
    index.get(&parent).map(|v| v.as_slice()).unwrap_or_default().iter()
}

/// Lazily loaded [`RemoteSnapshot`], shared by every resolver of a run.
///
/// Loading is all or nothing. [`RemoteCache::invalidate`] drops the snapshot
/// after a failed attempt, since that attempt may have written remote state
/// the snapshot does not show; the next lookup loads a fresh one.
#[derive(Default)]
pub struct RemoteCache {
    slot: RwLock<Option<Arc<RemoteSnapshot>>>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: RemoteSnapshot) -> Self {
        Self { slot: RwLock::new(Some(Arc::new(snapshot))) }
    }

    /// The snapshot if something already loaded it.
    pub fn snapshot(&self) -> Option<Arc<RemoteSnapshot>> {
        self.slot.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub async fn load(&self, remote: &dyn AdServer) -> SyncResult<Arc<RemoteSnapshot>> {
        if let Some(snapshot) = self.snapshot() {
            return Ok(snapshot);
        }
        let snapshot = Arc::new(RemoteSnapshot::load(remote).await?);
        *self.slot.write().unwrap_or_else(|p| p.into_inner()) = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub fn invalidate(&self) {
        if self.slot.write().unwrap_or_else(|p| p.into_inner()).take().is_some() {
            debug!("remote snapshot dropped");
        }
    }
}
