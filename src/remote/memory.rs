use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};
use crate::model::{RemoteCampaign, RemoteCreative, RemoteFlight, RemoteMap};

use super::AdServer;

#[derive(Default)]
struct State {
    next_id: i64,
    advertisers: BTreeSet<i64>,
    campaigns: BTreeMap<i64, RemoteCampaign>,
    creatives: BTreeMap<i64, RemoteCreative>,
    flights: BTreeMap<i64, RemoteFlight>,
    maps: BTreeMap<i64, RemoteMap>,
}

impl State {
    fn alloc(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory ad server for tests. Records every call by operation name and
/// can be told to fail the next call of a given operation, either before it
/// applies or after (a lost response).
#[derive(Default)]
pub struct MemoryAdServer {
    state: Mutex<State>,
    calls: Mutex<Vec<&'static str>>,
    failures: Mutex<VecDeque<(&'static str, SyncError)>>,
    lost: Mutex<VecDeque<(&'static str, SyncError)>>,
}

impl MemoryAdServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, op: &'static str, err: SyncError) {
        self.failures.lock().unwrap().push_back((op, err));
    }

    /// Apply the next `op` but answer with `err`. Only creates honour this.
    pub fn lose_next_response(&self, op: &'static str, err: SyncError) {
        self.lost.lock().unwrap().push_back((op, err));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn seed_campaign(&self, mut c: RemoteCampaign) -> i64 {
        let mut st = self.state.lock().unwrap();
        let id = c.id.unwrap_or_else(|| st.alloc());
        st.next_id = st.next_id.max(id);
        c.id = Some(id);
        st.advertisers.insert(c.advertiser_id);
        st.campaigns.insert(id, c);
        id
    }

    pub fn seed_creative(&self, mut c: RemoteCreative) -> i64 {
        let mut st = self.state.lock().unwrap();
        let id = c.id.unwrap_or_else(|| st.alloc());
        st.next_id = st.next_id.max(id);
        c.id = Some(id);
        st.advertisers.insert(c.advertiser_id);
        st.creatives.insert(id, c);
        id
    }

    pub fn seed_flight(&self, mut f: RemoteFlight) -> i64 {
        let mut st = self.state.lock().unwrap();
        let id = f.id.unwrap_or_else(|| st.alloc());
        st.next_id = st.next_id.max(id);
        f.id = Some(id);
        st.flights.insert(id, f);
        id
    }

    pub fn seed_map(&self, mut m: RemoteMap) -> i64 {
        let mut st = self.state.lock().unwrap();
        let id = m.id.unwrap_or_else(|| st.alloc());
        st.next_id = st.next_id.max(id);
        m.id = Some(id);
        st.maps.insert(id, m);
        id
    }

    pub fn campaigns(&self) -> Vec<RemoteCampaign> {
        self.state.lock().unwrap().campaigns.values().cloned().collect()
    }

    pub fn creatives(&self) -> Vec<RemoteCreative> {
        self.state.lock().unwrap().creatives.values().cloned().collect()
    }

    pub fn flights(&self) -> Vec<RemoteFlight> {
        self.state.lock().unwrap().flights.values().cloned().collect()
    }

    pub fn maps(&self) -> Vec<RemoteMap> {
        self.state.lock().unwrap().maps.values().cloned().collect()
    }

    pub fn map(&self, id: i64) -> Option<RemoteMap> {
        self.state.lock().unwrap().maps.get(&id).cloned()
    }

    fn record(&self, op: &'static str) -> SyncResult<()> {
        self.calls.lock().unwrap().push(op);
        match take_failure(&self.failures, op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn respond<T>(&self, op: &'static str, value: T) -> SyncResult<T> {
        match take_failure(&self.lost, op) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

fn take_failure(queue: &Mutex<VecDeque<(&'static str, SyncError)>>, op: &str) -> Option<SyncError> {
    let mut queue = queue.lock().unwrap();
    let pos = queue.iter().position(|(o, _)| *o == op)?;
    queue.remove(pos).map(|(_, err)| err)
}

fn unknown(kind: &str, id: Option<i64>) -> SyncError {
    SyncError::RemoteRejected { status: 404, message: format!("no {kind} with id {id:?}") }
}

#[async_trait]
impl AdServer for MemoryAdServer {
    async fn list_advertisers(&self) -> SyncResult<Vec<i64>> {
        self.record("list_advertisers")?;
        Ok(self.state.lock().unwrap().advertisers.iter().copied().collect())
    }

    async fn list_campaigns(&self) -> SyncResult<Vec<RemoteCampaign>> {
        self.record("list_campaigns")?;
        Ok(self.campaigns())
    }

    async fn get_campaign(&self, id: i64) -> SyncResult<Option<RemoteCampaign>> {
        self.record("get_campaign")?;
        Ok(self.state.lock().unwrap().campaigns.get(&id).cloned())
    }

    async fn create_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<RemoteCampaign> {
        self.record("create_campaign")?;
        let mut st = self.state.lock().unwrap();
        let mut c = campaign.clone();
        c.id = Some(st.alloc());
        st.advertisers.insert(c.advertiser_id);
        st.campaigns.insert(c.id.unwrap_or_default(), c.clone());
        self.respond("create_campaign", c)
    }

    async fn update_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<()> {
        self.record("update_campaign")?;
        let mut st = self.state.lock().unwrap();
        let slot = campaign
            .id
            .and_then(|id| st.campaigns.get_mut(&id))
            .ok_or_else(|| unknown("campaign", campaign.id))?;
        *slot = campaign.clone();
        Ok(())
    }

    async fn list_creatives(&self, advertiser_id: i64) -> SyncResult<Vec<RemoteCreative>> {
        self.record("list_creatives")?;
        Ok(self
            .creatives()
            .into_iter()
            .filter(|c| c.advertiser_id == advertiser_id)
            .collect())
    }

    async fn get_creative(&self, id: i64) -> SyncResult<Option<RemoteCreative>> {
        self.record("get_creative")?;
        Ok(self.state.lock().unwrap().creatives.get(&id).cloned())
    }

    async fn create_creative(&self, creative: &RemoteCreative) -> SyncResult<RemoteCreative> {
        self.record("create_creative")?;
        let mut st = self.state.lock().unwrap();
        let mut c = creative.clone();
        c.id = Some(st.alloc());
        st.advertisers.insert(c.advertiser_id);
        st.creatives.insert(c.id.unwrap_or_default(), c.clone());
        self.respond("create_creative", c)
    }

    async fn update_creative(&self, creative: &RemoteCreative) -> SyncResult<()> {
        self.record("update_creative")?;
        let mut st = self.state.lock().unwrap();
        let slot = creative
            .id
            .and_then(|id| st.creatives.get_mut(&id))
            .ok_or_else(|| unknown("creative", creative.id))?;
        *slot = creative.clone();
        Ok(())
    }

    async fn list_flights(&self) -> SyncResult<Vec<RemoteFlight>> {
        self.record("list_flights")?;
        Ok(self.flights())
    }

    async fn get_flight(&self, id: i64) -> SyncResult<Option<RemoteFlight>> {
        self.record("get_flight")?;
        Ok(self.state.lock().unwrap().flights.get(&id).cloned())
    }

    async fn create_flight(&self, flight: &RemoteFlight) -> SyncResult<RemoteFlight> {
        self.record("create_flight")?;
        let mut st = self.state.lock().unwrap();
        let mut f = flight.clone();
        f.id = Some(st.alloc());
        st.flights.insert(f.id.unwrap_or_default(), f.clone());
        self.respond("create_flight", f)
    }

    async fn update_flight(&self, flight: &RemoteFlight) -> SyncResult<()> {
        self.record("update_flight")?;
        let mut st = self.state.lock().unwrap();
        let slot = flight
            .id
            .and_then(|id| st.flights.get_mut(&id))
            .ok_or_else(|| unknown("flight", flight.id))?;
        *slot = flight.clone();
        Ok(())
    }

    async fn list_maps(&self, flight_id: i64) -> SyncResult<Vec<RemoteMap>> {
        self.record("list_maps")?;
        Ok(self.maps().into_iter().filter(|m| m.flight_id == flight_id).collect())
    }

    async fn get_map(&self, flight_id: i64, id: i64) -> SyncResult<Option<RemoteMap>> {
        self.record("get_map")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .maps
            .get(&id)
            .filter(|m| m.flight_id == flight_id)
            .cloned())
    }

    async fn create_map(&self, flight_id: i64, map: &RemoteMap) -> SyncResult<RemoteMap> {
        self.record("create_map")?;
        let mut st = self.state.lock().unwrap();
        // the real platform refuses a second map for the same pair
        if st.maps.values().any(|m| m.flight_id == flight_id && m.creative.id == map.creative.id) {
            return Err(SyncError::RemoteRejected {
                status: 400,
                message: format!("creative {} already mapped to flight {flight_id}", map.creative.id),
            });
        }
        let mut m = map.clone();
        m.id = Some(st.alloc());
        m.flight_id = flight_id;
        st.maps.insert(m.id.unwrap_or_default(), m.clone());
        self.respond("create_map", m)
    }

    async fn update_map(&self, map: &RemoteMap) -> SyncResult<()> {
        self.record("update_map")?;
        let mut st = self.state.lock().unwrap();
        let slot = map
            .id
            .and_then(|id| st.maps.get_mut(&id))
            .ok_or_else(|| unknown("map", map.id))?;
        *slot = map.clone();
        Ok(())
    }
}
