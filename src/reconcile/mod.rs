//! Dependency-ordered sync for (post, campaign) pairs, the scheduled update
//! pass and the mirror pass that switches off everything outside the active set.
//!
//! Resolvers run Campaign, Creative, Flight, Map. A failed step leaves the
//! earlier steps applied; every step is an idempotent upsert, so a retry
//! simply starts over from the top.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use crate::cache::{RemoteCache, RemoteSnapshot};
use crate::config::{PlatformSettings, RetryPolicy};
use crate::eligibility::{ApprovalSource, EligibilityGate, RecordApprovals};
use crate::error::{SyncError, SyncResult};
use crate::mapper::{post_id_from_title, EntityMapper};
use crate::model::{LocalCampaign, LocalPost, RemoteCampaign, RemoteEntity, RemoteFlight, RemoteKind, RemoteMap};
use crate::remote::AdServer;
use crate::resolve::{self, ResolveCtx, Upserted};
use crate::store::LocalStore;
use crate::telemetry;
use crate::telemetry::ops::deactivate::Phase as DeactivatePhase;
use crate::telemetry::ops::mirror::Phase as MirrorPhase;
use crate::telemetry::ops::sync::Phase as SyncPhase;

mod report;

pub use report::{BatchReport, Deactivated, Failure, Step, SyncOutcome};
use report::pair_label;

pub type Pair = (LocalPost, LocalCampaign);

pub struct Reconciler<'a> {
    remote: &'a dyn AdServer,
    store: &'a dyn LocalStore,
    settings: &'a PlatformSettings,
    approvals: &'a dyn ApprovalSource,
    retry: RetryPolicy,
    cache: RemoteCache,
}

impl<'a> Reconciler<'a> {
    pub fn new(remote: &'a dyn AdServer, store: &'a dyn LocalStore, settings: &'a PlatformSettings) -> Self {
        Self {
            remote,
            store,
            settings,
            approvals: &RecordApprovals,
            retry: RetryPolicy::default(),
            cache: RemoteCache::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_approvals(mut self, approvals: &'a dyn ApprovalSource) -> Self {
        self.approvals = approvals;
        self
    }

    fn gate(&self) -> EligibilityGate<'_> {
        EligibilityGate::new(self.approvals)
    }

    /// Load the remote snapshot now instead of on first use.
    pub async fn snapshot(&self) -> SyncResult<Arc<RemoteSnapshot>> {
        self.cache.load(self.remote).await
    }

    fn ctx(&self) -> ResolveCtx<'_> {
        ResolveCtx {
            remote: self.remote,
            mapper: EntityMapper::new(self.store),
            cache: &self.cache,
            settings: self.settings,
        }
    }

    /// Bring one pair's four remote entities in line with local state.
    /// Transient failures restart the whole sequence with backoff.
    pub async fn sync_one(&self, post: &mut LocalPost, campaign: &mut LocalCampaign) -> SyncResult<SyncOutcome> {
        let mut attempt = 1;
        loop {
            let err = match self.sync_attempt(post, campaign).await {
                Ok(outcome) => return Ok(SyncOutcome { attempts: attempt, ..outcome }),
                Err(e) => e,
            };
            // the failed attempt may have created entities the snapshot lacks
            self.cache.invalidate();
            if !self.backoff(attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }

    async fn sync_attempt(&self, post: &mut LocalPost, campaign: &mut LocalCampaign) -> SyncResult<SyncOutcome> {
        let ctx = self.ctx();
        let log = telemetry::sync();

        let c = resolve::campaign::upsert(&ctx, post)
            .instrument(log.span(&SyncPhase::Campaign))
            .await?;
        let cr = resolve::creative::upsert(&ctx, post, campaign)
            .instrument(log.span(&SyncPhase::Creative))
            .await?;
        let parent = ctx.mapper.get_remote_id(post, RemoteKind::Campaign);
        let f = resolve::flight::upsert(&ctx, campaign, parent)
            .instrument(log.span(&SyncPhase::Flight))
            .await?;
        let m = resolve::map::upsert(&ctx, post, campaign)
            .instrument(log.span(&SyncPhase::Map))
            .await?;

        Ok(SyncOutcome {
            post_id: post.post_id.clone(),
            campaign_id: campaign.campaign_id.clone(),
            attempts: 1,
            campaign: step(&c)?,
            creative: step(&cr)?,
            flight: step(&f)?,
            map: step(&m)?,
        })
    }

    /// Scheduled entry point: sync every eligible candidate. Never deactivates.
    pub async fn drive_update(&self, candidates: &mut [Pair]) -> BatchReport {
        let gate = self.gate();
        let mut report = BatchReport::default();
        let mut known = HashMap::new();
        for (post, campaign) in candidates.iter_mut() {
            if !gate.eligible(post, campaign) {
                debug!(post = %post.post_id, campaign = %campaign.campaign_id, "not eligible");
                report.skipped += 1;
                continue;
            }
            self.sync_into(&mut report, &mut known, post, campaign).await;
        }
        info!(synced = report.synced, skipped = report.skipped, failed = report.failures.len(), "update pass done");
        report
    }

    /// Sync the complete active set, then deactivate every active map in the
    /// snapshot that does not decode to a member of it. A snapshot that fails
    /// to load aborts the pass before any write.
    pub async fn mirror(&self, active: &mut [Pair]) -> SyncResult<BatchReport> {
        let log = telemetry::mirror();
        let snapshot = self.snapshot().instrument(log.span(&MirrorPhase::LoadCache)).await?;

        let mut report = BatchReport::default();
        let mut known = HashMap::new();
        async {
            for (post, campaign) in active.iter_mut() {
                self.sync_into(&mut report, &mut known, post, campaign).await;
            }
        }
        .instrument(log.span(&MirrorPhase::Reconcile))
        .await;

        let keep: HashSet<(String, String)> = active
            .iter()
            .map(|(p, c)| (p.post_id.clone(), c.campaign_id.clone()))
            .collect();

        self.switch_off(&mut report, &stale_maps(&snapshot, &keep)).await;

        info!(
            synced = report.synced,
            deactivated = report.deactivated.len(),
            failed = report.failures.len(),
            "mirror pass done"
        );
        Ok(report)
    }

    async fn switch_off(&self, report: &mut BatchReport, maps: &[&RemoteMap]) {
        let log = telemetry::mirror();
        for map in maps {
            let id = match map.remote_id() {
                Ok(id) => id,
                Err(err) => {
                    warn!(flight = map.flight_id, creative = map.creative.id, error = %err, "stale map has no id");
                    let subject = format!("map {}/{}", map.flight_id, map.creative.id);
                    report.failures.push(Failure::new(subject, &err));
                    continue;
                }
            };
            let off = RemoteMap { is_active: false, ..(*map).clone() };
            let res = self
                .retrying(|| self.remote.update_map(&off))
                .instrument(log.span(&MirrorPhase::Deactivate))
                .await;
            match res {
                Ok(()) => {
                    info!(map = id, flight = map.flight_id, creative = map.creative.id, "deactivated stale map");
                    report.deactivated.push(Deactivated { kind: RemoteKind::Map, id });
                }
                Err(err) => {
                    warn!(map = id, error = %err, "could not deactivate map");
                    report.failures.push(Failure::new(format!("map {id}"), &err));
                }
            }
        }
    }

    /// Switch off the pair's map and flight. Entities already inactive, or
    /// never created, are left alone.
    pub async fn deactivate_campaign(&self, post: &LocalPost, campaign: &LocalCampaign) -> SyncResult<Vec<Deactivated>> {
        self.retrying(|| self.deactivate_campaign_once(post, campaign)).await
    }

    async fn deactivate_campaign_once(&self, post: &LocalPost, campaign: &LocalCampaign) -> SyncResult<Vec<Deactivated>> {
        let ctx = self.ctx();
        let log = telemetry::deactivate();

        let flight = resolve::flight::find(&ctx, campaign)
            .instrument(log.span(&DeactivatePhase::Lookup))
            .await?;
        let creative = resolve::creative::find(&ctx, post, campaign)
            .instrument(log.span(&DeactivatePhase::Lookup))
            .await?;

        let mut off = Vec::new();
        if let (Some(f), Some(c)) = (&flight, &creative) {
            let stored = ctx.mapper.get_remote_id(campaign, RemoteKind::Map);
            let found = resolve::map::locate_pair(&ctx, stored, f.remote_id()?, c.remote_id()?).await?;
            if let Some(m) = found.filter(|m| m.is_active) {
                let id = m.remote_id()?;
                self.remote
                    .update_map(&RemoteMap { is_active: false, ..m })
                    .instrument(log.span(&DeactivatePhase::Map))
                    .await?;
                off.push(Deactivated { kind: RemoteKind::Map, id });
            }
        }
        if let Some(f) = flight.filter(|f| f.is_active) {
            let id = f.remote_id()?;
            self.remote
                .update_flight(&RemoteFlight { is_active: false, ..f })
                .instrument(log.span(&DeactivatePhase::Flight))
                .await?;
            off.push(Deactivated { kind: RemoteKind::Flight, id });
        }
        Ok(off)
    }

    /// Deactivate every campaign of the post, then the post's remote campaign.
    pub async fn deactivate_post(&self, post: &LocalPost) -> SyncResult<Vec<Deactivated>> {
        let mut off = Vec::new();
        for campaign in self.store.campaigns_for_post(&post.post_id).await? {
            off.extend(self.deactivate_campaign(post, &campaign).await?);
        }

        let ctx = self.ctx();
        let found = self.retrying(|| resolve::campaign::find(&ctx, post)).await?;
        if let Some(c) = found.filter(|c| c.is_active) {
            let id = c.remote_id()?;
            let disabled = RemoteCampaign { is_active: false, ..c };
            self.retrying(|| self.remote.update_campaign(&disabled))
                .instrument(telemetry::deactivate().span(&DeactivatePhase::Campaign))
                .await?;
            off.push(Deactivated { kind: RemoteKind::Campaign, id });
        }
        Ok(off)
    }

    // campaigns of one post share its remote campaign
    async fn sync_into(
        &self,
        report: &mut BatchReport,
        known: &mut HashMap<String, i64>,
        post: &mut LocalPost,
        campaign: &mut LocalCampaign,
    ) {
        if post.adzerk_campaign_id.is_none() {
            post.adzerk_campaign_id = known.get(&post.post_id).copied();
        }
        match self.sync_one(post, campaign).await {
            Ok(outcome) => {
                known.insert(post.post_id.clone(), outcome.campaign.id);
                report.synced += 1;
            }
            Err(err) => {
                warn!(post = %post.post_id, campaign = %campaign.campaign_id, error = %err, "pair failed");
                report.failures.push(Failure::new(pair_label(&post.post_id, &campaign.campaign_id), &err));
            }
        }
    }

    async fn retrying<T, F, Fut>(&self, mut op: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if !self.backoff(attempt, &err).await {
                return Err(err);
            }
            attempt += 1;
        }
    }

    /// Sleep before the next attempt; false once the error is final.
    async fn backoff(&self, attempt: u32, err: &SyncError) -> bool {
        if !err.is_retryable() || attempt >= self.retry.max_attempts {
            return false;
        }
        let delay = self.retry.delay_after(attempt);
        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "transient failure, retrying");
        tokio::time::sleep(delay)
            .instrument(telemetry::sync().span(&SyncPhase::Backoff))
            .await;
        true
    }
}

fn step<E: RemoteEntity>(u: &Upserted<E>) -> SyncResult<Step> {
    Ok(Step { id: u.entity.remote_id()?, action: u.action })
}

/// The local (post, campaign) a remote map stands for: the flight name is the
/// campaign id, and stripping it from the creative title leaves the post id.
pub fn decode_pair<'s>(snapshot: &'s RemoteSnapshot, map: &RemoteMap) -> Option<(&'s str, &'s str)> {
    let flight = snapshot.flight(map.flight_id)?;
    let creative = snapshot.creative(map.creative.id)?;
    let post_id = post_id_from_title(&creative.title, &flight.name)?;
    Some((post_id, flight.name.as_str()))
}

fn stale_maps<'s>(snapshot: &'s RemoteSnapshot, keep: &HashSet<(String, String)>) -> Vec<&'s RemoteMap> {
    snapshot
        .maps()
        .iter()
        .filter(|m| m.is_active && !m.is_deleted)
        .filter(|m| match decode_pair(snapshot, m) {
            Some((post_id, campaign_id)) => !keep.contains(&(post_id.to_string(), campaign_id.to_string())),
            None => {
                warn!(map = ?m.id, flight = m.flight_id, creative = m.creative.id, "active map has no local pair");
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChargeState, CreativeRef};
    use crate::remote::memory::MemoryAdServer;
    use crate::resolve::Action;
    use crate::store::memory::MemoryStore;
    use crate::testing::{campaign, no_wait_retry, post, settings};

    struct World {
        remote: MemoryAdServer,
        store: MemoryStore,
        settings: PlatformSettings,
    }

    impl World {
        fn new() -> Self {
            Self { remote: MemoryAdServer::new(), store: MemoryStore::new(), settings: settings() }
        }

        fn with_pairs(pairs: &[(&str, &str)]) -> Self {
            let w = Self::new();
            for (post_id, campaign_id) in pairs {
                w.store.insert(post(post_id), vec![campaign(campaign_id, post_id)]);
            }
            w
        }

        fn reconciler(&self) -> Reconciler<'_> {
            Reconciler::new(&self.remote, &self.store, &self.settings).with_retry(no_wait_retry(3))
        }

        async fn pair(&self, post_id: &str, campaign_id: &str) -> Pair {
            (self.store.post(post_id).await.unwrap(), self.store.campaign(campaign_id).await.unwrap())
        }
    }

    #[tokio::test]
    async fn first_sync_builds_the_whole_chain() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;

        let out = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        assert_eq!(out.attempts, 1);
        for s in [out.campaign, out.creative, out.flight, out.map] {
            assert_eq!(s.action, Action::Created);
        }

        assert_eq!(w.remote.campaigns()[0].name, "p_1");
        assert_eq!(w.remote.creatives()[0].title, "p_1-c_1");
        let flight = &w.remote.flights()[0];
        assert_eq!(flight.name, "c_1");
        assert_eq!(flight.keywords, "reddit.com");
        assert!(!flight.is_full_speed);
        assert_eq!(flight.campaign_id, out.campaign.id);
        let map = &w.remote.maps()[0];
        assert_eq!(map.percentage, 100);
        assert_eq!(map.impressions, 70_000);
        assert_eq!(map.flight_id, out.flight.id);
        assert_eq!(map.creative.id, out.creative.id);

        let stored = w.store.campaign("c_1").await.unwrap();
        assert_eq!(stored.adzerk_creative_id, Some(out.creative.id));
        assert_eq!(stored.adzerk_flight_id, Some(out.flight.id));
        assert_eq!(stored.adzerk_map_id, Some(out.map.id));
        assert_eq!(w.store.post("p_1").await.unwrap().adzerk_campaign_id, Some(out.campaign.id));
    }

    #[tokio::test]
    async fn second_sync_changes_nothing() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        let r = w.reconciler();

        let first = r.sync_one(&mut p, &mut c).await.unwrap();
        let before = (w.remote.campaigns(), w.remote.creatives(), w.remote.flights(), w.remote.maps());

        let second = r.sync_one(&mut p, &mut c).await.unwrap();
        let after = (w.remote.campaigns(), w.remote.creatives(), w.remote.flights(), w.remote.maps());

        assert_eq!(before, after);
        assert_eq!(second.map.id, first.map.id);
        for s in [second.campaign, second.creative, second.flight, second.map] {
            assert_eq!(s.action, Action::Updated);
        }
        for op in ["create_campaign", "create_creative", "create_flight", "create_map"] {
            assert_eq!(w.remote.count(op), 1, "{op}");
        }
    }

    #[tokio::test]
    async fn transient_failure_restarts_from_the_top() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        w.remote.fail_next("create_flight", SyncError::RemoteTransient("timeout".into()));

        let out = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.campaign.action, Action::Updated);
        assert_eq!(out.flight.action, Action::Created);
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.creatives().len(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        for _ in 0..3 {
            w.remote.fail_next("create_creative", SyncError::RemoteTransient("503".into()));
        }

        let err = w.reconciler().sync_one(&mut p, &mut c).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(w.remote.count("create_creative"), 3);
        assert_eq!(w.remote.count("create_campaign"), 1);
    }

    #[tokio::test]
    async fn rejection_is_not_retried() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        w.remote.fail_next(
            "create_creative",
            SyncError::RemoteRejected { status: 400, message: "bad AdTypeId".into() },
        );

        let err = w.reconciler().sync_one(&mut p, &mut c).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteRejected { status: 400, .. }));
        assert_eq!(w.remote.count("create_creative"), 1);
        // the campaign step stays applied
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.count("create_flight"), 0);
    }

    #[tokio::test]
    async fn mirror_switches_off_pairs_outside_the_active_set() {
        let w = World::with_pairs(&[("p_1", "c_1"), ("p_2", "c_2")]);
        let seed = w.reconciler();
        let (mut p1, mut c1) = w.pair("p_1", "c_1").await;
        let (mut p2, mut c2) = w.pair("p_2", "c_2").await;
        seed.sync_one(&mut p1, &mut c1).await.unwrap();
        seed.sync_one(&mut p2, &mut c2).await.unwrap();
        let (m1, m2) = (c1.adzerk_map_id.unwrap(), c2.adzerk_map_id.unwrap());

        let mut active = vec![(p1, c1)];
        let report = w.reconciler().mirror(&mut active).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.synced, 1);
        assert_eq!(report.deactivated, vec![Deactivated { kind: RemoteKind::Map, id: m2 }]);
        assert!(w.remote.map(m1).unwrap().is_active);
        assert!(!w.remote.map(m2).unwrap().is_active);
    }

    #[tokio::test]
    async fn mirror_switches_off_maps_without_a_local_pair() {
        let w = World::new();
        let flight = w.remote.seed_flight(RemoteFlight { name: "c_gone".into(), is_active: true, ..Default::default() });
        let orphan = w.remote.seed_map(RemoteMap {
            flight_id: flight,
            creative: CreativeRef { id: 4242 },
            is_active: true,
            ..Default::default()
        });

        let report = w.reconciler().mirror(&mut []).await.unwrap();
        assert_eq!(report.deactivated, vec![Deactivated { kind: RemoteKind::Map, id: orphan }]);
        assert!(!w.remote.map(orphan).unwrap().is_active);
    }

    #[tokio::test]
    async fn mirror_aborts_on_ambiguous_snapshot() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        for _ in 0..2 {
            w.remote.seed_campaign(RemoteCampaign { name: "p_1".into(), is_active: true, ..Default::default() });
        }
        let mut active = vec![w.pair("p_1", "c_1").await];

        let err = w.reconciler().mirror(&mut active).await.unwrap_err();
        assert!(matches!(err, SyncError::AmbiguousNaturalKey { kind: RemoteKind::Campaign, count: 2, .. }));
        assert_eq!(w.remote.count("create_creative"), 0);
        assert_eq!(w.remote.count("update_campaign"), 0);
    }

    #[tokio::test]
    async fn update_skips_ineligible_and_survives_failures() {
        let w = World::with_pairs(&[("p_1", "c_1"), ("p_2", "c_2"), ("p_3", "c_3")]);
        let mut unpaid = w.pair("p_2", "c_2").await;
        unpaid.1.charge = ChargeState::Authorized;
        let mut batch = vec![w.pair("p_3", "c_3").await, unpaid, w.pair("p_1", "c_1").await];
        w.remote.fail_next(
            "create_campaign",
            SyncError::RemoteRejected { status: 400, message: "nope".into() },
        );

        let report = w.reconciler().drive_update(&mut batch).await;
        assert_eq!(report.synced, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "p_3/c_3");
        assert!(!report.failures[0].retryable);
        assert!(report.deactivated.is_empty());
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.campaigns()[0].name, "p_1");
    }

    struct NothingApproved;

    impl ApprovalSource for NothingApproved {
        fn charge_confirmed(&self, _: &LocalCampaign) -> bool { false }
        fn accepted(&self, _: &LocalPost) -> bool { true }
    }

    #[tokio::test]
    async fn approval_source_decides_eligibility() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let mut batch = vec![w.pair("p_1", "c_1").await];

        let report = w.reconciler().with_approvals(&NothingApproved).drive_update(&mut batch).await;
        assert_eq!(report.synced, 0);
        assert_eq!(report.skipped, 1);
        assert!(w.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn campaigns_of_one_post_share_its_remote_campaign() {
        let w = World::with_pairs(&[("p_1", "c_1"), ("p_1", "c_2")]);
        let mut batch = vec![w.pair("p_1", "c_1").await, w.pair("p_1", "c_2").await];

        let report = w.reconciler().drive_update(&mut batch).await;
        assert_eq!(report.synced, 2);
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.creatives().len(), 2);
        assert_eq!(w.remote.flights().len(), 2);
        assert_eq!(w.remote.maps().len(), 2);
    }

    #[tokio::test]
    async fn deactivate_campaign_turns_off_map_and_flight_once() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        let r = w.reconciler();
        let out = r.sync_one(&mut p, &mut c).await.unwrap();

        let off = r.deactivate_campaign(&p, &c).await.unwrap();
        assert_eq!(
            off,
            vec![
                Deactivated { kind: RemoteKind::Map, id: out.map.id },
                Deactivated { kind: RemoteKind::Flight, id: out.flight.id },
            ]
        );
        assert!(!w.remote.maps()[0].is_active);
        assert!(!w.remote.flights()[0].is_active);
        assert!(w.remote.campaigns()[0].is_active);

        assert!(r.deactivate_campaign(&p, &c).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deactivate_post_turns_off_everything_it_owns() {
        let w = World::with_pairs(&[("p_1", "c_1"), ("p_1", "c_2")]);
        let r = w.reconciler();
        let mut batch = vec![w.pair("p_1", "c_1").await, w.pair("p_1", "c_2").await];
        r.drive_update(&mut batch).await;

        let p = w.store.post("p_1").await.unwrap();
        let off = r.deactivate_post(&p).await.unwrap();
        assert_eq!(off.len(), 5);
        assert_eq!(off.last().map(|d| d.kind), Some(RemoteKind::Campaign));
        assert!(w.remote.maps().iter().all(|m| !m.is_active));
        assert!(w.remote.flights().iter().all(|f| !f.is_active));
        assert!(!w.remote.campaigns()[0].is_active);
    }

    #[tokio::test]
    async fn never_synced_pair_has_nothing_to_deactivate() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (p, c) = w.pair("p_1", "c_1").await;
        assert!(w.reconciler().deactivate_campaign(&p, &c).await.unwrap().is_empty());
        assert!(w.remote.calls().iter().all(|op| !op.starts_with("update")));
    }

    #[tokio::test]
    async fn unlinked_remote_campaign_is_adopted_without_preload() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let seeded = w.remote.seed_campaign(RemoteCampaign { name: "p_1".into(), is_active: true, ..Default::default() });
        let mut batch = vec![w.pair("p_1", "c_1").await];

        let report = w.reconciler().drive_update(&mut batch).await;
        assert!(report.is_clean());
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.count("create_campaign"), 0);
        assert_eq!(w.store.post("p_1").await.unwrap().adzerk_campaign_id, Some(seeded));

        let report = w.reconciler().mirror(&mut batch).await.unwrap();
        assert!(report.is_clean());
        assert!(report.deactivated.is_empty());
    }

    #[tokio::test]
    async fn lost_create_response_is_found_on_retry() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        w.remote.lose_next_response("create_campaign", SyncError::RemoteTransient("reset".into()));

        let out = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        assert_eq!(out.attempts, 2);
        assert_eq!(out.campaign.action, Action::Updated);
        assert_eq!(w.remote.campaigns().len(), 1);
        assert_eq!(w.remote.count("create_campaign"), 1);
    }

    #[tokio::test]
    async fn stale_creative_pointer_replaces_the_map() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        let first = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();

        let mut old = w.remote.creatives()[0].clone();
        old.title = "retired".into();
        w.remote.update_creative(&old).await.unwrap();
        c.adzerk_creative_id = Some(9999);

        let out = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        assert_eq!(out.creative.action, Action::Created);
        assert_eq!(out.flight.id, first.flight.id);
        assert_eq!(out.map.action, Action::Created);
        assert!(!w.remote.map(first.map.id).unwrap().is_active);
        let live: Vec<_> = w.remote.maps().into_iter().filter(|m| m.is_active).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].creative.id, out.creative.id);
        assert_eq!(w.store.campaign("c_1").await.unwrap().adzerk_map_id, Some(out.map.id));

        let report = w.reconciler().mirror(&mut [(p, c)]).await.unwrap();
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn stale_flight_pointer_relinks_by_name() {
        let w = World::with_pairs(&[("p_1", "c_1")]);
        let (mut p, mut c) = w.pair("p_1", "c_1").await;
        let first = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        c.adzerk_flight_id = Some(9999);

        let out = w.reconciler().sync_one(&mut p, &mut c).await.unwrap();
        assert_eq!(out.flight.action, Action::Updated);
        assert_eq!(out.flight.id, first.flight.id);
        assert_eq!(out.map.id, first.map.id);
        assert_eq!(w.remote.flights().len(), 1);
        assert_eq!(w.remote.maps().len(), 1);
        assert_eq!(w.store.campaign("c_1").await.unwrap().adzerk_flight_id, Some(first.flight.id));
    }

    #[tokio::test]
    async fn stale_map_without_id_is_reported_and_skipped() {
        let w = World::new();
        let snapshot = RemoteSnapshot::from_parts(
            vec![],
            vec![],
            vec![RemoteFlight { id: Some(1), name: "c_gone".into(), is_active: true, ..Default::default() }],
            vec![RemoteMap { flight_id: 1, creative: CreativeRef { id: 4242 }, is_active: true, ..Default::default() }],
        )
        .unwrap();

        let mut report = BatchReport::default();
        w.reconciler().switch_off(&mut report, &stale_maps(&snapshot, &HashSet::new())).await;
        assert!(report.deactivated.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "map 1/4242");
        assert_eq!(w.remote.count("update_map"), 0);
    }
}
