use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::cache::RemoteSnapshot;
use crate::mapper::decode_creative_title;
use crate::model::RemoteEntity;
use crate::reconcile::decode_pair;
use crate::store::LocalStore;
use crate::telemetry::{self};
use crate::telemetry::ops::status::Phase as StatusPhase;
use crate::util::time::parse_day_opt;

use super::JobEnv;

#[derive(Args, Debug)]
pub struct StatusCmd {
    /// Day whose schedule is compared against the ad server
    #[arg(long)] pub on: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Counts {
    pub active: usize,
    pub inactive: usize,
}

impl Counts {
    fn of<'a, E: RemoteEntity + 'a>(items: impl IntoIterator<Item = &'a E>) -> Self {
        let mut c = Counts::default();
        for e in items {
            if e.is_active() { c.active += 1 } else { c.inactive += 1 }
        }
        c
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RemoteSummary {
    pub campaigns: Counts,
    pub creatives: Counts,
    pub flights: Counts,
    pub maps: Counts,
    /// Active maps whose flight or creative does not name a local pair.
    pub orphan_active_maps: Vec<i64>,
    /// Creative titles outside the `post-campaign` shape.
    pub foreign_creatives: usize,
    /// Active campaigns none of whose flights is active.
    pub idle_campaigns: Vec<i64>,
    /// Active flights with no active map, so nothing serves under them.
    pub empty_flights: Vec<i64>,
}

pub fn summarize(snapshot: &RemoteSnapshot) -> RemoteSummary {
    let orphan_active_maps = snapshot
        .maps()
        .iter()
        .filter(|m| m.is_active && decode_pair(snapshot, m).is_none())
        .filter_map(|m| m.id)
        .collect();
    RemoteSummary {
        campaigns: Counts::of(snapshot.campaigns()),
        creatives: Counts::of(snapshot.creatives()),
        flights: Counts::of(snapshot.flights()),
        maps: Counts::of(snapshot.maps()),
        orphan_active_maps,
        foreign_creatives: snapshot
            .creatives()
            .iter()
            .filter(|c| decode_creative_title(&c.title).is_none())
            .count(),
        idle_campaigns: snapshot
            .campaigns()
            .iter()
            .filter(|c| c.is_active)
            .filter_map(|c| c.id)
            .filter(|&id| !snapshot.flights_for_campaign(id).any(|f| f.is_active))
            .collect(),
        empty_flights: snapshot
            .flights()
            .iter()
            .filter(|f| f.is_active)
            .filter_map(|f| f.id)
            .filter(|&id| !snapshot.maps_for_flight(id).any(|m| m.is_active))
            .collect(),
    }
}

#[derive(Serialize)]
struct StatusOut {
    day: String,
    scheduled: usize,
    eligible: usize,
    remote: RemoteSummary,
}

pub async fn run(pool: &PgPool, args: StatusCmd) -> Result<()> {
    let env = JobEnv::from_env(pool);
    let day = parse_day_opt(&args.on)?;

    let log = telemetry::status();
    let _g = log.root_span_kv([("day", day.to_string())]).entered();

    let (scheduled, eligible) = async {
        let pairs = env.store.scheduled_pairs(day).await?;
        let gate = env.gate();
        let eligible = pairs.iter().filter(|(p, c)| gate.eligible(p, c)).count();
        anyhow::Ok((pairs.len(), eligible))
    }
    .instrument(log.span(&StatusPhase::Count))
    .await?;

    let remote = env.remote()?;
    let snapshot = RemoteSnapshot::load(&remote).instrument(log.span(&StatusPhase::LoadCache)).await?;
    let summary = summarize(&snapshot);

    log.info(format!("📅 {}: {} scheduled pairs, {} eligible", day, scheduled, eligible));
    log.info(format!("📣 Campaigns: {} active, {} inactive", summary.campaigns.active, summary.campaigns.inactive));
    log.info(format!("🖼️  Creatives: {} active, {} inactive ({} foreign titles)", summary.creatives.active, summary.creatives.inactive, summary.foreign_creatives));
    log.info(format!("✈️  Flights: {} active, {} inactive", summary.flights.active, summary.flights.inactive));
    log.info(format!("🔗 Maps: {} active, {} inactive", summary.maps.active, summary.maps.inactive));
    if !summary.orphan_active_maps.is_empty() {
        log.warn(format!("⚠️  Active maps without a local pair: {:?}", summary.orphan_active_maps));
    }
    if !summary.idle_campaigns.is_empty() {
        log.info(format!("   Active campaigns with no active flight: {:?}", summary.idle_campaigns));
    }
    if !summary.empty_flights.is_empty() {
        log.warn(format!("⚠️  Active flights with no active map: {:?}", summary.empty_flights));
    }
    if summary.maps.active > eligible {
        log.info("   More active maps than eligible pairs; run `mirror --apply` to switch off the rest.");
    }

    log.result(&StatusOut { day: day.to_string(), scheduled, eligible, remote: summary })?;
    Ok(())
}
