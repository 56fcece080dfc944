use anyhow::{bail, Result};
use chrono::Duration;
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::store::LocalStore;
use crate::telemetry::{self};
use crate::telemetry::ops::update::Phase as UpdatePhase;
use crate::util::time::today;

use super::{JobEnv, PairPlan};

#[derive(Args, Debug)]
pub struct UpdateCmd {
    /// Days from today whose schedule is synced
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)] pub offset: i64,
    /// Load the full remote snapshot before syncing
    #[arg(long, default_value_t = false)] pub preload: bool,
    #[arg(long, default_value_t = false)] pub apply: bool,
}

#[derive(Serialize)]
struct UpdatePlanOut {
    day: String,
    candidates: usize,
    eligible: usize,
    pairs: Vec<PairPlan>,
}

pub async fn run(pool: &PgPool, args: UpdateCmd) -> Result<()> {
    let env = JobEnv::from_env(pool);
    let day = today() + Duration::days(args.offset);
    let mode = if args.apply { "apply" } else { "plan" };

    let log = telemetry::update();
    let _g = log.root_span_kv([
        ("mode", mode.to_string()),
        ("day", day.to_string()),
        ("preload", args.preload.to_string()),
    ]).entered();

    let mut pairs = env.store.scheduled_pairs(day).instrument(log.span(&UpdatePhase::Select)).await?;

    let plans: Vec<PairPlan> = {
        let _s = log.span(&UpdatePhase::Gate).entered();
        let gate = env.gate();
        pairs.iter().map(|(p, c)| PairPlan::new(&gate, p, c)).collect()
    };
    let eligible = plans.iter().filter(|p| p.eligible).count();
    log.info(format!(
        "📝 Update plan — mode={} day={} candidates={} eligible={}",
        mode, day, pairs.len(), eligible
    ));

    if !args.apply {
        for p in plans.iter().filter(|p| !p.eligible) {
            log.info(format!("   skip {}/{} (not charged or not approved)", p.post_id, p.campaign_id));
        }
        log.info("   Use --apply to execute.");
        log.plan(&UpdatePlanOut { day: day.to_string(), candidates: pairs.len(), eligible, pairs: plans })?;
        return Ok(());
    }

    let remote = env.remote()?;
    let reconciler = env.reconciler(&remote);
    if args.preload {
        let snapshot = reconciler.snapshot().instrument(log.span(&UpdatePhase::Preload)).await?;
        log.info(format!(
            "📦 Preloaded {} campaigns, {} flights, {} maps",
            snapshot.campaigns().len(), snapshot.flights().len(), snapshot.maps().len()
        ));
    }

    let report = reconciler.drive_update(&mut pairs).instrument(log.span(&UpdatePhase::Sync)).await;
    log.info(format!(
        "✅ Update done — synced={} skipped={} failed={}",
        report.synced, report.skipped, report.failures.len()
    ));
    for f in &report.failures {
        log.warn_kv("pair failed", [("subject", f.subject.clone()), ("error", f.error.clone())]);
    }
    log.result(&report)?;

    if !report.is_clean() {
        log.error(format!("❌ {} pair(s) failed to sync", report.failures.len()));
        bail!("{} pair(s) failed to sync", report.failures.len());
    }
    Ok(())
}
