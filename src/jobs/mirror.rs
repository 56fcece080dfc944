use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::eligibility::EligibilityGate;
use crate::reconcile::Pair;
use crate::store::LocalStore;
use crate::telemetry::{self};
use crate::telemetry::ops::mirror::Phase as MirrorPhase;
use crate::util::time::parse_day_opt;

use super::{JobEnv, PairPlan};

#[derive(Args, Debug)]
pub struct MirrorCmd {
    /// Day whose schedule is the active set: today, +Nd, -Nd or YYYY-MM-DD
    #[arg(long)] pub on: Option<String>,
    #[arg(long, default_value_t = false)] pub apply: bool,
}

#[derive(Serialize)]
struct MirrorPlanOut {
    day: String,
    scheduled: usize,
    active: Vec<PairPlan>,
}

/// Scheduled pairs for the day that pass the gate.
fn active_set(gate: &EligibilityGate<'_>, scheduled: Vec<Pair>) -> Vec<Pair> {
    scheduled.into_iter().filter(|(p, c)| gate.eligible(p, c)).collect()
}

pub async fn run(pool: &PgPool, args: MirrorCmd) -> Result<()> {
    let env = JobEnv::from_env(pool);
    let day = parse_day_opt(&args.on)?;
    let mode = if args.apply { "apply" } else { "plan" };

    let log = telemetry::mirror();
    let _g = log.root_span_kv([("mode", mode.to_string()), ("day", day.to_string())]).entered();

    let scheduled = env.store.scheduled_pairs(day).instrument(log.span(&MirrorPhase::Select)).await?;
    let scheduled_count = scheduled.len();
    let gate = env.gate();
    let mut active = active_set(&gate, scheduled);
    log.info(format!(
        "📝 Mirror plan — mode={} day={} scheduled={} active={}",
        mode, day, scheduled_count, active.len()
    ));

    if !args.apply {
        log.info("🔎 Would sync the active set and switch off every other active map");
        log.info("   Use --apply to execute.");
        let plans = active.iter().map(|(p, c)| PairPlan::new(&gate, p, c)).collect();
        log.plan(&MirrorPlanOut { day: day.to_string(), scheduled: scheduled_count, active: plans })?;
        return Ok(());
    }

    let remote = env.remote()?;
    let report = env.reconciler(&remote).mirror(&mut active).await?;
    log.info(format!(
        "✅ Mirror done — synced={} deactivated={} failed={}",
        report.synced, report.deactivated.len(), report.failures.len()
    ));
    for f in &report.failures {
        log.warn_kv("mirror step failed", [("subject", f.subject.clone()), ("error", f.error.clone())]);
    }
    log.result(&report)?;

    if !report.is_clean() {
        log.error(format!("❌ {} mirror step(s) failed", report.failures.len()));
        bail!("{} mirror step(s) failed", report.failures.len());
    }
    Ok(())
}
