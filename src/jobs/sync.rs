use anyhow::{bail, Result};
use clap::Args;
use sqlx::PgPool;

use crate::store::LocalStore;
use crate::telemetry::{self};

use super::{JobEnv, PairPlan};

#[derive(Args, Debug)]
pub struct SyncCmd {
    /// Local post id
    pub post: String,
    /// Local campaign id, must belong to the post
    pub campaign: String,
    #[arg(long, default_value_t = false)] pub apply: bool,
    /// Sync even when the pair is not charged or not approved
    #[arg(long, default_value_t = false)] pub force: bool,
}

pub async fn run(pool: &PgPool, args: SyncCmd) -> Result<()> {
    let env = JobEnv::from_env(pool);
    let mode = if args.apply { "apply" } else { "plan" };

    let log = telemetry::sync();
    let _g = log.root_span_kv([
        ("mode", mode.to_string()),
        ("post", args.post.clone()),
        ("campaign", args.campaign.clone()),
        ("force", args.force.to_string()),
    ]).entered();

    let mut post = env.store.post(&args.post).await?;
    let mut campaign = env.store.campaign(&args.campaign).await?;
    if campaign.post_id != post.post_id {
        bail!("campaign {} belongs to post {}, not {}", campaign.campaign_id, campaign.post_id, post.post_id);
    }

    let gate = env.gate();
    let plan = PairPlan::new(&gate, &post, &campaign);
    log.info(format!(
        "📝 Sync plan — mode={} pair={}/{} eligible={} charge={:?} moderation={:?} linked={}",
        mode, plan.post_id, plan.campaign_id, plan.eligible, campaign.charge, post.moderation, plan.fully_linked()
    ));
    if !args.apply {
        log.info("   Use --apply to execute.");
        log.plan(&plan)?;
        return Ok(());
    }
    if !plan.eligible {
        if !args.force {
            bail!("{}/{} is not eligible; pass --force to sync anyway", plan.post_id, plan.campaign_id);
        }
        log.warn(format!("⚠️  Forcing sync of ineligible pair {}/{}", plan.post_id, plan.campaign_id));
    }

    let remote = env.remote()?;
    let outcome = env.reconciler(&remote).sync_one(&mut post, &mut campaign).await?;
    log.info(format!(
        "✅ Synced {}/{} — campaign={} ({:?}) creative={} ({:?}) flight={} ({:?}) map={} ({:?}) attempts={}",
        outcome.post_id,
        outcome.campaign_id,
        outcome.campaign.id, outcome.campaign.action,
        outcome.creative.id, outcome.creative.action,
        outcome.flight.id, outcome.flight.action,
        outcome.map.id, outcome.map.action,
        outcome.attempts,
    ));
    log.result(&outcome)?;
    Ok(())
}
