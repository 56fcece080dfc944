use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use sqlx::PgPool;
use tracing::Instrument;

use crate::model::LocalCampaign;
use crate::store::LocalStore;
use crate::telemetry::{self};
use crate::telemetry::ops::deactivate::Phase as DeactivatePhase;

use super::{JobEnv, PairPlan};

#[derive(Args, Debug)]
pub struct DeactivateCmd {
    #[arg(long, global = true, default_value_t = false)] pub apply: bool,
    #[command(subcommand)] pub target: Target,
}

#[derive(Subcommand, Debug)]
pub enum Target {
    /// Every campaign of the post, then the post's remote campaign
    Post { post: String },
    /// One campaign's map and flight
    Campaign { post: String, campaign: String },
}

enum Scope {
    Post(Vec<LocalCampaign>),
    Campaign(LocalCampaign),
}

impl Scope {
    fn name(&self) -> &'static str {
        match self { Scope::Post(_) => "post", Scope::Campaign(_) => "campaign" }
    }

    fn campaigns(&self) -> &[LocalCampaign] {
        match self { Scope::Post(cs) => cs, Scope::Campaign(c) => std::slice::from_ref(c) }
    }
}

#[derive(Serialize)]
struct DeactivatePlanOut {
    target: &'static str,
    post_id: String,
    remote_campaign: Option<i64>,
    pairs: Vec<PairPlan>,
}

pub async fn run(pool: &PgPool, args: DeactivateCmd) -> Result<()> {
    let env = JobEnv::from_env(pool);
    let mode = if args.apply { "apply" } else { "plan" };

    let log = telemetry::deactivate();
    let _g = log.root_span_kv([("mode", mode.to_string()), ("target", format!("{:?}", args.target))]).entered();

    let (post, scope) = async {
        match &args.target {
            Target::Post { post } => {
                let p = env.store.post(post).await?;
                let cs = env.store.campaigns_for_post(post).await?;
                anyhow::Ok((p, Scope::Post(cs)))
            }
            Target::Campaign { post, campaign } => {
                let p = env.store.post(post).await?;
                let c = env.store.campaign(campaign).await?;
                if c.post_id != p.post_id {
                    bail!("campaign {} belongs to post {}, not {}", c.campaign_id, c.post_id, p.post_id);
                }
                anyhow::Ok((p, Scope::Campaign(c)))
            }
        }
    }
    .instrument(log.span(&DeactivatePhase::Lookup))
    .await?;

    log.info(format!(
        "📝 Deactivate plan — mode={} target={} post={} campaigns={}",
        mode, scope.name(), post.post_id, scope.campaigns().len()
    ));
    if !args.apply {
        for c in scope.campaigns() {
            log.info(format!(
                "🔎 Would switch off map and flight of {}/{} (flight={:?} map={:?})",
                post.post_id, c.campaign_id, c.adzerk_flight_id, c.adzerk_map_id
            ));
        }
        if let Scope::Post(_) = scope {
            log.info(format!("🔎 Would switch off remote campaign {:?}", post.adzerk_campaign_id));
        }
        log.info("   Use --apply to execute.");
        let gate = env.gate();
        log.plan(&DeactivatePlanOut {
            target: scope.name(),
            post_id: post.post_id.clone(),
            remote_campaign: post.adzerk_campaign_id,
            pairs: scope.campaigns().iter().map(|c| PairPlan::new(&gate, &post, c)).collect(),
        })?;
        return Ok(());
    }

    let remote = env.remote()?;
    let reconciler = env.reconciler(&remote);
    let off = match &scope {
        Scope::Post(_) => reconciler.deactivate_post(&post).await?,
        Scope::Campaign(c) => reconciler.deactivate_campaign(&post, c).await?,
    };
    for d in &off {
        log.info(format!("🔌 Deactivated {:?} {}", d.kind, d.id));
    }
    log.info(format!("✅ Deactivate done — {} entities switched off", off.len()));
    log.result(&off)?;
    Ok(())
}
