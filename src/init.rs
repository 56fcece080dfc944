use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use tracing::Instrument;

use crate::telemetry::{self};
use crate::telemetry::ops::init::Phase as InitPhase;

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, default_value_t = false)] pub apply: bool,
}

#[derive(Serialize)]
struct MigrationOut {
    version: i64,
    description: String,
}

pub async fn run(pool: &PgPool, args: InitCmd) -> Result<()> {
    let mode = if args.apply { "apply" } else { "plan" };
    let log = telemetry::init();
    let _g = log.root_span_kv([("mode", mode.to_string())]).entered();

    let migrations: Vec<MigrationOut> = {
        let _s = log.span(&InitPhase::Plan).entered();
        MIGRATOR
            .iter()
            .map(|m| MigrationOut { version: m.version, description: m.description.to_string() })
            .collect()
    };
    log.info(format!("📝 Init plan — mode={} migrations={}", mode, migrations.len()));
    for m in &migrations {
        log.info(format!("   {} {}", m.version, m.description));
    }

    if !args.apply {
        log.info("   Use --apply to execute.");
        log.plan(&migrations)?;
        return Ok(());
    }

    // idempotent, already applied versions are skipped
    MIGRATOR.run(pool).instrument(log.span(&InitPhase::Migrate)).await?;
    log.info("✅ Schema promo is up to date");
    log.result(&migrations)?;
    Ok(())
}
