use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

mod cache;
mod config;
mod eligibility;
mod error;
mod init;
mod jobs;
mod mapper;
mod model;
mod output;
mod reconcile;
mod remote;
mod resolve;
mod store;
mod telemetry;
mod util;

#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(name = "adsync", about = "Mirror promoted-post campaigns onto the ad server")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the local schema
    Init(init::InitCmd),
    /// Sync one (post, campaign) pair
    Sync(jobs::sync::SyncCmd),
    /// Sync every eligible pair scheduled for a day
    Update(jobs::update::UpdateCmd),
    /// Make the ad server's active maps exactly the eligible scheduled pairs
    Mirror(jobs::mirror::MirrorCmd),
    /// Switch off a post's or a campaign's remote entities
    Deactivate(jobs::deactivate::DeactivateCmd),
    /// Compare the schedule with what the ad server is serving
    Status(jobs::status::StatusCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr. Respect RUST_LOG and ADSYNC_LOG_FORMAT
    telemetry::config::init_tracing();
    let dsn = cli
        .dsn
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("Please provide --dsn or set DATABASE_URL in .env")?;

    let pool = PgPoolOptions::new().max_connections(5).connect(&dsn).await?;

    match cli.command {
        Commands::Init(args) => init::run(&pool, args).await?,
        Commands::Sync(args) => jobs::sync::run(&pool, args).await?,
        Commands::Update(args) => jobs::update::run(&pool, args).await?,
        Commands::Mirror(args) => jobs::mirror::run(&pool, args).await?,
        Commands::Deactivate(args) => jobs::deactivate::run(&pool, args).await?,
        Commands::Status(args) => jobs::status::run(&pool, args).await?,
    }

    Ok(())
}
