use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct SyncOne;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Campaign, Creative, Flight, Map, Backoff }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Campaign => "campaign",
        Phase::Creative => "creative",
        Phase::Flight => "flight",
        Phase::Map => "map",
        Phase::Backoff => "backoff",
    }}
    fn span(&self) -> Span { match self {
        Phase::Campaign => info_span!("campaign"),
        Phase::Creative => info_span!("creative"),
        Phase::Flight => info_span!("flight"),
        Phase::Map => info_span!("map"),
        Phase::Backoff => info_span!("backoff"),
    }}
}

impl OpMarker for SyncOne {
    const NAME: &'static str = "sync";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("sync") }
}
