use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Deactivate;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Lookup, Map, Flight, Campaign }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Lookup => "lookup",
        Phase::Map => "map",
        Phase::Flight => "flight",
        Phase::Campaign => "campaign",
    }}
    fn span(&self) -> Span { match self {
        Phase::Lookup => info_span!("lookup"),
        Phase::Map => info_span!("map"),
        Phase::Flight => info_span!("flight"),
        Phase::Campaign => info_span!("campaign"),
    }}
}

impl OpMarker for Deactivate {
    const NAME: &'static str = "deactivate";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("deactivate") }
}
