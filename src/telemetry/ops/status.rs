use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Status;

#[derive(Copy, Clone, Debug)]
pub enum Phase { LoadCache, Count }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::LoadCache => "load_cache", Phase::Count => "count" } }
    fn span(&self) -> Span { match self { Phase::LoadCache => info_span!("load_cache"), Phase::Count => info_span!("count") } }
}

impl OpMarker for Status {
    const NAME: &'static str = "status";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("status") }
}
