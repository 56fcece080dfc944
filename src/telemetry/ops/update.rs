use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Update;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Select, Preload, Gate, Sync }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Select => "select",
        Phase::Preload => "preload",
        Phase::Gate => "gate",
        Phase::Sync => "sync",
    }}
    fn span(&self) -> Span { match self {
        Phase::Select => info_span!("select"),
        Phase::Preload => info_span!("preload"),
        Phase::Gate => info_span!("gate"),
        Phase::Sync => info_span!("sync"),
    }}
}

impl OpMarker for Update {
    const NAME: &'static str = "update";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("update") }
}
