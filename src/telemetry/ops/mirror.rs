use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Mirror;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Select, LoadCache, Reconcile, Deactivate }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Select => "select",
        Phase::LoadCache => "load_cache",
        Phase::Reconcile => "reconcile",
        Phase::Deactivate => "deactivate",
    }}
    fn span(&self) -> Span { match self {
        Phase::Select => info_span!("select"),
        Phase::LoadCache => info_span!("load_cache"),
        Phase::Reconcile => info_span!("reconcile"),
        Phase::Deactivate => info_span!("deactivate"),
    }}
}

impl OpMarker for Mirror {
    const NAME: &'static str = "mirror";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("mirror") }
}
