use serde::Serialize;

use crate::error::SyncError;
use crate::model::RemoteKind;
use crate::resolve::Action;

/// Id and action of one resolver step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: i64,
    pub action: Action,
}

/// What `sync_one` did for a pair.
#[derive(Clone, Debug, Serialize)]
pub struct SyncOutcome {
    pub post_id: String,
    pub campaign_id: String,
    pub attempts: u32,
    pub campaign: Step,
    pub creative: Step,
    pub flight: Step,
    pub map: Step,
}

/// Remote entity switched off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Deactivated {
    pub kind: RemoteKind,
    pub id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Failure {
    /// `post/campaign` for pair syncs, `map <id>` for stale map deactivation,
    /// `map <flight>/<creative>` for a stale map the server gave no id.
    pub subject: String,
    pub error: String,
    pub retryable: bool,
}

impl Failure {
    pub fn new(subject: impl Into<String>, err: &SyncError) -> Self {
        Self { subject: subject.into(), error: err.to_string(), retryable: err.is_retryable() }
    }
}

/// Totals for a batch pass. One failure never stops the batch.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    pub synced: usize,
    pub skipped: usize,
    pub deactivated: Vec<Deactivated>,
    pub failures: Vec<Failure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub(crate) fn pair_label(post_id: &str, campaign_id: &str) -> String {
    format!("{post_id}/{campaign_id}")
}
