use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "adsync.v1";

#[derive(Debug, Clone, Serialize, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

/// One machine-readable document per job run. `apply` tells which of
/// `plan` and `result` is set.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub time: DateTime<Utc>,
    pub request_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Envelope {
    fn empty(op: &'static str, apply: bool, meta: Option<Meta>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply,
            plan: None,
            result: None,
            meta,
        }
    }

    pub fn plan<T: Serialize>(op: &'static str, plan: &T, meta: Option<Meta>) -> serde_json::Result<Self> {
        Ok(Self { plan: Some(serde_json::to_value(plan)?), ..Self::empty(op, false, meta) })
    }

    pub fn result<T: Serialize>(op: &'static str, result: &T, meta: Option<Meta>) -> serde_json::Result<Self> {
        Ok(Self { result: Some(serde_json::to_value(result)?), ..Self::empty(op, true, meta) })
    }

    pub fn payload(&self) -> Option<&Value> {
        if self.apply { self.result.as_ref() } else { self.plan.as_ref() }
    }
}
