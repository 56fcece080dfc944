use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Campaign,
    Creative,
    Flight,
    Map,
}

impl RemoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteKind::Campaign => "campaign",
            RemoteKind::Creative => "creative",
            RemoteKind::Flight => "flight",
            RemoteKind::Map => "map",
        }
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait RemoteEntity {
    const KIND: RemoteKind;

    fn id(&self) -> Option<i64>;
    fn is_active(&self) -> bool;

    /// Id of an entity the server handed back; a record without one is malformed.
    fn remote_id(&self) -> SyncResult<i64> {
        self.id().ok_or_else(|| SyncError::RemoteRejected {
            status: 0,
            message: format!("{} record returned without an Id", Self::KIND),
        })
    }
}

/// Entities addressed by a natural key built from local identifiers.
pub trait Named: RemoteEntity {
    fn natural_key(&self) -> &str;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteCampaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub advertiser_id: i64,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flights: Option<Vec<serde_json::Value>>,
    pub is_deleted: bool,
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteCreative {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub body: String,
    pub script_body: String,
    pub advertiser_id: i64,
    pub ad_type_id: i64,
    pub alt: String,
    #[serde(rename = "IsHTMLJS")]
    pub is_html_js: bool,
    pub is_sync: bool,
    pub is_deleted: bool,
    pub is_active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteFlight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub campaign_id: i64,
    pub priority_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub price: f64,
    pub option_type: i32,
    pub impressions: i64,
    pub is_unlimited: bool,
    pub is_full_speed: bool,
    pub keywords: String,
    pub goal_type: i32,
    pub rate_type: i32,
    pub is_freq_cap: bool,
    pub freq_cap: i64,
    pub freq_cap_duration: i32,
    pub freq_cap_type: i32,
    pub is_deleted: bool,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreativeRef {
    pub id: i64,
}

/// Creative-to-flight join. Never recreated for a pair once it exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub campaign_id: i64,
    pub flight_id: i64,
    pub creative: CreativeRef,
    pub publisher_account_id: i64,
    pub percentage: i32,
    pub distribution_type: i32,
    pub impressions: i64,
    pub size_override: bool,
    pub iframe: bool,
    pub is_deleted: bool,
    pub is_active: bool,
}

impl RemoteEntity for RemoteCampaign {
    const KIND: RemoteKind = RemoteKind::Campaign;
    fn id(&self) -> Option<i64> { self.id }
    fn is_active(&self) -> bool { self.is_active }
}

impl RemoteEntity for RemoteCreative {
    const KIND: RemoteKind = RemoteKind::Creative;
    fn id(&self) -> Option<i64> { self.id }
    fn is_active(&self) -> bool { self.is_active }
}

impl RemoteEntity for RemoteFlight {
    const KIND: RemoteKind = RemoteKind::Flight;
    fn id(&self) -> Option<i64> { self.id }
    fn is_active(&self) -> bool { self.is_active }
}

impl RemoteEntity for RemoteMap {
    const KIND: RemoteKind = RemoteKind::Map;
    fn id(&self) -> Option<i64> { self.id }
    fn is_active(&self) -> bool { self.is_active }
}

impl Named for RemoteCampaign {
    fn natural_key(&self) -> &str { &self.name }
}

impl Named for RemoteCreative {
    fn natural_key(&self) -> &str { &self.title }
}

impl Named for RemoteFlight {
    fn natural_key(&self) -> &str { &self.name }
}
