use chrono::NaiveDate;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Accepted,
    Rejected,
}

impl ModerationState {
    // unknown values never count as accepted
    pub fn from_db(s: &str) -> Self {
        match s {
            "accepted" => ModerationState::Accepted,
            "rejected" => ModerationState::Rejected,
            _ => ModerationState::Pending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeState {
    Unpaid,
    Authorized,
    Charged,
    Refunded,
    Voided,
}

impl ChargeState {
    pub fn from_db(s: &str) -> Self {
        match s {
            "authorized" => ChargeState::Authorized,
            "charged" => ChargeState::Charged,
            "refunded" => ChargeState::Refunded,
            "voided" => ChargeState::Voided,
            _ => ChargeState::Unpaid,
        }
    }
}

/// A promoted post. Mirrors one remote Campaign.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalPost {
    pub post_id: String,
    pub title: String,
    pub author: String,
    /// Community the post was submitted to; `None` for the front page.
    pub community: Option<String>,
    pub moderation: ModerationState,
    pub adzerk_campaign_id: Option<i64>,
}

/// A run schedule attached to exactly one post. Mirrors one remote Flight, and
/// together with its post one Creative and one Map.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalCampaign {
    pub campaign_id: String,
    pub post_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub impressions: i64,
    pub price: f64,
    pub serve_even: bool,
    /// Flight targeting; `None` means the front page.
    pub community: Option<String>,
    pub charge: ChargeState,
    pub adzerk_creative_id: Option<i64>,
    pub adzerk_flight_id: Option<i64>,
    pub adzerk_map_id: Option<i64>,
}

impl LocalCampaign {
    /// Whether `day` falls inside the `[start, end)` run window.
    pub fn runs_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day < self.end_date
    }
}
