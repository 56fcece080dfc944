//! Fixtures shared by unit tests.

use chrono::NaiveDate;

use crate::config::{PlatformSettings, RetryPolicy};
use crate::model::{ChargeState, LocalCampaign, LocalPost, ModerationState};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn post(post_id: &str) -> LocalPost {
    LocalPost {
        post_id: post_id.to_string(),
        title: format!("title of {post_id}"),
        author: "spez".into(),
        community: None,
        moderation: ModerationState::Accepted,
        adzerk_campaign_id: None,
    }
}

/// Charged campaign for 2024-01-01..2024-01-08, 70k impressions, even pacing.
pub fn campaign(campaign_id: &str, post_id: &str) -> LocalCampaign {
    LocalCampaign {
        campaign_id: campaign_id.to_string(),
        post_id: post_id.to_string(),
        start_date: day(2024, 1, 1),
        end_date: day(2024, 1, 8),
        impressions: 70_000,
        price: 70.0,
        serve_even: true,
        community: None,
        charge: ChargeState::Charged,
        adzerk_creative_id: None,
        adzerk_flight_id: None,
        adzerk_map_id: None,
    }
}

pub fn settings() -> PlatformSettings {
    PlatformSettings::default()
}

pub fn no_wait_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: std::time::Duration::ZERO,
        max_delay: std::time::Duration::ZERO,
    }
}
