use tracing::info;

use crate::config::PlatformSettings;
use crate::error::{SyncError, SyncResult};
use crate::mapper::flight_name;
use crate::model::{LocalCampaign, RemoteEntity, RemoteFlight, RemoteKind};
use crate::util::time::to_remote_date;

use super::{lookup, Action, ResolveCtx, Upserted};

const OPTION_TYPE_CPM: i32 = 1;
const GOAL_TYPE_IMPRESSIONS: i32 = 1;
const RATE_TYPE_FLAT: i32 = 2;
const FREQ_CAP_DURATION: i32 = 1;
const FREQ_CAP_TYPE_DAY: i32 = 2;

pub fn keyword(campaign: &LocalCampaign, settings: &PlatformSettings) -> String {
    campaign
        .community
        .clone()
        .unwrap_or_else(|| settings.front_page_keyword.clone())
}

pub fn desired(campaign: &LocalCampaign, remote_campaign_id: i64, settings: &PlatformSettings) -> RemoteFlight {
    RemoteFlight {
        id: None,
        name: flight_name(campaign),
        campaign_id: remote_campaign_id,
        priority_id: settings.priority_id,
        start_date: to_remote_date(campaign.start_date),
        end_date: to_remote_date(campaign.end_date),
        price: campaign.price,
        option_type: OPTION_TYPE_CPM,
        impressions: campaign.impressions,
        is_unlimited: false,
        is_full_speed: !campaign.serve_even,
        keywords: keyword(campaign, settings),
        goal_type: GOAL_TYPE_IMPRESSIONS,
        rate_type: RATE_TYPE_FLAT,
        is_freq_cap: true,
        freq_cap: settings.freq_cap,
        freq_cap_duration: FREQ_CAP_DURATION,
        freq_cap_type: FREQ_CAP_TYPE_DAY,
        is_deleted: false,
        is_active: true,
    }
}

pub async fn find(ctx: &ResolveCtx<'_>, campaign: &LocalCampaign) -> SyncResult<Option<RemoteFlight>> {
    let stored = ctx.mapper.get_remote_id(campaign, RemoteKind::Flight);
    lookup(ctx, stored, &flight_name(campaign)).await
}

/// Campaign -> remote Flight under the post's remote campaign.
pub async fn upsert(
    ctx: &ResolveCtx<'_>,
    campaign: &mut LocalCampaign,
    remote_campaign_id: Option<i64>,
) -> SyncResult<Upserted<RemoteFlight>> {
    let name = flight_name(campaign);
    let Some(parent) = remote_campaign_id else {
        return Err(SyncError::missing(RemoteKind::Flight, RemoteKind::Campaign, name));
    };

    let want = desired(campaign, parent, ctx.settings);

    let (entity, action) = match find(ctx, campaign).await? {
        Some(existing) => {
            info!(kind = "flight", key = %name, id = ?existing.id, "updating");
            let updated = RemoteFlight { id: existing.id, ..want };
            ctx.remote.update_flight(&updated).await?;
            (updated, Action::Updated)
        }
        None => {
            info!(kind = "flight", key = %name, "creating");
            (ctx.remote.create_flight(&want).await?, Action::Created)
        }
    };

    ctx.mapper.set_remote_id(campaign, RemoteKind::Flight, entity.remote_id()?).await?;
    Ok(Upserted { entity, action })
}
