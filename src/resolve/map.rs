use tracing::{debug, info, warn};

use crate::config::PlatformSettings;
use crate::error::{SyncError, SyncResult};
use crate::mapper::creative_title;
use crate::model::{CreativeRef, LocalCampaign, LocalPost, RemoteEntity, RemoteKind, RemoteMap};

use super::{Action, ResolveCtx, Upserted};

const FULL_DISTRIBUTION: i32 = 100;
const DISTRIBUTION_FIXED: i32 = 2;

/// Remote ids a map joins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapParents {
    pub campaign_id: i64,
    pub creative_id: i64,
    pub flight_id: i64,
}

pub fn desired(campaign: &LocalCampaign, parents: MapParents, settings: &PlatformSettings) -> RemoteMap {
    RemoteMap {
        id: None,
        campaign_id: parents.campaign_id,
        flight_id: parents.flight_id,
        creative: CreativeRef { id: parents.creative_id },
        publisher_account_id: settings.advertiser_id,
        percentage: FULL_DISTRIBUTION,
        distribution_type: DISTRIBUTION_FIXED,
        impressions: campaign.impressions,
        size_override: false,
        iframe: false,
        is_deleted: false,
        is_active: true,
    }
}

fn parents(ctx: &ResolveCtx<'_>, post: &LocalPost, campaign: &LocalCampaign) -> SyncResult<MapParents> {
    let need = |kind: RemoteKind, id: Option<i64>| {
        id.ok_or_else(|| SyncError::missing(RemoteKind::Map, kind, creative_title(post, campaign)))
    };
    Ok(MapParents {
        campaign_id: need(RemoteKind::Campaign, ctx.mapper.get_remote_id(post, RemoteKind::Campaign))?,
        creative_id: need(RemoteKind::Creative, ctx.mapper.get_remote_id(campaign, RemoteKind::Creative))?,
        flight_id: need(RemoteKind::Flight, ctx.mapper.get_remote_id(campaign, RemoteKind::Flight))?,
    })
}

/// Find the map joining the pair, if any.
///
/// Order: stored id, snapshot, then the flight's own map list. The remote side
/// rejects a second map for a pair, so a miss here must be a real miss.
///
/// A stored map that joins another creative was built from this campaign's
/// earlier ids and is superseded: it is switched off and the pair is looked up
/// afresh.
pub async fn locate_pair(ctx: &ResolveCtx<'_>, stored: Option<i64>, flight_id: i64, creative_id: i64) -> SyncResult<Option<RemoteMap>> {
    if let Some(id) = stored {
        match ctx.remote.get_map(flight_id, id).await? {
            Some(m) if m.creative.id == creative_id => return Ok(Some(m)),
            Some(m) => retire(ctx, m).await?,
            None => debug!(id, flight_id, "stored map id not found under flight"),
        }
    }
    if let Some(m) = ctx.cache.snapshot().and_then(|s| s.find_map(flight_id, creative_id).cloned()) {
        return Ok(Some(m));
    }
    // snapshot may predate this flight, ask the server directly
    let listed = ctx.remote.list_maps(flight_id).await?;
    Ok(listed.into_iter().find(|m| m.creative.id == creative_id))
}

async fn retire(ctx: &ResolveCtx<'_>, map: RemoteMap) -> SyncResult<()> {
    if !map.is_active {
        return Ok(());
    }
    warn!(map = ?map.id, flight = map.flight_id, creative = map.creative.id, "switching off superseded map");
    ctx.remote.update_map(&RemoteMap { is_active: false, ..map }).await
}

/// (Flight, Creative) -> remote Map. Reactivates an existing map for the
/// pair instead of creating a second one.
pub async fn upsert(
    ctx: &ResolveCtx<'_>,
    post: &LocalPost,
    campaign: &mut LocalCampaign,
) -> SyncResult<Upserted<RemoteMap>> {
    let ids = parents(ctx, post, campaign)?;
    let want = desired(campaign, ids, ctx.settings);
    let stored = ctx.mapper.get_remote_id(campaign, RemoteKind::Map);

    let (entity, action) = match locate_pair(ctx, stored, ids.flight_id, ids.creative_id).await? {
        Some(existing) => {
            info!(kind = "map", flight = ids.flight_id, creative = ids.creative_id, id = ?existing.id, "updating");
            let updated = RemoteMap { id: existing.id, ..want };
            ctx.remote.update_map(&updated).await?;
            (updated, Action::Updated)
        }
        None => {
            info!(kind = "map", flight = ids.flight_id, creative = ids.creative_id, "creating");
            (ctx.remote.create_map(ids.flight_id, &want).await?, Action::Created)
        }
    };

    ctx.mapper.set_remote_id(campaign, RemoteKind::Map, entity.remote_id()?).await?;
    Ok(Upserted { entity, action })
}
