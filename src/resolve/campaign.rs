use tracing::info;

use crate::config::PlatformSettings;
use crate::error::SyncResult;
use crate::mapper::campaign_name;
use crate::model::{LocalPost, RemoteCampaign, RemoteEntity, RemoteKind};
use crate::util::time::{to_remote_date, today};

use super::{lookup, Action, ResolveCtx, Upserted};

pub fn desired(post: &LocalPost, settings: &PlatformSettings) -> RemoteCampaign {
    RemoteCampaign {
        id: None,
        name: campaign_name(post),
        advertiser_id: settings.advertiser_id,
        price: 0.0,
        start_date: None,
        flights: None,
        is_deleted: false,
        is_active: true,
    }
}

// name, start date and flight list are set once, at creation
fn overwrite(existing: &mut RemoteCampaign, desired: &RemoteCampaign) {
    existing.advertiser_id = desired.advertiser_id;
    existing.price = desired.price;
    existing.is_deleted = desired.is_deleted;
    existing.is_active = desired.is_active;
}

pub async fn find(ctx: &ResolveCtx<'_>, post: &LocalPost) -> SyncResult<Option<RemoteCampaign>> {
    let stored = ctx.mapper.get_remote_id(post, RemoteKind::Campaign);
    lookup(ctx, stored, &campaign_name(post)).await
}

/// Post -> remote Campaign.
pub async fn upsert(ctx: &ResolveCtx<'_>, post: &mut LocalPost) -> SyncResult<Upserted<RemoteCampaign>> {
    let name = campaign_name(post);
    let want = desired(post, ctx.settings);

    let (entity, action) = match find(ctx, post).await? {
        Some(mut existing) => {
            info!(kind = "campaign", key = %name, id = ?existing.id, "updating");
            overwrite(&mut existing, &want);
            ctx.remote.update_campaign(&existing).await?;
            (existing, Action::Updated)
        }
        None => {
            info!(kind = "campaign", key = %name, "creating");
            let mut fresh = want;
            fresh.start_date = Some(to_remote_date(today()));
            fresh.flights = Some(Vec::new());
            (ctx.remote.create_campaign(&fresh).await?, Action::Created)
        }
    };

    ctx.mapper.set_remote_id(post, RemoteKind::Campaign, entity.remote_id()?).await?;
    Ok(Upserted { entity, action })
}
