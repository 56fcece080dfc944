use serde_json::json;
use tracing::info;

use crate::config::PlatformSettings;
use crate::error::{SyncError, SyncResult};
use crate::mapper::creative_title;
use crate::model::{LocalCampaign, LocalPost, RemoteCreative, RemoteEntity, RemoteKind};

use super::{lookup, Action, ResolveCtx, Upserted};

/// Community the ad is shown for: the campaign's override, else the post's
/// own community, else the front page.
pub fn target(post: &LocalPost, campaign: &LocalCampaign, settings: &PlatformSettings) -> String {
    campaign
        .community
        .as_ref()
        .or(post.community.as_ref())
        .cloned()
        .unwrap_or_else(|| settings.front_page_keyword.clone())
}

/// Ad payload the serving script renders.
pub fn render_payload(post: &LocalPost, campaign: &LocalCampaign, settings: &PlatformSettings) -> String {
    json!({
        "link": post.post_id,
        "campaign": campaign.campaign_id,
        "title": post.title,
        "author": post.author,
        "target": target(post, campaign, settings),
    })
    .to_string()
}

pub fn desired(post: &LocalPost, campaign: &LocalCampaign, settings: &PlatformSettings) -> RemoteCreative {
    let title = creative_title(post, campaign);
    RemoteCreative {
        id: None,
        body: title.clone(),
        title,
        script_body: render_payload(post, campaign, settings),
        advertiser_id: settings.advertiser_id,
        ad_type_id: settings.ad_type_id,
        alt: post.title.clone(),
        is_html_js: true,
        is_sync: false,
        is_deleted: false,
        is_active: true,
    }
}

pub async fn find(ctx: &ResolveCtx<'_>, post: &LocalPost, campaign: &LocalCampaign) -> SyncResult<Option<RemoteCreative>> {
    let stored = ctx.mapper.get_remote_id(campaign, RemoteKind::Creative);
    lookup(ctx, stored, &creative_title(post, campaign)).await
}

/// (Post, Campaign) -> remote Creative. The post must already have its
/// remote campaign.
pub async fn upsert(
    ctx: &ResolveCtx<'_>,
    post: &LocalPost,
    campaign: &mut LocalCampaign,
) -> SyncResult<Upserted<RemoteCreative>> {
    let title = creative_title(post, campaign);
    if ctx.mapper.get_remote_id(post, RemoteKind::Campaign).is_none() {
        return Err(SyncError::missing(RemoteKind::Creative, RemoteKind::Campaign, title));
    }

    let want = desired(post, campaign, ctx.settings);

    let (entity, action) = match find(ctx, post, campaign).await? {
        Some(existing) => {
            info!(kind = "creative", key = %title, id = ?existing.id, "updating");
            let updated = RemoteCreative { id: existing.id, ..want };
            ctx.remote.update_creative(&updated).await?;
            (updated, Action::Updated)
        }
        None => {
            info!(kind = "creative", key = %title, "creating");
            (ctx.remote.create_creative(&want).await?, Action::Created)
        }
    };

    ctx.mapper.set_remote_id(campaign, RemoteKind::Creative, entity.remote_id()?).await?;
    Ok(Upserted { entity, action })
}
