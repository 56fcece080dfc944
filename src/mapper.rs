//! Local-to-remote identity: natural keys and stored remote id pointers.

use crate::error::{SyncError, SyncResult};
use crate::model::{LocalCampaign, LocalPost, RemoteKind};
use crate::store::{LinkTarget, LocalStore};

pub const KEY_SEPARATOR: char = '-';

pub fn campaign_name(post: &LocalPost) -> String {
    post.post_id.clone()
}

pub fn creative_title(post: &LocalPost, campaign: &LocalCampaign) -> String {
    format!("{}{}{}", post.post_id, KEY_SEPARATOR, campaign.campaign_id)
}

pub fn flight_name(campaign: &LocalCampaign) -> String {
    campaign.campaign_id.clone()
}

/// Split a creative title back into `(post_id, campaign_id)`.
///
/// Titles with more than one separator are ambiguous and yield `None`.
pub fn decode_creative_title(title: &str) -> Option<(&str, &str)> {
    let (post_id, campaign_id) = title.split_once(KEY_SEPARATOR)?;
    if post_id.is_empty() || campaign_id.is_empty() || campaign_id.contains(KEY_SEPARATOR) {
        return None;
    }
    Some((post_id, campaign_id))
}

/// Post id of a creative title whose campaign part is already known (from the
/// parent flight's name). Unlike [`decode_creative_title`] this tolerates
/// separators inside either id.
pub fn post_id_from_title<'a>(title: &'a str, campaign_id: &str) -> Option<&'a str> {
    let post_id = title.strip_suffix(campaign_id)?.strip_suffix(KEY_SEPARATOR)?;
    (!post_id.is_empty()).then_some(post_id)
}

/// Local records that carry remote id pointers.
pub trait Linked {
    fn link_target(&self) -> LinkTarget<'_>;
    fn stored_id(&self, kind: RemoteKind) -> Option<i64>;
    fn remote_slot(&mut self, kind: RemoteKind) -> Option<&mut Option<i64>>;
}

impl Linked for LocalPost {
    fn link_target(&self) -> LinkTarget<'_> {
        LinkTarget::Post(&self.post_id)
    }

    fn stored_id(&self, kind: RemoteKind) -> Option<i64> {
        match kind {
            RemoteKind::Campaign => self.adzerk_campaign_id,
            _ => None,
        }
    }

    fn remote_slot(&mut self, kind: RemoteKind) -> Option<&mut Option<i64>> {
        match kind {
            RemoteKind::Campaign => Some(&mut self.adzerk_campaign_id),
            _ => None,
        }
    }
}

impl Linked for LocalCampaign {
    fn link_target(&self) -> LinkTarget<'_> {
        LinkTarget::Campaign(&self.campaign_id)
    }

    fn stored_id(&self, kind: RemoteKind) -> Option<i64> {
        match kind {
            RemoteKind::Creative => self.adzerk_creative_id,
            RemoteKind::Flight => self.adzerk_flight_id,
            RemoteKind::Map => self.adzerk_map_id,
            RemoteKind::Campaign => None,
        }
    }

    fn remote_slot(&mut self, kind: RemoteKind) -> Option<&mut Option<i64>> {
        match kind {
            RemoteKind::Creative => Some(&mut self.adzerk_creative_id),
            RemoteKind::Flight => Some(&mut self.adzerk_flight_id),
            RemoteKind::Map => Some(&mut self.adzerk_map_id),
            RemoteKind::Campaign => None,
        }
    }
}

/// Reads and persists the remote id pointers stored on local records.
#[derive(Clone, Copy)]
pub struct EntityMapper<'a> {
    store: &'a dyn LocalStore,
}

impl<'a> EntityMapper<'a> {
    pub fn new(store: &'a dyn LocalStore) -> Self {
        Self { store }
    }

    pub fn get_remote_id<T: Linked>(&self, local: &T, kind: RemoteKind) -> Option<i64> {
        local.stored_id(kind)
    }

    /// Store `id` on `local`: committed to the store first, then mirrored onto
    /// the in-memory record so later resolvers in the same pass see it.
    pub async fn set_remote_id<T: Linked + Send>(&self, local: &mut T, kind: RemoteKind, id: i64) -> SyncResult<()> {
        if local.stored_id(kind) == Some(id) {
            return Ok(());
        }
        let target = local.link_target().name();
        if local.remote_slot(kind).is_none() {
            return Err(SyncError::InvalidLink { kind, target });
        }
        self.store.set_remote_id(local.link_target(), kind, id).await?;
        if let Some(slot) = local.remote_slot(kind) {
            *slot = Some(id);
        }
        Ok(())
    }
}
