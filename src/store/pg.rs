use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::error::{SyncError, SyncResult};
use crate::model::{ChargeState, LocalCampaign, LocalPost, ModerationState, RemoteKind};

use super::{LinkTarget, LocalStore};

#[derive(FromRow)]
struct PostRow {
    post_id: String,
    title: String,
    author: String,
    community: Option<String>,
    moderation: String,
    adzerk_campaign_id: Option<i64>,
}

impl From<PostRow> for LocalPost {
    fn from(r: PostRow) -> Self {
        LocalPost {
            post_id: r.post_id,
            title: r.title,
            author: r.author,
            community: r.community,
            moderation: ModerationState::from_db(&r.moderation),
            adzerk_campaign_id: r.adzerk_campaign_id,
        }
    }
}

#[derive(FromRow)]
struct CampaignRow {
    campaign_id: String,
    post_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    impressions: i64,
    price: f64,
    serve_even: bool,
    community: Option<String>,
    charge: String,
    adzerk_creative_id: Option<i64>,
    adzerk_flight_id: Option<i64>,
    adzerk_map_id: Option<i64>,
}

impl From<CampaignRow> for LocalCampaign {
    fn from(r: CampaignRow) -> Self {
        LocalCampaign {
            campaign_id: r.campaign_id,
            post_id: r.post_id,
            start_date: r.start_date,
            end_date: r.end_date,
            impressions: r.impressions,
            price: r.price,
            serve_even: r.serve_even,
            community: r.community,
            charge: ChargeState::from_db(&r.charge),
            adzerk_creative_id: r.adzerk_creative_id,
            adzerk_flight_id: r.adzerk_flight_id,
            adzerk_map_id: r.adzerk_map_id,
        }
    }
}

const POST_COLUMNS: &str = "post_id, title, author, community, moderation, adzerk_campaign_id";
const CAMPAIGN_COLUMNS: &str = "campaign_id, post_id, start_date, end_date, impressions, price, serve_even, \
     community, charge, adzerk_creative_id, adzerk_flight_id, adzerk_map_id";

/// Postgres-backed record store (`promo` schema).
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalStore for PgStore {
    async fn post(&self, post_id: &str) -> SyncResult<LocalPost> {
        let sql = format!("SELECT {POST_COLUMNS} FROM promo.post WHERE post_id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LocalPost::from)
            .ok_or_else(|| SyncError::UnknownRecord { what: "post", id: post_id.to_string() })
    }

    async fn campaign(&self, campaign_id: &str) -> SyncResult<LocalCampaign> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM promo.campaign WHERE campaign_id = $1");
        let row = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(LocalCampaign::from)
            .ok_or_else(|| SyncError::UnknownRecord { what: "campaign", id: campaign_id.to_string() })
    }

    async fn campaigns_for_post(&self, post_id: &str) -> SyncResult<Vec<LocalCampaign>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM promo.campaign WHERE post_id = $1 ORDER BY campaign_id"
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(LocalCampaign::from).collect())
    }

    async fn scheduled_pairs(&self, day: NaiveDate) -> SyncResult<Vec<(LocalPost, LocalCampaign)>> {
        let sql = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM promo.campaign \
             WHERE start_date <= $1 AND end_date > $1 \
             ORDER BY campaign_id"
        );
        let campaigns = sqlx::query_as::<_, CampaignRow>(&sql)
            .bind(day)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(campaigns.len());
        for row in campaigns {
            let campaign = LocalCampaign::from(row);
            let post = self.post(&campaign.post_id).await?;
            out.push((post, campaign));
        }
        Ok(out)
    }

    async fn set_remote_id(&self, target: LinkTarget<'_>, kind: RemoteKind, id: i64) -> SyncResult<()> {
        let (sql, key) = match (target, kind) {
            (LinkTarget::Post(key), RemoteKind::Campaign) => {
                ("UPDATE promo.post SET adzerk_campaign_id = $1 WHERE post_id = $2", key)
            }
            (LinkTarget::Campaign(key), RemoteKind::Creative) => {
                ("UPDATE promo.campaign SET adzerk_creative_id = $1 WHERE campaign_id = $2", key)
            }
            (LinkTarget::Campaign(key), RemoteKind::Flight) => {
                ("UPDATE promo.campaign SET adzerk_flight_id = $1 WHERE campaign_id = $2", key)
            }
            (LinkTarget::Campaign(key), RemoteKind::Map) => {
                ("UPDATE promo.campaign SET adzerk_map_id = $1 WHERE campaign_id = $2", key)
            }
            (target, kind) => return Err(SyncError::InvalidLink { kind, target: target.name() }),
        };
        let res = sqlx::query(sql).bind(id).bind(key).execute(&self.pool).await?;
        if res.rows_affected() == 0 {
            return Err(SyncError::UnknownRecord { what: target.name(), id: key.to_string() });
        }
        Ok(())
    }
}
