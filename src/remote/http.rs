use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::PlatformSettings;
use crate::error::{SyncError, SyncResult};
use crate::model::{RemoteCampaign, RemoteCreative, RemoteEntity, RemoteFlight, RemoteMap};

use super::AdServer;

const API_KEY_HEADER: &str = "X-Adzerk-ApiKey";

/// REST adapter for the ad server. Entities travel as JSON inside a form field
/// named after the entity; lists come back as `{"items": [...]}` pages.
#[derive(Clone)]
pub struct HttpAdServer {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdvertiserRow {
    id: i64,
}

impl HttpAdServer {
    pub fn new(cfg: &PlatformSettings) -> anyhow::Result<Self> {
        let Some(api_key) = cfg.api_key.clone() else {
            bail!("ADZERK_API_KEY is not set");
        };
        Url::parse(&cfg.base_url).with_context(|| format!("invalid ADZERK_BASE_URL: {}", cfg.base_url))?;
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .context("build http client")?;
        Ok(Self { http, base_url: cfg.base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(API_KEY_HEADER, &self.api_key)
    }

    async fn send(&self, req: RequestBuilder) -> SyncResult<(StatusCode, Body)> {
        let resp = self.authed(req).send().await.map_err(transport)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(transport)?;
        Ok((status, Body(body.to_vec())))
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Vec<T>> {
        let (status, body) = self.send(self.http.get(self.endpoint(path))).await?;
        check(status, &body)?;
        let page: ListPage<T> = body.decode()?;
        Ok(page.items)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<Option<T>> {
        let (status, body) = self.send(self.http.get(self.endpoint(path))).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check(status, &body)?;
        body.decode().map(Some)
    }

    async fn create<T: Serialize + DeserializeOwned>(&self, path: &str, field: &str, entity: &T) -> SyncResult<T> {
        let form = [(field, encode(entity)?)];
        let (status, body) = self.send(self.http.post(self.endpoint(path)).form(&form)).await?;
        check(status, &body)?;
        body.decode()
    }

    async fn update<T: Serialize>(&self, path: &str, field: &str, entity: &T) -> SyncResult<()> {
        let form = [(field, encode(entity)?)];
        let (status, body) = self.send(self.http.put(self.endpoint(path)).form(&form)).await?;
        check(status, &body)
    }
}

struct Body(Vec<u8>);

impl Body {
    fn decode<T: DeserializeOwned>(&self) -> SyncResult<T> {
        serde_json::from_slice(&self.0).map_err(|e| SyncError::RemoteRejected {
            status: 200,
            message: format!("undecodable response: {e}"),
        })
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0).trim().to_string()
    }
}

fn encode<T: Serialize>(entity: &T) -> SyncResult<String> {
    serde_json::to_string(entity).map_err(|e| SyncError::RemoteRejected {
        status: 0,
        message: format!("unencodable entity: {e}"),
    })
}

fn transport(err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::RemoteTransient("request timed out".into())
    } else {
        SyncError::RemoteTransient(format!("http error: {err}"))
    }
}

fn check(status: StatusCode, body: &Body) -> SyncResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SyncError::RemoteTransient(format!("{status}: {}", body.text())));
    }
    Err(SyncError::RemoteRejected { status: status.as_u16(), message: body.text() })
}

#[async_trait]
impl AdServer for HttpAdServer {
    async fn list_advertisers(&self) -> SyncResult<Vec<i64>> {
        let rows: Vec<AdvertiserRow> = self.list("advertiser").await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn list_campaigns(&self) -> SyncResult<Vec<RemoteCampaign>> {
        self.list("campaign").await
    }

    async fn get_campaign(&self, id: i64) -> SyncResult<Option<RemoteCampaign>> {
        self.get(&format!("campaign/{id}")).await
    }

    async fn create_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<RemoteCampaign> {
        self.create("campaign", "campaign", campaign).await
    }

    async fn update_campaign(&self, campaign: &RemoteCampaign) -> SyncResult<()> {
        let id = campaign.remote_id()?;
        self.update(&format!("campaign/{id}"), "campaign", campaign).await
    }

    async fn list_creatives(&self, advertiser_id: i64) -> SyncResult<Vec<RemoteCreative>> {
        self.list(&format!("advertiser/{advertiser_id}/creatives")).await
    }

    async fn get_creative(&self, id: i64) -> SyncResult<Option<RemoteCreative>> {
        self.get(&format!("creative/{id}")).await
    }

    async fn create_creative(&self, creative: &RemoteCreative) -> SyncResult<RemoteCreative> {
        self.create("creative", "creative", creative).await
    }

    async fn update_creative(&self, creative: &RemoteCreative) -> SyncResult<()> {
        let id = creative.remote_id()?;
        self.update(&format!("creative/{id}"), "creative", creative).await
    }

    async fn list_flights(&self) -> SyncResult<Vec<RemoteFlight>> {
        self.list("flight").await
    }

    async fn get_flight(&self, id: i64) -> SyncResult<Option<RemoteFlight>> {
        self.get(&format!("flight/{id}")).await
    }

    async fn create_flight(&self, flight: &RemoteFlight) -> SyncResult<RemoteFlight> {
        self.create("flight", "flight", flight).await
    }

    async fn update_flight(&self, flight: &RemoteFlight) -> SyncResult<()> {
        let id = flight.remote_id()?;
        self.update(&format!("flight/{id}"), "flight", flight).await
    }

    async fn list_maps(&self, flight_id: i64) -> SyncResult<Vec<RemoteMap>> {
        self.list(&format!("flight/{flight_id}/creative")).await
    }

    async fn get_map(&self, flight_id: i64, id: i64) -> SyncResult<Option<RemoteMap>> {
        self.get(&format!("flight/{flight_id}/creative/{id}")).await
    }

    async fn create_map(&self, flight_id: i64, map: &RemoteMap) -> SyncResult<RemoteMap> {
        self.create(&format!("flight/{flight_id}/creative"), "creativeFlightMap", map).await
    }

    async fn update_map(&self, map: &RemoteMap) -> SyncResult<()> {
        let id = map.remote_id()?;
        self.update(&format!("flight/{}/creative/{id}", map.flight_id), "creativeFlightMap", map).await
    }
}
