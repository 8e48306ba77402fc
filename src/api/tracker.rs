use crate::core::error::TrackerError;
use crate::models::listing::FreeListing;
use crate::utils::time::{unlimited_free_until, TrackerZone};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Listings requested per search; only the first page is read
pub const PAGE_SIZE: u32 = 50;

const FREE_DISCOUNT: &str = "FREE";
const SUCCESS_MESSAGE: &str = "SUCCESS";

/// Source of free listings and their download links
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// First page of listings in `mode` that are currently free
    async fn search_free(&self, mode: &str, now: DateTime<Utc>) -> Result<Vec<FreeListing>, TrackerError>;

    /// One-time download link, or `None` when the tracker refuses a token
    async fn fetch_download_link(&self, listing_id: &str) -> Result<Option<String>, TrackerError>;
}

/// API client for the tracker's torrent search and download token endpoints
pub struct TrackerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_delay: Duration,
    zone: TrackerZone,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    mode: &'a str,
    categories: Vec<String>,
    visible: u8,
    page_number: u32,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<SearchPage>,
}

/// Rows stay raw so one malformed listing does not fail the whole page
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListing {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "smallDescr", default)]
    pub small_descr: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_u64")]
    pub size: u64,
    pub status: ApiListingStatus,
}

#[derive(Debug, Deserialize)]
pub struct ApiListingStatus {
    #[serde(default)]
    pub discount: Option<String>,
    #[serde(rename = "discountEndTime", default)]
    pub discount_end_time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_u64")]
    pub seeders: u64,
    #[serde(default, deserialize_with = "deserialize_lenient_u64")]
    pub leechers: u64,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiListing {
    pub fn is_free(&self) -> bool {
        self.status.discount.as_deref() == Some(FREE_DISCOUNT)
    }

    /// Normalize into a [`FreeListing`]
    ///
    /// Returns `None` for listings that are not free, or whose end time
    /// cannot be parsed.
    pub fn into_free_listing(self, now: DateTime<Utc>, zone: &TrackerZone) -> Option<FreeListing> {
        if !self.is_free() {
            return None;
        }

        let free_until = match self.status.discount_end_time.as_deref().map(str::trim) {
            None | Some("") => unlimited_free_until(now),
            Some(raw) => match zone.parse(raw) {
                Some(at) => at,
                None => {
                    warn!(
                        listing_id = %self.id,
                        discount_end_time = %raw,
                        "Unparseable discountEndTime, skipping listing"
                    );
                    return None;
                }
            },
        };

        Some(FreeListing {
            id: self.id,
            name: self.name,
            small_descr: self.small_descr.unwrap_or_default(),
            size: self.size,
            seeders: self.status.seeders,
            leechers: self.status.leechers,
            free_until,
        })
    }
}

impl TrackerClient {
    pub fn new(
        base_url: String,
        api_key: String,
        request_delay: Duration,
        zone: TrackerZone,
    ) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            request_delay,
            zone,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST to the tracker after the fixed courtesy delay
    async fn post<F>(&self, path: &str, build: F) -> Result<reqwest::Response, TrackerError>
    where
        F: FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let request = self
            .client
            .post(self.endpoint(path))
            .header("x-api-key", &self.api_key);

        Ok(build(request).send().await?)
    }

    pub async fn search(&self, mode: &str) -> Result<SearchPage, TrackerError> {
        info!(mode = %mode, "Searching tracker for free torrents");

        let body = SearchRequest {
            mode,
            categories: Vec::new(),
            visible: 1,
            page_number: 1,
            page_size: PAGE_SIZE,
        };

        let response = self
            .post("api/torrent/search", |request| request.json(&body))
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::SearchStatus {
                status: response.status().as_u16(),
                category: mode.to_string(),
            });
        }

        let parsed = response.json::<SearchResponse>().await?;

        parsed.data.ok_or_else(|| {
            TrackerError::Decode(format!(
                "search in [{}] returned no data (message: {})",
                mode,
                parsed.message.as_deref().unwrap_or("<none>")
            ))
        })
    }
}

#[async_trait]
impl ListingSource for TrackerClient {
    async fn search_free(&self, mode: &str, now: DateTime<Utc>) -> Result<Vec<FreeListing>, TrackerError> {
        let page = self.search(mode).await?;
        let total = page.data.len();

        let free: Vec<FreeListing> = page
            .data
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<ApiListing>(row) {
                Ok(listing) => listing.into_free_listing(now, &self.zone),
                Err(e) => {
                    warn!(mode = %mode, error = %e, "Malformed listing in search results, skipping");
                    None
                }
            })
            .collect();

        debug!(mode = %mode, total = total, free = free.len(), "Tracker search completed");

        Ok(free)
    }

    async fn fetch_download_link(&self, listing_id: &str) -> Result<Option<String>, TrackerError> {
        let form = reqwest::multipart::Form::new().text("id", listing_id.to_string());

        let response = self
            .post("api/torrent/genDlToken", |request| request.multipart(form))
            .await?;

        if !response.status().is_success() {
            return Err(TrackerError::TokenStatus {
                status: response.status().as_u16(),
                listing_id: listing_id.to_string(),
            });
        }

        let parsed = response.json::<TokenResponse>().await?;

        if parsed.message.as_deref() != Some(SUCCESS_MESSAGE) {
            warn!(
                listing_id = %listing_id,
                message = ?parsed.message,
                "Tracker refused download token"
            );
            return Ok(None);
        }

        match parsed.data.as_ref().and_then(|d| d.as_str()) {
            Some(link) if !link.is_empty() => Ok(Some(link.to_string())),
            _ => {
                warn!(listing_id = %listing_id, "Download token response carried no link");
                Ok(None)
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(u64),
    Float(f64),
    Text(String),
}

fn deserialize_lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Lenient::Int(v)) => Ok(v),
        Some(Lenient::Float(v)) => Ok(v.max(0.0) as u64),
        Some(Lenient::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(Lenient::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Int(v) => Ok(v.to_string()),
        Lenient::Float(v) => Ok((v as u64).to_string()),
        Lenient::Text(s) => Ok(s),
    }
}
