use super::models::SavedTracksResponse;
use crate::{
    error::{LikedYearsError, Result},
    traits::TrackSource,
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::liked::LikedPage;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.spotify.com";
const MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    base_url: Url,
    access_token: String,
    page_size: u32,
    request_timeout: Duration,
    client: Client,
}

#[derive(Default)]
pub struct SpotifyClientBuilder {
    base_url: Option<String>,
    access_token: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl SpotifyClientBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    pub fn access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Items per page, clamped to what the API accepts (1..=50).
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = Some(seconds);
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let access_token = self
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(LikedYearsError::NotConfigured)?;
        let base_url_str = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        // Keep a trailing slash so joins append to any path prefix
        let base_url = Url::parse(&format!("{}/", base_url_str.trim_end_matches('/')))?;

        Ok(SpotifyClient {
            base_url,
            access_token,
            page_size: self
                .page_size
                .unwrap_or(MAX_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            client: Client::new(),
        })
    }
}

impl SpotifyClient {
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// Offset of the first item on a 1-based page.
    fn offset_for(&self, cursor: u32) -> u32 {
        cursor.saturating_sub(1).saturating_mul(self.page_size)
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint)?;
        debug!("Request: GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LikedYearsError::Timeout(self.request_timeout.as_secs())
                } else {
                    LikedYearsError::Http(e)
                }
            })?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let text = if status.is_success() {
            response.text().await?
        } else {
            response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string())
        };
        parse_body(status, &text)
    }

    /// Fetch one page of the user's saved tracks.
    pub async fn liked_tracks_page(&self, cursor: u32) -> Result<LikedPage> {
        let offset = self.offset_for(cursor);
        let response: SavedTracksResponse = self
            .make_request(
                "v1/me/tracks",
                &[
                    ("limit", self.page_size.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        let total = response.total;
        let page = response.into_page();
        info!(
            "Fetched liked tracks page {} (offset {}): {} entries of {:?}, more: {}",
            cursor,
            offset,
            page.entries.len(),
            total,
            page.has_next
        );
        Ok(page)
    }

    pub async fn check_connection(&self) -> bool {
        self.make_request::<serde_json::Value>("v1/me", &[])
            .await
            .is_ok()
    }
}

fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T> {
    if status.is_success() {
        let body = if text.trim().is_empty() { "null" } else { text };
        serde_json::from_str(body).map_err(|e| LikedYearsError::Api {
            status: status.as_u16(),
            message: format!("JSON parse error: {e}"),
        })
    } else if status == StatusCode::UNAUTHORIZED {
        Err(LikedYearsError::Unauthorized(text.to_string()))
    } else {
        Err(LikedYearsError::Api {
            status: status.as_u16(),
            message: text.to_string(),
        })
    }
}

#[async_trait]
impl TrackSource for SpotifyClient {
    fn id(&self) -> &'static str {
        "spotify"
    }

    fn name(&self) -> &'static str {
        "Spotify"
    }

    async fn fetch_page(&self, cursor: u32) -> Result<LikedPage> {
        self.liked_tracks_page(cursor).await
    }
}
