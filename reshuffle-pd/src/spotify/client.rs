//! Spotify Web API client
//!
//! Thin read/write wrapper over the playlist endpoints. Requests carry a
//! pre-issued bearer token and are paced to a minimum interval. Failures are
//! returned as-is; there is no retry.

use crate::source::CollectionSource;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use reshuffle_common::models::{lenient_timestamp, CollectionId};
use reshuffle_common::{Error, IgnoreSet, Item, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const USER_AGENT: &str = concat!("reshuffle/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RATE_LIMIT_MS: u64 = 100;

/// Page sizes accepted by the endpoints
const PLAYLISTS_PAGE_LIMIT: u32 = 50;
const TRACKS_PAGE_LIMIT: u32 = 100;

/// One page of a `{items, next}` listing
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserProfile {
    id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistSummary {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Owner {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistEntry {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<Value>,
}

/// Minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Spotify rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::Config(
                "Spotify access token not configured. Set SPOTIFY_ACCESS_TOKEN or access_token in config.toml"
                    .to_string(),
            ));
        }

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    /// Send a request and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request, returning the raw body of a success response
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<String> {
        self.rate_limiter.wait().await;

        let response = request
            .send()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Remote(e.to_string()))?;

        if status.as_u16() == 404 {
            return Err(Error::NotFound(body));
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }

    /// Follow `next` links from `first_url` until the listing is exhausted
    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next {
            let page: Page<T> = self.send_json(self.request(Method::GET, &url)).await?;
            pages += 1;
            items.extend(page.items);
            next = page.next;
        }

        debug!(pages, items = items.len(), "Pagination complete");
        Ok(items)
    }

    /// Id of the user the token belongs to
    pub async fn current_user_id(&self) -> Result<String> {
        let url = self.url("/me");
        let profile: UserProfile = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(profile.id)
    }
}

#[async_trait]
impl CollectionSource for SpotifyClient {
    async fn list_owned_collections(
        &self,
        principal: &str,
        ignore: &IgnoreSet,
    ) -> Result<Vec<CollectionId>> {
        let url = self.url(&format!("/me/playlists?limit={}", PLAYLISTS_PAGE_LIMIT));
        let playlists: Vec<PlaylistSummary> = self.get_all_pages(url).await?;
        Ok(owned_playlist_ids(playlists, principal, ignore))
    }

    async fn list_items(&self, collection: &str, include_local: bool) -> Result<Vec<Item>> {
        let url = self.url(&format!(
            "/playlists/{}/tracks?limit={}&additional_types=track&fields=items(track,added_at),next",
            collection, TRACKS_PAGE_LIMIT
        ));
        let entries: Vec<PlaylistEntry> = self.get_all_pages(url).await?;
        entries_to_items(entries, include_local)
    }
}

/// Keep playlists owned by `principal` that are not ignored, in listing order
pub(crate) fn owned_playlist_ids(
    playlists: Vec<PlaylistSummary>,
    principal: &str,
    ignore: &IgnoreSet,
) -> Vec<CollectionId> {
    playlists
        .into_iter()
        .filter(|p| {
            p.owner
                .as_ref()
                .and_then(|o| o.id.as_deref())
                .is_some_and(|owner| owner == principal)
        })
        .filter_map(|p| p.id)
        .filter(|id| !id.is_empty() && !ignore.contains(id))
        .collect()
}

/// Turn playlist entries into items, stamping each track with its `added_at`
///
/// Entries whose track is missing or not an object are dropped. Tracks without
/// an id are dropped unless `include_local` is set and they are local files.
pub(crate) fn entries_to_items(entries: Vec<PlaylistEntry>, include_local: bool) -> Result<Vec<Item>> {
    let mut items = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(Value::Object(mut track)) = entry.track else {
            continue;
        };

        let has_id = track
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        let is_local = track
            .get("is_local")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if !has_id && !(include_local && is_local) {
            continue;
        }

        let added_at = entry.added_at.map(Value::String).unwrap_or(Value::Null);
        track.insert("added_at".to_string(), added_at);
        items.push(serde_json::from_value(Value::Object(track))?);
    }

    Ok(items)
}
