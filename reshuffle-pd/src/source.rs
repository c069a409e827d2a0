//! Collection source and writer seams
//!
//! The remote playlist service sits behind [`CollectionSource`] (reads) and
//! [`CollectionWriter`] (destination replace). Implementations own pagination,
//! authentication and transport; the engine only sees complete listings.
//!
//! [`CachedSource`] layers the TTL cache over any source. Cache keys encode
//! every parameter that changes a listing plus a schema version tag, so a
//! change in stored shape only needs a new tag.

use async_trait::async_trait;
use reshuffle_common::config::SamplerConfig;
use reshuffle_common::models::CollectionId;
use reshuffle_common::{IgnoreSet, Item, Result, TtlCache};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Read access to the playlists of the remote service
#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Every playlist owned by `principal`, minus `ignore`, fully paginated
    async fn list_owned_collections(
        &self,
        principal: &str,
        ignore: &IgnoreSet,
    ) -> Result<Vec<CollectionId>>;

    /// Every track of `collection`, fully paginated
    ///
    /// Local tracks (no remote id) are only returned when `include_local`.
    async fn list_items(&self, collection: &str, include_local: bool) -> Result<Vec<Item>>;
}

/// Write access to a destination playlist
#[async_trait]
pub trait CollectionWriter: Send + Sync {
    /// Replace the entire contents of `collection` with `item_ids`, in order
    async fn replace_items(&self, collection: &str, item_ids: &[String]) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct CachedIds {
    ids: Vec<CollectionId>,
}

#[derive(Serialize, Deserialize)]
struct CachedTracks {
    tracks: Vec<Item>,
}

/// Cache key for a principal's owned playlists under an ignore-set
pub fn owned_collections_key(principal: &str, ignore: &IgnoreSet) -> String {
    let ignore_key = ignore.iter().map(String::as_str).collect::<Vec<_>>().join(",");
    format!("playlists:{}:owned:v1:ignore={}", principal, ignore_key)
}

/// Cache key for one playlist's tracks
pub fn collection_items_key(collection: &str, include_local: bool) -> String {
    format!(
        "playlist_tracks:{}:local={}:full:v1",
        collection, include_local
    )
}

/// Read-through TTL cache over a [`CollectionSource`]
pub struct CachedSource<S> {
    inner: S,
    cache: TtlCache,
    config: SamplerConfig,
}

impl<S: CollectionSource> CachedSource<S> {
    pub fn new(inner: S, cache: TtlCache, config: SamplerConfig) -> Self {
        Self { inner, cache, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub async fn owned_collections(
        &self,
        principal: &str,
        ignore: &IgnoreSet,
    ) -> Result<Vec<CollectionId>> {
        let key = owned_collections_key(principal, ignore);

        if !self.config.force_refresh {
            if let Some(cached) = self
                .cache
                .get::<CachedIds>(&key, self.config.ttl_seconds)
                .await?
            {
                debug!(principal, count = cached.ids.len(), "Owned playlists from cache");
                return Ok(cached.ids);
            }
        }

        let ids = self.inner.list_owned_collections(principal, ignore).await?;
        debug!(principal, count = ids.len(), "Fetched owned playlists");

        let entry = CachedIds { ids };
        self.cache.set(&key, &entry).await?;
        Ok(entry.ids)
    }

    pub async fn items(&self, collection: &str) -> Result<Vec<Item>> {
        let include_local = self.config.include_local;
        let key = collection_items_key(collection, include_local);

        if !self.config.force_refresh {
            if let Some(cached) = self
                .cache
                .get::<CachedTracks>(&key, self.config.ttl_seconds)
                .await?
            {
                debug!(collection, count = cached.tracks.len(), "Playlist tracks from cache");
                return Ok(cached.tracks);
            }
        }

        let tracks = self.inner.list_items(collection, include_local).await?;
        debug!(collection, count = tracks.len(), "Fetched playlist tracks");

        let entry = CachedTracks { tracks };
        self.cache.set(&key, &entry).await?;
        Ok(entry.tracks)
    }
}
