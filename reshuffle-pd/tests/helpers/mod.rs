//! Test helpers for reshuffle-pd integration tests
//!
//! - FakeSource: in-memory playlists with call counters and failure injection
//! - temp_cache: throwaway cache database
//! - fake_api: Spotify Web API stand-in served over HTTP

pub mod fake_api;

use async_trait::async_trait;
use reshuffle_common::models::CollectionId;
use reshuffle_common::{Error, IgnoreSet, Item, Result, TtlCache};
use reshuffle_pd::CollectionSource;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// In-memory playlists owned by named users
#[derive(Default)]
pub struct FakeSource {
    /// playlist id -> (owner, tracks)
    playlists: BTreeMap<CollectionId, (String, Vec<Item>)>,
    failing_playlist: Option<CollectionId>,
    list_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playlist(mut self, id: &str, owner: &str, tracks: Vec<Item>) -> Self {
        self.playlists
            .insert(id.to_string(), (owner.to_string(), tracks));
        self
    }

    /// Make `list_items` fail for `id`
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing_playlist = Some(id.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionSource for FakeSource {
    async fn list_owned_collections(
        &self,
        principal: &str,
        ignore: &IgnoreSet,
    ) -> Result<Vec<CollectionId>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .playlists
            .iter()
            .filter(|(id, (owner, _))| owner == principal && !ignore.contains(*id))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn list_items(&self, collection: &str, include_local: bool) -> Result<Vec<Item>> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_playlist.as_deref() == Some(collection) {
            return Err(Error::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let tracks = self
            .playlists
            .get(collection)
            .map(|(_, tracks)| tracks.clone())
            .unwrap_or_default();
        Ok(tracks
            .into_iter()
            .filter(|t| t.identity().is_some() || (include_local && t.is_local))
            .collect())
    }
}

/// Open a cache in a fresh temporary directory
pub async fn temp_cache() -> (TempDir, TtlCache) {
    let dir = tempfile::tempdir().unwrap();
    let cache = TtlCache::open(&dir.path().join("cache.sqlite")).await.unwrap();
    (dir, cache)
}

/// Track with an id, an added timestamp and a marker of where it came from
pub fn track(id: &str, added_at: Option<&str>, from: &str) -> Item {
    let item = Item::new(id).with_metadata("from", serde_json::json!(from));
    match added_at {
        Some(ts) => item.with_added_at(ts),
        None => item,
    }
}
