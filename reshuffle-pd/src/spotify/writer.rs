//! Destination playlist writes
//!
//! Replacing contents is a PUT of the first chunk (which clears everything
//! else) followed by POSTs appending the remaining chunks.

use super::client::SpotifyClient;
use crate::source::CollectionWriter;
use async_trait::async_trait;
use reqwest::Method;
use reshuffle_common::{Error, Result, TtlCache};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

/// Maximum track URIs per add/replace request
pub const CHUNK_SIZE: usize = 100;

/// Default lifetime of an alias -> playlist id mapping
pub const ALIAS_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Deserialize)]
pub struct PlaylistInfo {
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct CachedAlias {
    playlist_id: String,
}

/// Options for a playlist created on behalf of an alias
#[derive(Debug, Clone, Default)]
pub struct NewPlaylist {
    pub name: String,
    pub public: bool,
    pub description: Option<String>,
}

/// Cache key mapping an internal alias to a playlist id
pub fn alias_key(user_id: &str, alias: &str) -> String {
    format!("playlist_alias:{}:{}:v1", user_id, alias)
}

/// Track URIs grouped into request-sized chunks
pub fn uri_chunks(track_ids: &[String]) -> Vec<Vec<String>> {
    track_ids
        .chunks(CHUNK_SIZE)
        .map(|chunk| chunk.iter().map(|id| format!("spotify:track:{}", id)).collect())
        .collect()
}

/// Playlist id remembered for `alias`, without creating anything on a miss
pub async fn lookup_alias_playlist(
    cache: &TtlCache,
    user_id: &str,
    alias: &str,
    ttl_seconds: u64,
) -> Result<Option<String>> {
    let cached = cache
        .get::<CachedAlias>(&alias_key(user_id, alias), ttl_seconds)
        .await?;
    Ok(cached.map(|c| c.playlist_id))
}

impl SpotifyClient {
    /// Fetch playlist name and id; `NotFound` if it does not exist
    pub async fn playlist_info(&self, playlist_id: &str) -> Result<PlaylistInfo> {
        let url = self.url(&format!("/playlists/{}?fields=id,name", playlist_id));
        self.send_json(self.request(Method::GET, &url)).await
    }

    /// Create a playlist for `user_id`, returning its id
    pub async fn create_playlist(&self, user_id: &str, options: &NewPlaylist) -> Result<String> {
        let url = self.url(&format!("/users/{}/playlists", user_id));
        let body = json!({
            "name": options.name,
            "public": options.public,
            "description": options.description.as_deref().unwrap_or(""),
        });

        let created: PlaylistInfo = self
            .send_json(self.request(Method::POST, &url).json(&body))
            .await?;
        created
            .id
            .ok_or_else(|| Error::Remote("Playlist creation returned no id".to_string()))
    }

    /// Resolve `alias` to a playlist id, creating the playlist on first use
    pub async fn ensure_alias_playlist(
        &self,
        cache: &TtlCache,
        user_id: &str,
        alias: &str,
        options: &NewPlaylist,
        ttl_seconds: u64,
    ) -> Result<String> {
        if let Some(playlist_id) = lookup_alias_playlist(cache, user_id, alias, ttl_seconds).await? {
            info!(alias, playlist_id = %playlist_id, "Using cached playlist for alias");
            return Ok(playlist_id);
        }

        info!(alias, name = %options.name, "Creating playlist for alias");
        let playlist_id = self.create_playlist(user_id, options).await?;
        cache
            .set(
                &alias_key(user_id, alias),
                &CachedAlias { playlist_id: playlist_id.clone() },
            )
            .await?;
        Ok(playlist_id)
    }
}

#[async_trait]
impl CollectionWriter for SpotifyClient {
    async fn replace_items(&self, collection: &str, item_ids: &[String]) -> Result<()> {
        if item_ids.is_empty() {
            warn!(playlist_id = collection, "No tracks to write, leaving playlist untouched");
            return Ok(());
        }

        let info = self.playlist_info(collection).await?;
        info!(
            playlist_id = collection,
            name = info.name.as_deref().unwrap_or("<unnamed>"),
            tracks = item_ids.len(),
            "Replacing playlist contents"
        );

        let url = self.url(&format!("/playlists/{}/tracks", collection));
        for (i, chunk) in uri_chunks(item_ids).into_iter().enumerate() {
            let method = if i == 0 { Method::PUT } else { Method::POST };
            self.send(self.request(method, &url).json(&json!({ "uris": chunk })))
                .await?;
        }

        info!(playlist_id = collection, tracks = item_ids.len(), "Playlist replaced");
        Ok(())
    }
}
