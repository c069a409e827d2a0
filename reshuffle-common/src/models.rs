//! Track and playlist models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::time::parse_timestamp;

/// Playlist identifier as issued by the remote service
pub type CollectionId = String;

/// Playlists excluded from aggregation
///
/// Ordered so that cache keys built from it are canonical.
pub type IgnoreSet = BTreeSet<CollectionId>;

/// One track occurrence inside a playlist
///
/// Only `id`, `added_at` and `is_local` are interpreted. Every other field of
/// the remote record lands in `metadata` and is carried through untouched,
/// including through the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<String>,

    /// When the track was added to its playlist (raw remote string)
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub added_at: Option<String>,

    #[serde(default)]
    pub is_local: bool,

    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Accept any JSON value for a timestamp field, keeping only strings
///
/// A number, object or other non-string becomes `None` instead of failing the
/// whole record.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => Some(raw),
        _ => None,
    })
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            added_at: None,
            is_local: false,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_added_at(mut self, added_at: impl Into<String>) -> Self {
        self.added_at = Some(added_at.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Identity used for deduplication, if usable
    pub fn identity(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    /// Parsed `added_at`; unparseable and absent timestamps are both `None`
    pub fn added_instant(&self) -> Option<DateTime<Utc>> {
        self.added_at.as_deref().and_then(parse_timestamp)
    }
}
