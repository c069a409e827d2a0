//! Spotify collaborator: playlist listing, track listing and playlist writes

pub mod client;
pub mod playlist_ref;
pub mod writer;

pub use client::SpotifyClient;
pub use playlist_ref::parse_playlist_id;
pub use writer::{lookup_alias_playlist, NewPlaylist, ALIAS_TTL_SECONDS};
