//! Playlist reference parsing
//!
//! Accepts any of:
//! - `https://open.spotify.com/playlist/<id>?si=...`
//! - `spotify:playlist:<id>`
//! - `<id>`

use reshuffle_common::{Error, Result};

const WEB_MARKER: &str = "open.spotify.com/playlist/";
const URI_MARKER: &str = "spotify:playlist:";

/// Extract the bare playlist id from a URL, URI or id
pub fn parse_playlist_id(input: &str) -> Result<String> {
    let input = input.trim();

    let id = if let Some((_, rest)) = input.split_once(WEB_MARKER) {
        rest.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/')
    } else if let Some((_, rest)) = input.split_once(URI_MARKER) {
        rest
    } else {
        input
    };

    if id.is_empty() || id.contains(['/', ':', ' ']) {
        return Err(Error::InvalidInput(format!(
            "Not a playlist URL, URI or id: '{}'",
            input
        )));
    }

    Ok(id.to_string())
}
