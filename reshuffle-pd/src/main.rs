//! reshuffle - refill a playlist with a weighted sample of your own playlists
//!
//! Aggregates every playlist the authenticated user owns (except the target),
//! scores each distinct track by frequency and recency, draws a
//! temperature-weighted sample, and replaces the target playlist's contents.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use reshuffle_common::config::TomlConfig;
use reshuffle_common::{time, IgnoreSet, TtlCache};
use reshuffle_pd::spotify::{
    lookup_alias_playlist, parse_playlist_id, NewPlaylist, SpotifyClient, ALIAS_TTL_SECONDS,
};
use reshuffle_pd::{CollectionWriter, ScorerKind, Selector};
use tracing::info;

/// Command-line arguments for reshuffle
///
/// Every option overrides the environment and the config file.
#[derive(Parser, Debug)]
#[command(name = "reshuffle")]
#[command(about = "Refill a playlist with a temperature-weighted sample of your playlists")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/reshuffle/config.toml)
    #[arg(short, long, env = "RESHUFFLE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tracks to draw
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Sampling temperature; 0 or below picks the top scores deterministically
    #[arg(short, long, allow_negative_numbers = true)]
    temperature: Option<f64>,

    /// Destination playlist (URL, spotify:playlist: URI or id)
    #[arg(long)]
    target: Option<String>,

    /// Internal alias for a destination playlist, created on first use
    #[arg(long, conflicts_with = "target")]
    alias: Option<String>,

    /// Scoring policy: frequency-recency or seasonal
    #[arg(long)]
    scorer: Option<String>,

    /// Include local (non-streamable) tracks in listings
    #[arg(long)]
    include_local: bool,

    /// Ignore cached listings and refetch everything
    #[arg(long)]
    refresh: bool,

    /// Print the selection without touching any playlist
    #[arg(long)]
    dry_run: bool,

    /// Cache database path
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

fn resolve_config(args: &Args) -> Result<TomlConfig> {
    let mut config = TomlConfig::load(args.config.as_deref())?;
    config.apply_env_overrides()?;

    if let Some(count) = args.count {
        config.sample_size = count;
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if let Some(target) = &args.target {
        config.target_playlist = Some(target.clone());
    }
    if let Some(scorer) = &args.scorer {
        config.scorer = scorer.clone();
    }
    if let Some(path) = &args.cache_path {
        config.cache_path = Some(path.clone());
    }
    config.include_local |= args.include_local;
    config.force_refresh |= args.refresh;

    Ok(config)
}

/// Where the sample gets written
#[derive(Debug, PartialEq)]
enum Destination {
    Alias(String),
    Playlist(String),
    Unset,
}

/// `--alias` outranks a target from the environment or config file
fn destination(args: &Args, config: &TomlConfig) -> Result<Destination> {
    if let Some(alias) = &args.alias {
        return Ok(Destination::Alias(alias.clone()));
    }
    match &config.target_playlist {
        Some(target) => Ok(Destination::Playlist(parse_playlist_id(target)?)),
        None => Ok(Destination::Unset),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args).context("Failed to resolve configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting reshuffle v{}", env!("CARGO_PKG_VERSION"));

    let scorer_kind: ScorerKind = config.scorer.parse()?;
    if config.temperature.is_nan() {
        bail!("Temperature must be a number");
    }

    let cache_path = config.resolved_cache_path();
    info!("Cache path: {}", cache_path.display());
    let cache = TtlCache::open(&cache_path)
        .await
        .context("Failed to open cache database")?;

    // Nothing older than the longest reader TTL can still be served
    cache
        .purge_expired(config.cache_ttl_seconds.max(ALIAS_TTL_SECONDS))
        .await
        .context("Failed to purge cache")?;

    let token = config.access_token.clone().unwrap_or_default();
    let client = SpotifyClient::new(&config.api_base_url, token)?;
    let principal = client
        .current_user_id()
        .await
        .context("Failed to resolve current user")?;
    info!(user = %principal, "Authenticated");

    let target = match destination(&args, &config)? {
        Destination::Playlist(playlist_id) => Some(playlist_id),
        Destination::Alias(alias) if args.dry_run => {
            // Still exclude an existing alias playlist so the pool matches a real run
            let existing =
                lookup_alias_playlist(&cache, &principal, &alias, ALIAS_TTL_SECONDS).await?;
            if existing.is_none() {
                info!(alias = %alias, "Alias has no playlist yet");
            }
            existing
        }
        Destination::Alias(alias) => {
            let options = NewPlaylist {
                name: alias.clone(),
                public: false,
                description: Some("Generated by reshuffle".to_string()),
            };
            Some(
                client
                    .ensure_alias_playlist(&cache, &principal, &alias, &options, ALIAS_TTL_SECONDS)
                    .await?,
            )
        }
        Destination::Unset if args.dry_run => None,
        Destination::Unset => {
            bail!("No target playlist. Pass --target, --alias or set target_playlist")
        }
    };

    // Never sample from the playlist being overwritten
    let ignore: IgnoreSet = target.iter().cloned().collect();

    let selector = Selector::new(client, cache, config.sampler_config());
    let scorer = scorer_kind.build(time::now());
    info!(
        count = config.sample_size,
        temperature = config.temperature,
        scorer = scorer_kind.as_str(),
        "Sampling tracks"
    );

    let tracks = selector
        .sample(
            &principal,
            config.sample_size,
            config.temperature,
            scorer.as_ref(),
            &ignore,
        )
        .await
        .context("Track sampling failed")?;

    for (i, track) in tracks.iter().enumerate() {
        let name = track
            .metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("<unknown>");
        println!(
            "{:>3}. {} {} (added {})",
            i + 1,
            track.identity().unwrap_or("-"),
            name,
            track.added_at.as_deref().unwrap_or("unknown")
        );
    }

    let track_ids: Vec<String> = tracks
        .iter()
        .filter_map(|t| t.identity().map(str::to_owned))
        .collect();

    match target {
        Some(playlist_id) if !args.dry_run => {
            selector
                .source()
                .inner()
                .replace_items(&playlist_id, &track_ids)
                .await
                .context("Failed to write target playlist")?;
            info!(playlist_id = %playlist_id, tracks = track_ids.len(), "Done");
        }
        _ => info!(tracks = track_ids.len(), "Dry run, no playlist modified"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "sample_size = 25\ntemperature = 2.0\nscorer = \"seasonal\"\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "reshuffle",
            "--config",
            config_path.to_str().unwrap(),
            "-n",
            "5",
            "--temperature",
            "-1",
            "--refresh",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.sample_size, 5);
        assert_eq!(config.temperature, -1.0);
        assert_eq!(config.scorer, "seasonal");
        assert!(config.force_refresh);
        assert!(!config.include_local);
    }

    #[test]
    fn test_alias_flag_outranks_configured_target() {
        let config = TomlConfig {
            target_playlist: Some("abc".to_string()),
            ..TomlConfig::default()
        };

        let args = Args::parse_from(["reshuffle", "--alias", "daily"]);
        assert_eq!(
            destination(&args, &config).unwrap(),
            Destination::Alias("daily".to_string())
        );

        let args = Args::parse_from(["reshuffle", "--alias", "daily", "--dry-run"]);
        assert_eq!(
            destination(&args, &config).unwrap(),
            Destination::Alias("daily".to_string())
        );
    }

    #[test]
    fn test_configured_target_is_parsed() {
        let args = Args::parse_from(["reshuffle"]);

        let config = TomlConfig {
            target_playlist: Some("https://open.spotify.com/playlist/37i9dQZF1DX?si=x".to_string()),
            ..TomlConfig::default()
        };
        assert_eq!(
            destination(&args, &config).unwrap(),
            Destination::Playlist("37i9dQZF1DX".to_string())
        );

        assert_eq!(
            destination(&args, &TomlConfig::default()).unwrap(),
            Destination::Unset
        );
    }

    #[test]
    fn test_alias_conflicts_with_target() {
        let result = Args::try_parse_from(["reshuffle", "--target", "abc", "--alias", "daily"]);
        assert!(result.is_err());
    }
}
