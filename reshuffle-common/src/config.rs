//! Configuration loading
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (applied by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file is not an error: the defaults apply and a warning is
//! logged. A config file that exists but does not parse is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default Spotify Web API root
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Configuration file contents
///
/// Every field is optional in the file; absent fields take compiled defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// SQLite cache file. `None` means [`default_cache_path`].
    pub cache_path: Option<PathBuf>,

    /// Maximum age of cached remote listings
    pub cache_ttl_seconds: u64,

    /// Number of tracks to draw
    pub sample_size: usize,

    /// Sampling temperature; `<= 0` selects deterministically
    pub temperature: f64,

    /// Keep local (id-less) tracks in fetched listings
    pub include_local: bool,

    /// Skip cache reads (results are still written back)
    pub force_refresh: bool,

    /// Scoring policy name: `frequency-recency` or `seasonal`
    pub scorer: String,

    /// Destination playlist (URL, `spotify:playlist:` URI or bare id)
    pub target_playlist: Option<String>,

    pub api_base_url: String,

    /// Pre-issued OAuth bearer token
    pub access_token: Option<String>,

    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            cache_ttl_seconds: 3600,
            sample_size: 10,
            temperature: 1.0,
            include_local: false,
            force_refresh: false,
            scorer: "frequency-recency".to_string(),
            target_playlist: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Engine settings handed explicitly to the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub ttl_seconds: u64,
    pub include_local: bool,
    pub force_refresh: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            include_local: false,
            force_refresh: false,
        }
    }
}

impl TomlConfig {
    /// Load configuration from `explicit`, or from the default location
    ///
    /// An explicitly named file must exist. The default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                Some(path) => {
                    warn!(
                        "No config file at {}, using built-in defaults",
                        path.display()
                    );
                    return Ok(Self::default());
                }
                None => {
                    warn!("Could not determine config directory, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config = Self::from_file(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Overlay `RESHUFFLE_*` / `SPOTIFY_ACCESS_TOKEN` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(path) = env_var("RESHUFFLE_CACHE_PATH") {
            self.cache_path = Some(PathBuf::from(path));
        }
        if let Some(ttl) = env_var("RESHUFFLE_CACHE_TTL_SECONDS") {
            self.cache_ttl_seconds = parse_env("RESHUFFLE_CACHE_TTL_SECONDS", &ttl)?;
        }
        if let Some(size) = env_var("RESHUFFLE_SAMPLE_SIZE") {
            self.sample_size = parse_env("RESHUFFLE_SAMPLE_SIZE", &size)?;
        }
        if let Some(temperature) = env_var("RESHUFFLE_TEMPERATURE") {
            self.temperature = parse_env("RESHUFFLE_TEMPERATURE", &temperature)?;
        }
        if let Some(scorer) = env_var("RESHUFFLE_SCORER") {
            self.scorer = scorer;
        }
        if let Some(target) = env_var("RESHUFFLE_TARGET_PLAYLIST") {
            self.target_playlist = Some(target);
        }
        if let Some(url) = env_var("RESHUFFLE_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(token) = env_var("SPOTIFY_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(level) = env_var("RESHUFFLE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Cache location after defaulting
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            ttl_seconds: self.cache_ttl_seconds,
            include_local: self.include_local,
            force_refresh: self.force_refresh,
        }
    }
}

/// Default config file location for the platform
///
/// `~/.config/reshuffle/config.toml` on Linux, the platform equivalent elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("reshuffle").join("config.toml"))
}

/// OS-dependent default cache database path
pub fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reshuffle").join("cache.sqlite"))
        .unwrap_or_else(|| PathBuf::from("./reshuffle_cache.sqlite"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", name, raw, e)))
}
