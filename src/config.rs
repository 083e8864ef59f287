//! Runtime configuration
//!
//! Read from `DRIVE_*` environment variables, optionally seeded from a
//! `.env` file in the working directory.

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default Drive API base URL
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com";

/// Alias Drive accepts for the top of "My Drive"
pub const ROOT_FOLDER_ALIAS: &str = "root";

/// Default socket path for the local API
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/gdrive-browser.sock";

/// Drive caps `pageSize` at 1000
const MAX_PAGE_SIZE: u32 = 1000;

/// Where cached folder contents are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    File,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "file" | "filesystem" => Ok(CacheBackend::File),
            other => Err(anyhow!("unknown cache backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth bearer token for the Drive API
    pub access_token: Option<String>,
    pub api_url: String,
    /// Folder each new session starts in
    pub default_folder_id: String,
    /// Optional boundary above which breadcrumbs are not resolved
    pub root_folder_id: Option<String>,
    /// Zero disables caching
    pub cache_ttl: Duration,
    pub cache_backend: CacheBackend,
    pub cache_dir: PathBuf,
    pub page_size: u32,
    /// Upper bound on breadcrumb hops
    pub max_depth: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub socket_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            default_folder_id: ROOT_FOLDER_ALIAS.to_string(),
            root_folder_id: None,
            cache_ttl: Duration::from_secs(3600),
            cache_backend: CacheBackend::File,
            cache_dir: default_cache_dir(),
            page_size: 50,
            max_depth: 64,
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            access_token: var("DRIVE_ACCESS_TOKEN"),
            api_url: var("DRIVE_API_URL").unwrap_or(defaults.api_url),
            default_folder_id: var("DRIVE_DEFAULT_FOLDER_ID")
                .unwrap_or(defaults.default_folder_id),
            root_folder_id: var("DRIVE_ROOT_FOLDER_ID"),
            cache_ttl: match var("DRIVE_CACHE_TTL_SECS") {
                Some(v) => Duration::from_secs(parse_var("DRIVE_CACHE_TTL_SECS", &v)?),
                None => defaults.cache_ttl,
            },
            cache_backend: match var("DRIVE_CACHE_BACKEND") {
                Some(v) => v.parse::<CacheBackend>().context("DRIVE_CACHE_BACKEND")?,
                None => defaults.cache_backend,
            },
            cache_dir: var("DRIVE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            page_size: match var("DRIVE_PAGE_SIZE") {
                Some(v) => parse_var("DRIVE_PAGE_SIZE", &v)?,
                None => defaults.page_size,
            },
            max_depth: match var("DRIVE_MAX_DEPTH") {
                Some(v) => parse_var("DRIVE_MAX_DEPTH", &v)?,
                None => defaults.max_depth,
            },
            request_timeout: match var("DRIVE_REQUEST_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_var("DRIVE_REQUEST_TIMEOUT_SECS", &v)?),
                None => defaults.request_timeout,
            },
            max_retries: match var("DRIVE_MAX_RETRIES") {
                Some(v) => parse_var("DRIVE_MAX_RETRIES", &v)?,
                None => defaults.max_retries,
            },
            socket_path: var("DRIVE_SOCKET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.socket_path),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            bail!(
                "DRIVE_PAGE_SIZE must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.page_size
            );
        }
        if self.max_depth == 0 {
            bail!("DRIVE_MAX_DEPTH must be at least 1");
        }
        if self.request_timeout.is_zero() {
            bail!("DRIVE_REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("invalid {} '{}': {}", key, value, e))
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("gdrive-browser")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.default_folder_id, "root");
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.cache_backend, CacheBackend::File);
        assert!(config.access_token.is_none());
        assert!(config.root_folder_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DRIVE_ACCESS_TOKEN", "ya29.token"),
            ("DRIVE_DEFAULT_FOLDER_ID", "13-S74hr"),
            ("DRIVE_ROOT_FOLDER_ID", "13-S74hr"),
            ("DRIVE_CACHE_TTL_SECS", "0"),
            ("DRIVE_CACHE_BACKEND", "memory"),
            ("DRIVE_PAGE_SIZE", "200"),
            ("DRIVE_SOCKET_PATH", "/run/gdrive.sock"),
        ])
        .unwrap();
        assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(config.default_folder_id, "13-S74hr");
        assert_eq!(config.root_folder_id.as_deref(), Some("13-S74hr"));
        assert!(config.cache_ttl.is_zero());
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.page_size, 200);
        assert_eq!(config.socket_path, PathBuf::from("/run/gdrive.sock"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("DRIVE_DEFAULT_FOLDER_ID", "  "), ("DRIVE_PAGE_SIZE", "")]).unwrap();
        assert_eq!(config.default_folder_id, "root");
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("DRIVE_PAGE_SIZE", "0")]).is_err());
        assert!(load(&[("DRIVE_PAGE_SIZE", "5000")]).is_err());
        assert!(load(&[("DRIVE_CACHE_TTL_SECS", "soon")]).is_err());
        assert!(load(&[("DRIVE_CACHE_BACKEND", "redis")]).is_err());
        assert!(load(&[("DRIVE_MAX_DEPTH", "0")]).is_err());
    }
}
