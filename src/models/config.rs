//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::council::{CouncilProfile, Integration};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,

    /// External adapter script settings
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Address directory settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-council overrides
    #[serde(default = "defaults::councils")]
    pub councils: Vec<CouncilProfile>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.adapter.program.trim().is_empty() {
            return Err(AppError::validation("adapter.program is empty"));
        }
        if self.adapter.timeout_secs == 0 {
            return Err(AppError::validation("adapter.timeout_secs must be > 0"));
        }
        if self.adapter.placeholder_postcode.trim().is_empty() {
            return Err(AppError::validation("adapter.placeholder_postcode is empty"));
        }
        if !self.resolver.public_url.contains("{postcode}") {
            return Err(AppError::validation(
                "resolver.public_url must contain a {postcode} placeholder",
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(AppError::validation("cache.ttl_secs must be > 0"));
        }

        let mut seen = std::collections::HashSet::new();
        for council in &self.councils {
            if council.id.trim().is_empty() {
                return Err(AppError::validation("council with empty id"));
            }
            if !seen.insert(council.id.as_str()) {
                return Err(AppError::validation(format!(
                    "council '{}' is defined twice",
                    council.id
                )));
            }
        }
        Ok(())
    }

    /// Look up the override entry for a council.
    pub fn council(&self, id: &str) -> Option<&CouncilProfile> {
        self.councils.iter().find(|c| c.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            adapter: AdapterConfig::default(),
            resolver: ResolverConfig::default(),
            cache: CacheConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            councils: defaults::councils(),
        }
    }
}

/// HTTP client settings shared by the resolver and native adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::http_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::http_timeout(),
        }
    }
}

/// External adapter script settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Executable to run
    #[serde(default = "defaults::program")]
    pub program: String,

    /// Arguments placed before the council name
    #[serde(default = "defaults::program_args")]
    pub args: Vec<String>,

    /// Process timeout in seconds
    #[serde(default = "defaults::adapter_timeout")]
    pub timeout_secs: u64,

    /// Directory holding one script per council, scanned for the council list
    #[serde(default)]
    pub councils_dir: Option<PathBuf>,

    /// Postcode substituted when a UPRN arrives alone
    #[serde(default = "defaults::placeholder_postcode")]
    pub placeholder_postcode: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            program: defaults::program(),
            args: defaults::program_args(),
            timeout_secs: defaults::adapter_timeout(),
            councils_dir: None,
            placeholder_postcode: defaults::placeholder_postcode(),
        }
    }
}

/// Address directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Public directory page, `{postcode}` is replaced by the compact postcode
    #[serde(default = "defaults::public_url")]
    pub public_url: String,

    /// Privileged postcode endpoint
    #[serde(default = "defaults::places_url")]
    pub places_url: String,

    /// Keys at or below this length are treated as absent
    #[serde(default = "defaults::min_key_length")]
    pub min_key_length: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            public_url: defaults::public_url(),
            places_url: defaults::places_url(),
            min_key_length: defaults::min_key_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::bind")]
    pub bind: String,

    #[serde(default = "defaults::port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            port: defaults::port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use super::{CouncilProfile, Integration};

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; binday/0.1)".into()
    }
    pub fn http_timeout() -> u64 {
        15
    }

    // Adapter defaults
    pub fn program() -> String {
        "python3".into()
    }
    pub fn program_args() -> Vec<String> {
        vec![
            "-m".into(),
            "uk_bin_collection.uk_bin_collection.collect_data".into(),
        ]
    }
    pub fn adapter_timeout() -> u64 {
        120
    }
    pub fn placeholder_postcode() -> String {
        "ZZ1 1ZZ".into()
    }

    // Resolver defaults
    pub fn public_url() -> String {
        "https://uprn.uk/postcode/{postcode}".into()
    }
    pub fn places_url() -> String {
        "https://api.os.uk/search/places/v1/postcode".into()
    }
    pub fn min_key_length() -> usize {
        10
    }

    // Cache defaults
    pub fn cache_ttl() -> u64 {
        24 * 60 * 60
    }

    // Server defaults
    pub fn bind() -> String {
        "127.0.0.1".into()
    }
    pub fn port() -> u16 {
        8080
    }

    pub fn log_level() -> String {
        "info".into()
    }

    // Council override defaults
    pub fn councils() -> Vec<CouncilProfile> {
        vec![
            CouncilProfile {
                id: "WiltshireCouncil".into(),
                integration: Integration::Wiltshire,
                default_url: None,
                extra_flags: Vec::new(),
                requires_postcode: true,
            },
            CouncilProfile {
                id: "WasteServiceStandard".into(),
                integration: Integration::StandardApi,
                default_url: None,
                extra_flags: Vec::new(),
                requires_postcode: false,
            },
            CouncilProfile {
                id: "ValeofGlamorganCouncil".into(),
                integration: Integration::Script,
                default_url: Some(
                    "https://www.valeofglamorgan.gov.uk/en/living/Recycling-and-Waste/".into(),
                ),
                extra_flags: vec!["-s".into()],
                requires_postcode: false,
            },
        ]
    }
}
