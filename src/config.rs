//! Configuration file parser for ~/.config/palaver/config.toml.
//!
//! The config file is optional for browsing a public forum — a missing
//! file yields `Config::default()`, which still needs `forum_url` set
//! before the client can connect, so `main` reports that case with a
//! setup hint. Unknown keys are accepted (serde default behavior) but
//! logged as likely typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds the maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to `Default::default()`.
///
/// The custom `Debug` impl masks `api_token` so the credential cannot
/// leak through logs or error messages.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forum root URL, e.g. "https://discuss.example.com".
    /// The JSON:API lives under `<forum_url>/api`.
    pub forum_url: Option<String>,

    /// Flarum API token for the authenticated user.
    /// The PALAVER_TOKEN env var takes precedence over this key.
    pub api_token: Option<String>,

    /// Theme variant name ("dark" or "light").
    pub theme: String,

    /// Columns from the left screen edge that activate the discussion
    /// pane when the pointer enters them.
    pub pane_hot_edge: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forum_url: None,
            api_token: None,
            theme: "dark".to_string(),
            pane_hot_edge: 10,
        }
    }
}

/// Mask `api_token` in Debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("forum_url", &self.forum_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("theme", &self.theme)
            .field("pane_hot_edge", &self.pane_hot_edge)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line info
    /// - Unknown keys → accepted, logged as a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["forum_url", "api_token", "theme", "pane_hot_edge"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            forum = config.forum_url.as_deref().unwrap_or("<unset>"),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Resolve the API token: env var wins over the config file.
    pub fn resolve_token(&self) -> Option<secrecy::SecretString> {
        std::env::var("PALAVER_TOKEN")
            .ok()
            .or_else(|| self.api_token.clone())
            .map(secrecy::SecretString::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
