use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_HOST: &str = "crunchbase-crunchbase-v1.p.rapidapi.com";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub fetch: FetchConfig,
}

/// Connection settings and credentials, passed explicitly to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// RapidAPI key sent as `x-rapidapi-key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Value of the `x-rapidapi-host` header
    pub host: String,

    /// Scheme and host the `/odm-*` paths are appended to
    pub base_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound on concurrent page fetches; defaults to the core count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_HOST.to_string(),
            base_url: format!("https://{}", DEFAULT_HOST),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load config from the default location, then apply environment overrides.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            debug!("No config file at {:?}, using defaults", config_path);
            Self::default()
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse a config file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply `CBAPI_API_KEY` (falling back to `RAPIDAPI_KEY`) and `CBAPI_BASE_URL`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("CBAPI_API_KEY").or_else(|| lookup("RAPIDAPI_KEY")) {
            self.api.api_key = Some(key);
        }
        if let Some(url) = lookup("CBAPI_BASE_URL") {
            self.api.base_url = url;
        }
        self
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cbapi").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# cbapi configuration file
# Location: ~/.config/cbapi/config.toml (Linux)
#           ~/Library/Application Support/cbapi/config.toml (macOS)
#           %APPDATA%\cbapi\config.toml (Windows)

[api]
# RapidAPI key. CBAPI_API_KEY or RAPIDAPI_KEY in the environment take precedence.
# api_key = "your-rapidapi-key"

# Sent as the x-rapidapi-host header
host = "{host}"

# Endpoints are {{base_url}}/odm-organizations and {{base_url}}/odm-people
base_url = "https://{host}"

# Per-request timeout in seconds
timeout_secs = 30

[fetch]
# Maximum number of pages fetched concurrently.
# Defaults to the number of available cores.
# max_workers = 8
"#,
            host = DEFAULT_HOST
        )
    }
}
