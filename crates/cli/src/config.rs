//! CLI configuration

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default API endpoint, including the `/api` prefix
pub const DEFAULT_BASE_URL: &str = "http://localhost:8085/api";

/// Main CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// API connection settings
    pub api: ApiConfig,

    /// Directory for credentials and logs
    pub data_dir: PathBuf,
}

/// API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the API
    pub base_url: String,

    /// Per-request timeout in seconds (0 disables it)
    pub timeout_secs: u64,

    /// Override for the User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from defaults, an optional file, then
    /// `STUDYBOARD__*` environment variables
    pub fn load(file: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("STUDYBOARD").separator("__"))
            .build()
            .context("Failed to load configuration")?;

        let mut config: Self = settings.try_deserialize()?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url: invalid URL '{}'", self.api.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api.base_url: unsupported scheme '{}'", url.scheme());
        }
        Ok(())
    }

    /// Where the session credentials are stored
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }
}

/// Default data directory, honouring `STUDYBOARD_STATE_DIR`
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STUDYBOARD_STATE_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studyboard")
    }
}
