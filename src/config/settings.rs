//! Application settings and configuration management

use crate::error::{AppError, Result};
use crate::form::limits;
use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Endpoint compiled into the binary. `GEN_STUDIO_WS_URL` at build time replaces it.
pub const DEFAULT_WS_URL: &str = match option_env!("GEN_STUDIO_WS_URL") {
    Some(url) => url,
    None => "ws://localhost:8000/ws/generate",
};

/// Default location of the optional settings file
pub const DEFAULT_CONFIG_PATH: &str = "config/studio.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub defaults: FormDefaults,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the generation backend lives and how long to wait for it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Base HTTP URL for side endpoints. Derived from `ws_url` when unset.
    #[serde(default)]
    pub http_url: Option<String>,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// How long to wait for the backend's `ready` greeting before submitting anyway
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_health_timeout() -> u64 {
    5
}

fn default_ready_timeout() -> u64 {
    2000
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Resolve the health endpoint URL.
    ///
    /// With no explicit `http_url`, the WebSocket URL is reused with its scheme
    /// mapped to http(s) and its path replaced by `health_path`.
    pub fn health_url(&self) -> Result<String> {
        let mut url = match &self.http_url {
            Some(base) => Url::parse(base)
                .map_err(|e| AppError::config(format!("Invalid http_url '{}': {}", base, e)))?,
            None => {
                let mut url = Url::parse(&self.ws_url).map_err(|e| {
                    AppError::config(format!("Invalid ws_url '{}': {}", self.ws_url, e))
                })?;
                let scheme = match url.scheme() {
                    "wss" => "https",
                    _ => "http",
                };
                url.set_scheme(scheme).map_err(|_| {
                    AppError::config(format!("Cannot derive HTTP URL from '{}'", self.ws_url))
                })?;
                url
            }
        };

        url.set_path(&self.health_path);
        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            http_url: None,
            health_path: default_health_path(),
            connect_timeout_secs: default_connect_timeout(),
            health_timeout_secs: default_health_timeout(),
            ready_timeout_ms: default_ready_timeout(),
        }
    }
}

/// Initial values for the generation form
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormDefaults {
    #[serde(default)]
    pub negative: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_guidance")]
    pub guidance: f64,
    #[serde(default = "default_seed")]
    pub seed: String,
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_width() -> u32 {
    512
}

fn default_height() -> u32 {
    768
}

fn default_steps() -> u32 {
    24
}

fn default_guidance() -> f64 {
    7.0
}

fn default_seed() -> String {
    "123456".to_string()
}

fn default_strength() -> f64 {
    0.55
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            negative: String::new(),
            width: default_width(),
            height: default_height(),
            steps: default_steps(),
            guidance: default_guidance(),
            seed: default_seed(),
            strength: default_strength(),
        }
    }
}

/// Where finished images are written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_output_dir() -> String {
    "./generated".to_string()
}

fn default_file_prefix() -> String {
    "gen".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from the default file location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load settings from a specific file (TOML or YAML by extension), then
    /// apply `GEN_STUDIO__SECTION__KEY` environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let format = if path
            .extension()
            .map_or(false, |ext| ext == "yaml" || ext == "yml")
        {
            FileFormat::Yaml
        } else {
            FileFormat::Toml
        };

        let mut builder = Config::builder()
            .set_default("backend.ws_url", DEFAULT_WS_URL)?
            .set_default("backend.health_path", default_health_path())?
            .set_default("backend.connect_timeout_secs", default_connect_timeout())?
            .set_default("backend.health_timeout_secs", default_health_timeout())?
            .set_default("backend.ready_timeout_ms", default_ready_timeout())?
            .set_default("defaults.negative", "")?
            .set_default("defaults.width", default_width())?
            .set_default("defaults.height", default_height())?
            .set_default("defaults.steps", default_steps())?
            .set_default("defaults.guidance", default_guidance())?
            .set_default("defaults.seed", default_seed())?
            .set_default("defaults.strength", default_strength())?
            .set_default("output.dir", default_output_dir())?
            .set_default("output.file_prefix", default_file_prefix())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        if path.exists() {
            builder = builder.add_source(File::from(path).format(format));
        }

        builder = builder.add_source(
            Environment::with_prefix("GEN_STUDIO")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.backend.ws_url).map_err(|e| {
            AppError::config(format!("Invalid ws_url '{}': {}", self.backend.ws_url, e))
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(AppError::config(format!(
                "ws_url must use ws:// or wss://, got '{}'",
                self.backend.ws_url
            )));
        }

        if self.backend.connect_timeout_secs == 0 {
            return Err(AppError::config("connect_timeout_secs cannot be 0"));
        }

        let d = &self.defaults;
        if d.width < limits::MIN_DIMENSION || d.height < limits::MIN_DIMENSION {
            return Err(AppError::config(format!(
                "Default dimensions must be at least {}",
                limits::MIN_DIMENSION
            )));
        }
        if !limits::STEPS.contains(&d.steps) {
            return Err(AppError::config(format!(
                "Default steps must be within {}..={}",
                limits::STEPS.start(),
                limits::STEPS.end()
            )));
        }
        if !(limits::MIN_GUIDANCE..=limits::MAX_GUIDANCE).contains(&d.guidance) {
            return Err(AppError::config(format!(
                "Default guidance must be within {}..={}",
                limits::MIN_GUIDANCE,
                limits::MAX_GUIDANCE
            )));
        }
        if !(limits::MIN_STRENGTH..=limits::MAX_STRENGTH).contains(&d.strength) {
            return Err(AppError::config(format!(
                "Default strength must be within {}..={}",
                limits::MIN_STRENGTH,
                limits::MAX_STRENGTH
            )));
        }

        if self.output.dir.trim().is_empty() {
            return Err(AppError::config("Output directory cannot be empty"));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(AppError::config(format!(
                    "Unknown logging format '{}', expected json or pretty",
                    other
                )))
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            defaults: FormDefaults::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
