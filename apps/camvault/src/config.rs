//! Daemon configuration.
//!
//! Reads JSON from `$XDG_CONFIG_HOME/camvault/config.json` (falling back to
//! `~/.config`), then overlays `CAMVAULT_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use camvault_cloud::Endpoints;
use camvault_protocol::Credentials;
use camvault_transfer::{DEFAULT_PIECE_SIZE, DEFAULT_SPLIT_THRESHOLD, PlanConfig};
use camvault_uploader::RetryPolicy;

const ENV_PREFIX: &str = "CAMVAULT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch_dir: PathBuf,
    /// Segment extension; empty accepts every file.
    pub extension: String,
    pub remote_folder: String,
    pub primary_token: String,
    pub secondary_token: Option<String>,
    pub session_cookie: String,
    pub webhook_url: Option<String>,
    pub api_base: String,
    pub upload_base: String,
    pub landing_url: String,
    pub http_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub split_threshold: u64,
    pub piece_size: u64,
    pub retry_attempts: u32,
    pub retry_initial_delay_secs: u64,
    pub retry_delay_step_secs: u64,
    /// Scrape fresh tokens from the landing page before each session.
    pub refresh_tokens: bool,
    /// Minimum age of scraped tokens before scraping again; 0 scrapes every time.
    pub token_max_age_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        let retry = RetryPolicy::default();
        Self {
            watch_dir: PathBuf::from("/var/lib/camvault/segments"),
            extension: "mp4".into(),
            remote_folder: "/recordings".into(),
            primary_token: String::new(),
            secondary_token: None,
            session_cookie: String::new(),
            webhook_url: None,
            api_base: endpoints.api_base,
            upload_base: endpoints.upload_base,
            landing_url: endpoints.landing_url,
            http_timeout_secs: 600,
            notify_timeout_secs: 10,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
            piece_size: DEFAULT_PIECE_SIZE,
            retry_attempts: retry.max_attempts,
            retry_initial_delay_secs: retry.initial_delay.as_secs(),
            retry_delay_step_secs: retry.delay_step.as_secs(),
            refresh_tokens: true,
            token_max_age_secs: 0,
        }
    }
}

impl AppConfig {
    /// Loads the file (explicit path must exist; the default path is
    /// optional), applies the environment and validates.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match config_file_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overlays `CAMVAULT_*` variables resolved through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(v) = var("WATCH_DIR") {
            self.watch_dir = PathBuf::from(v);
        }
        if let Some(v) = var("EXTENSION") {
            self.extension = v;
        }
        if let Some(v) = var("REMOTE_FOLDER") {
            self.remote_folder = v;
        }
        if let Some(v) = var("JS_TOKEN") {
            self.primary_token = v;
        }
        if let Some(v) = var("BDSTOKEN") {
            self.secondary_token = Some(v);
        }
        if let Some(v) = var("COOKIE") {
            self.session_cookie = v;
        }
        if let Some(v) = var("WEBHOOK_URL") {
            self.webhook_url = Some(v);
        }
        if let Some(v) = var("SPLIT_THRESHOLD") {
            self.split_threshold = parse_number("SPLIT_THRESHOLD", &v)?;
        }
        if let Some(v) = var("PIECE_SIZE") {
            self.piece_size = parse_number("PIECE_SIZE", &v)?;
        }
        if let Some(v) = var("REFRESH_TOKENS") {
            self.refresh_tokens = matches!(v.as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.primary_token.is_empty() || self.session_cookie.is_empty() {
            bail!("primary_token and session_cookie are required");
        }
        if self.piece_size == 0 {
            bail!("piece_size must be greater than zero");
        }
        if self.split_threshold < self.piece_size {
            bail!(
                "split_threshold ({}) must be at least piece_size ({})",
                self.split_threshold,
                self.piece_size
            );
        }
        if self.retry_attempts == 0 {
            bail!("retry_attempts must be at least 1");
        }
        if !self.remote_folder.starts_with('/') {
            bail!("remote_folder must be an absolute path");
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        let creds = Credentials::new(&self.primary_token, &self.session_cookie);
        match &self.secondary_token {
            Some(token) => creds.with_secondary(token),
            None => creds,
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            api_base: self.api_base.clone(),
            upload_base: self.upload_base.clone(),
            landing_url: self.landing_url.clone(),
        }
    }

    pub fn plan(&self) -> PlanConfig {
        PlanConfig::new(self.split_threshold, self.piece_size)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_initial_delay_secs),
            Duration::from_secs(self.retry_delay_step_secs),
        )
    }

    pub fn extension_filter(&self) -> Option<&str> {
        Some(self.extension.as_str()).filter(|e| !e.is_empty())
    }
}

fn parse_number(name: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{ENV_PREFIX}{name} must be an integer, got {value:?}"))
}

fn config_file_path() -> Option<PathBuf> {
    config_base_dir().map(|dir| dir.join("camvault").join("config.json"))
}

fn config_base_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
}
