// src/config.rs
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "AICAMERA_ENDPOINT";
pub const ENV_PROMPT_ENDPOINT: &str = "AICAMERA_PROMPT_ENDPOINT";
pub const ENV_API_TOKEN: &str = "AICAMERA_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "AICAMERA_TIMEOUT_SECS";
pub const ENV_JPEG_QUALITY: &str = "AICAMERA_JPEG_QUALITY";

/// Runtime settings. Layered as defaults, then JSON file, then environment, then CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classification endpoint receiving `{"image": ...}`.
    pub endpoint: String,
    /// Endpoint for free-text prompts.
    pub prompt_endpoint: String,
    /// Sent as a bearer token when present.
    pub api_token: Option<String>,
    /// Whole-request timeout; `None` waits forever.
    pub timeout_secs: Option<u64>,
    pub jpeg_quality: u8,
    pub target_width: u32,
    pub target_height: u32,
    pub frames_per_second: u32,
    /// Rotate frames upright before upload.
    pub upright_frames: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/classify".to_string(),
            prompt_endpoint: "http://localhost:8080/predict".to_string(),
            api_token: None,
            timeout_secs: Some(30),
            jpeg_quality: 100,
            target_width: 1280,
            target_height: 720,
            frames_per_second: 30,
            upright_frames: false,
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` if given, then with the environment.
    /// Not validated yet: CLI flags may still replace any of it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.apply_env(lookup)?;
        debug!("Effective config: {:?}", config.redacted());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(endpoint) = lookup(ENV_PROMPT_ENDPOINT) {
            self.prompt_endpoint = endpoint;
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
            self.timeout_secs = Some(secs);
        }
        if let Some(quality) = lookup(ENV_JPEG_QUALITY) {
            self.jpeg_quality = quality
                .parse()
                .with_context(|| format!("{} must be 1-100", ENV_JPEG_QUALITY))?;
        }
        Ok(())
    }

    /// Checks for the scan flow: encoding, feed and classification endpoint.
    pub fn validate_for_scan(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!("jpeg_quality must be 1-100, got {}", self.jpeg_quality));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(anyhow!("Target resolution must be non-zero"));
        }
        if self.frames_per_second == 0 {
            return Err(anyhow!("frames_per_second must be at least 1"));
        }
        check_url("endpoint", &self.endpoint)
    }

    pub fn validate_for_prompt(&self) -> Result<()> {
        check_url("prompt_endpoint", &self.prompt_endpoint)
    }

    /// Request timeout. Zero from any source means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn target_resolution(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frames_per_second
    }

    fn redacted(&self) -> Config {
        let mut config = self.clone();
        if config.api_token.is_some() {
            config.api_token = Some("***".to_string());
        }
        config
    }
}

fn check_url(name: &str, url: &str) -> Result<()> {
    reqwest::Url::parse(url).with_context(|| format!("Invalid {} URL: {}", name, url))?;
    Ok(())
}
