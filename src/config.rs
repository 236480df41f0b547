//! Deployment configuration.
//!
//! Layers, lowest to highest precedence: built-in defaults, the JSON file named by
//! `DRIVEPRESS_CONFIG`, then individual `DRIVEPRESS_*` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::access::AccessPolicy;
use crate::drive::{DriveClient, TokenSource, DEFAULT_API_BASE, METADATA_TOKEN_URL};
use crate::handler::DEFAULT_CACHE_CONTROL;
use crate::resolver::{ResolverConfig, Scope};

pub const CONFIG_ENV: &str = "DRIVEPRESS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub http_port: u16,
    /// `null` turns the client cache hint off.
    pub cache_control: Option<String>,
    pub access: AccessPolicy,
    pub resolver: ResolverConfig,
    pub drive: DriveConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8787,
            cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()),
            access: AccessPolicy::default(),
            resolver: ResolverConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    /// Drive `orderBy`; `null` leaves ordering to the provider.
    pub order_by: Option<String>,
    pub request_timeout_secs: u64,
    pub token: TokenConfig,
    /// Serve from a local JSON fixture instead of Drive.
    pub fixture_path: Option<PathBuf>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            order_by: Some("modifiedTime desc".to_string()),
            request_timeout_secs: 10,
            token: TokenConfig::default(),
            fixture_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenConfig {
    Static { token: String },
    MetadataServer { url: String },
}

impl Default for TokenConfig {
    fn default() -> Self { TokenConfig::MetadataServer { url: METADATA_TOKEN_URL.to_string() } }
}

impl TokenConfig {
    pub fn to_source(&self) -> TokenSource {
        match self {
            TokenConfig::Static { token } => TokenSource::Static(token.clone()),
            TokenConfig::MetadataServer { url } => TokenSource::MetadataServer { url: url.clone() },
        }
    }
}

impl DriveConfig {
    pub fn build_client(&self) -> Result<DriveClient> {
        DriveClient::new(
            &self.api_base,
            self.token.to_source(),
            self.order_by.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )
        .map_err(|e| anyhow!("building drive client: {e}"))
    }
}

impl AppConfig {
    /// A relative `drive.fixture_path` is taken relative to the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let mut cfg: Self = serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        if let (Some(fixture), Some(dir)) = (&cfg.drive.fixture_path, path.parent()) {
            if fixture.is_relative() {
                cfg.drive.fixture_path = Some(dir.join(fixture));
            }
        }
        Ok(cfg)
    }

    /// Defaults, then `$DRIVEPRESS_CONFIG`, then `DRIVEPRESS_*` overrides.
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().filter(|(k, _)| k.starts_with("DRIVEPRESS_")).collect();
        Self::load_from(&vars)
    }

    pub fn load_from(vars: &HashMap<String, String>) -> Result<Self> {
        let mut cfg = match vars.get(CONFIG_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        cfg.apply_env(vars)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        let get = |k: &str| vars.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(port) = get("DRIVEPRESS_HTTP_PORT") {
            self.http_port = port.parse().with_context(|| format!("DRIVEPRESS_HTTP_PORT is not a port: {port}"))?;
        }
        if let Some(domain) = get("DRIVEPRESS_STAGING_DOMAIN") {
            self.access.staging_domain = Some(domain.to_string());
        }
        if let Some(origins) = get("DRIVEPRESS_ALLOWED_ORIGINS") {
            self.access.allowed_origins = origins.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
        }
        if let Some(token) = get("DRIVEPRESS_ACCESS_TOKEN") {
            self.drive.token = TokenConfig::Static { token: token.to_string() };
        }
        if let Some(folder) = get("DRIVEPRESS_BLOG_FOLDER") {
            self.resolver.scopes.entry(Scope::Blog).or_default().folder_id = Some(folder.to_string());
        }
        if let Some(folder) = get("DRIVEPRESS_RECIPES_FOLDER") {
            self.resolver.scopes.entry(Scope::Recipes).or_default().folder_id = Some(folder.to_string());
        }
        if let Some(fixture) = get("DRIVEPRESS_FIXTURE") {
            self.drive.fixture_path = Some(PathBuf::from(fixture));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.resolver.validate().map_err(|e| anyhow!("invalid resolver config: {e}"))?;
        if self.drive.request_timeout_secs == 0 {
            return Err(anyhow!("drive.request_timeout_secs must be at least 1"));
        }
        if self.access.allowed_origins.is_empty() && self.access.staging_domain.is_none() {
            tracing::warn!(target: "startup", "no allowed origins and no staging domain: every request will be rejected");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
