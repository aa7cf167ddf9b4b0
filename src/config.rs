//! User configuration (`~/.config/converge/config.toml`)
//!
//! ```toml
//! [provider]
//! kind = "arm"
//!
//! [provider.arm]
//! endpoint = "https://management.azure.com"
//! token_env = "AZURE_ACCESS_TOKEN"
//! timeout_secs = 120
//!
//! [defaults]
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//!
//! [kinds.dns_zone]
//! path = "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Network/dnsZones/{name}"
//! api_version = "2018-05-01"
//! ```

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use reconcile::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{Catalog, CatalogEntry};
use crate::paths;

/// Which backend reconciles resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Azure Resource Manager REST API
    #[default]
    Arm,
    /// JSON documents in the state directory
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub provider: ProviderConfig,
    /// Parameters offered to every resource whose kind accepts them
    pub defaults: Record,
    pub apply: ApplyConfig,
    /// Additional kinds, keyed by name
    pub kinds: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub arm: ArmSettings,
    pub local: LocalSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmSettings {
    pub endpoint: String,
    /// Environment variable holding a bearer token
    pub token_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for ArmSettings {
    fn default() -> Self {
        let client = armkit::ClientConfig::default();
        Self {
            endpoint: client.endpoint,
            token_env: "AZURE_ACCESS_TOKEN".to_string(),
            timeout_secs: client.timeout_secs,
            max_attempts: client.max_attempts,
        }
    }
}

impl ArmSettings {
    /// Client settings, with the token read from the environment
    pub fn client_config(&self) -> armkit::ClientConfig {
        let token = std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        if token.is_none() {
            log::warn!("{} is not set; requests are sent without a token", self.token_env);
        }
        armkit::ClientConfig {
            endpoint: self.endpoint.clone(),
            token,
            timeout_secs: self.timeout_secs,
            max_attempts: self.max_attempts,
            user_agent: concat!("converge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalSettings {
    /// Store directory; `<state dir>/resources` when unset
    pub dir: Option<String>,
}

impl LocalSettings {
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(paths::expand(dir)),
            None => Ok(paths::state_dir()?.join("resources")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApplyConfig {
    /// Parallel reconciliations per wave
    pub jobs: usize,
    /// Ask before applying changes
    pub confirm: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            confirm: true,
        }
    }
}

impl Config {
    /// Load config from an explicit path, or the default location
    ///
    /// A missing default config file yields the defaults; a missing
    /// explicit one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = paths::config_file()?;
                if !path.exists() {
                    log::debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let arm = &self.provider.arm;
        if !arm.endpoint.starts_with("https://") && !arm.endpoint.starts_with("http://") {
            bail!("provider.arm.endpoint must be an http(s) URL, got {:?}", arm.endpoint);
        }
        if arm.token_env.trim().is_empty() {
            bail!("provider.arm.token_env cannot be empty");
        }
        if arm.timeout_secs == 0 {
            bail!("provider.arm.timeout_secs must be positive");
        }
        if self.apply.jobs == 0 {
            bail!("apply.jobs must be at least 1");
        }

        let problems: Vec<String> = self
            .catalog()
            .check()
            .into_iter()
            .filter(|p| self.kinds.keys().any(|name| p.starts_with(&format!("kind {name}:"))))
            .collect();
        if !problems.is_empty() {
            bail!("Invalid kinds in config:\n  {}", problems.join("\n  "));
        }
        Ok(())
    }

    /// Built-in kinds plus the ones declared here
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog::builtin();
        catalog.extend_custom(&self.kinds);
        catalog
    }
}
