//! Application configuration
//!
//! Loaded from a YAML file or from the environment (`.env` honoured).
//!
//! ```yaml
//! api_key: "..."
//! oauth_client_id: "12345"
//! storage_dir: ".vault-breakdown"
//! filters:
//!   category: weapon
//!   exclude_tier: exotic
//!   duplicates_only: true
//! breakdown:
//!   dimensions: [inventoryBucketHash, damageTypeHash, itemSubType]
//!   sort: count
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::OAuthSettings;
use crate::breakdown::{ItemDimension, SortMode};
use crate::pipeline::{InventoryFilters, ItemType, TierType};

pub const DEFAULT_BASE_URL: &str = "https://www.bungie.net";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_key: String,
    pub oauth_client_id: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Defaults to `{base_url}/en/oauth/authorize`
    #[serde(default)]
    pub authorize_url: Option<String>,

    /// Defaults to `{base_url}/platform/app/oauth/token/`
    #[serde(default)]
    pub token_url: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory holding the session record and login nonce
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Sent as the cache-busting parameter on static content
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub breakdown: BreakdownConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".vault-breakdown")
}

fn default_app_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

impl AppConfig {
    /// Build from environment variables.
    ///
    /// Requires `BUNGIE_API_KEY` and `BUNGIE_OAUTH_CLIENT_ID`; `BUNGIE_BASE_URL`,
    /// `BUNGIE_LANGUAGE`, `BUNGIE_TIMEOUT_SECS` and `VAULT_STORAGE_DIR` override
    /// the defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = var("BUNGIE_API_KEY").context("BUNGIE_API_KEY environment variable not set")?;
        let oauth_client_id = var("BUNGIE_OAUTH_CLIENT_ID")
            .context("BUNGIE_OAUTH_CLIENT_ID environment variable not set")?;

        let timeout_secs = match var("BUNGIE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("BUNGIE_TIMEOUT_SECS is not a number: {}", raw))?,
            None => default_timeout_secs(),
        };

        Ok(Self {
            api_key,
            oauth_client_id,
            base_url: var("BUNGIE_BASE_URL").unwrap_or_else(default_base_url),
            authorize_url: None,
            token_url: None,
            language: var("BUNGIE_LANGUAGE").unwrap_or_else(default_language),
            timeout_secs,
            storage_dir: var("VAULT_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_storage_dir),
            app_name: default_app_name(),
            filters: FilterConfig::default(),
            breakdown: BreakdownConfig::default(),
        })
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn authorize_url(&self) -> String {
        self.authorize_url
            .clone()
            .unwrap_or_else(|| format!("{}/en/oauth/authorize", self.base()))
    }

    pub fn token_url(&self) -> String {
        self.token_url
            .clone()
            .unwrap_or_else(|| format!("{}/platform/app/oauth/token/", self.base()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: self.oauth_client_id.clone(),
            authorize_url: self.authorize_url(),
            token_url: self.token_url(),
        }
    }
}

// =============================================================================
// Filters and breakdown defaults
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Weapon,
    Armor,
}

impl From<Category> for ItemType {
    fn from(category: Category) -> Self {
        match category {
            Category::Weapon => ItemType::WEAPON,
            Category::Armor => ItemType::ARMOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Common,
    Rare,
    Legendary,
    Exotic,
}

impl From<Tier> for TierType {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Common => TierType::COMMON,
            Tier::Rare => TierType::RARE,
            Tier::Legendary => TierType::LEGENDARY,
            Tier::Exotic => TierType::EXOTIC,
        }
    }
}

/// Initial filter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub category: Category,
    pub exclude_tier: Option<Tier>,
    pub duplicates_only: bool,
}

impl From<FilterConfig> for InventoryFilters {
    fn from(config: FilterConfig) -> Self {
        InventoryFilters {
            category: config.category.into(),
            exclude_tier: config.exclude_tier.map(TierType::from),
            duplicates_only: config.duplicates_only,
        }
    }
}

/// Initial grouping selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownConfig {
    pub dimensions: Vec<ItemDimension>,
    pub sort: SortMode,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            dimensions: ItemDimension::ALL.to_vec(),
            sort: SortMode::default(),
        }
    }
}
