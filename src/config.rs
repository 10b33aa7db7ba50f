use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use guestbox_core::store::{DEFAULT_DATA_KEY, DEFAULT_FLAG_KEY, DEFAULT_QUOTA_BYTES};
use guestbox_core::StoreOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub account: Option<AccountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_data_key")]
    pub data_key: String,
    #[serde(default = "default_flag_key")]
    pub flag_key: String,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            data_key: default_data_key(),
            flag_key: default_flag_key(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/guest-storage.json")
}
fn default_data_key() -> String {
    DEFAULT_DATA_KEY.to_string()
}
fn default_flag_key() -> String {
    DEFAULT_FLAG_KEY.to_string()
}
fn default_quota_bytes() -> u64 {
    DEFAULT_QUOTA_BYTES
}

impl StorageConfig {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            data_key: self.data_key.clone(),
            flag_key: self.flag_key.clone(),
            quota_bytes: self.quota_bytes,
        }
    }
}

/// Remote account backend (PostgREST-compatible) used by `migrate`.
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_key_env() -> String {
    "GUESTBOX_API_KEY".to_string()
}
fn default_token_env() -> String {
    "GUESTBOX_ACCESS_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

impl Config {
    /// Defaults used when no config file exists: local storage only,
    /// no remote account.
    pub fn minimal() -> Self {
        Self {
            storage: StorageConfig::default(),
            account: None,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate storage
    if config.storage.quota_bytes == 0 {
        anyhow::bail!("storage.quota_bytes must be > 0");
    }
    if config.storage.data_key.is_empty() || config.storage.flag_key.is_empty() {
        anyhow::bail!("storage.data_key and storage.flag_key must not be empty");
    }
    if config.storage.data_key == config.storage.flag_key {
        anyhow::bail!("storage.data_key and storage.flag_key must differ");
    }

    // Validate account
    if let Some(account) = &config.account {
        let url = reqwest::Url::parse(&account.url)
            .with_context(|| format!("account.url is not a valid URL: '{}'", account.url))?;
        match url.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!(
                "Unsupported account.url scheme: '{}'. Must be http or https.",
                other
            ),
        }
        if account.timeout_secs == 0 {
            anyhow::bail!("account.timeout_secs must be > 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config> {
        let config: Config = toml::from_str(text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.storage.quota_bytes, 5 * 1024 * 1024);
        assert_eq!(config.storage.data_key, "guest_data");
        assert!(config.account.is_none());
    }

    #[test]
    fn account_section_parses() {
        let config = parse(
            r#"
[storage]
path = "/tmp/g.json"
quota_bytes = 1000

[account]
url = "https://project.example.co"
max_retries = 0
"#,
        )
        .unwrap();
        let account = config.account.unwrap();
        assert_eq!(account.max_retries, 0);
        assert_eq!(account.timeout_secs, 30);
        assert_eq!(account.token_env, "GUESTBOX_ACCESS_TOKEN");
        assert_eq!(config.storage.store_options().quota_bytes, 1000);
    }

    #[test]
    fn rejects_zero_quota() {
        assert!(parse("[storage]\nquota_bytes = 0\n").is_err());
    }

    #[test]
    fn rejects_shared_keys() {
        assert!(parse("[storage]\ndata_key = \"k\"\nflag_key = \"k\"\n").is_err());
    }

    #[test]
    fn rejects_non_http_account_url() {
        assert!(parse("[account]\nurl = \"ftp://example.com\"\n").is_err());
        assert!(parse("[account]\nurl = \"not a url\"\n").is_err());
    }
}
