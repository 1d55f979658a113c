use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
    #[error("Failed to write client config: {0}")]
    WriteError(#[from] std::io::Error),
}

/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Path of the JSON file recording which providers are linked.
    pub client_config_path: PathBuf,
    /// Directory holding per-provider OAuth token cache files.
    pub credentials_dir: PathBuf,
    /// Provider-issued OAuth client id/secret JSON for Google Drive.
    pub gdrive_client_secret_path: PathBuf,
    /// Override for the Google API base URL (testing against a mock).
    pub gdrive_api_base: Option<String>,
    /// Directory holding the provider logos embedded into the link page.
    pub assets_dir: PathBuf,
    pub log_file: PathBuf,
    /// Maximum multipart upload size in bytes
    pub max_upload_size: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:9999".to_string());

        let client_config_path = std::env::var("CLIENT_CONFIG")
            .unwrap_or_else(|_| "horcrux_client_config.json".to_string())
            .into();

        let credentials_dir = std::env::var("CREDENTIALS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_credentials_dir());

        let gdrive_client_secret_path = std::env::var("GDRIVE_CLIENT_SECRET")
            .unwrap_or_else(|_| "gdrive_client_secret.json".to_string())
            .into();

        let gdrive_api_base = std::env::var("GDRIVE_API_BASE").ok();

        let assets_dir = std::env::var("ASSETS_DIR")
            .unwrap_or_else(|_| "assets".to_string())
            .into();

        let log_file = std::env::var("LOG_FILE")
            .unwrap_or_else(|_| "horcrux.log".to_string())
            .into();

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24 * 1024 * 1024); // 24MB

        let config = Config {
            bind_address,
            client_config_path,
            credentials_dir,
            gdrive_client_secret_path,
            gdrive_api_base,
            assets_dir,
            log_file,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.is_empty() {
            return Err(ConfigError::ValidationError(
                "BIND_ADDRESS cannot be empty".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_credentials_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".credentials")
}

/// Which storage providers the user has linked. Field names match the
/// on-disk JSON written by earlier versions of the tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(rename = "UsingGdrive")]
    pub using_gdrive: bool,
    #[serde(rename = "UsingDropbox")]
    pub using_dropbox: bool,
    #[serde(rename = "UsingFlickr")]
    pub using_flickr: bool,
}

impl ClientConfig {
    pub fn any_enabled(&self) -> bool {
        self.using_gdrive || self.using_dropbox || self.using_flickr
    }
}

/// Persists the client configuration to a local JSON file. Loaded once at
/// startup; flushed whenever a provider is newly linked.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: ClientConfig,
}

impl ConfigStore {
    /// Load the client configuration. A missing or corrupt file is treated
    /// as "no providers linked" rather than an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let config = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Client config unreadable, treating all providers as disabled"
                    );
                    ClientConfig::default()
                }
            },
            Err(_) => ClientConfig::default(),
        };

        tracing::info!(path = %path.display(), ?config, "Loaded client config");
        Self { path, config }
    }

    pub fn get(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_enabled(&self, provider: crate::backend::Provider) -> bool {
        use crate::backend::Provider;
        match provider {
            Provider::Gdrive => self.config.using_gdrive,
            Provider::Dropbox => self.config.using_dropbox,
            Provider::Flickr => self.config.using_flickr,
        }
    }

    /// Mark a provider as linked and flush to disk.
    pub fn enable(&mut self, provider: crate::backend::Provider) -> Result<(), ConfigError> {
        use crate::backend::Provider;
        match provider {
            Provider::Gdrive => self.config.using_gdrive = true,
            Provider::Dropbox => self.config.using_dropbox = true,
            Provider::Flickr => self.config.using_flickr = true,
        }
        self.save()
    }

    fn save(&self) -> Result<(), ConfigError> {
        tracing::info!(path = %self.path.display(), config = ?self.config, "Saving client config");
        let raw = serde_json::to_vec(&self.config)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
