//! Provider configuration: credentials plus folder settings.
//!
//! Built once by whoever constructs the provider and shared immutably.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProviderError, Result};

pub const DEFAULT_API_URL: &str = "https://api.box.com/2.0";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.box.com/api/2.0";
/// Id Box assigns to the account's root folder
pub const ROOT_FOLDER_ID: &str = "0";

/// Bearer credentials for the remote API
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Where the provider is rooted and which endpoints it talks to
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Id of the folder that virtual `/` maps to
    pub folder: String,
    /// Base path that virtual paths are joined onto
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
}

fn default_path() -> String {
    "/".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

impl Settings {
    pub fn new(folder: impl Into<String>) -> Self {
        Settings {
            folder: folder.into(),
            path: default_path(),
            api_url: default_api_url(),
            upload_url: default_upload_url(),
        }
    }
}

/// Immutable configuration handed to the provider at construction
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub credentials: Credentials,
    pub settings: Settings,
}

impl ProviderConfig {
    pub fn new(credentials: Credentials, settings: Settings) -> Self {
        ProviderConfig {
            credentials,
            settings,
        }
    }

    /// Build from the opaque credential and settings objects supplied by
    /// the service that hosts the provider
    pub fn from_json(credentials: &Value, settings: &Value) -> Result<Self> {
        let credentials = Credentials::deserialize(credentials)?;
        let settings = Settings::deserialize(settings)?;
        Ok(Self::new(credentials, settings))
    }

    /// Build from `BOX_TOKEN`, `BOX_FOLDER_ID`, `BOX_BASE_PATH`,
    /// `BOX_API_URL` and `BOX_UPLOAD_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup("BOX_TOKEN")
            .ok_or_else(|| ProviderError::Config("BOX_TOKEN is not set".to_string()))?;

        let mut settings =
            Settings::new(lookup("BOX_FOLDER_ID").unwrap_or_else(|| ROOT_FOLDER_ID.to_string()));
        if let Some(path) = lookup("BOX_BASE_PATH") {
            settings.path = path;
        }
        if let Some(url) = lookup("BOX_API_URL") {
            settings.api_url = url;
        }
        if let Some(url) = lookup("BOX_UPLOAD_URL") {
            settings.upload_url = url;
        }

        Ok(Self::new(Credentials { token }, settings))
    }

    pub fn token(&self) -> &str {
        &self.credentials.token
    }

    /// Id of the configured base folder
    pub fn folder(&self) -> &str {
        &self.settings.folder
    }

    /// Configured base path
    pub fn base_path(&self) -> &str {
        &self.settings.path
    }
}
