//! Configuration management

use std::{env, path::Path};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    /// Variables are set into the process environment for `env:VAR` resolution.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Identity provider (OAuth2) configuration
    pub oauth: OAuthConfig,
    /// Session token configuration
    pub session: SessionConfig,
    /// Remote object API (cloud drive) configuration
    pub drive: DriveConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Front-end origin allowed by CORS
    pub client_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            client_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Identity provider configuration for the authorization-code flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// OAuth client id (supports `env:VAR_NAME`)
    pub client_id: String,
    /// OAuth client secret (supports `env:VAR_NAME`)
    pub client_secret: String,
    /// Provider authorization endpoint
    pub auth_url: String,
    /// Provider token endpoint
    pub token_url: String,
    /// Redirect URL registered with the provider
    pub redirect_url: String,
    /// Requested scopes
    pub scopes: Vec<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_url: "http://localhost:3000".to_string(),
            scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "email".to_string(),
                "https://www.googleapis.com/auth/drive.readonly".to_string(),
            ],
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Signing secret for session tokens (supports `env:VAR_NAME`).
    /// Loaded once at startup; never rotated at runtime.
    pub token_secret: String,
    /// Session token lifetime in seconds
    pub token_expiration_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_expiration_secs: 36000,
        }
    }
}

/// Remote object API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the object API
    pub base_url: String,
    /// Maximum byte span served when a range request omits an explicit end
    pub chunk_size: u64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            chunk_size: 512 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file plus environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the merged configuration
    /// fails to deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (FEEDER_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("FEEDER_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Load env files into process environment (before secret expansion)
        config.load_env_files();
        config.expand_secrets();

        Ok(config)
    }

    /// Check the fields the gateway cannot run without.
    ///
    /// # Errors
    ///
    /// Returns an error if the session signing secret is empty.
    pub fn validate(&self) -> Result<()> {
        if self.session.token_secret.is_empty() {
            return Err(Error::Config(
                "session.token_secret must be set (or FEEDER_GATEWAY_SESSION__TOKEN_SECRET)"
                    .to_string(),
            ));
        }
        if self.oauth.client_id.is_empty() {
            tracing::warn!("oauth.client_id is empty - provider login will fail");
        }
        Ok(())
    }

    /// Load environment files into the process environment.
    /// Supports ~ expansion. Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand `env:VAR_NAME` references in secret-bearing fields
    fn expand_secrets(&mut self) {
        for value in [
            &mut self.oauth.client_id,
            &mut self.oauth.client_secret,
            &mut self.session.token_secret,
        ] {
            *value = resolve_env_ref(value);
        }
    }
}

/// Resolve a `env:VAR_NAME` reference against the process environment.
/// Values without the prefix pass through unchanged.
fn resolve_env_ref(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix("env:") {
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}
