//! Layered configuration
//!
//! Defaults, then `config.toml`, then environment variables (a `.env` file
//! is loaded by the binary before this runs), then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::api::constants::DEFAULT_TIMEOUT_SECS;
use crate::api::error::BitrixError;
use crate::api::models::{AuthMode, CredentialSource, Credentials};

pub const APP_DIR: &str = "bitrix-cli";
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_AUTH_MODE: &str = "BITRIX_AUTH_MODE";
pub const ENV_DOMAIN: &str = "BITRIX_DOMAIN";
pub const ENV_WEBHOOK_URL: &str = "BITRIX_WEBHOOK_URL";
pub const ENV_ACCESS_TOKEN: &str = "BITRIX_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "BITRIX_TIMEOUT_SECS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub domain: Option<String>,
    pub webhook_url: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub continue_on_fail: bool,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub auth_mode: Option<AuthMode>,
    pub domain: Option<String>,
    pub webhook_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub continue_on_fail: bool,
}

impl Config {
    /// `<config_dir>/bitrix-cli/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Build the full configuration from every layer except flags
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Overlay `BITRIX_*` variables read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(mode) = lookup(ENV_AUTH_MODE) {
            self.auth.mode = AuthMode::parse(&mode)
                .with_context(|| format!("Invalid {}: {}", ENV_AUTH_MODE, mode))?;
        }
        if let Some(domain) = lookup(ENV_DOMAIN) {
            self.auth.domain = Some(domain);
        }
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.auth.webhook_url = Some(url);
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.auth.access_token = Some(token);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.http.timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_TIMEOUT_SECS, timeout))?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(mode) = overrides.auth_mode {
            self.auth.mode = mode;
        }
        if overrides.domain.is_some() {
            self.auth.domain = overrides.domain;
        }
        if overrides.webhook_url.is_some() {
            self.auth.webhook_url = overrides.webhook_url;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.http.timeout_secs = timeout;
        }
        if overrides.continue_on_fail {
            self.run.continue_on_fail = true;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

impl CredentialSource for Config {
    fn credentials(&self, mode: AuthMode) -> Result<Credentials, BitrixError> {
        let credentials = Credentials {
            domain: self.auth.domain.clone(),
            webhook_url: self.auth.webhook_url.clone(),
            access_token: self.auth.access_token.clone(),
        };
        // Fail early rather than at the first request
        credentials.base_url(mode)?;
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.auth.mode, AuthMode::Webhook);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(!config.run.continue_on_fail);
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[auth]
mode = "oauth2"
domain = "portal.bitrix24.com"

[http]
timeout_secs = 5
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.auth.mode, AuthMode::OAuth2);
        assert_eq!(config.auth.domain.as_deref(), Some("portal.bitrix24.com"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(!config.run.continue_on_fail);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.auth.webhook_url = Some("https://old.example/rest/1/a".to_string());
        config
            .apply_env(env(&[
                (ENV_AUTH_MODE, "bitrixOAuth2Api"),
                (ENV_WEBHOOK_URL, "https://new.example/rest/1/b"),
                (ENV_TIMEOUT_SECS, "12"),
                (ENV_DOMAIN, "  "),
            ]))
            .unwrap();

        assert_eq!(config.auth.mode, AuthMode::OAuth2);
        assert_eq!(config.auth.webhook_url.as_deref(), Some("https://new.example/rest/1/b"));
        assert_eq!(config.http.timeout_secs, 12);
        assert_eq!(config.auth.domain, None);
    }

    #[test]
    fn test_invalid_env_values() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
        assert!(config.apply_env(env(&[(ENV_AUTH_MODE, "basic")])).is_err());
    }

    #[test]
    fn test_flags_win() {
        let mut config = Config::default();
        config.apply_overrides(Overrides {
            auth_mode: Some(AuthMode::OAuth2),
            domain: Some("flag.bitrix24.com".to_string()),
            continue_on_fail: true,
            ..Default::default()
        });
        assert_eq!(config.auth.mode, AuthMode::OAuth2);
        assert_eq!(config.auth.domain.as_deref(), Some("flag.bitrix24.com"));
        assert!(config.run.continue_on_fail);
    }

    #[test]
    fn test_credentials_require_mode_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.credentials(AuthMode::Webhook),
            Err(BitrixError::Auth { .. })
        ));

        config.auth.webhook_url = Some("https://portal.bitrix24.com/rest/1/abc/".to_string());
        let credentials = config.credentials(AuthMode::Webhook).unwrap();
        assert_eq!(
            credentials.base_url(AuthMode::Webhook).unwrap(),
            "https://portal.bitrix24.com/rest/1/abc"
        );
        assert!(config.credentials(AuthMode::OAuth2).is_err());
    }
}
