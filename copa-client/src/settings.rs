//! Client settings: endpoints, credentials and transport options.
//!
//! Read from `~/.config/copa/settings.toml` by default. A Java-style
//! `settings.properties` file is read as INI and may use the legacy
//! `loginURL` / `requestURL` key names. `COPA_*` environment variables
//! override file values (e.g. `COPA_PWD`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::channel::SessionChannel;
use crate::error::SettingsError;

const ENV_PREFIX: &str = "COPA";

fn default_use_tls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(alias = "loginURL", alias = "loginurl")]
    pub login_url: String,

    #[serde(alias = "requestURL", alias = "requesturl")]
    pub request_url: String,

    pub user: Option<String>,

    #[serde(alias = "password")]
    pub pwd: Option<String>,

    /// Use HTTPS with trust-all certificate handling.
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientSettings {
    pub fn settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = dirs::config_dir()
            .ok_or(SettingsError::NoConfigDir)?
            .join("copa");

        Ok(config_dir.join("settings.toml"))
    }

    /// Expand `~` in a user supplied settings path.
    pub fn resolve_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).into_owned())
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }

        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("properties") => File::from(path).format(FileFormat::Ini),
            _ => File::from(path),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `(user, pwd)` when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.pwd) {
            (Some(user), Some(pwd)) => Some((user, pwd)),
            _ => None,
        }
    }

    /// A new, not yet started channel for these settings.
    pub fn channel(&self) -> SessionChannel {
        SessionChannel::new(&self.login_url, &self.request_url, self.use_tls)
            .with_timeout(self.timeout())
    }
}
