//! Local settings file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.deploydash/
//!   config.yaml     (settings, mode 0600, written atomically)
//!   deploydash.db   (record store, see deploydash-store)
//!   daemon.sock     (daemon control socket)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable consulted when the file has no VCS token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "DEPLOYDASH_DB";

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Contents of `config.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Enterprise API base URL. `None` means the public API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_api_url: Option<String>,

    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker: Option<TrackerSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: None,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            tracker: None,
        }
    }
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Ticket tracker connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrackerSettings {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<TrackerAuthMethod>,
}

impl TrackerSettings {
    /// The configured method, or the one implied by the credentials present.
    pub fn effective_auth_method(&self) -> TrackerAuthMethod {
        if let Some(method) = self.auth_method {
            return method;
        }
        match self.username.as_deref() {
            Some(user) if !user.is_empty() => TrackerAuthMethod::Basic,
            _ => TrackerAuthMethod::Bearer,
        }
    }
}

/// How tracker requests authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerAuthMethod {
    /// `username:token` basic auth (cloud instances).
    Basic,
    /// `Authorization: Bearer <token>` (personal access tokens).
    Bearer,
    /// Bearer plus `X-Atlassian-Token: no-check`.
    Token,
}

impl Settings {
    /// VCS token from the file, falling back to `$GITHUB_TOKEN`.
    pub fn resolved_token(&self) -> Option<String> {
        self.github_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty()))
    }

    /// API base URL without a trailing slash.
    pub fn api_base_url(&self) -> String {
        match self.github_api_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() && url.trim_end_matches('/') != DEFAULT_API_URL => {
                url.trim_end_matches('/').to_string()
            }
            _ => DEFAULT_API_URL.to_string(),
        }
    }

    /// Whether requests go to an enterprise host rather than the public API.
    pub fn is_enterprise(&self) -> bool {
        self.api_base_url() != DEFAULT_API_URL
    }
}

// ---------------------------------------------------------------------------
// 2. Paths
// ---------------------------------------------------------------------------

/// `<home>/.deploydash/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".deploydash")
}

/// `<home>/.deploydash/config.yaml`
pub fn settings_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

/// `$DEPLOYDASH_DB`, or `<home>/.deploydash/deploydash.db`.
pub fn database_path_at(home: &Path) -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => root_at(home).join("deploydash.db"),
    }
}

/// `database_path_at` convenience wrapper.
pub fn database_path() -> Result<PathBuf, CoreError> {
    Ok(database_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// 3. Load / save
// ---------------------------------------------------------------------------

/// Load settings; a missing file yields the defaults.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    let path = settings_path_at(home);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, CoreError> {
    load_at(&home()?)
}

/// Atomically write settings: serialize, write `config.yaml.tmp`, `chmod 0600`, rename.
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), CoreError> {
    let root = root_at(home);
    if !root.exists() {
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        set_dir_permissions(&root)?;
    }
    let path = settings_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), CoreError> {
    save_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// 4. Helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_url_defaults_to_public_host() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url(), DEFAULT_API_URL);
        assert!(!settings.is_enterprise());
    }

    #[test]
    fn api_base_url_treats_public_host_with_slash_as_default() {
        let settings = Settings {
            github_api_url: Some("https://api.github.com/".into()),
            ..Settings::default()
        };
        assert!(!settings.is_enterprise());
    }

    #[test]
    fn api_base_url_uses_enterprise_host() {
        let settings = Settings {
            github_api_url: Some("https://git.acme.corp/api/v3/".into()),
            ..Settings::default()
        };
        assert_eq!(settings.api_base_url(), "https://git.acme.corp/api/v3");
        assert!(settings.is_enterprise());
    }

    #[test]
    fn tracker_auth_is_inferred_from_credentials() {
        let mut tracker = TrackerSettings {
            url: "https://acme.atlassian.net".into(),
            token: Some("t".into()),
            username: Some("dev@acme.io".into()),
            auth_method: None,
        };
        assert_eq!(tracker.effective_auth_method(), TrackerAuthMethod::Basic);
        tracker.username = None;
        assert_eq!(tracker.effective_auth_method(), TrackerAuthMethod::Bearer);
        tracker.auth_method = Some(TrackerAuthMethod::Token);
        assert_eq!(tracker.effective_auth_method(), TrackerAuthMethod::Token);
    }
}
