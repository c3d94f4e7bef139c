//! User configuration loaded from `~/.flowvault/config.toml`.
//!
//! The file is optional; if it does not exist every field falls back to its
//! `Default` value, so a bare `flowvault backup` works against a local
//! instance out of the box.

use crate::staging::IdPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Could not determine home directory")]
    HomeDirNotFound,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Where backup output is persisted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Backups are switched off; running `backup` warns and does nothing.
    Disabled,
    /// Write the backup tree locally only.
    #[default]
    Local,
    /// Write the backup tree, then commit and push it to a git remote.
    Remote,
}

/// `[api]` section: the instance's REST surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to this file.
    pub api_key_env: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:5678/rest".to_string(),
            api_key_env: "N8N_API_KEY".to_string(),
        }
    }
}

/// `[engine]` section: how to reach the engine's own CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Command line prefix, e.g. `["n8n"]` or `["docker", "exec", "-i",
    /// "n8n", "n8n"]`. When the instance runs in a container, exchange
    /// paths handed to the command must be visible on both sides.
    pub command: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            command: vec!["n8n".to_string()],
        }
    }
}

/// `[backup]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    /// Backup root directory; `~/.flowvault/backups` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    pub storage: StorageMode,
    /// Also export credentials (kept in their encrypted form).
    pub include_credentials: bool,
    pub git_remote: String,
    pub git_branch: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig {
            root: None,
            storage: StorageMode::default(),
            include_credentials: false,
            git_remote: "origin".to_string(),
            git_branch: "main".to_string(),
        }
    }
}

/// `[restore]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestoreConfig {
    pub id_policy: IdPolicy,
    /// Accept a name-only match when the remote candidate carries no folder
    /// location signal at all. Logged every time it fires.
    pub allow_unanchored_name_match: bool,
    /// Preserve the staging area (staged copies plus the run manifest)
    /// under the flowvault home after a restore, instead of discarding it.
    pub keep_manifest: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        RestoreConfig {
            id_policy: IdPolicy::default(),
            allow_unanchored_name_match: true,
            keep_manifest: false,
        }
    }
}

/// Top-level configuration, deserialized from `~/.flowvault/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
    pub backup: BackupConfig,
    pub restore: RestoreConfig,
}

impl UserConfig {
    /// Resolved backup root: the configured value, or `~/.flowvault/backups`.
    pub fn backup_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.backup.root {
            Some(root) => Ok(root.clone()),
            None => Ok(flowvault_home()?.join("backups")),
        }
    }

    /// Read the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api.api_key_env).ok()
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Flowvault's user-scoped data directory (`~/.flowvault`).
///
/// If `FLOWVAULT_HOME` is set, that directory is used instead. This lets
/// tests and CI run against an isolated directory without touching the
/// user's real data.
pub fn flowvault_home() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var("FLOWVAULT_HOME") {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(".flowvault"))
        .ok_or(ConfigError::HomeDirNotFound)
}

/// Canonical path of the config file (`~/.flowvault/config.toml`).
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(flowvault_home()?.join("config.toml"))
}

/// Load the configuration, falling back to defaults when the file is absent.
pub fn load_config() -> Result<UserConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        debug!("Config not found at {}; using defaults", path.display());
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: UserConfig = toml::from_str(&content)?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
