//! Layered configuration for the indexing engine.
//!
//! # Environment Variables
//!
//! Variables are prefixed with `ELIXIR_` and use double underscores to
//! separate nested levels:
//! - `ELIXIR_UPDATE__WORKERS=16` sets `update.workers`
//! - `ELIXIR_REPO_PATH=/srv/linux.git` sets `repo_path`
//! - `ELIXIR_LOG_LEVEL=debug` sets `log_level`

use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = ".elixir";
const CONFIG_FILE_NAME: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Path to the source repository (a bare or working git repo).
    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,

    /// Path to the directory holding the persisted cross-reference
    /// database.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Root directory under which multiple `<project>/{repo,data}`
    /// layouts live, when running in multi-project mode.
    #[serde(default)]
    pub projects_root: Option<PathBuf>,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpdateConfig {
    /// Worker pool size per pass. Clamped to a minimum of 5 on use.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-blob extraction timeout in milliseconds.
    #[serde(default = "default_extract_timeout_ms")]
    pub extract_timeout_ms: u64,
}

fn default_version() -> u32 {
    1
}
fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_data_path() -> PathBuf {
    PathBuf::from(".elixir/data")
}
fn default_workers() -> usize {
    10
}
fn default_extract_timeout_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            repo_path: default_repo_path(),
            data_path: default_data_path(),
            projects_root: None,
            update: UpdateConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extract_timeout_ms: default_extract_timeout_ms(),
        }
    }
}

/// Minimum worker pool size, per the external interface contract.
pub const MIN_WORKERS: usize = 5;

impl Settings {
    /// Load configuration from defaults, workspace config file, then
    /// environment variables, in increasing precedence order.
    pub fn load() -> Result<Self, figment::Error> {
        let config_path =
            Self::find_workspace_config().unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ELIXIR_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()))
            .extract()
    }

    /// Load configuration from a specific file, still layering in
    /// environment overrides.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ELIXIR_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()))
            .extract()
    }

    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR_NAME);
            if config_dir.is_dir() {
                return Some(config_dir.join(CONFIG_FILE_NAME));
            }
        }
        None
    }

    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR_NAME).is_dir())
            .map(|ancestor| ancestor.to_path_buf())
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("invalid config path")?;
        std::fs::create_dir_all(parent)?;
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Clamp the configured worker count to the external-interface
    /// minimum, per spec §6.
    pub fn effective_workers(&self) -> usize {
        self.update.workers.max(MIN_WORKERS)
    }

    /// In multi-project mode (`projects_root` set, e.g. via
    /// `ELIXIR_ROOT`), derive `repo_path`/`data_path` from
    /// `<projects_root>/<project>/{repo,data}`. `project` names which
    /// subdirectory to use; when `None`, the first one found
    /// (alphabetically) is picked. A no-op when `projects_root` is unset.
    pub fn resolve_project(&mut self, project: Option<&str>) -> crate::error::ElixirResult<()> {
        let Some(root) = self.projects_root.clone() else {
            return Ok(());
        };

        let project_dir = match project {
            Some(name) => root.join(name),
            None => {
                let mut candidates: Vec<PathBuf> = std::fs::read_dir(&root)
                    .map_err(|e| crate::error::ElixirError::Config {
                        reason: format!("cannot read projects root '{}': {e}", root.display()),
                    })?
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir())
                    .collect();
                candidates.sort();
                candidates.into_iter().next().ok_or_else(|| crate::error::ElixirError::Config {
                    reason: format!("no project directories found under '{}'", root.display()),
                })?
            }
        };

        self.repo_path = project_dir.join("repo");
        self.data_path = project_dir.join("data");
        Ok(())
    }
}
