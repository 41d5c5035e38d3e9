//! Environment configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.webpub/
//!   config.yaml          (environments, mode 0600)
//!   cache/
//!     publish-cache.json (change cache, owned by webpub-sync)
//! ```
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::Environment;

/// Root of the YAML configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub environments: Vec<Environment>,
}

impl Config {
    /// Look up an environment by name, case-insensitively.
    pub fn environment(&self, name: &str) -> Result<&Environment, CoreError> {
        self.environments
            .iter()
            .find(|env| env.name.matches(name))
            .ok_or_else(|| CoreError::UnknownEnvironment {
                name: name.to_string(),
                known: self.known_names(),
            })
    }

    fn known_names(&self) -> String {
        if self.environments.is_empty() {
            return "none".to_string();
        }
        self.environments
            .iter()
            .map(|env| env.name.0.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn validate(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for env in &self.environments {
            if !seen.insert(env.name.key()) {
                return Err(CoreError::DuplicateEnvironment {
                    name: env.name.0.clone(),
                });
            }
        }
        Ok(())
    }
}

/// `<home>/.webpub/`
pub fn webpub_root(home: &Path) -> PathBuf {
    home.join(".webpub")
}

/// `<home>/.webpub/config.yaml`, pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    webpub_root(home).join("config.yaml")
}

/// `<home>/.webpub/cache/publish-cache.json`, pure, no I/O.
pub fn cache_path_at(home: &Path) -> PathBuf {
    webpub_root(home).join("cache").join("publish-cache.json")
}

/// Load the configuration.
///
/// Returns `CoreError::ConfigNotFound` if absent, `CoreError::ConfigParse`
/// (with path + line context) if malformed, and
/// `CoreError::DuplicateEnvironment` if two environments share a name.
pub fn load_at(home: &Path) -> Result<Config, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(CoreError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let config: Config = serde_yaml::from_str(&contents)
        .map_err(|source| CoreError::ConfigParse { path, source })?;
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, CoreError> {
    load_at(&home()?)
}

/// Atomically save the configuration.
///
/// Write flow: serialize → `config.yaml.tmp` → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), CoreError> {
    config.validate()?;
    let root = webpub_root(home);
    std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
    let path = config_path_at(home);
    let tmp = root.join("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<(), CoreError> {
    save_at(&home()?, config)
}

/// Home directory, or `CoreError::HomeNotFound`.
pub fn home() -> Result<PathBuf, CoreError> {
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

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
