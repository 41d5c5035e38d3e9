//! Domain types shared by the binding store, the environment configuration
//! and the publish engine.
//!
//! All local path fields use `PathBuf`; remote names are plain strings because
//! the platform treats them as opaque unique names with `/` separators.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Unique name of the platform's built-in "no package" pseudo-package.
pub const DEFAULT_PACKAGE: &str = "Default";

/// Environment variable consulted for the bearer token when an environment
/// does not name its own.
pub const DEFAULT_TOKEN_ENV: &str = "WEBPUB_TOKEN";

/// Web API version used when an environment does not pin one.
pub const DEFAULT_API_VERSION: &str = "v9.2";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Unique name of a package (solution) on the remote platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
    /// `true` when this names the built-in pseudo-package that every record
    /// implicitly belongs to. Always resolvable; membership is never added.
    pub fn is_default(&self) -> bool {
        self.0.trim().eq_ignore_ascii_case(DEFAULT_PACKAGE)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of a configured remote environment (dev, test, prod, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentName(pub String);

impl EnvironmentName {
    /// Case-insensitive key used wherever environments index persistent state.
    pub fn key(&self) -> String {
        self.0.trim().to_lowercase()
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvironmentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironmentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Whether a binding covers one file or a whole folder tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    File,
    Folder,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::File => write!(f, "file"),
            BindingKind::Folder => write!(f, "folder"),
        }
    }
}

/// A user-declared mapping from a local file or folder to a remote name
/// inside a package.
///
/// For [`BindingKind::Folder`], `remote_path` is a prefix: concrete remote
/// names are built by appending the file's offset from `local_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub package_name: PackageName,
    pub kind: BindingKind,
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

/// One configured remote environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: EnvironmentName,
    /// Organization root URL, e.g. `https://contoso-dev.crm.dynamics.com`.
    pub url: String,
    /// When `false`, files whose resource does not exist remotely are skipped
    /// instead of created.
    #[serde(default = "default_true")]
    pub create_missing_resources: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl Environment {
    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_ENV)
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
