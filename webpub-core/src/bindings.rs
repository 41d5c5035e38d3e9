//! Per-workspace binding store.
//!
//! # Storage layout
//!
//! ```text
//! <workspace>/
//!   .webpub/
//!     bindings.json   { "version": 1, "updatedAt": "...", "bindings": [ ... ] }
//! ```
//!
//! A bare JSON array of binding records is accepted on load and rewritten in
//! the structured form on the next save. Relative `localPath` entries are
//! interpreted against the workspace root.
//!
//! Writes use the `.tmp` + rename pattern so a crash never truncates the
//! document.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::paths::normalize_path;
use crate::types::{Binding, BindingKind};

/// Current on-disk document version.
pub const BINDINGS_VERSION: u32 = 1;

/// On-disk bindings payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct BindingsFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BindingsCompat {
    Structured(BindingsFile),
    Legacy(Vec<Binding>),
}

/// Ordered set of bindings for one workspace.
///
/// Order is preserved as declared; lookups never depend on it because the
/// most specific match always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingSet {
    bindings: Vec<Binding>,
}

impl BindingSet {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Insert `binding`, replacing any binding with the same local path.
    ///
    /// Returns the replaced binding, if any. Replacement keeps the original
    /// position; new bindings are appended.
    pub fn bind(&mut self, binding: Binding) -> Option<Binding> {
        let key = normalize_path(&binding.local_path);
        match self
            .bindings
            .iter_mut()
            .find(|b| normalize_path(&b.local_path) == key)
        {
            Some(existing) => Some(std::mem::replace(existing, binding)),
            None => {
                self.bindings.push(binding);
                None
            }
        }
    }

    /// Remove the binding declared for exactly `local_path`.
    pub fn unbind(&mut self, local_path: &Path) -> Option<Binding> {
        let key = normalize_path(local_path);
        let index = self
            .bindings
            .iter()
            .position(|b| normalize_path(&b.local_path) == key)?;
        Some(self.bindings.remove(index))
    }

    /// Most specific binding covering `path`.
    ///
    /// A file binding for exactly `path` beats every folder binding; among
    /// folder bindings the one with the longest local path wins. A folder
    /// binding covers its own folder as well as everything beneath it.
    pub fn resolve(&self, path: &Path) -> Option<&Binding> {
        let target = normalize_path(path);

        if let Some(file) = self
            .bindings
            .iter()
            .find(|b| b.kind == BindingKind::File && normalize_path(&b.local_path) == target)
        {
            return Some(file);
        }

        self.bindings
            .iter()
            .filter(|b| b.kind == BindingKind::Folder)
            .filter_map(|b| {
                let root = normalize_path(&b.local_path);
                target
                    .starts_with(&root)
                    .then(|| (root.components().count(), b))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, b)| b)
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// `<workspace>/.webpub/bindings.json`
pub fn bindings_path_at(workspace: &Path) -> PathBuf {
    workspace.join(".webpub").join("bindings.json")
}

/// Load the bindings declared for `workspace`.
///
/// Returns an empty set if the document does not exist yet.
pub fn load_at(workspace: &Path) -> Result<BindingSet, CoreError> {
    let path = bindings_path_at(workspace);
    if !path.exists() {
        return Ok(BindingSet::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let parsed = serde_json::from_str::<BindingsCompat>(&contents)
        .map_err(|source| CoreError::BindingsParse {
            path: path.clone(),
            source,
        })?;
    let mut bindings = match parsed {
        BindingsCompat::Structured(file) => file.bindings,
        BindingsCompat::Legacy(bindings) => bindings,
    };
    for binding in &mut bindings {
        if binding.local_path.is_relative() {
            binding.local_path = workspace.join(&binding.local_path);
        }
    }
    Ok(BindingSet::new(bindings))
}

/// Save `set` for `workspace` atomically.
///
/// Writes to `bindings.json.tmp` then renames over `bindings.json`.
pub fn save_at(workspace: &Path, set: &BindingSet) -> Result<(), CoreError> {
    let path = bindings_path_at(workspace);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid bindings path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let file = BindingsFile {
        version: BINDINGS_VERSION,
        updated_at: Some(Utc::now()),
        bindings: set.bindings.clone(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load, insert or replace `binding`, save. Returns the replaced binding.
pub fn bind_at(workspace: &Path, binding: Binding) -> Result<Option<Binding>, CoreError> {
    let mut set = load_at(workspace)?;
    let replaced = set.bind(binding);
    save_at(workspace, &set)?;
    Ok(replaced)
}

/// Load, remove the binding for `local_path`, save if anything changed.
pub fn unbind_at(workspace: &Path, local_path: &Path) -> Result<Option<Binding>, CoreError> {
    let mut set = load_at(workspace)?;
    let removed = set.unbind(local_path);
    if removed.is_some() {
        save_at(workspace, &set)?;
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
