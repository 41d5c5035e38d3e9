//! Binding + concrete target → `(local path, remote name)`.

use std::path::{Path, PathBuf};

use webpub_core::paths::{normalize_path, to_forward_slashes};
use webpub_core::{Binding, BindingKind};

use crate::error::{io_err, SyncError};

/// Where one file lives locally and which remote name it publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub local_path: PathBuf,
    pub remote_path: String,
}

/// Compute the concrete remote name for `target` under `binding`.
///
/// Purely lexical: `..` components are resolved before the containment
/// check, so `web/../secret.js` never maps through a binding for `web`.
pub fn resolve_target(binding: &Binding, target: &Path) -> Result<ResolvedTarget, SyncError> {
    let target = normalize_path(target);
    let root = normalize_path(&binding.local_path);

    match binding.kind {
        BindingKind::File => {
            if target != root {
                return Err(SyncError::TargetMismatch {
                    target,
                    bound: root,
                });
            }
            Ok(ResolvedTarget {
                local_path: target,
                remote_path: binding.remote_path.replace('\\', "/"),
            })
        }
        BindingKind::Folder => {
            if target == root {
                return Err(SyncError::BindingRoot { path: target });
            }
            let Ok(relative) = target.strip_prefix(&root) else {
                return Err(SyncError::OutsideBinding { target, root });
            };
            let relative = to_forward_slashes(relative);
            let remote_path = join_remote(&binding.remote_path, &relative);
            Ok(ResolvedTarget {
                local_path: target,
                remote_path,
            })
        }
    }
}

/// `prefix` + `/` + `relative`, tolerating trailing or backslash separators
/// on the prefix.
pub fn join_remote(prefix: &str, relative: &str) -> String {
    let prefix = prefix.replace('\\', "/");
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{prefix}/{relative}")
    }
}

/// Fail unless `path` is a regular file.
pub async fn ensure_regular_file(path: &Path) -> Result<(), SyncError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| io_err(path, e))?;
    if metadata.is_file() {
        Ok(())
    } else {
        Err(SyncError::NotAFile {
            path: path.to_path_buf(),
        })
    }
}
