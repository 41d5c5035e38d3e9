pub mod bind;
pub mod env;
pub mod publish;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use webpub_core::paths::normalize_path;

/// `path` made absolute against the current directory, `.`/`..` resolved.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    Ok(normalize_path(&cwd.join(path)))
}

/// The workspace given with `--workspace`, or the current directory.
pub fn workspace(arg: Option<&Path>) -> Result<PathBuf> {
    match arg {
        Some(dir) => absolute(dir),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}
