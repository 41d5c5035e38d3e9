//! `webpub bind`, `webpub unbind` and `webpub bindings`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use webpub_core::{bindings, Binding, BindingKind, PackageName};

use super::{absolute, workspace};

#[derive(Args, Debug)]
pub struct BindArgs {
    /// Local file or folder to bind.
    pub path: PathBuf,

    /// Remote resource name, or name prefix for a folder (e.g. `new_/scripts`).
    #[arg(long)]
    pub remote: String,

    /// Unique name of the package the resources belong to. `Default` means no
    /// package.
    #[arg(long)]
    pub package: String,

    /// Workspace holding `.webpub/bindings.json`. Defaults to the current
    /// directory.
    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

impl BindArgs {
    pub fn run(self) -> Result<()> {
        let workspace = workspace(self.workspace.as_deref())?;
        let local_path = absolute(&self.path)?;
        let kind = if local_path.is_dir() {
            BindingKind::Folder
        } else if local_path.is_file() {
            BindingKind::File
        } else {
            bail!("{} does not exist", local_path.display());
        };
        let remote_path = self.remote.trim().replace('\\', "/");
        if remote_path.is_empty() {
            bail!("--remote must not be empty");
        }

        let binding = Binding {
            local_path: local_path.clone(),
            remote_path,
            package_name: PackageName::from(self.package.trim()),
            kind,
        };
        let replaced = bindings::bind_at(&workspace, binding.clone())
            .with_context(|| format!("failed to save bindings in {}", workspace.display()))?;

        let verb = if replaced.is_some() { "rebound" } else { "bound" };
        println!(
            "✓ {verb} {} {} → {} (package {})",
            binding.kind,
            local_path.display(),
            binding.remote_path,
            binding.package_name
        );
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct UnbindArgs {
    /// Local path whose binding should be removed.
    pub path: PathBuf,

    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

impl UnbindArgs {
    pub fn run(self) -> Result<()> {
        let workspace = workspace(self.workspace.as_deref())?;
        let local_path = absolute(&self.path)?;
        match bindings::unbind_at(&workspace, &local_path)
            .with_context(|| format!("failed to update bindings in {}", workspace.display()))?
        {
            Some(removed) => println!("✓ unbound {} ({})", local_path.display(), removed.remote_path),
            None => println!("No binding declared for {}.", local_path.display()),
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct BindingsArgs {
    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

#[derive(Tabled)]
struct BindingRow {
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "local path")]
    local: String,
    #[tabled(rename = "remote")]
    remote: String,
    #[tabled(rename = "package")]
    package: String,
}

impl BindingsArgs {
    pub fn run(self) -> Result<()> {
        let workspace = workspace(self.workspace.as_deref())?;
        let set = bindings::load_at(&workspace)
            .with_context(|| format!("failed to load bindings in {}", workspace.display()))?;

        if set.is_empty() {
            println!("No bindings declared.");
            println!("Run: webpub bind <path> --remote <name> --package <pkg>");
            return Ok(());
        }

        let rows: Vec<BindingRow> = set
            .iter()
            .map(|b| BindingRow {
                kind: b.kind.to_string(),
                local: b
                    .local_path
                    .strip_prefix(&workspace)
                    .unwrap_or(&b.local_path)
                    .display()
                    .to_string(),
                remote: b.remote_path.clone(),
                package: b.package_name.to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
