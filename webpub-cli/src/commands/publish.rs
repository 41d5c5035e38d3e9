//! `webpub publish <path> --env <name>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use webpub_core::{bindings, config, Binding, BindingKind, Environment};
use webpub_remote::{AuthContext, HttpConnector};
use webpub_sync::{
    ChangeCache, FileOutcome, FolderOptions, PublishOptions, PublishStep, Publisher, Reporter,
};

use super::{absolute, workspace};

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Bound file, or a folder under a folder binding.
    pub path: PathBuf,

    /// Environment to publish to.
    #[arg(long = "env", short = 'e')]
    pub environment: String,

    /// Upload even when the content matches the last publish.
    #[arg(long)]
    pub no_cache: bool,

    /// Print full diagnostics (status, error code, correlation id, body) for
    /// failures.
    #[arg(long)]
    pub details: bool,

    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

impl PublishArgs {
    pub async fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        let config = config::load_at(&home)
            .context("failed to load configuration; add one with `webpub env add`")?;
        let environment = config.environment(&self.environment)?.clone();

        let workspace = workspace(self.workspace.as_deref())?;
        let target = absolute(&self.path)?;
        let set = bindings::load_at(&workspace)
            .with_context(|| format!("failed to load bindings in {}", workspace.display()))?;
        let binding = set.resolve(&target).cloned().with_context(|| {
            format!(
                "no binding covers {}; run `webpub bind` first",
                target.display()
            )
        })?;

        let cache = if self.no_cache {
            None
        } else {
            Some(Arc::new(
                ChangeCache::load_at(&home)
                    .await
                    .context("failed to load change cache")?,
            ))
        };

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("{}", "cancelling after in-flight files…".yellow());
                    cancel.cancel();
                }
            });
        }

        let publisher = Publisher::new(
            Arc::new(HttpConnector::default()),
            Arc::new(ConsoleReporter {
                details: self.details,
            }),
        );
        let auth = AuthContext::from_env();

        if target.is_dir() {
            if binding.kind != BindingKind::Folder {
                bail!("{} is a folder but is bound as a file", target.display());
            }
            let report = publisher
                .publish_folder(
                    &binding,
                    &target,
                    &environment,
                    &auth,
                    FolderOptions {
                        cache,
                        cancel,
                        bindings: Arc::new(set),
                        ..FolderOptions::default()
                    },
                )
                .await?;

            let summary = report.summary();
            if report.cancelled {
                println!("{}", summary.yellow());
            } else if report.has_failures() {
                println!("{}", summary.red());
            } else {
                println!("{}", summary.green());
            }
            if report.has_failures() {
                bail!("{} file(s) failed to publish", report.totals.failed);
            }
            return Ok(());
        }

        let options = PublishOptions {
            cache,
            first_in_batch: true,
            cancel,
        };
        let outcome = publisher
            .publish_file(&binding, &environment, &auth, &target, &options)
            .await;
        if outcome.failure().is_some() {
            bail!("publish failed");
        }
        Ok(())
    }
}

/// Prints one line per file and the header of each batch.
struct ConsoleReporter {
    details: bool,
}

impl Reporter for ConsoleReporter {
    fn batch_header(&self, environment: &Environment, binding: &Binding) {
        println!(
            "{} {} ({}) · package {}",
            "Publishing to".bold(),
            environment.name,
            environment.url,
            binding.package_name
        );
    }

    fn step(&self, path: &Path, step: PublishStep) {
        tracing::debug!(path = %path.display(), "{}", step.label());
    }

    fn finished(&self, path: &Path, outcome: &FileOutcome) {
        let path = path.display();
        match outcome {
            FileOutcome::Created { remote_path, .. } => {
                println!("  {} {path} → {remote_path}", "+".green())
            }
            FileOutcome::Updated { remote_path, .. } => {
                println!("  {} {path} → {remote_path}", "✎".green())
            }
            FileOutcome::Skipped {
                remote_path,
                reason,
            } => println!("  {} {path} ({remote_path}: {reason})", "·".bright_black()),
            FileOutcome::Cancelled => println!("  {} {path} (cancelled)", "-".yellow()),
            FileOutcome::Failed(failure) => {
                eprintln!("  {} {path}: {failure}", "✗".red());
                if self.details {
                    for line in failure.details().lines() {
                        eprintln!("      {line}");
                    }
                }
            }
        }
    }
}
