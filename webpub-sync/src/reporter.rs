//! Where the engine tells the outside world what it is doing.

use std::path::Path;

use webpub_core::{Binding, Environment};

use crate::outcome::FileOutcome;

/// Pipeline step currently running for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    CheckingCache,
    Connecting,
    Preflight,
    Uploading,
    AddingToPackage,
    Activating,
}

impl PublishStep {
    pub fn label(self) -> &'static str {
        match self {
            PublishStep::CheckingCache => "checking change cache",
            PublishStep::Connecting => "connecting",
            PublishStep::Preflight => "looking up package and resource",
            PublishStep::Uploading => "uploading",
            PublishStep::AddingToPackage => "adding to package",
            PublishStep::Activating => "publishing",
        }
    }
}

/// Receives progress from the publish engine. Implementations must be cheap;
/// they are called from inside the pipeline.
pub trait Reporter: Send + Sync {
    /// Once per single-file publish, or once for the first file of a batch.
    fn batch_header(&self, environment: &Environment, binding: &Binding);

    fn step(&self, path: &Path, step: PublishStep);

    /// Exactly once per file, whatever the outcome.
    fn finished(&self, path: &Path, outcome: &FileOutcome);
}

/// Logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn batch_header(&self, environment: &Environment, binding: &Binding) {
        tracing::info!(
            environment = %environment.name,
            url = %environment.url,
            package = %binding.package_name,
            remote = %binding.remote_path,
            "publishing",
        );
    }

    fn step(&self, path: &Path, step: PublishStep) {
        tracing::debug!(path = %path.display(), "{}", step.label());
    }

    fn finished(&self, path: &Path, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Failed(failure) => {
                tracing::error!(path = %path.display(), details = %failure.details(), "{failure}");
            }
            FileOutcome::Cancelled => tracing::warn!(path = %path.display(), "cancelled"),
            other => tracing::info!(path = %path.display(), "{other}"),
        }
    }
}
