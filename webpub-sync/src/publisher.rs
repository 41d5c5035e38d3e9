//! Single-file publish pipeline.
//!
//! Steps run strictly in order: resolve the target, consult the change cache,
//! connect, preflight (package and existing resource, concurrently), apply the
//! existence policy, upload, add to the package (new resources only),
//! activate, record the fingerprint. The cancellation token is checked before
//! every step; a request already on the wire is never aborted.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use webpub_core::{Binding, Environment};
use webpub_remote::{
    AuthContext, Connector, HttpConnector, NewWebResource, PackageMembership, RemoteError,
    ResourceId, WebApiClient,
};

use crate::activation::ActivationQueue;
use crate::change_cache::ChangeCache;
use crate::content::{LocalFile, WebResourceType};
use crate::error::SyncError;
use crate::mapping::{ensure_regular_file, resolve_target};
use crate::outcome::{FileOutcome, PublishFailure, SkipReason};
use crate::reporter::{PublishStep, Reporter, TracingReporter};

/// Per-call knobs for [`Publisher::publish_file`].
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Skip files whose content hash matches the last upload. `None` always
    /// uploads.
    pub cache: Option<Arc<ChangeCache>>,
    /// Emit the batch header before this file. Affects logging only.
    pub first_in_batch: bool,
    pub cancel: CancellationToken,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            cache: None,
            first_in_batch: true,
            cancel: CancellationToken::new(),
        }
    }
}

/// Why the pipeline stopped early.
enum StepError {
    Cancelled,
    Failed(PublishFailure),
}

impl From<SyncError> for StepError {
    fn from(err: SyncError) -> Self {
        StepError::Failed(PublishFailure::from(&err))
    }
}

impl From<RemoteError> for StepError {
    fn from(err: RemoteError) -> Self {
        StepError::Failed(PublishFailure::from_remote(&err))
    }
}

fn fail(message: impl Into<String>) -> StepError {
    StepError::Failed(PublishFailure::new(message))
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), StepError> {
    if cancel.is_cancelled() {
        Err(StepError::Cancelled)
    } else {
        Ok(())
    }
}

/// The publish engine. Cheap to clone; clones share the activation queue.
#[derive(Clone)]
pub struct Publisher {
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) activation: ActivationQueue,
}

impl Publisher {
    /// Build a publisher with its own activation worker. Must be called from
    /// inside a Tokio runtime.
    pub fn new(connector: Arc<dyn Connector>, reporter: Arc<dyn Reporter>) -> Self {
        Self::with_activation(connector, reporter, ActivationQueue::spawn())
    }

    pub fn with_activation(
        connector: Arc<dyn Connector>,
        reporter: Arc<dyn Reporter>,
        activation: ActivationQueue,
    ) -> Self {
        Self {
            connector,
            reporter,
            activation,
        }
    }

    /// Real HTTP, progress through `tracing`.
    pub fn http() -> Self {
        Self::new(Arc::new(HttpConnector::default()), Arc::new(TracingReporter))
    }

    /// Publish one file. Never returns an error: every failure is folded into
    /// [`FileOutcome::Failed`] and reported exactly once.
    pub async fn publish_file(
        &self,
        binding: &Binding,
        environment: &Environment,
        auth: &AuthContext,
        target: &Path,
        options: &PublishOptions,
    ) -> FileOutcome {
        if options.first_in_batch {
            self.reporter.batch_header(environment, binding);
        }
        let outcome = match self
            .run_pipeline(binding, environment, auth, target, options)
            .await
        {
            Ok(outcome) => outcome,
            Err(StepError::Cancelled) => FileOutcome::Cancelled,
            Err(StepError::Failed(failure)) => FileOutcome::Failed(failure),
        };
        self.reporter.finished(target, &outcome);
        outcome
    }

    /// Fail `target` without running its pipeline, reporting it the same way
    /// [`Publisher::publish_file`] would.
    pub(crate) fn reject_file(
        &self,
        binding: &Binding,
        environment: &Environment,
        target: &Path,
        failure: PublishFailure,
        options: &PublishOptions,
    ) -> FileOutcome {
        if options.first_in_batch {
            self.reporter.batch_header(environment, binding);
        }
        let outcome = FileOutcome::Failed(failure);
        self.reporter.finished(target, &outcome);
        outcome
    }

    async fn run_pipeline(
        &self,
        binding: &Binding,
        environment: &Environment,
        auth: &AuthContext,
        target: &Path,
        options: &PublishOptions,
    ) -> Result<FileOutcome, StepError> {
        let cancel = &options.cancel;

        checkpoint(cancel)?;
        let resolved = resolve_target(binding, target)?;
        ensure_regular_file(&resolved.local_path).await?;
        let remote_path = resolved.remote_path;

        let mut local = None;
        if let Some(cache) = &options.cache {
            checkpoint(cancel)?;
            self.reporter.step(target, PublishStep::CheckingCache);
            let file = LocalFile::read(&resolved.local_path).await?;
            let unchanged = match cache
                .is_unchanged(&environment.name, &remote_path, &file.fingerprint)
                .await
            {
                Ok(unchanged) => unchanged,
                // Only a failed refresh of a matching entry can error.
                Err(err) => {
                    tracing::warn!(error = %err, "could not refresh change cache entry");
                    true
                }
            };
            if unchanged {
                return Ok(FileOutcome::Skipped {
                    remote_path,
                    reason: SkipReason::Unchanged,
                });
            }
            local = Some(file);
        }

        checkpoint(cancel)?;
        self.reporter.step(target, PublishStep::Connecting);
        let token = auth.resolve(environment).await?;
        let client = WebApiClient::new(self.connector.connect(environment, token)?);
        let membership = PackageMembership::new(client.clone());

        checkpoint(cancel)?;
        self.reporter.step(target, PublishStep::Preflight);
        let (package, existing) = tokio::join!(
            membership.resolve_package(&binding.package_name),
            client.find_resources_by_name(&remote_path),
        );
        let package = package?.ok_or_else(|| {
            fail(format!(
                "package '{}' not found in environment '{}'",
                binding.package_name, environment.name
            ))
        })?;
        let mut existing = existing?;
        if existing.len() > 1 {
            return Err(fail(format!(
                "multiple resources found for this path; resolve duplicates first ({} named '{remote_path}')",
                existing.len()
            )));
        }
        let existing: Option<ResourceId> = existing.pop().map(|row| row.webresourceid);

        if existing.is_none() && !environment.create_missing_resources {
            return Ok(FileOutcome::Skipped {
                remote_path,
                reason: SkipReason::CreationDisabled,
            });
        }

        checkpoint(cancel)?;
        self.reporter.step(target, PublishStep::Uploading);
        let file = match local {
            Some(file) => file,
            None => LocalFile::read(&resolved.local_path).await?,
        };
        let content = file.base64();
        let (id, created) = match existing {
            Some(id) => {
                client.update_resource_content(&id, content).await?;
                (id, false)
            }
            None => {
                let resource = NewWebResource {
                    name: remote_path.clone(),
                    displayname: file.display_name(),
                    content,
                    webresourcetype: WebResourceType::from_path(&file.path).code(),
                };
                (client.create_resource(&resource).await?, true)
            }
        };

        if created {
            checkpoint(cancel)?;
            self.reporter.step(target, PublishStep::AddingToPackage);
            membership.ensure_member(&package, &id).await?;
        }

        checkpoint(cancel)?;
        self.reporter.step(target, PublishStep::Activating);
        self.activation.activate(&client, vec![id.clone()]).await?;

        if let Some(cache) = &options.cache {
            if let Err(err) = cache
                .record(&environment.name, &remote_path, file.fingerprint.clone())
                .await
            {
                tracing::warn!(error = %err, remote = %remote_path, "published but could not update change cache");
            }
        }

        Ok(if created {
            FileOutcome::Created { remote_path, id }
        } else {
            FileOutcome::Updated { remote_path, id }
        })
    }
}
