//! Folder publish: enumerate, then fan out over a small worker pool.
//!
//! Workers pull the next file from a shared counter rather than owning a
//! fixed slice, so one large file does not leave the other workers idle.
//! Activation stays one-wide through the shared [`ActivationQueue`] whatever
//! the upload width.
//!
//! [`ActivationQueue`]: crate::activation::ActivationQueue

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use webpub_core::paths::normalize_path;
use webpub_core::{Binding, BindingKind, BindingSet, Environment};
use webpub_remote::AuthContext;

use crate::change_cache::ChangeCache;
use crate::content::WebResourceType;
use crate::error::SyncError;
use crate::mapping::resolve_target;
use crate::outcome::{FileOutcome, PublishCounts, PublishFailure};
use crate::publisher::{PublishOptions, Publisher};

/// Upload width of a folder publish.
pub const FOLDER_CONCURRENCY: usize = 4;

/// Every publishable file under `folder`, recursively, sorted by path.
pub fn collect_publishable_files(folder: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).follow_links(false) {
        let entry = entry?;
        if !WebResourceType::is_publishable(entry.path()) {
            continue;
        }
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else if entry.path_is_symlink() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink");
        }
    }
    files.sort();
    Ok(files)
}

/// One finished file of a folder batch.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Position in the sorted file list, zero-based.
    pub index: usize,
    pub total: usize,
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone)]
pub struct FolderOptions {
    pub cache: Option<Arc<ChangeCache>>,
    pub cancel: CancellationToken,
    pub progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
    /// Bindings consulted per file so a file-level binding overrides the
    /// folder binding being iterated.
    pub bindings: Arc<BindingSet>,
    pub concurrency: usize,
}

impl Default for FolderOptions {
    fn default() -> Self {
        Self {
            cache: None,
            cancel: CancellationToken::new(),
            progress: None,
            bindings: Arc::new(BindingSet::default()),
            concurrency: FOLDER_CONCURRENCY,
        }
    }
}

/// Aggregated result of a folder publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderReport {
    pub totals: PublishCounts,
    /// Files whose pipeline ran to a terminal outcome, cancelled ones included.
    pub processed: usize,
    pub total_files: usize,
    pub cancelled: bool,
}

impl FolderReport {
    /// One line for the end of a batch.
    pub fn summary(&self) -> String {
        if self.cancelled {
            format!(
                "cancelled after processing {} of {} files ({})",
                self.processed, self.total_files, self.totals
            )
        } else {
            format!(
                "completed, {} failed ({} of {} files: {})",
                self.totals.failed, self.processed, self.total_files, self.totals
            )
        }
    }

    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0
    }
}

/// State shared by the workers of one batch.
struct Batch {
    publisher: Publisher,
    folder_binding: Binding,
    environment: Environment,
    auth: AuthContext,
    files: Vec<PathBuf>,
    /// File index → reason it must not be published in this batch.
    collisions: HashMap<usize, String>,
    next: AtomicUsize,
    halted: AtomicBool,
    options: FolderOptions,
}

impl Batch {
    /// The folder binding, unless the store holds a more specific one for
    /// this exact file.
    fn binding_for(&self, path: &Path) -> Binding {
        match self.options.bindings.resolve(path) {
            Some(found) if is_more_specific(found, &self.folder_binding) => found.clone(),
            _ => self.folder_binding.clone(),
        }
    }

    fn should_stop(&self) -> bool {
        self.options.cancel.is_cancelled() || self.halted.load(Ordering::SeqCst)
    }
}

/// Files of one batch that resolve to the same remote name, case-insensitively.
///
/// Publishing both would race two creates for one name and leave duplicates
/// behind, so every file in such a group is failed up front.
fn colliding_names(
    files: &[PathBuf],
    binding_for: impl Fn(&Path) -> Binding,
) -> HashMap<usize, String> {
    let mut by_name: HashMap<String, Vec<(usize, String)>> = HashMap::new();
    for (index, path) in files.iter().enumerate() {
        // Unresolvable files fail inside their own pipeline.
        if let Ok(resolved) = resolve_target(&binding_for(path), path) {
            by_name
                .entry(resolved.remote_path.to_lowercase())
                .or_default()
                .push((index, resolved.remote_path));
        }
    }

    let mut collisions = HashMap::new();
    for claims in by_name.into_values().filter(|claims| claims.len() > 1) {
        let count = claims.len();
        for (index, name) in claims {
            collisions.insert(index, format!("{count} local files map to '{name}'"));
        }
    }
    collisions
}

fn is_more_specific(candidate: &Binding, folder: &Binding) -> bool {
    match candidate.kind {
        BindingKind::File => true,
        BindingKind::Folder => {
            let candidate_root = normalize_path(&candidate.local_path);
            let folder_root = normalize_path(&folder.local_path);
            candidate_root != folder_root && candidate_root.starts_with(&folder_root)
        }
    }
}

async fn run_worker(batch: Arc<Batch>) -> (PublishCounts, usize) {
    let mut totals = PublishCounts::default();
    let mut processed = 0;
    let total = batch.files.len();

    while !batch.should_stop() {
        let index = batch.next.fetch_add(1, Ordering::SeqCst);
        let Some(path) = batch.files.get(index) else {
            break;
        };
        let binding = batch.binding_for(path);
        let options = PublishOptions {
            cache: batch.options.cache.clone(),
            first_in_batch: index == 0,
            cancel: batch.options.cancel.clone(),
        };
        let outcome = match batch.collisions.get(&index) {
            Some(message) => batch.publisher.reject_file(
                &binding,
                &batch.environment,
                path,
                PublishFailure::new(message.clone()),
                &options,
            ),
            None => {
                batch
                    .publisher
                    .publish_file(&binding, &batch.environment, &batch.auth, path, &options)
                    .await
            }
        };

        processed += 1;
        totals += outcome.counts();
        if outcome.is_cancelled() {
            batch.halted.store(true, Ordering::SeqCst);
        }
        if let Some(progress) = &batch.options.progress {
            let _ = progress.send(ProgressEvent {
                index,
                total,
                path: path.clone(),
                outcome,
            });
        }
    }
    (totals, processed)
}

impl Publisher {
    /// Publish every supported file under `folder` with the folder `binding`.
    ///
    /// The token is resolved once for the whole batch; a failure there is
    /// returned before any file is touched. After that, failures stay local
    /// to their file and the batch carries on. Cancellation is cooperative:
    /// in-flight files finish their current step, no new file starts.
    pub async fn publish_folder(
        &self,
        binding: &Binding,
        folder: &Path,
        environment: &Environment,
        auth: &AuthContext,
        options: FolderOptions,
    ) -> Result<FolderReport, SyncError> {
        let folder = normalize_path(folder);
        let is_dir = tokio::fs::metadata(&folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(SyncError::NotAFolder { path: folder });
        }

        let files = {
            let folder = folder.clone();
            tokio::task::spawn_blocking(move || collect_publishable_files(&folder))
                .await
                .map_err(|err| SyncError::Worker(format!("enumeration join error: {err}")))??
        };
        let total_files = files.len();

        if options.cancel.is_cancelled() {
            tracing::info!(files = total_files, "folder publish cancelled before start");
            return Ok(FolderReport {
                totals: PublishCounts {
                    cancelled: true,
                    ..PublishCounts::default()
                },
                processed: 0,
                total_files,
                cancelled: true,
            });
        }
        if files.is_empty() {
            tracing::info!(folder = %folder.display(), "no publishable files");
            return Ok(FolderReport::default());
        }

        let token = auth.resolve(environment).await?;
        let workers = options.concurrency.clamp(1, FOLDER_CONCURRENCY).min(total_files);
        tracing::debug!(files = total_files, workers, "starting folder publish");

        let mut batch = Batch {
            publisher: self.clone(),
            folder_binding: binding.clone(),
            environment: environment.clone(),
            auth: AuthContext::Token(token),
            files,
            collisions: HashMap::new(),
            next: AtomicUsize::new(0),
            halted: AtomicBool::new(false),
            options,
        };
        batch.collisions = colliding_names(&batch.files, |path| batch.binding_for(path));
        if !batch.collisions.is_empty() {
            tracing::warn!(
                files = batch.collisions.len(),
                "several local files map to one remote name; they will not be published"
            );
        }
        let batch = Arc::new(batch);

        let mut set = JoinSet::new();
        for _ in 0..workers {
            set.spawn(run_worker(batch.clone()));
        }

        let mut totals = PublishCounts::default();
        let mut processed = 0;
        while let Some(joined) = set.join_next().await {
            let (worker_totals, worker_processed) =
                joined.map_err(|err| SyncError::Worker(err.to_string()))?;
            totals += worker_totals;
            processed += worker_processed;
        }

        let cancelled = totals.cancelled || processed < total_files;
        totals.cancelled = cancelled;
        Ok(FolderReport {
            totals,
            processed,
            total_files,
            cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_supported_files_sorted_and_recursive() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("forms/nested")).unwrap();
        std::fs::write(root.join("z.css"), "").unwrap();
        std::fs::write(root.join("a.js"), "").unwrap();
        std::fs::write(root.join("forms/nested/b.HTML"), "").unwrap();
        std::fs::write(root.join("notes.md"), "").unwrap();

        let files = collect_publishable_files(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.js", "forms/nested/b.HTML", "z.css"]);
    }

    #[test]
    fn summary_distinguishes_cancelled_from_completed() {
        let mut report = FolderReport {
            totals: PublishCounts {
                updated: 2,
                failed: 1,
                ..PublishCounts::default()
            },
            processed: 3,
            total_files: 3,
            cancelled: false,
        };
        assert!(report.summary().starts_with("completed, 1 failed"));
        report.cancelled = true;
        assert!(report.summary().starts_with("cancelled after processing 3 of 3 files"));
    }

    #[test]
    fn colliding_remote_names_are_flagged_on_every_claimant() {
        let folder = Binding {
            local_path: PathBuf::from("/w/web"),
            remote_path: "pkg/web".into(),
            package_name: "p".into(),
            kind: BindingKind::Folder,
        };
        let alias = Binding {
            local_path: PathBuf::from("/w/web/b.js"),
            remote_path: "pkg/web/A.js".into(),
            package_name: "p".into(),
            kind: BindingKind::File,
        };
        let files = vec![
            PathBuf::from("/w/web/a.js"),
            PathBuf::from("/w/web/b.js"),
            PathBuf::from("/w/web/c.js"),
        ];
        let collisions = colliding_names(&files, |path| {
            if path == alias.local_path {
                alias.clone()
            } else {
                folder.clone()
            }
        });

        assert_eq!(collisions.len(), 2);
        assert_eq!(collisions[&0], "2 local files map to 'pkg/web/a.js'");
        assert_eq!(collisions[&1], "2 local files map to 'pkg/web/A.js'");
        assert!(!collisions.contains_key(&2));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_not_collected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("a.js"), "").unwrap();
        std::os::unix::fs::symlink(root.join("a.js"), root.join("link.js")).unwrap();

        let files = collect_publishable_files(root).unwrap();
        assert_eq!(files, vec![root.join("a.js")]);
    }

    #[test]
    fn file_binding_beats_folder_binding() {
        let folder = Binding {
            local_path: PathBuf::from("/w/web"),
            remote_path: "pkg/web".into(),
            package_name: "p".into(),
            kind: BindingKind::Folder,
        };
        let file = Binding {
            local_path: PathBuf::from("/w/web/a.js"),
            remote_path: "pkg/special.js".into(),
            package_name: "p".into(),
            kind: BindingKind::File,
        };
        let parent = Binding {
            local_path: PathBuf::from("/w"),
            kind: BindingKind::Folder,
            ..folder.clone()
        };
        assert!(is_more_specific(&file, &folder));
        assert!(!is_more_specific(&folder, &folder));
        assert!(!is_more_specific(&parent, &folder));
    }
}
