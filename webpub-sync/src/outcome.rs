//! Per-file outcomes and batch totals.

use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use webpub_remote::{RemoteError, ResourceId};

use crate::error::SyncError;

/// Why a file was skipped without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The change cache already holds this content for this environment.
    Unchanged,
    /// The resource does not exist and the environment forbids creating it.
    CreationDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unchanged => write!(f, "unchanged since last publish"),
            SkipReason::CreationDisabled => {
                write!(f, "does not exist and this environment does not allow creating it")
            }
        }
    }
}

/// A user-facing failure, keeping whatever diagnostics the server gave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub message: String,
    pub code: Option<String>,
    pub correlation_id: Option<String>,
    pub status: Option<u16>,
    pub raw: Option<String>,
}

impl PublishFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            correlation_id: None,
            status: None,
            raw: None,
        }
    }

    pub fn from_remote(err: &RemoteError) -> Self {
        Self {
            message: err.to_string(),
            code: err.code().map(str::to_string),
            correlation_id: err.correlation_id().map(str::to_string),
            status: err.status(),
            raw: err.raw_body().map(str::to_string),
        }
    }

    /// Everything known about the failure, for a "copy details" action.
    pub fn details(&self) -> String {
        let mut out = self.message.clone();
        if let Some(status) = self.status {
            out.push_str(&format!("\nHTTP status: {status}"));
        }
        if let Some(code) = &self.code {
            out.push_str(&format!("\nError code: {code}"));
        }
        if let Some(id) = &self.correlation_id {
            out.push_str(&format!("\nCorrelation id: {id}"));
        }
        if let Some(raw) = &self.raw {
            out.push_str(&format!("\nResponse body:\n{raw}"));
        }
        out
    }
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        match (&self.code, &self.correlation_id) {
            (Some(code), Some(id)) => write!(f, " [code {code}, correlation id {id}]"),
            (Some(code), None) => write!(f, " [code {code}]"),
            (None, Some(id)) => write!(f, " [correlation id {id}]"),
            (None, None) => Ok(()),
        }
    }
}

impl From<&SyncError> for PublishFailure {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Remote(remote) => PublishFailure::from_remote(remote),
            other => PublishFailure::new(other.to_string()),
        }
    }
}

/// Terminal state of one single-file publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Created { remote_path: String, id: ResourceId },
    Updated { remote_path: String, id: ResourceId },
    Skipped { remote_path: String, reason: SkipReason },
    /// Stopped at a step boundary because cancellation was requested.
    Cancelled,
    Failed(PublishFailure),
}

impl FileOutcome {
    pub fn counts(&self) -> PublishCounts {
        let mut counts = PublishCounts::default();
        match self {
            FileOutcome::Created { .. } => counts.created = 1,
            FileOutcome::Updated { .. } => counts.updated = 1,
            FileOutcome::Skipped { .. } => counts.skipped = 1,
            FileOutcome::Cancelled => {
                counts.skipped = 1;
                counts.cancelled = true;
            }
            FileOutcome::Failed(_) => counts.failed = 1,
        }
        counts
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FileOutcome::Cancelled)
    }

    pub fn failure(&self) -> Option<&PublishFailure> {
        match self {
            FileOutcome::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Created { remote_path, .. } => write!(f, "created {remote_path}"),
            FileOutcome::Updated { remote_path, .. } => write!(f, "updated {remote_path}"),
            FileOutcome::Skipped {
                remote_path,
                reason,
            } => write!(f, "skipped {remote_path}: {reason}"),
            FileOutcome::Cancelled => write!(f, "cancelled"),
            FileOutcome::Failed(failure) => write!(f, "failed: {failure}"),
        }
    }
}

/// Created / updated / skipped / failed counts, for one file or summed over
/// a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl PublishCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

impl AddAssign for PublishCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
        self.cancelled |= rhs.cancelled;
    }
}

impl fmt::Display for PublishCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped, {} failed",
            self.created, self.updated, self.skipped, self.failed
        )
    }
}
