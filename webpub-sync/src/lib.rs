//! # webpub-sync
//!
//! The publish engine: change cache, single-file pipeline, folder scheduler
//! and the serialized activation queue.
//!
//! Call [`Publisher::publish_file`] for one file or
//! [`Publisher::publish_folder`] for every supported file under a folder
//! binding.

pub mod activation;
pub mod change_cache;
pub mod content;
pub mod error;
pub mod mapping;
pub mod outcome;
pub mod publisher;
pub mod reporter;
pub mod scheduler;

pub use activation::ActivationQueue;
pub use change_cache::{ChangeCache, Fingerprint};
pub use error::SyncError;
pub use outcome::{FileOutcome, PublishCounts, PublishFailure, SkipReason};
pub use publisher::{PublishOptions, Publisher};
pub use reporter::{PublishStep, Reporter, TracingReporter};
pub use scheduler::{FolderOptions, FolderReport, ProgressEvent, FOLDER_CONCURRENCY};
