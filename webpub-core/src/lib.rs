//! webpub core library: domain types, binding store and environment config.
//!
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`CoreError`]
//! - [`bindings`]: per-workspace binding store and most-specific resolution
//! - [`config`]: `~/.webpub/config.yaml` load / save
//! - [`paths`]: lexical path helpers

pub mod bindings;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use bindings::BindingSet;
pub use config::Config;
pub use error::CoreError;
pub use types::{
    Binding, BindingKind, Environment, EnvironmentName, PackageName, DEFAULT_PACKAGE,
};
