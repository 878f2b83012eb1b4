//! refsync core library: domain types, configuration, input parsing and errors.
//!
//! - [`types`]: newtypes and domain structs
//! - [`error`]: [`ConfigError`]
//! - [`config`]: well-known names and [`Settings`]
//! - [`spec`]: codelist specification parsing
//! - [`project`]: project file actions

pub mod config;
pub mod error;
pub mod project;
pub mod spec;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use types::{ProjectAction, ResourceDescriptor, ResourceId};
