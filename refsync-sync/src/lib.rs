//! # refsync-sync
//!
//! Manifest-based synchronization and drift detection for codelists.
//!
//! Call [`update_at`] to fetch every specified codelist and rewrite the
//! manifest, or [`check_at`] to compare the specification, manifest and
//! files on disk. [`pipeline`] wires both to [`refsync_core::Settings`].

pub mod check;
pub mod diff;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod manifest;
pub mod pipeline;
pub mod resolve;
pub mod update;

pub use check::{check_at, CheckOutcome, DriftReport, ManifestSource};
pub use error::SyncError;
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use manifest::{Manifest, ManifestEntry};
pub use resolve::{ManifestResolver, RequireManifest, SynthesizeManifest};
pub use update::{update_at, UpdateSummary};
