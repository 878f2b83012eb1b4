//! Error types for refsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use refsync_core::{config::UPDATE_COMMAND, ConfigError, ResourceId};

use crate::check::DriftReport;
use crate::fetch::FetchError;

/// All errors that can arise from update and check operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed or missing specification.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A resource could not be downloaded; the whole update was abandoned.
    #[error(
        "Error downloading codelist {id}: {source}\n\n\
         Check that you can access the codelist at:\n{url}"
    )]
    Fetch {
        id: ResourceId,
        /// Browsable page, not the download URL.
        url: String,
        #[source]
        source: FetchError,
    },

    /// No manifest next to the specification.
    #[error(
        "No file found at '{}'.\n\
         To fix these errors run the command below and commit the changes:\n\n  {UPDATE_COMMAND}\n",
        path.display()
    )]
    ManifestMissing { path: PathBuf },

    /// The manifest exists but does not parse.
    #[error(
        "'{}' is invalid: {source}\n\
         Note that this file is automatically generated and should not be manually edited.\n\
         To fix these errors run the command below and commit the changes:\n\n  {UPDATE_COMMAND}\n",
        path.display()
    )]
    ManifestCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Specification, manifest and files on disk disagree.
    #[error("{0}")]
    Drift(DriftReport),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (manifest save path).
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
