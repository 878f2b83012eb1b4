//! What `check` does when the manifest is missing.
//!
//! Repositories created before manifests existed have data files but no
//! `codelists.json`. Outside CI that is an error; inside CI the manifest can
//! be synthesized by running a full update into a throwaway directory, which
//! is equivalent to checking against the live site.

use std::path::Path;

use tempfile::TempDir;

use refsync_core::config;

use crate::error::{io_err, SyncError};
use crate::fetch::Fetcher;
use crate::manifest::{self, Manifest};
use crate::update::update_at;

/// Strategy for a resource directory that has no manifest.
pub trait ManifestResolver {
    /// Produce a manifest to check against, or fail.
    fn resolve_missing(&self, resource_dir: &Path) -> Result<Manifest, SyncError>;
}

/// Fail with [`SyncError::ManifestMissing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireManifest;

impl ManifestResolver for RequireManifest {
    fn resolve_missing(&self, resource_dir: &Path) -> Result<Manifest, SyncError> {
        Err(SyncError::ManifestMissing {
            path: config::manifest_path(resource_dir),
        })
    }
}

/// Fetch everything into a temporary directory and use the manifest that
/// produces. Nothing in `resource_dir` is modified.
pub struct SynthesizeManifest<'a> {
    fetcher: &'a dyn Fetcher,
    base_url: String,
}

impl<'a> SynthesizeManifest<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }
}

impl ManifestResolver for SynthesizeManifest<'_> {
    fn resolve_missing(&self, resource_dir: &Path) -> Result<Manifest, SyncError> {
        tracing::warn!(
            "no manifest at {}; using a temporary manifest built from the live site. \
             Run `{}` and commit the result",
            config::manifest_path(resource_dir).display(),
            config::UPDATE_COMMAND,
        );
        let scratch = TempDir::new().map_err(|e| io_err(std::env::temp_dir(), e))?;
        let source = config::spec_path(resource_dir);
        let target = config::spec_path(scratch.path());
        std::fs::copy(&source, &target).map_err(|e| io_err(&source, e))?;

        let summary = update_at(scratch.path(), &self.base_url, self.fetcher)?;
        manifest::load(&summary.manifest_path)
    }
}
