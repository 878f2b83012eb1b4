//! Drift detection between the specification, the manifest and the files on
//! disk.
//!
//! Three independent comparisons, reported in this order:
//! 1. Specification ids vs manifest ids (spec edited without `update`).
//! 2. `.csv` files on disk vs manifest keys (files added or deleted by hand).
//! 3. Normalized digest of every tracked file vs the recorded digest (files
//!    edited by hand).
//!
//! Each comparison is evaluated in full; a failure in one does not hide the
//! others.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use refsync_core::{config, spec};

use crate::diff::{set_changes, SetChange};
use crate::error::SyncError;
use crate::hash;
use crate::manifest::{self, Manifest};
use crate::resolve::ManifestResolver;
use crate::update::data_files;

/// Where the manifest used for a check came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    /// `codelists.json` in the resource directory.
    Committed,
    /// Built on the fly by a [`ManifestResolver`].
    Synthesized,
}

/// Result of checking a resource directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No resource directory, so nothing to check.
    NoResourceDirectory,
    Checked(DriftReport),
}

/// Everything that disagrees, by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    pub manifest_source: ManifestSource,
    pub spec_changes: Vec<SetChange>,
    pub file_changes: Vec<SetChange>,
    /// Manifest keys whose file content no longer matches, sorted.
    pub modified_files: Vec<String>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.spec_changes.is_empty()
            && self.file_changes.is_empty()
            && self.modified_files.is_empty()
    }

    /// `Ok(self)` when clean, `Err(SyncError::Drift)` otherwise.
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(SyncError::Drift(self))
        }
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "Codelists OK");
        }
        if !self.spec_changes.is_empty() {
            writeln!(
                f,
                "It looks like '{}' has been edited but 'update' hasn't been run.",
                config::SPEC_FILE
            )?;
            write_changes(f, &self.spec_changes)?;
            writeln!(f)?;
        }
        if !self.file_changes.is_empty() {
            writeln!(
                f,
                "It looks like CSV files have been added or deleted in the '{}' folder.",
                config::CODELISTS_DIR
            )?;
            write_changes(f, &self.file_changes)?;
            writeln!(f)?;
        }
        if !self.modified_files.is_empty() {
            writeln!(f, "A CSV file seems to have been modified since it was downloaded:")?;
            for file in &self.modified_files {
                writeln!(f, "  {}/{file}", config::CODELISTS_DIR)?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "To fix these errors run the command below and commit the changes:\n"
        )?;
        writeln!(f, "  {}", config::UPDATE_COMMAND)
    }
}

fn write_changes(f: &mut fmt::Formatter<'_>, changes: &[SetChange]) -> fmt::Result {
    for change in changes {
        writeln!(f, "{change}")?;
    }
    Ok(())
}

/// Check `resource_dir` for drift.
///
/// A missing manifest is handed to `resolver`. The returned report may be
/// dirty; call [`DriftReport::into_result`] to turn drift into an error.
pub fn check_at(
    resource_dir: &Path,
    resolver: &dyn ManifestResolver,
) -> Result<CheckOutcome, SyncError> {
    if !resource_dir.exists() {
        tracing::debug!(dir = %resource_dir.display(), "no resource directory");
        return Ok(CheckOutcome::NoResourceDirectory);
    }
    let descriptors = spec::parse(resource_dir)?;

    let manifest_path = config::manifest_path(resource_dir);
    let (manifest, manifest_source) = if manifest_path.exists() {
        (manifest::load(&manifest_path)?, ManifestSource::Committed)
    } else {
        (
            resolver.resolve_missing(resource_dir)?,
            ManifestSource::Synthesized,
        )
    };

    let ids_in_spec: BTreeSet<String> = descriptors.iter().map(|d| d.id.0.clone()).collect();
    let ids_in_manifest: BTreeSet<String> = manifest.ids().map(|id| id.0.clone()).collect();
    let spec_changes = set_changes(&ids_in_spec, &ids_in_manifest);

    let files_on_disk = data_files(resource_dir)?;
    let files_in_manifest: BTreeSet<String> = manifest.files.keys().cloned().collect();
    let file_changes = set_changes(&files_on_disk, &files_in_manifest);

    let modified_files = modified_files(resource_dir, &manifest, &files_on_disk)?;

    Ok(CheckOutcome::Checked(DriftReport {
        manifest_source,
        spec_changes,
        file_changes,
        modified_files,
    }))
}

/// Tracked files whose content changed. Files missing from disk are already
/// reported as file-set drift and are skipped here.
fn modified_files(
    resource_dir: &Path,
    manifest: &Manifest,
    files_on_disk: &BTreeSet<String>,
) -> Result<Vec<String>, SyncError> {
    let mut modified = Vec::new();
    for (filename, entry) in manifest.files.iter() {
        if !files_on_disk.contains(filename) {
            continue;
        }
        let current = hash::digest_file(&resource_dir.join(filename))?;
        if current != entry.digest {
            tracing::debug!(file = %filename, expected = %entry.digest, actual = %current, "digest mismatch");
            modified.push(filename.clone());
        }
    }
    modified.sort();
    Ok(modified)
}
