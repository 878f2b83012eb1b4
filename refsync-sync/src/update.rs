//! `update`: fetch every specified codelist and rewrite the manifest.
//!
//! ## Protocol
//!
//! 1. Parse the specification.
//! 2. Snapshot the `.csv` files already on disk.
//! 3. Fetch each resource in file order and write the raw bytes. The first
//!    failure aborts the run before the manifest is touched.
//! 4. Reconcile timestamps with the previous manifest and save atomically.
//! 5. Delete files that are no longer specified.
//!
//! Steps 3-5 are not transactional. A run that dies after writing some files
//! leaves them ahead of the manifest, and `check` reports that as drift.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;

use refsync_core::{config, spec, ResourceId};

use crate::error::{io_err, SyncError};
use crate::fetch::Fetcher;
use crate::hash;
use crate::manifest::{self, Manifest, ManifestEntry};

/// Outcome of a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub manifest_path: PathBuf,
    /// Fetched ids, in specification order.
    pub fetched: Vec<ResourceId>,
    /// Files whose digest differs from the previous manifest (or are new).
    pub changed: Vec<String>,
    /// Orphaned files that were deleted.
    pub deleted: Vec<String>,
}

/// Update `resource_dir` against the codelists site at `base_url`.
pub fn update_at(
    resource_dir: &Path,
    base_url: &str,
    fetcher: &dyn Fetcher,
) -> Result<UpdateSummary, SyncError> {
    let descriptors = spec::parse_with_base(resource_dir, base_url)?;
    let old_files = data_files(resource_dir)?;

    let mut new_files = BTreeSet::new();
    let mut manifest = Manifest::default();
    let mut fetched = Vec::with_capacity(descriptors.len());

    for descriptor in &descriptors {
        tracing::info!("Fetching {}", descriptor.id);
        let content = fetcher
            .get(&descriptor.download_url)
            .map_err(|source| SyncError::Fetch {
                id: descriptor.id.clone(),
                url: descriptor.url.clone(),
                source,
            })?;

        // On-disk bytes are kept exactly as served; only the digest is normalized.
        let path = &descriptor.local_filename;
        std::fs::write(path, &content).map_err(|e| io_err(path, e))?;

        let key = descriptor.file_key();
        let digest = hash::digest(&content);
        tracing::debug!(file = %key, sha = %digest, "wrote");
        new_files.insert(key.clone());
        manifest.files.insert(
            key,
            ManifestEntry {
                id: descriptor.id.clone(),
                source_url: descriptor.url.clone(),
                fetched_at: manifest::downloaded_at(Utc::now()),
                digest,
            },
        );
        fetched.push(descriptor.id.clone());
    }

    let manifest_path = config::manifest_path(resource_dir);
    let previous = load_previous(&manifest_path)?;
    if let Some(previous) = &previous {
        manifest::reconcile_timestamps(&mut manifest, previous);
    }
    let changed = changed_files(&manifest, previous.as_ref());
    manifest::save(&manifest, &manifest_path)?;

    let mut deleted = Vec::new();
    for orphan in old_files.difference(&new_files) {
        tracing::info!("Deleting {orphan}");
        let path = resource_dir.join(orphan);
        std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        deleted.push(orphan.clone());
    }

    Ok(UpdateSummary {
        manifest_path,
        fetched,
        changed,
        deleted,
    })
}

/// Names of the `.csv` files directly inside `dir`.
pub(crate) fn data_files(dir: &Path) -> Result<BTreeSet<String>, SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut files = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let is_data = path
            .extension()
            .is_some_and(|ext| ext == config::DATA_EXTENSION);
        if is_data && path.is_file() {
            files.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(files)
}

/// A previous manifest that no longer parses is replaced, not repaired.
fn load_previous(path: &Path) -> Result<Option<Manifest>, SyncError> {
    match manifest::load(path) {
        Ok(previous) => Ok(Some(previous)),
        Err(SyncError::ManifestMissing { .. }) => Ok(None),
        Err(SyncError::ManifestCorrupt { path, source }) => {
            tracing::warn!(
                path = %path.display(),
                error = %source,
                "previous manifest is invalid; download dates will be reset"
            );
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn changed_files(manifest: &Manifest, previous: Option<&Manifest>) -> Vec<String> {
    manifest
        .files
        .iter()
        .filter(|(key, entry)| {
            previous
                .and_then(|p| p.files.get(*key))
                .map_or(true, |old| old.digest != entry.digest)
        })
        .map(|(key, _)| key.clone())
        .collect()
}
