//! Manifest store: the committed record of what was last fetched.
//!
//! Persists a JSON document at `<resource_dir>/codelists.json`:
//!
//! ```json
//! {
//!   "files": {
//!     "proj-list.csv": {
//!       "id": "proj/list/v1",
//!       "url": "https://codelists.opensafely.org/codelist/proj/list/v1/",
//!       "downloaded_at": "2024-03-01 09:30:00.123456Z",
//!       "sha": "a9993e364706816aba3e25717850c26c9cd0d89d"
//!     }
//!   }
//! }
//! ```
//!
//! Entries keep the order they were written in (specification order) and
//! `downloaded_at` is stored verbatim, so a manifest written by an older tool
//! survives a no-op update byte for byte. Writes use an atomic `.tmp` +
//! rename.

use std::fmt;
use std::ops::Index;
use std::path::Path;

use chrono::{DateTime, Timelike, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use refsync_core::ResourceId;

use crate::error::{io_err, SyncError};

/// One fetched file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub id: ResourceId,
    #[serde(rename = "url")]
    pub source_url: String,
    /// Opaque once written; only [`downloaded_at`] produces new values.
    #[serde(rename = "downloaded_at")]
    pub fetched_at: String,
    #[serde(rename = "sha")]
    pub digest: String,
}

/// Manifest entries keyed by file name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFiles {
    entries: Vec<(String, ManifestEntry)>,
}

impl ManifestFiles {
    /// Replaces an existing entry in place, otherwise appends.
    pub fn insert(&mut self, filename: String, entry: ManifestEntry) {
        match self.entries.iter_mut().find(|(key, _)| *key == filename) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((filename, entry)),
        }
    }

    pub fn get(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == filename)
            .map(|(_, entry)| entry)
    }

    pub fn contains_key(&self, filename: &str) -> bool {
        self.get(filename).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManifestEntry)> {
        self.entries.iter().map(|(key, entry)| (key, entry))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ManifestEntry)> {
        self.entries.iter_mut().map(|(key, entry)| (&*key, entry))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter().map(|(_, entry)| entry)
    }
}

impl Index<&str> for ManifestFiles {
    type Output = ManifestEntry;

    fn index(&self, filename: &str) -> &ManifestEntry {
        match self.get(filename) {
            Some(entry) => entry,
            None => panic!("no manifest entry for {filename}"),
        }
    }
}

impl Serialize for ManifestFiles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ManifestFiles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilesVisitor;

        impl<'de> Visitor<'de> for FilesVisitor {
            type Value = ManifestFiles;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of file names to manifest entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ManifestFiles, A::Error> {
                let mut files = ManifestFiles::default();
                while let Some((key, entry)) = access.next_entry::<String, ManifestEntry>()? {
                    files.insert(key, entry);
                }
                Ok(files)
            }
        }

        deserializer.deserialize_map(FilesVisitor)
    }
}

/// Fetched files keyed by file name relative to the resource directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub files: ManifestFiles,
}

impl Manifest {
    /// Ids of every entry.
    pub fn ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.files.values().map(|entry| &entry.id)
    }
}

/// `downloaded_at` text for `at`: `YYYY-MM-DD HH:MM:SS[.ffffff]Z`, the
/// fraction omitted when it is zero microseconds.
pub fn downloaded_at(at: DateTime<Utc>) -> String {
    let micros = at.nanosecond() / 1_000;
    if micros == 0 {
        format!("{}Z", at.format("%Y-%m-%d %H:%M:%S"))
    } else {
        format!("{}.{micros:06}Z", at.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Load the manifest at `path`.
///
/// Returns `SyncError::ManifestMissing` if absent and
/// `SyncError::ManifestCorrupt` if the content is not a valid manifest.
pub fn load(path: &Path) -> Result<Manifest, SyncError> {
    if !path.exists() {
        return Err(SyncError::ManifestMissing {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&contents).map_err(|source| SyncError::ManifestCorrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Save the manifest atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(manifest: &Manifest, path: &Path) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(manifest)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Carry `fetched_at` over from `old` for every file whose digest is
/// unchanged, so a no-op update leaves the manifest byte-identical.
pub fn reconcile_timestamps(new: &mut Manifest, old: &Manifest) {
    for (filename, entry) in new.files.iter_mut() {
        let Some(previous) = old.files.get(filename) else {
            continue;
        };
        if previous.digest == entry.digest {
            entry.fetched_at = previous.fetched_at.clone();
        }
    }
}
