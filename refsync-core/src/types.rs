//! Domain types shared by the sync engine and the CLI.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identity of a codelist: its normalized token path, e.g.
/// `project/codelist/version` or `user/alice/codelist/version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One remote resource named by a line of the specification file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: ResourceId,
    /// Human-browsable page for the resource; shown in error messages.
    pub url: String,
    /// Machine download location.
    pub download_url: String,
    /// Absolute location of the local copy inside the resource directory.
    pub local_filename: PathBuf,
}

impl ResourceDescriptor {
    /// The local file name relative to the resource directory, used as the
    /// manifest key.
    pub fn file_key(&self) -> String {
        self.local_filename
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One action from a project file: its name and `run` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectAction {
    pub name: String,
    pub run: String,
}

impl ProjectAction {
    /// Image name of the run command, i.e. the part before the first `:`.
    pub fn image_name(&self) -> &str {
        let command = self.run.split_whitespace().next().unwrap_or("");
        command.split(':').next().unwrap_or(command)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
