//! Error types for refsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::UPDATE_COMMAND;

/// Malformed or missing user input: the codelist specification or a project
/// file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The resource directory does not exist or is not a directory.
    #[error("No '{}' folder found", dir.display())]
    MissingDirectory { dir: PathBuf },

    /// The directory exists but holds no specification file.
    #[error("No file found at '{}'", path.display())]
    MissingSpecFile { path: PathBuf },

    /// A specification line has neither 3 nor 4 tokens.
    #[error(
        "{line} (line {line_number}) does not match [project]/[codelist]/[version] \
         or user/[username]/[codelist]/[version]\n\
         Fix the specification file and run: {UPDATE_COMMAND}"
    )]
    InvalidLine { line_number: usize, line: String },

    /// Underlying I/O failure, with the path that was being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find {}", path.display())]
    ProjectFileNotFound { path: PathBuf },

    /// YAML parse error on a project file; includes line context from serde_yaml.
    #[error("Could not parse {}: {source}", path.display())]
    ProjectFileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No actions found in {}", path.display())]
    NoActions { path: PathBuf },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
