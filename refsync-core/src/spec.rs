//! Codelist specification parsing.
//!
//! # File format
//!
//! ```text
//! # comment
//! myproj/mycodelist/20200101
//! user/alice/mycodelist/20200101/
//! ```
//!
//! One token path per line. Surrounding whitespace and trailing slashes are
//! ignored, as are blank lines and `#` comments.

use std::path::{Path, PathBuf};

use crate::config::{self, DATA_EXTENSION, DEFAULT_CODELISTS_URL};
use crate::error::{io_err, ConfigError};
use crate::types::{ResourceDescriptor, ResourceId};

/// Parse `<resource_dir>/codelists.txt` against the default codelists site.
pub fn parse(resource_dir: &Path) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    parse_with_base(resource_dir, DEFAULT_CODELISTS_URL)
}

/// Parse `<resource_dir>/codelists.txt`, building URLs under `base_url`.
///
/// Descriptors are returned in file order.
pub fn parse_with_base(
    resource_dir: &Path,
    base_url: &str,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    if !resource_dir.is_dir() {
        return Err(ConfigError::MissingDirectory {
            dir: resource_dir.to_path_buf(),
        });
    }
    let path = config::spec_path(resource_dir);
    if !path.is_file() {
        return Err(ConfigError::MissingSpecFile { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    parse_str(&contents, resource_dir, base_url)
}

/// Parse specification text. Local filenames are placed inside `resource_dir`.
pub fn parse_str(
    contents: &str,
    resource_dir: &Path,
    base_url: &str,
) -> Result<Vec<ResourceDescriptor>, ConfigError> {
    let base_url = base_url.trim_end_matches('/');
    let mut descriptors = Vec::new();
    // `\r\n`, bare `\r` and `\n` all end a line.
    let contents = contents.replace("\r\n", "\n").replace('\r', "\n");
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim().trim_end_matches('/');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split('/').collect();
        if !matches!(tokens.len(), 3 | 4) {
            return Err(ConfigError::InvalidLine {
                line_number: index + 1,
                line: line.to_string(),
            });
        }
        descriptors.push(descriptor(line, &tokens, resource_dir, base_url));
    }
    Ok(descriptors)
}

fn descriptor(
    line: &str,
    tokens: &[&str],
    resource_dir: &Path,
    base_url: &str,
) -> ResourceDescriptor {
    let url = format!("{base_url}/codelist/{line}/");
    let stem = tokens[..tokens.len() - 1].join("-");
    ResourceDescriptor {
        id: ResourceId::from(line),
        download_url: format!("{url}download.csv"),
        url,
        local_filename: local_path(resource_dir, &stem),
    }
}

fn local_path(resource_dir: &Path, stem: &str) -> PathBuf {
    resource_dir.join(format!("{stem}.{DATA_EXTENSION}"))
}
