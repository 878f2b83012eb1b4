//! Well-known names and environment-driven settings.
//!
//! Everything has a built-in default; the environment can override the
//! remote locations. [`Settings::from_lookup`] takes any variable lookup so
//! tests never touch the process environment.

use std::path::{Path, PathBuf};

/// Resource directory name, relative to the project root.
pub const CODELISTS_DIR: &str = "codelists";
/// Specification file inside the resource directory.
pub const SPEC_FILE: &str = "codelists.txt";
/// Manifest file inside the resource directory.
pub const MANIFEST_FILE: &str = "codelists.json";
/// Extension of every fetched data file.
pub const DATA_EXTENSION: &str = "csv";

pub const DEFAULT_CODELISTS_URL: &str = "https://codelists.opensafely.org";
pub const DEFAULT_REGISTRY: &str = "ghcr.io/opensafely-core";

/// Command that regenerates fetched data and the manifest.
pub const UPDATE_COMMAND: &str = "refsync codelists update";
/// Command that refreshes local container images.
pub const PULL_COMMAND: &str = "refsync pull";

pub const ENV_CODELISTS_URL: &str = "REFSYNC_CODELISTS_URL";
pub const ENV_REGISTRY: &str = "REFSYNC_REGISTRY";
/// Set by GitHub Actions in every workflow run.
pub const ENV_CI_WORKFLOW: &str = "GITHUB_WORKFLOW";

/// `<root>/codelists/`
pub fn resource_dir(root: &Path) -> PathBuf {
    root.join(CODELISTS_DIR)
}

/// `<resource_dir>/codelists.txt`
pub fn spec_path(resource_dir: &Path) -> PathBuf {
    resource_dir.join(SPEC_FILE)
}

/// `<resource_dir>/codelists.json`
pub fn manifest_path(resource_dir: &Path) -> PathBuf {
    resource_dir.join(MANIFEST_FILE)
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the codelists site, without trailing slash.
    pub codelists_url: String,
    /// Image registry prefix, e.g. `ghcr.io/opensafely-core`.
    pub registry: String,
    /// Running inside a recognized CI workflow.
    pub ci: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            codelists_url: DEFAULT_CODELISTS_URL.to_string(),
            registry: DEFAULT_REGISTRY.to_string(),
            ci: false,
        }
    }
}

impl Settings {
    /// Settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Settings from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            codelists_url: get(ENV_CODELISTS_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.codelists_url),
            registry: get(ENV_REGISTRY)
                .map(|registry| registry.trim_end_matches('/').to_string())
                .unwrap_or(defaults.registry),
            ci: get(ENV_CI_WORKFLOW).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert!(!settings.ci);
    }

    #[test]
    fn overrides_strip_trailing_slashes() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_CODELISTS_URL, "http://localhost:8000/"),
            (ENV_REGISTRY, "registry.example.com/team/"),
        ]));
        assert_eq!(settings.codelists_url, "http://localhost:8000");
        assert_eq!(settings.registry, "registry.example.com/team");
    }

    #[test]
    fn ci_detected_from_workflow_variable() {
        assert!(Settings::from_lookup(lookup(&[(ENV_CI_WORKFLOW, "tests")])).ci);
        assert!(!Settings::from_lookup(lookup(&[(ENV_CI_WORKFLOW, "  ")])).ci);
    }

    #[test]
    fn path_helpers_compose() {
        let dir = resource_dir(Path::new("/study"));
        assert_eq!(dir, PathBuf::from("/study/codelists"));
        assert_eq!(spec_path(&dir), PathBuf::from("/study/codelists/codelists.txt"));
        assert_eq!(manifest_path(&dir), PathBuf::from("/study/codelists/codelists.json"));
    }
}
