//! The set of images this tool manages.

use refsync_core::config::DEFAULT_REGISTRY;
use refsync_core::Settings;

/// Images published under the registry, sorted.
pub const KNOWN_IMAGES: &[&str] = &[
    "cohortextractor",
    "cohortextractor-v2",
    "databuilder",
    "jupyter",
    "python",
    "r",
    "stata-mp",
];

/// Known images that are not published yet and are never pulled.
pub const UNPUBLISHED_IMAGES: &[&str] = &["databuilder"];

/// Registries that used to host the images. Leftovers are removed after a pull.
pub const DEPRECATED_REGISTRIES: &[&str] = &["docker.opensafely.org", "ghcr.io/opensafely"];

/// Registry prefix plus image names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    pub registry: String,
    pub images: Vec<String>,
    pub deprecated_registries: Vec<String>,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY)
    }
}

impl ImageCatalog {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            images: KNOWN_IMAGES.iter().map(|s| s.to_string()).collect(),
            deprecated_registries: DEPRECATED_REGISTRIES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.registry.clone())
    }

    pub fn contains(&self, image: &str) -> bool {
        self.images.iter().any(|known| known == image)
    }

    pub fn is_published(&self, image: &str) -> bool {
        !UNPUBLISHED_IMAGES.contains(&image)
    }

    /// `<registry>/<image>`, the repository name the runtime reports.
    pub fn full_name(&self, image: &str) -> String {
        format!("{}/{image}", self.registry)
    }

    /// `<registry>/*`, for listing local images.
    pub fn local_pattern(&self) -> String {
        format!("{}/*", self.registry)
    }
}
