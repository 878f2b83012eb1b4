//! Update local images from the registry.

use std::fmt;
use std::path::{Path, PathBuf};

use refsync_core::project::parse_project_file;
use refsync_core::ConfigError;

use crate::catalog::ImageCatalog;
use crate::runtime::ContainerRuntime;
use crate::ImageError;

/// Which images a pull covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every catalog image already present locally (or all, when forced).
    All,
    /// One named image, always pulled.
    Image(String),
    /// The images used by a project file's actions, always pulled.
    Project(PathBuf),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PullReport {
    pub pulled: Vec<String>,
    pub removed: Vec<String>,
}

impl fmt::Display for PullReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pulled.is_empty() {
            return write!(f, "No docker images found to update.");
        }
        write!(f, "Updated {} image(s): {}", self.pulled.len(), self.pulled.join(", "))
    }
}

/// Catalog images referenced by the actions in `project`, in file order and
/// without repeats.
pub fn images_for_project(catalog: &ImageCatalog, project: &Path) -> Result<Vec<String>, ImageError> {
    let mut images: Vec<String> = Vec::new();
    for action in parse_project_file(project)? {
        let image = action.image_name();
        if catalog.contains(image) && !images.iter().any(|seen| seen == image) {
            images.push(image.to_string());
        }
    }
    if images.is_empty() {
        return Err(ConfigError::NoActions {
            path: project.to_path_buf(),
        }
        .into());
    }
    Ok(images)
}

fn resolve(catalog: &ImageCatalog, selection: &Selection) -> Result<(Vec<String>, bool), ImageError> {
    match selection {
        Selection::All => Ok((catalog.images.clone(), false)),
        Selection::Image(name) if catalog.contains(name) => Ok((vec![name.clone()], true)),
        Selection::Image(name) => Err(ImageError::UnknownImage {
            name: name.clone(),
            known: catalog.images.join(", "),
        }),
        Selection::Project(path) => Ok((images_for_project(catalog, path)?, true)),
    }
}

/// Pull the selected images, then clean up leftovers from old registries.
pub fn pull(
    catalog: &ImageCatalog,
    runtime: &dyn ContainerRuntime,
    selection: &Selection,
    force: bool,
) -> Result<PullReport, ImageError> {
    runtime.preflight()?;
    let (images, forced) = resolve(catalog, selection)?;
    let force = force || forced;
    let local = runtime.list_local_images(&catalog.local_pattern())?;

    let mut report = PullReport::default();
    for image in images {
        if !catalog.is_published(&image) {
            tracing::debug!(image = %image, "not published, skipping");
            continue;
        }
        let tag = catalog.full_name(&image);
        if force || local.contains_key(&tag) {
            tracing::info!("Updating {image} image");
            runtime.pull(&tag)?;
            report.pulled.push(image);
        }
    }

    if report.pulled.is_empty() {
        return Ok(report);
    }

    tracing::info!("Cleaning up old images");
    report.removed = remove_deprecated(catalog, runtime);
    runtime.prune_dangling()?;
    Ok(report)
}

/// Best effort: listing or removal failures are logged and skipped.
fn remove_deprecated(catalog: &ImageCatalog, runtime: &dyn ContainerRuntime) -> Vec<String> {
    let mut removed = Vec::new();
    for registry in &catalog.deprecated_registries {
        let local = match runtime.list_local_images(&format!("{registry}/*")) {
            Ok(local) => local,
            Err(err) => {
                tracing::warn!("could not list images under {registry}: {err}");
                continue;
            }
        };
        for image in &catalog.images {
            let tag = format!("{registry}/{image}");
            if !local.contains_key(&tag) {
                continue;
            }
            match runtime.remove_image(&tag) {
                Ok(()) => removed.push(tag),
                Err(err) => tracing::warn!("could not remove {tag}: {err}"),
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn project_images_are_deduplicated_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.yaml");
        fs::write(
            &path,
            "actions:\n  a:\n    run: r:latest analysis/a.R\n  b:\n    run: python:latest x.py\n  \
             c:\n    run: r:latest analysis/c.R\n  d:\n    run: ruby:latest nope.rb\n",
        )
        .unwrap();
        let images = images_for_project(&ImageCatalog::default(), &path).unwrap();
        assert_eq!(images, vec!["r".to_string(), "python".to_string()]);
    }

    #[test]
    fn project_without_catalog_images_has_no_actions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.yaml");
        fs::write(&path, "actions:\n  a:\n    run: ruby:latest x.rb\n").unwrap();
        let err = images_for_project(&ImageCatalog::default(), &path).unwrap_err();
        assert!(matches!(err, ImageError::Config(ConfigError::NoActions { .. })));
        assert!(err.to_string().starts_with("No actions found in"));
    }

    #[test]
    fn unknown_image_lists_known_ones() {
        let err = resolve(&ImageCatalog::default(), &Selection::Image("ruby".into())).unwrap_err();
        assert!(err.to_string().contains("cohortextractor, cohortextractor-v2"));
    }

    #[test]
    fn empty_report_says_nothing_found() {
        assert_eq!(
            PullReport::default().to_string(),
            "No docker images found to update."
        );
    }
}
