//! Compare local image digests with the registry's `latest` tag.

use std::fmt;

use crate::catalog::ImageCatalog;
use crate::registry::{RegistryClient, RegistryTransport};
use crate::runtime::ContainerRuntime;
use crate::ImageError;

pub const LATEST_TAG: &str = "latest";

/// Images whose remote digest differs from the local one, plus images that
/// could not be checked.
#[derive(Debug, Default)]
pub struct VersionReport {
    pub outdated: Vec<String>,
    pub failed: Vec<(String, ImageError)>,
}

impl VersionReport {
    pub fn is_current(&self) -> bool {
        self.outdated.is_empty()
    }
}

impl fmt::Display for VersionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.outdated.is_empty() {
            return write!(f, "All local images are up to date.");
        }
        writeln!(
            f,
            "Warning: the docker images for {} actions are out of date - please update by running:",
            self.outdated.join(", ")
        )?;
        write!(f, "    {}", refsync_core::config::PULL_COMMAND)
    }
}

/// Checks every catalog image present locally against the registry.
///
/// A failure for one image is recorded in the report and the rest are still
/// checked. Only listing local images can fail the whole run.
pub fn check_for_updates<T: RegistryTransport>(
    catalog: &ImageCatalog,
    runtime: &dyn ContainerRuntime,
    client: &mut RegistryClient<T>,
) -> Result<VersionReport, ImageError> {
    let local = runtime.list_local_images(&catalog.local_pattern())?;
    let mut report = VersionReport::default();

    for image in &catalog.images {
        let full_name = catalog.full_name(image);
        let Some(local_digest) = local.get(&full_name) else {
            tracing::debug!(image = %image, "not present locally, skipping");
            continue;
        };
        match client.remote_digest(&full_name, LATEST_TAG) {
            Ok(remote) if &remote != local_digest => {
                tracing::debug!(image = %image, local = %local_digest, remote = %remote, "outdated");
                report.outdated.push(image.clone());
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(image = %image, "could not check remote version: {err}");
                report.failed.push((image.clone(), err));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_outdated_images_and_pull_command() {
        let report = VersionReport {
            outdated: vec!["python".to_string(), "r".to_string()],
            failed: Vec::new(),
        };
        let text = report.to_string();
        assert!(text.contains("python, r actions are out of date"));
        assert!(text.ends_with("    refsync pull"));
        assert!(!report.is_current());
    }

    #[test]
    fn empty_report_is_current() {
        let report = VersionReport::default();
        assert!(report.is_current());
        assert_eq!(report.to_string(), "All local images are up to date.");
    }
}
