//! Shared entrypoint used by the CLI: picks the resource directory and the
//! missing-manifest strategy from [`Settings`].

use std::path::Path;

use refsync_core::Settings;

use crate::check::{check_at, CheckOutcome};
use crate::fetch::Fetcher;
use crate::resolve::{ManifestResolver, RequireManifest, SynthesizeManifest};
use crate::update::{update_at, UpdateSummary};
use crate::SyncError;

/// Fetch everything in `resource_dir` from the configured codelists site.
pub fn update(
    resource_dir: &Path,
    settings: &Settings,
    fetcher: &dyn Fetcher,
) -> Result<UpdateSummary, SyncError> {
    update_at(resource_dir, &settings.codelists_url, fetcher)
}

/// Check `resource_dir`, synthesizing a missing manifest only in CI.
///
/// Drift is returned as `Err(SyncError::Drift)`.
pub fn check(
    resource_dir: &Path,
    settings: &Settings,
    fetcher: &dyn Fetcher,
) -> Result<CheckOutcome, SyncError> {
    let synthesize = SynthesizeManifest::new(fetcher, settings.codelists_url.clone());
    let resolver: &dyn ManifestResolver = if settings.ci {
        &synthesize
    } else {
        &RequireManifest
    };
    match check_at(resource_dir, resolver)? {
        CheckOutcome::Checked(report) => Ok(CheckOutcome::Checked(report.into_result()?)),
        outcome => Ok(outcome),
    }
}
