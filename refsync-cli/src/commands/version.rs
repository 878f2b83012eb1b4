//! `refsync check-version`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use refsync_core::Settings;
use refsync_images::{check_for_updates, DockerCli, ImageCatalog, RegistryClient};

#[derive(Args, Debug)]
pub struct CheckVersionArgs {}

impl CheckVersionArgs {
    pub fn run(self) -> Result<()> {
        let catalog = ImageCatalog::from_settings(&Settings::from_env());
        let mut client = RegistryClient::over_http();
        let report = check_for_updates(&catalog, &DockerCli::default(), &mut client)
            .context("failed to list local images")?;

        for (image, err) in &report.failed {
            println!("{} could not check {image}: {err}", "warning:".yellow().bold());
        }
        if report.is_current() {
            println!("{report}");
        } else {
            println!("{}", report.to_string().yellow());
        }
        Ok(())
    }
}
