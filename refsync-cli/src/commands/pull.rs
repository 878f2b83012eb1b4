//! `refsync pull`: update local action images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use refsync_core::Settings;
use refsync_images::{pull, DockerCli, ImageCatalog, Selection};

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image to update, or `all` (default).
    pub image: Option<String>,

    /// Update images even if they are not present locally.
    #[arg(long)]
    pub force: bool,

    /// Pull the images used by this project file's actions.
    #[arg(long, conflicts_with = "image")]
    pub project: Option<PathBuf>,
}

impl PullArgs {
    pub fn run(self) -> Result<()> {
        let catalog = ImageCatalog::from_settings(&Settings::from_env());
        let selection = match (self.project, self.image) {
            (Some(project), _) => Selection::Project(project),
            (None, Some(image)) if image != "all" => Selection::Image(image),
            (None, _) => Selection::All,
        };

        let report = pull(&catalog, &DockerCli::default(), &selection, self.force)
            .context("failed to update images")?;
        println!("{report}");
        Ok(())
    }
}
