//! `refsync images`: known images and what is present locally.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use refsync_core::Settings;
use refsync_images::{ContainerRuntime, DockerCli, ImageCatalog};

#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct ImageRow {
    #[tabled(rename = "image")]
    image: String,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "local digest", display_with = "display_digest")]
    local_digest: Option<String>,
    #[tabled(rename = "published")]
    published: bool,
}

fn display_digest(digest: &Option<String>) -> String {
    digest.clone().unwrap_or_else(|| "-".to_string())
}

impl ImagesArgs {
    pub fn run(self) -> Result<()> {
        let catalog = ImageCatalog::from_settings(&Settings::from_env());
        let local = DockerCli::default()
            .list_local_images(&catalog.local_pattern())
            .context("failed to list local images")?;

        let rows: Vec<ImageRow> = catalog
            .images
            .iter()
            .map(|image| {
                let repository = catalog.full_name(image);
                ImageRow {
                    image: image.clone(),
                    local_digest: local.get(&repository).cloned(),
                    repository,
                    published: catalog.is_published(image),
                }
            })
            .collect();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize images JSON")?
            );
            return Ok(());
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
