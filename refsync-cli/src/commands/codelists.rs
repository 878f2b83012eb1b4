//! `refsync codelists update` and `refsync codelists check`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use refsync_core::{config, Settings};
use refsync_sync::{pipeline, CheckOutcome, HttpFetcher, ManifestSource, UpdateSummary};

#[derive(Subcommand, Debug)]
pub enum CodelistsCommand {
    /// Download every codelist in codelists.txt and rewrite codelists.json.
    Update(DirArgs),

    /// Check that codelists.txt, codelists.json and the CSV files agree.
    Check(DirArgs),
}

#[derive(Args, Debug)]
pub struct DirArgs {
    /// Project directory containing the `codelists` folder.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(cmd: CodelistsCommand) -> Result<()> {
    let settings = Settings::from_env();
    let fetcher = HttpFetcher::new();
    match cmd {
        CodelistsCommand::Update(args) => {
            let resource_dir = config::resource_dir(&args.dir);
            let summary = pipeline::update(&resource_dir, &settings, &fetcher)?;
            print_summary(&summary);
            Ok(())
        }
        CodelistsCommand::Check(args) => {
            let resource_dir = config::resource_dir(&args.dir);
            match pipeline::check(&resource_dir, &settings, &fetcher)? {
                CheckOutcome::NoResourceDirectory => {
                    println!(
                        "No '{}' directory present so nothing to check",
                        config::CODELISTS_DIR
                    );
                }
                CheckOutcome::Checked(report) => {
                    if report.manifest_source == ManifestSource::Synthesized {
                        print_synthesized_warning();
                    }
                    println!("{report}");
                }
            }
            Ok(())
        }
    }
}

fn print_summary(summary: &UpdateSummary) {
    println!(
        "Fetched {} codelist(s), {} changed, {} removed",
        summary.fetched.len(),
        summary.changed.len(),
        summary.deleted.len(),
    );
    for file in &summary.changed {
        println!("  {} {}/{file}", "changed".yellow(), config::CODELISTS_DIR);
    }
    for file in &summary.deleted {
        println!("  {} {}/{file}", "removed".red(), config::CODELISTS_DIR);
    }
    println!("Manifest written to {}", summary.manifest_path.display());
}

fn print_synthesized_warning() {
    let banner = format!(
        "==> WARNING\n    \
         No {} found, so it was rebuilt from the codelists site for this check.\n    \
         Run `{}` and commit {} to make this check strict.",
        config::MANIFEST_FILE,
        config::UPDATE_COMMAND,
        config::MANIFEST_FILE,
    );
    println!("{}", banner.yellow().bold());
}
