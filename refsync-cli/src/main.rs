//! refsync: keep reference codelists and action images in step with their
//! upstream sources.
//!
//! # Usage
//!
//! ```text
//! refsync codelists update [--dir <path>]
//! refsync codelists check [--dir <path>]
//! refsync pull [IMAGE] [--force] [--project <project.yaml>]
//! refsync check-version
//! refsync images [--json]
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    codelists::CodelistsCommand, images::ImagesArgs, pull::PullArgs, version::CheckVersionArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "refsync",
    version,
    about = "Sync reference codelists and local action images",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download codelists or check them against the manifest.
    Codelists {
        #[command(subcommand)]
        command: CodelistsCommand,
    },

    /// Update local action images from the registry.
    Pull(PullArgs),

    /// Warn when local action images are behind the registry.
    CheckVersion(CheckVersionArgs),

    /// List known action images and their local digests.
    Images(ImagesArgs),
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // User-facing failures go to stdout, then exit 1.
            println!("{}", render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Codelists { command } => commands::codelists::run(command),
        Commands::Pull(args) => args.run(),
        Commands::CheckVersion(args) => args.run(),
        Commands::Images(args) => args.run(),
    }
}

/// The error followed by any cause its message does not already include.
fn render_error(err: &anyhow::Error) -> String {
    let mut out = err.to_string();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str("\n  caused by: ");
            out.push_str(&text);
        }
    }
    out
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
