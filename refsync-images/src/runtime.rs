//! Local container runtime capability.

use std::collections::BTreeMap;
use std::process::{Command, Output, Stdio};

use crate::ImageError;

/// What the image workflows need from the local container runtime.
pub trait ContainerRuntime {
    /// Fails when the runtime is not installed or not running.
    fn preflight(&self) -> Result<(), ImageError>;

    /// Local images matching `pattern`, as repository name to image id.
    fn list_local_images(&self, pattern: &str) -> Result<BTreeMap<String, String>, ImageError>;

    fn pull(&self, tag: &str) -> Result<(), ImageError>;

    fn remove_image(&self, tag: &str) -> Result<(), ImageError>;

    fn prune_dangling(&self) -> Result<(), ImageError>;
}

/// [`ContainerRuntime`] backed by the `docker` command line tool.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut command = self.program.clone();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }

    fn run(&self, args: &[&str], inherit_stdout: bool) -> Result<Output, ImageError> {
        let mut command = Command::new(&self.program);
        command.args(args);
        if inherit_stdout {
            command.stdout(Stdio::inherit()).stderr(Stdio::piped());
        }
        tracing::debug!(command = %self.describe(args), "running");
        let output = command.output().map_err(|source| ImageError::Spawn {
            command: self.describe(args),
            source,
        })?;
        if output.status.success() {
            return Ok(output);
        }
        Err(ImageError::Subprocess {
            command: self.describe(args),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl ContainerRuntime for DockerCli {
    fn preflight(&self) -> Result<(), ImageError> {
        self.run(&["info", "--format", "{{.ServerVersion}}"], false)
            .map(|_| ())
    }

    fn list_local_images(&self, pattern: &str) -> Result<BTreeMap<String, String>, ImageError> {
        let output = self.run(
            &[
                "images",
                pattern,
                "--no-trunc",
                "--format={{.Repository}}={{.ID}}",
            ],
            false,
        )?;
        Ok(parse_image_listing(&String::from_utf8_lossy(&output.stdout)))
    }

    fn pull(&self, tag: &str) -> Result<(), ImageError> {
        let reference = format!("{tag}:latest");
        self.run(&["pull", &reference], true).map(|_| ())
    }

    fn remove_image(&self, tag: &str) -> Result<(), ImageError> {
        self.run(&["image", "rm", tag], false).map(|_| ())
    }

    fn prune_dangling(&self) -> Result<(), ImageError> {
        self.run(&["image", "prune", "--force"], true).map(|_| ())
    }
}

/// Parses `repository=id` lines. Blank and malformed lines are skipped.
pub fn parse_image_listing(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.split_once('='))
        .map(|(repository, id)| (repository.to_string(), id.to_string()))
        .collect()
}
