//! # refsync-images
//!
//! Container images used to run project actions locally.
//!
//! [`pull::pull`] updates local images from the registry and cleans up
//! images left behind by old registries. [`version::check_for_updates`]
//! compares local image digests with the registry's `latest` tag through a
//! [`RegistryClient`], which caches one bearer token for the whole run.

pub mod catalog;
pub mod error;
pub mod pull;
pub mod registry;
pub mod runtime;
pub mod version;

pub use catalog::ImageCatalog;
pub use error::ImageError;
pub use pull::{pull, PullReport, Selection};
pub use registry::{HttpReply, RegistryClient, RegistryTransport, UreqTransport};
pub use runtime::{ContainerRuntime, DockerCli};
pub use version::{check_for_updates, VersionReport};
