use thiserror::Error;

use refsync_core::ConfigError;

/// Error surface for the container runtime and the image registry.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Bad project file or image selection.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown image '{name}'; expected one of: {known}")]
    UnknownImage { name: String, known: String },

    /// The runtime tool ran but exited unsuccessfully.
    #[error("`{command}` failed ({status}):\n{stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    /// The runtime tool could not be started at all.
    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("registry returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// A 401 challenge that cannot be answered.
    #[error("cannot authenticate with registry: {0}")]
    Challenge(String),

    #[error("unexpected registry response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },
}
