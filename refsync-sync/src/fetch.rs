//! Fetch-by-URL capability.
//!
//! The sync engine only needs `GET url -> bytes`; [`HttpFetcher`] provides it
//! over blocking `ureq`, and any `Fn(&str) -> Result<Vec<u8>, FetchError>`
//! closure can stand in for it.

use std::io::Read;
use std::time::Duration;

use thiserror::Error;

const USER_AGENT: &str = concat!("refsync/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(60);

/// Failure to fetch a URL. HTTP status failures and transport failures are
/// kept apart. The URL is carried but not displayed; callers name the
/// resource themselves.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request failed: {message}")]
    Transport { url: String, message: String },
}

/// Blocking `GET url -> bytes`.
pub trait Fetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError>,
{
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}

/// [`Fetcher`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "GET");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                // `Transport`'s Display embeds the URL; keep kind and detail only.
                let message = match transport.message() {
                    Some(detail) => format!("{}: {detail}", transport.kind()),
                    None => transport.kind().to_string(),
                };
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message,
                });
            }
        };
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |url: &str| -> Result<Vec<u8>, FetchError> {
            if url.ends_with("ok") {
                Ok(b"body".to_vec())
            } else {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            }
        };
        assert_eq!(fetcher.get("https://x/ok").expect("ok"), b"body");
        let err = fetcher.get("https://x/missing").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let err = HttpFetcher::new()
            .get("http://127.0.0.1:9/download.csv")
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }), "got: {err}");
        assert!(!err.to_string().contains("download.csv"), "got: {err}");
    }
}
