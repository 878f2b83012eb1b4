//! Remote image digests from a registry speaking the distribution v2 API.
//!
//! Even public manifests need a bearer token. The token is obtained with two
//! round trips: an unauthenticated manifest request answered by a
//! `www-authenticate` challenge, then a request to the challenge realm with
//! the remaining challenge parameters as query arguments. [`RegistryClient`]
//! keeps the first token it obtains and reuses it for every later image.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use crate::ImageError;

const USER_AGENT: &str = concat!("refsync/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

pub const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.oci.image.manifest.v1+json";

/// Status, challenge header and body of one registry response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub www_authenticate: Option<String>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET used by [`RegistryClient`]. Non-2xx statuses are replies, not
/// errors; only transport failures are `Err`.
pub trait RegistryTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
    ) -> Result<HttpReply, ImageError>;
}

/// [`RegistryTransport`] over `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self { agent }
    }
}

impl RegistryTransport for UreqTransport {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
    ) -> Result<HttpReply, ImageError> {
        let mut request = self.agent.get(url).set("Accept", MANIFEST_ACCEPT);
        for (key, value) in query {
            request = request.query(key, value);
        }
        if let Some(token) = bearer {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(ImageError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                })
            }
        };

        let status = response.status();
        let www_authenticate = response.header("www-authenticate").map(str::to_string);
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| ImageError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(HttpReply {
            status,
            www_authenticate,
            body,
        })
    }
}

/// A parsed `Bearer realm="...",key="value",...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub params: Vec<(String, String)>,
}

/// Parses a bearer challenge. Quoted values may contain commas.
pub fn parse_challenge(header: &str) -> Result<Challenge, ImageError> {
    let header = header.trim();
    let rest = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
        _ => {
            return Err(ImageError::Challenge(format!(
                "not a bearer challenge: {header}"
            )))
        }
    };

    let mut realm = None;
    let mut params = Vec::new();
    for (key, value) in challenge_pairs(rest) {
        if key.eq_ignore_ascii_case("realm") {
            realm = Some(value);
        } else {
            params.push((key, value));
        }
    }

    match realm {
        Some(realm) if !realm.is_empty() => Ok(Challenge { realm, params }),
        _ => Err(ImageError::Challenge(format!(
            "no realm in challenge: {header}"
        ))),
    }
}

fn challenge_pairs(input: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.trim().is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        _ => value.push(c),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                value = value.trim().to_string();
            }
        }
        pairs.push((key.trim().to_string(), value));
    }
    pairs
}

/// `https://<host>/v2/<path>/manifests/<tag>` for `<host>/<path>`.
pub fn manifest_url(full_name: &str, tag: &str) -> Result<String, ImageError> {
    match full_name.split_once('/') {
        Some((host, path)) if !host.is_empty() && !path.is_empty() => {
            Ok(format!("https://{host}/v2/{path}/manifests/{tag}"))
        }
        _ => Err(ImageError::UnexpectedResponse {
            url: full_name.to_string(),
            message: "image name has no registry host".to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ManifestReply {
    config: ConfigDescriptor,
}

#[derive(Debug, Deserialize)]
struct ConfigDescriptor {
    digest: String,
}

/// Registry client with a single cached bearer token.
#[derive(Debug)]
pub struct RegistryClient<T> {
    transport: T,
    token: Option<String>,
}

impl RegistryClient<UreqTransport> {
    pub fn over_http() -> Self {
        Self::new(UreqTransport::new())
    }
}

impl<T: RegistryTransport> RegistryClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
        }
    }

    pub fn cached_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Digest of the image config behind `full_name:tag`.
    ///
    /// A rejected request leaves the cached token in place.
    pub fn remote_digest(&mut self, full_name: &str, tag: &str) -> Result<String, ImageError> {
        let url = manifest_url(full_name, tag)?;
        let token = self.token_for(&url)?;
        let reply = self.transport.get(&url, &[], Some(&token))?;
        if !reply.is_success() {
            return Err(ImageError::Status {
                url,
                status: reply.status,
            });
        }
        let manifest: ManifestReply =
            serde_json::from_slice(&reply.body).map_err(|e| ImageError::UnexpectedResponse {
                url: url.clone(),
                message: e.to_string(),
            })?;
        tracing::debug!(image = full_name, tag, digest = %manifest.config.digest, "remote digest");
        Ok(manifest.config.digest)
    }

    fn token_for(&mut self, manifest_url: &str) -> Result<String, ImageError> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.request_token(manifest_url)?;
        self.token = Some(token.clone());
        Ok(token)
    }

    fn request_token(&self, manifest_url: &str) -> Result<String, ImageError> {
        let probe = self.transport.get(manifest_url, &[], None)?;
        let header = probe.www_authenticate.ok_or_else(|| {
            ImageError::Challenge(format!(
                "no www-authenticate header in HTTP {} response from {manifest_url}",
                probe.status
            ))
        })?;
        let challenge = parse_challenge(&header)?;
        tracing::debug!(realm = %challenge.realm, "requesting registry token");

        let reply = self
            .transport
            .get(&challenge.realm, &challenge.params, None)?;
        if !reply.is_success() {
            return Err(ImageError::Status {
                url: challenge.realm,
                status: reply.status,
            });
        }
        let parsed: TokenReply =
            serde_json::from_slice(&reply.body).map_err(|e| ImageError::UnexpectedResponse {
                url: challenge.realm.clone(),
                message: e.to_string(),
            })?;
        parsed
            .token
            .or(parsed.access_token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ImageError::UnexpectedResponse {
                url: challenge.realm,
                message: "token response has no token".to_string(),
            })
    }
}
