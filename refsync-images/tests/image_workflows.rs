//! Pull and version-check workflows against a fake runtime and registry.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;

use refsync_images::{
    check_for_updates, pull, ContainerRuntime, HttpReply, ImageCatalog, ImageError,
    RegistryClient, RegistryTransport, Selection,
};
use rstest::rstest;
use tempfile::TempDir;

const CORE: &str = "ghcr.io/opensafely-core";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeRuntime {
    /// pattern -> (repository -> id)
    listings: HashMap<String, BTreeMap<String, String>>,
    failing_pulls: Vec<String>,
    failing_removals: Vec<String>,
    calls: RefCell<Vec<String>>,
}

impl FakeRuntime {
    fn with_local(mut self, registry: &str, image: &str, id: &str) -> Self {
        self.listings
            .entry(format!("{registry}/*"))
            .or_default()
            .insert(format!("{registry}/{image}"), id.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn failure(command: String) -> ImageError {
        ImageError::Subprocess {
            command,
            status: "exit status: 1".to_string(),
            stderr: "boom".to_string(),
        }
    }
}

impl ContainerRuntime for FakeRuntime {
    fn preflight(&self) -> Result<(), ImageError> {
        self.calls.borrow_mut().push("preflight".to_string());
        Ok(())
    }

    fn list_local_images(&self, pattern: &str) -> Result<BTreeMap<String, String>, ImageError> {
        Ok(self.listings.get(pattern).cloned().unwrap_or_default())
    }

    fn pull(&self, tag: &str) -> Result<(), ImageError> {
        self.calls.borrow_mut().push(format!("pull {tag}"));
        if self.failing_pulls.iter().any(|t| t == tag) {
            return Err(Self::failure(format!("docker pull {tag}:latest")));
        }
        Ok(())
    }

    fn remove_image(&self, tag: &str) -> Result<(), ImageError> {
        self.calls.borrow_mut().push(format!("rm {tag}"));
        if self.failing_removals.iter().any(|t| t == tag) {
            return Err(Self::failure(format!("docker image rm {tag}")));
        }
        Ok(())
    }

    fn prune_dangling(&self) -> Result<(), ImageError> {
        self.calls.borrow_mut().push("prune".to_string());
        Ok(())
    }
}

/// A ghcr-like registry: manifests need a bearer token from `/token`.
struct FakeRegistry {
    token: String,
    digests: HashMap<String, String>,
    /// Manifest URLs that answer 401 even with a token.
    rejecting: Vec<String>,
    requests: RefCell<Vec<(String, Option<String>)>>,
}

impl FakeRegistry {
    fn new(digests: &[(&str, &str)]) -> Self {
        Self {
            token: "public-token".to_string(),
            digests: digests
                .iter()
                .map(|(image, digest)| {
                    (
                        format!("https://ghcr.io/v2/opensafely-core/{image}/manifests/latest"),
                        digest.to_string(),
                    )
                })
                .collect(),
            rejecting: Vec::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn token_requests(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|(url, _)| url == "https://ghcr.io/token")
            .count()
    }
}

fn reply(status: u16, body: &str) -> HttpReply {
    HttpReply {
        status,
        www_authenticate: None,
        body: body.as_bytes().to_vec(),
    }
}

impl RegistryTransport for &FakeRegistry {
    fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        bearer: Option<&str>,
    ) -> Result<HttpReply, ImageError> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), bearer.map(str::to_string)));

        if url == "https://ghcr.io/token" {
            assert!(query.iter().any(|(k, v)| k == "service" && v == "ghcr.io"));
            assert!(query.iter().any(|(k, _)| k == "scope"));
            return Ok(reply(200, &format!(r#"{{"token":"{}"}}"#, self.token)));
        }

        if bearer != Some(self.token.as_str()) || self.rejecting.iter().any(|r| r == url) {
            return Ok(HttpReply {
                status: 401,
                www_authenticate: Some(
                    r#"Bearer realm="https://ghcr.io/token",service="ghcr.io",scope="repository:opensafely-core/python:pull""#
                        .to_string(),
                ),
                body: Vec::new(),
            });
        }
        match self.digests.get(url) {
            Some(digest) => Ok(reply(
                200,
                &format!(r#"{{"schemaVersion":2,"config":{{"digest":"{digest}"}}}}"#),
            )),
            None => Ok(reply(404, "")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pull
// ---------------------------------------------------------------------------

#[test]
fn pull_all_updates_only_local_images_then_cleans_up() {
    let runtime = FakeRuntime::default()
        .with_local(CORE, "python", "sha256:p")
        .with_local(CORE, "r", "sha256:r")
        .with_local("docker.opensafely.org", "r", "sha256:old");

    let report = pull(&ImageCatalog::default(), &runtime, &Selection::All, false).unwrap();

    assert_eq!(report.pulled, vec!["python".to_string(), "r".to_string()]);
    assert_eq!(report.removed, vec!["docker.opensafely.org/r".to_string()]);
    assert_eq!(
        runtime.calls(),
        vec![
            "preflight".to_string(),
            format!("pull {CORE}/python"),
            format!("pull {CORE}/r"),
            "rm docker.opensafely.org/r".to_string(),
            "prune".to_string(),
        ]
    );
}

#[test]
fn pull_all_with_nothing_local_does_nothing() {
    let runtime = FakeRuntime::default();
    let report = pull(&ImageCatalog::default(), &runtime, &Selection::All, false).unwrap();
    assert!(report.pulled.is_empty());
    assert_eq!(runtime.calls(), vec!["preflight".to_string()]);
}

#[test]
fn forced_pull_all_skips_unpublished_images() {
    let runtime = FakeRuntime::default();
    let report = pull(&ImageCatalog::default(), &runtime, &Selection::All, true).unwrap();
    assert!(!report.pulled.contains(&"databuilder".to_string()));
    assert_eq!(report.pulled.len(), ImageCatalog::default().images.len() - 1);
}

#[rstest]
#[case("python", vec!["python"])]
#[case("databuilder", vec![])]
fn named_image_is_pulled_even_when_absent(#[case] image: &str, #[case] expected: Vec<&str>) {
    let runtime = FakeRuntime::default();
    let report = pull(
        &ImageCatalog::default(),
        &runtime,
        &Selection::Image(image.to_string()),
        false,
    )
    .unwrap();
    assert_eq!(report.pulled, expected);
}

#[test]
fn project_selection_pulls_action_images() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("project.yaml");
    fs::write(
        &project,
        "version: '3.0'\nactions:\n  extract:\n    run: cohortextractor:latest generate_cohort\n  \
         model:\n    run: stata-mp:latest analysis/model.do\n",
    )
    .unwrap();

    let runtime = FakeRuntime::default();
    let report = pull(
        &ImageCatalog::default(),
        &runtime,
        &Selection::Project(project),
        false,
    )
    .unwrap();
    assert_eq!(report.pulled, vec!["cohortextractor", "stata-mp"]);
}

#[test]
fn failed_pull_stops_before_cleanup() {
    let runtime = FakeRuntime {
        failing_pulls: vec![format!("{CORE}/jupyter")],
        ..FakeRuntime::default()
    }
    .with_local(CORE, "jupyter", "sha256:j");

    let err = pull(&ImageCatalog::default(), &runtime, &Selection::All, false).unwrap_err();
    assert!(matches!(err, ImageError::Subprocess { .. }));
    assert!(err.to_string().contains("boom"));
    assert!(!runtime.calls().contains(&"prune".to_string()));
}

#[test]
fn failed_deprecated_removal_is_ignored() {
    let runtime = FakeRuntime {
        failing_removals: vec!["ghcr.io/opensafely/python".to_string()],
        ..FakeRuntime::default()
    }
    .with_local(CORE, "python", "sha256:p")
    .with_local("ghcr.io/opensafely", "python", "sha256:old");

    let report = pull(&ImageCatalog::default(), &runtime, &Selection::All, false).unwrap();
    assert!(report.removed.is_empty());
    assert_eq!(runtime.calls().last().map(String::as_str), Some("prune"));
}

// ---------------------------------------------------------------------------
// Version check
// ---------------------------------------------------------------------------

#[test]
fn outdated_images_are_flagged_with_one_token_request() {
    let registry = FakeRegistry::new(&[
        ("python", "sha256:new-python"),
        ("r", "sha256:same-r"),
    ]);
    let runtime = FakeRuntime::default()
        .with_local(CORE, "python", "sha256:old-python")
        .with_local(CORE, "r", "sha256:same-r");
    let mut client = RegistryClient::new(&registry);

    let report = check_for_updates(&ImageCatalog::default(), &runtime, &mut client).unwrap();

    assert_eq!(report.outdated, vec!["python".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(registry.token_requests(), 1);
    assert_eq!(client.cached_token(), Some("public-token"));
}

#[test]
fn images_without_local_digest_are_not_queried() {
    let registry = FakeRegistry::new(&[("python", "sha256:x")]);
    let runtime = FakeRuntime::default();
    let mut client = RegistryClient::new(&registry);

    let report = check_for_updates(&ImageCatalog::default(), &runtime, &mut client).unwrap();

    assert!(report.is_current());
    assert!(registry.requests.borrow().is_empty());
    assert_eq!(client.cached_token(), None);
}

#[test]
fn rejection_after_token_fails_only_that_image() {
    let mut registry = FakeRegistry::new(&[
        ("jupyter", "sha256:j2"),
        ("python", "sha256:p2"),
        ("r", "sha256:r2"),
    ]);
    registry
        .rejecting
        .push("https://ghcr.io/v2/opensafely-core/python/manifests/latest".to_string());
    let runtime = FakeRuntime::default()
        .with_local(CORE, "jupyter", "sha256:j1")
        .with_local(CORE, "python", "sha256:p1")
        .with_local(CORE, "r", "sha256:r1");
    let mut client = RegistryClient::new(&registry);

    let report = check_for_updates(&ImageCatalog::default(), &runtime, &mut client).unwrap();

    assert_eq!(report.outdated, vec!["jupyter".to_string(), "r".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "python");
    assert!(matches!(
        report.failed[0].1,
        ImageError::Status { status: 401, .. }
    ));
    assert_eq!(registry.token_requests(), 1);
    assert_eq!(client.cached_token(), Some("public-token"));
}

#[test]
fn access_token_field_is_accepted() {
    struct AccessTokenRegistry;

    impl RegistryTransport for AccessTokenRegistry {
        fn get(
            &self,
            url: &str,
            _query: &[(String, String)],
            bearer: Option<&str>,
        ) -> Result<HttpReply, ImageError> {
            Ok(match (url, bearer) {
                ("https://auth.example.com/token", _) => reply(200, r#"{"access_token":"abc"}"#),
                (_, Some("abc")) => reply(200, r#"{"config":{"digest":"sha256:d"}}"#),
                _ => HttpReply {
                    status: 401,
                    www_authenticate: Some(
                        r#"Bearer realm="https://auth.example.com/token",service="example""#
                            .to_string(),
                    ),
                    body: Vec::new(),
                },
            })
        }
    }

    let mut client = RegistryClient::new(AccessTokenRegistry);
    let digest = client
        .remote_digest("registry.example.com/team/python", "latest")
        .unwrap();
    assert_eq!(digest, "sha256:d");
}

#[test]
fn missing_challenge_header_is_reported() {
    struct OpenRegistry;

    impl RegistryTransport for OpenRegistry {
        fn get(
            &self,
            _url: &str,
            _query: &[(String, String)],
            _bearer: Option<&str>,
        ) -> Result<HttpReply, ImageError> {
            Ok(reply(404, ""))
        }
    }

    let mut client = RegistryClient::new(OpenRegistry);
    let err = client
        .remote_digest("ghcr.io/opensafely-core/r", "latest")
        .unwrap_err();
    assert!(matches!(err, ImageError::Challenge(_)), "got: {err}");
    assert_eq!(client.cached_token(), None);
}
