//! Remote fragment retrieval.
//!
//! Fragments are read through the GitHub contents API:
//! `GET {api_base}/repos/{owner}/{repository}/contents/{path}?ref={revision}`.
//! The response is a JSON object whose `content` field carries the file as
//! base64. Only a `200 OK` counts as success; any other status aborts with
//! [`Error::Fetch`] naming the failed path.
//!
//! The HTTP exchange sits behind the [`Transport`] trait so the rest of the
//! pipeline can be exercised without a network.

// Internal imports (std, crate)
use std::future::Future;

use crate::config::RemoteSettings;
use crate::credential::Credential;
use crate::Error;

// External imports (alphabetized)
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifies one remotely hosted fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentSource {
    /// Repository name under the configured owner
    pub repository: String,
    /// Path of the file inside the repository
    pub path: String,
    /// Commit hash, tag or branch
    pub revision: String,
}

impl FragmentSource {
    pub fn new(
        repository: impl Into<String>,
        path: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            path: path.into(),
            revision: revision.into(),
        }
    }
}

/// Raw answer of a single HTTP GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Performs authenticated GET requests.
pub trait Transport {
    fn get(
        &self,
        url: &Url,
        authorization: &str,
    ) -> impl Future<Output = crate::Result<TransportResponse>>;
}

/// Retrieves the text of a fragment.
pub trait Fetcher {
    fn fetch(&self, source: &FragmentSource) -> impl Future<Output = crate::Result<String>>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("specbundle/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, authorization: &str) -> crate::Result<TransportResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// [`Fetcher`] for the GitHub contents API.
#[derive(Debug)]
pub struct GitHubFetcher<T> {
    transport: T,
    credential: Credential,
    remote: RemoteSettings,
}

impl<T: Transport> GitHubFetcher<T> {
    pub fn new(transport: T, credential: Credential, remote: RemoteSettings) -> Self {
        Self {
            transport,
            credential,
            remote,
        }
    }

    /// Contents API URL for `source`.
    pub fn contents_url(&self, source: &FragmentSource) -> crate::Result<Url> {
        let mut url = self.remote.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                Error::config(format!(
                    "API base {} cannot carry a path",
                    self.remote.api_base
                ))
            })?;
            segments
                .pop_if_empty()
                .extend(["repos", self.remote.owner.as_str(), source.repository.as_str()])
                .push("contents")
                .extend(source.path.split('/').filter(|s| !s.is_empty()));
        }
        url.query_pairs_mut().append_pair("ref", &source.revision);
        Ok(url)
    }
}

impl<T: Transport> Fetcher for GitHubFetcher<T> {
    async fn fetch(&self, source: &FragmentSource) -> crate::Result<String> {
        let url = self.contents_url(source)?;
        log::debug!(
            "Fetching {}/{} at {}",
            source.repository,
            source.path,
            source.revision
        );

        let response = self
            .transport
            .get(&url, &self.credential.authorization())
            .await?;
        if response.status != 200 {
            return Err(Error::Fetch {
                path: source.path.clone(),
                status: response.status,
                body: response.body,
            });
        }

        decode_contents(&source.path, &response.body)
    }
}

/// Extract the file text from a contents API JSON payload.
pub fn decode_contents(path: &str, body: &str) -> crate::Result<String> {
    let payload: ContentsResponse = serde_json::from_str(body)?;
    match payload.encoding.as_deref() {
        None | Some("base64") => {}
        Some(other) => {
            return Err(Error::document(format!(
                "{path} is served with unsupported encoding '{other}'"
            )))
        }
    }

    let compact: String = payload
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::document(format!("{path} is not valid UTF-8: {e}")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted transport recording every request.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub responses: RefCell<VecDeque<TransportResponse>>,
        pub requests: RefCell<Vec<(String, String)>>,
    }

    impl MockTransport {
        pub fn with_responses(responses: Vec<TransportResponse>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl Transport for &MockTransport {
        async fn get(&self, url: &Url, authorization: &str) -> crate::Result<TransportResponse> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), authorization.to_string()));
            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(TransportResponse {
                    status: 404,
                    body: "{\"message\":\"Not Found\"}".into(),
                }))
        }
    }

    pub(crate) fn ok_content(text: &str) -> TransportResponse {
        TransportResponse {
            status: 200,
            body: serde_json::json!({
                "content": STANDARD.encode(text),
                "encoding": "base64",
            })
            .to_string(),
        }
    }

    fn fetcher(transport: &MockTransport) -> GitHubFetcher<&MockTransport> {
        GitHubFetcher::new(transport, Credential::new("secret"), RemoteSettings::default())
    }

    #[test]
    fn test_contents_url() -> crate::Result<()> {
        let transport = MockTransport::default();
        let url = fetcher(&transport).contents_url(&FragmentSource::new(
            "sweater-comb",
            "components/common.yaml",
            "main",
        ))?;
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/snyk/sweater-comb/contents/components/common.yaml?ref=main"
        );
        Ok(())
    }

    #[test]
    fn test_contents_url_with_nested_api_base() -> crate::Result<()> {
        let transport = MockTransport::default();
        let remote = RemoteSettings {
            api_base: Url::parse("http://localhost:8080/api/v3").unwrap(),
            owner: "acme".into(),
        };
        let fetcher = GitHubFetcher::new(&transport, Credential::new("t"), remote);
        let url = fetcher.contents_url(&FragmentSource::new("svc", "a/b.yaml", "abc123"))?;
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/v3/repos/acme/svc/contents/a/b.yaml?ref=abc123"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_decodes_content_and_sends_token() -> crate::Result<()> {
        let transport = MockTransport::with_responses(vec![ok_content("a: 1\nb: 2\n")]);
        let text = fetcher(&transport)
            .fetch(&FragmentSource::new("svc", "models/a.yaml", "abc"))
            .await?;
        assert_eq!(text, "a: 1\nb: 2\n");
        assert_eq!(transport.requests.borrow()[0].1, "token secret");
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_names_path() {
        let transport = MockTransport::with_responses(vec![TransportResponse {
            status: 403,
            body: "forbidden".into(),
        }]);
        let err = fetcher(&transport)
            .fetch(&FragmentSource::new("svc", "models/a.yaml", "abc"))
            .await
            .unwrap_err();
        match err {
            Error::Fetch { path, status, body } => {
                assert_eq!(path, "models/a.yaml");
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_contents_ignores_line_breaks() -> crate::Result<()> {
        let encoded = STANDARD.encode("openapi: 3.0.3\ninfo:\n  title: Test\n");
        let (head, tail) = encoded.split_at(10);
        let body = serde_json::json!({ "content": format!("{head}\n{tail}\n") }).to_string();
        assert_eq!(
            decode_contents("spec.yaml", &body)?,
            "openapi: 3.0.3\ninfo:\n  title: Test\n"
        );
        Ok(())
    }

    #[test]
    fn test_decode_contents_rejects_unknown_encoding() {
        let body = r#"{"content": "", "encoding": "none"}"#;
        assert!(matches!(
            decode_contents("big.yaml", body),
            Err(Error::Document(_))
        ));
    }
}
