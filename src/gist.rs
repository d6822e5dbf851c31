//! GitHub gist client: the write side of a run.
//!
//! A run only ever touches one file: the first file of the configured gist.
//! Its content is replaced wholesale, there is no merging or versioning.

use crate::http::{add_common_headers, parse_url, send, RawResponse, Side};
use crate::{GistError, Result};
use async_trait::async_trait;
use http_client::{HttpClient, Request};
use http_types::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Write side of a run: where the rendered text goes.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait SnippetPublisher {
    /// Name of the file whose content will be replaced.
    async fn first_filename(&self, gist_id: &str) -> Result<String>;

    /// Replace the content of `filename` in the gist.
    async fn write_file(&self, gist_id: &str, filename: &str, content: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct GistClient {
    client: Arc<dyn HttpClient + Send + Sync>,
    token: String,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for GistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GistClient {
    pub fn new(client: Arc<dyn HttpClient + Send + Sync>, token: String, timeout: Duration) -> Self {
        Self::with_base_url(client, token, timeout, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a different host, e.g. GitHub Enterprise.
    pub fn with_base_url(
        client: Arc<dyn HttpClient + Send + Sync>,
        token: String,
        timeout: Duration,
        base_url: String,
    ) -> Self {
        Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn gist_request(&self, method: Method, gist_id: &str) -> Result<Request> {
        let url = format!("{}/gists/{}", self.base_url, urlencoding::encode(gist_id));
        let mut request = Request::new(method, parse_url(&url, Side::Publish)?);
        add_common_headers(&mut request);
        request.insert_header("Accept", "application/vnd.github+json");
        request.insert_header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        request.insert_header("Authorization", format!("token {}", self.token));
        Ok(request)
    }
}

#[async_trait(?Send)]
impl SnippetPublisher for GistClient {
    async fn first_filename(&self, gist_id: &str) -> Result<String> {
        let request = self.gist_request(Method::Get, gist_id)?;
        let response = send(&*self.client, request, self.timeout, Side::Publish).await?;
        check_status(&response, gist_id)?;
        parse_first_filename(&response.body)
    }

    async fn write_file(&self, gist_id: &str, filename: &str, content: &str) -> Result<()> {
        let mut request = self.gist_request(Method::Patch, gist_id)?;
        request.insert_header("Content-Type", "application/json");
        request.set_body(update_body(filename, content).to_string());

        let response = send(&*self.client, request, self.timeout, Side::Publish).await?;
        check_status(&response, gist_id)?;
        log::debug!("Wrote {} bytes to {gist_id}/{filename}", content.len());
        Ok(())
    }
}

#[derive(Deserialize)]
struct ApiGist {
    #[serde(default)]
    files: Map<String, Value>,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

fn check_status(response: &RawResponse, gist_id: &str) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let message = serde_json::from_str::<ApiMessage>(&response.body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_default();
    let hint = match response.status {
        401 => "token rejected",
        403 => "token lacks gist scope or rate limited",
        404 => "gist not found or not owned by token",
        422 => "update rejected",
        _ => "unexpected status",
    };
    Err(GistError::Publish(format!(
        "gist {gist_id}: HTTP {} ({hint}){}",
        response.status,
        if message.is_empty() {
            String::new()
        } else {
            format!(": {message}")
        }
    )))
}

/// The first file in the gist, in the order GitHub lists them.
pub fn parse_first_filename(body: &str) -> Result<String> {
    let gist: ApiGist = serde_json::from_str(body)
        .map_err(|e| GistError::Publish(format!("unreadable gist metadata: {e}")))?;
    gist.files
        .keys()
        .next()
        .cloned()
        .ok_or_else(|| GistError::Publish("gist has no files".to_string()))
}

/// Body for `PATCH /gists/{id}` replacing one file's content.
pub fn update_body(filename: &str, content: &str) -> Value {
    let mut files = Map::new();
    files.insert(filename.to_string(), json!({ "content": content }));
    json!({ "files": files })
}
