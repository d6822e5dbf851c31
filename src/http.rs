use crate::{GistError, Result};
use http_client::{HttpClient, Request};
use http_types::Url;
use std::time::{Duration, Instant};

/// User agent sent with every request; both APIs ask clients to identify themselves
pub const USER_AGENT: &str = concat!("lastfm-gist/", env!("CARGO_PKG_VERSION"));

/// Which side of the run a request belongs to, used to pick the error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Reading listening history from Last.fm
    Fetch,
    /// Reading or writing the gist
    Publish,
}

impl Side {
    pub fn error(self, message: String) -> GistError {
        match self {
            Side::Fetch => GistError::Fetch(message),
            Side::Publish => GistError::Publish(message),
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Parse a URL built from trusted parts plus escaped user input
pub fn parse_url(url: &str, side: Side) -> Result<Url> {
    url.parse::<Url>()
        .map_err(|e| side.error(format!("invalid URL {url}: {e}")))
}

/// Add headers common to every request
pub fn add_common_headers(request: &mut Request) {
    request.insert_header("User-Agent", USER_AGENT);
    request.insert_header("Accept", "application/json");
}

/// Send a request and read its body, giving up after `timeout`.
///
/// Non-success statuses are returned as-is; callers decide what they mean.
pub async fn send(
    client: &(dyn HttpClient + Send + Sync),
    request: Request,
    timeout: Duration,
    side: Side,
) -> Result<RawResponse> {
    let method = request.method();
    let url = request.url().clone();
    let request_start = Instant::now();

    log::debug!("{method} {}{}", url.origin().ascii_serialization(), url.path());

    let exchange = async {
        let mut response = client
            .send(request)
            .await
            .map_err(|e| side.error(e.to_string()))?;
        let status: u16 = response.status().into();
        let body = response
            .body_string()
            .await
            .map_err(|e| side.error(e.to_string()))?;
        Ok::<RawResponse, GistError>(RawResponse { status, body })
    };

    let response = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| GistError::Timeout {
            side,
            seconds: timeout.as_secs(),
        })??;

    log::debug!(
        "{method} {} -> {} in {}ms",
        url.path(),
        response.status,
        request_start.elapsed().as_millis()
    );

    Ok(response)
}
