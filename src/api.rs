use crate::http::{add_common_headers, parse_url, send, Side};
use crate::types::{PlayEvent, RankedEntry};
use crate::{GistError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http_client::{HttpClient, Request};
use http_types::Method;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Page size for `user.getrecenttracks`; 200 is the API maximum.
pub const RECENT_TRACKS_PAGE_SIZE: u32 = 200;

const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com";

// =============================================================================
// ScrobbleSource trait and implementation
// =============================================================================

/// Read side of a run: where listening history comes from.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait(?Send)]
pub trait ScrobbleSource {
    /// One page of individual scrobbles played since `from`, newest first.
    async fn recent_tracks_page(&self, from: DateTime<Utc>, page: u32)
        -> Result<RecentTracksPage>;

    /// The user's chart for the most recent week, aggregated by Last.fm.
    async fn weekly_track_chart(&self) -> Result<Vec<RankedEntry>>;

    /// The user's top tracks over the last seven days.
    async fn top_tracks(&self, limit: usize) -> Result<Vec<RankedEntry>>;
}

/// A page of recent scrobbles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentTracksPage {
    /// Events on this page, including a now-playing entry if there is one
    pub events: Vec<PlayEvent>,
    /// Current page number (1-indexed)
    pub page_number: u32,
    /// Total number of pages Last.fm reports for the query
    pub total_pages: u32,
}

impl RecentTracksPage {
    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }
}

#[derive(Clone)]
pub struct LastFmApiClient {
    client: Arc<dyn HttpClient + Send + Sync>,
    username: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl LastFmApiClient {
    pub fn new(
        client: Arc<dyn HttpClient + Send + Sync>,
        username: String,
        api_key: String,
        timeout: Duration,
    ) -> Self {
        Self::with_base_url(client, username, api_key, timeout, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at a different host, e.g. a local stub.
    pub fn with_base_url(
        client: Arc<dyn HttpClient + Send + Sync>,
        username: String,
        api_key: String,
        timeout: Duration,
        base_url: String,
    ) -> Self {
        Self {
            client,
            username,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn method_url(&self, method: &str, extra: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/2.0/?method={}&user={}&api_key={}&format=json",
            self.base_url,
            method,
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.api_key),
        );
        for (name, value) in extra {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut request = Request::new(Method::Get, parse_url(url, Side::Fetch)?);
        add_common_headers(&mut request);

        let response = send(&*self.client, request, self.timeout, Side::Fetch).await?;
        let parsed: Option<Value> = serde_json::from_str(&response.body).ok();

        if let Some(error) = parsed.as_ref().and_then(api_error) {
            return Err(error);
        }
        if !response.is_success() {
            return Err(GistError::Fetch(format!(
                "Last.fm returned HTTP {}",
                response.status
            )));
        }
        parsed.ok_or_else(|| GistError::Data("response body is not JSON".to_string()))
    }
}

#[async_trait(?Send)]
impl ScrobbleSource for LastFmApiClient {
    async fn recent_tracks_page(
        &self,
        from: DateTime<Utc>,
        page: u32,
    ) -> Result<RecentTracksPage> {
        let url = self.method_url(
            "user.getrecenttracks",
            &[
                ("limit", RECENT_TRACKS_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
                ("from", from.timestamp().max(0).to_string()),
            ],
        );
        let json = self.get_json(&url).await?;
        parse_recent_tracks(&json)
    }

    async fn weekly_track_chart(&self) -> Result<Vec<RankedEntry>> {
        let url = self.method_url("user.getweeklytrackchart", &[]);
        let json = self.get_json(&url).await?;
        parse_chart(&json, "weeklytrackchart")
    }

    async fn top_tracks(&self, limit: usize) -> Result<Vec<RankedEntry>> {
        let url = self.method_url(
            "user.gettoptracks",
            &[("period", "7day".to_string()), ("limit", limit.to_string())],
        );
        let json = self.get_json(&url).await?;
        parse_chart(&json, "toptracks")
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Last.fm sends numbers as strings almost everywhere, but not reliably.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ApiNumber {
    Int(i64),
    Text(String),
}

impl ApiNumber {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ApiNumber::Int(n) => Some(*n),
            ApiNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ApiTrack {
    pub name: Option<String>,
    pub artist: Option<ApiArtist>,
    pub date: Option<ApiDate>,
    pub playcount: Option<ApiNumber>,
    #[serde(rename = "@attr")]
    pub attr: Option<ApiTrackAttr>,
}

/// Recent tracks and the weekly chart use `#text`; top tracks use `name`.
#[derive(Deserialize, Debug)]
pub struct ApiArtist {
    #[serde(rename = "#text")]
    pub text: Option<String>,
    pub name: Option<String>,
}

impl ApiArtist {
    pub fn display_name(&self) -> Option<&str> {
        self.text.as_deref().or(self.name.as_deref())
    }
}

#[derive(Deserialize, Debug)]
pub struct ApiDate {
    pub uts: ApiNumber,
}

#[derive(Deserialize, Debug)]
pub struct ApiTrackAttr {
    pub nowplaying: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ApiPaginationAttr {
    pub page: Option<ApiNumber>,
    #[serde(rename = "totalPages")]
    pub total_pages: Option<ApiNumber>,
}

/// Turn an `{"error": 10, "message": "..."}` body into an error.
///
/// Codes that mean the credentials or username are wrong are configuration
/// errors; everything else is treated as a failed fetch.
pub fn api_error(json: &Value) -> Option<GistError> {
    let code = json.get("error")?.as_i64()?;
    let message = json
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(match code {
        // 6: invalid parameters (e.g. no such user), 10: invalid key, 26: suspended key
        6 | 10 | 26 => GistError::Config(format!("Last.fm rejected the request: {message}")),
        _ => GistError::Fetch(format!("Last.fm error {code}: {message}")),
    })
}

/// A single item comes back as an object instead of a one-element array.
fn track_items(container: &Value) -> Vec<Value> {
    match container.get("track") {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        _ => Vec::new(),
    }
}

fn parse_items(container: &Value) -> Vec<ApiTrack> {
    track_items(container)
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ApiTrack>(item) {
            Ok(track) => Some(track),
            Err(e) => {
                log::debug!("Skipping malformed track entry: {e}");
                None
            }
        })
        .collect()
}

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

pub fn parse_recent_tracks(json: &Value) -> Result<RecentTracksPage> {
    let container = json
        .get("recenttracks")
        .ok_or_else(|| GistError::Data("missing recenttracks".to_string()))?;

    let attr: Option<ApiPaginationAttr> = container
        .get("@attr")
        .and_then(|a| serde_json::from_value(a.clone()).ok());
    let page_number = attr
        .as_ref()
        .and_then(|a| a.page.as_ref()?.as_i64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1);
    let total_pages = attr
        .as_ref()
        .and_then(|a| a.total_pages.as_ref()?.as_i64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(page_number);

    let events: Vec<PlayEvent> = parse_items(container)
        .into_iter()
        .filter_map(|t| {
            let Some(track) = non_empty(t.name.as_deref()) else {
                log::debug!("Skipping scrobble without a track name");
                return None;
            };
            let artist = t
                .artist
                .as_ref()
                .and_then(ApiArtist::display_name)
                .unwrap_or_default();
            let now_playing = t
                .attr
                .as_ref()
                .is_some_and(|a| a.nowplaying.as_deref() == Some("true"));
            let played_at_millis = t
                .date
                .as_ref()
                .and_then(|d| d.uts.as_i64())
                .and_then(|secs| secs.checked_mul(1000));

            Some(PlayEvent {
                track: track.to_string(),
                artist: artist.to_string(),
                played_at_millis,
                now_playing,
            })
        })
        .collect();

    Ok(RecentTracksPage {
        events,
        page_number,
        total_pages,
    })
}

/// Parse `weeklytrackchart` or `toptracks`, which share an item shape.
pub fn parse_chart(json: &Value, root: &str) -> Result<Vec<RankedEntry>> {
    let container = json
        .get(root)
        .ok_or_else(|| GistError::Data(format!("missing {root}")))?;

    Ok(parse_items(container)
        .into_iter()
        .filter_map(|t| {
            let track = non_empty(t.name.as_deref())?;
            let play_count = t
                .playcount
                .as_ref()
                .and_then(ApiNumber::as_i64)
                .and_then(|n| u32::try_from(n).ok())?;
            let artist = t
                .artist
                .as_ref()
                .and_then(ApiArtist::display_name)
                .unwrap_or_default();
            Some(RankedEntry::new(track, artist, play_count))
        })
        .collect())
}
