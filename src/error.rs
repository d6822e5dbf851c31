use crate::http::Side;
use thiserror::Error;

/// Error types for a single fetch → aggregate → render → publish run.
///
/// Each variant names the stage that failed so the binary can log it and
/// pick an exit code without inspecting messages.
///
/// # Error Handling Examples
///
/// ```rust
/// use lastfm_gist::GistError;
///
/// fn exit_code(err: &GistError) -> i32 {
///     match err {
///         GistError::Config(_) => 2,
///         _ => 1,
///     }
/// }
///
/// assert_eq!(exit_code(&GistError::Config("GIST_ID is not set".to_string())), 2);
/// assert_eq!(exit_code(&GistError::Publish("401 Unauthorized".to_string())), 1);
/// ```
///
/// # Retries
///
/// Only [`GistError::Fetch`] and [`GistError::Timeout`] are considered
/// transient; see [`retry_operation`](crate::retry::retry_operation).
#[derive(Error, Debug)]
pub enum GistError {
    /// A required setting is absent or an option is out of range.
    ///
    /// Raised before any network activity and never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network failure or non-success response from the Last.fm API.
    ///
    /// This includes connection failures, DNS errors, HTTP error statuses
    /// and API-level errors reported in the JSON body.
    #[error("Last.fm request failed: {0}")]
    Fetch(String),

    /// The Last.fm response parsed but did not have the expected shape.
    ///
    /// The pipeline treats this as "nothing to report" and renders the
    /// placeholder line instead of aborting.
    #[error("Unexpected Last.fm response: {0}")]
    Data(String),

    /// Reading or writing the gist failed.
    ///
    /// # Common Causes
    /// - Token rejected or lacking the `gist` scope
    /// - Gist id does not exist
    /// - Gist has no files to overwrite
    /// - GitHub rate limit
    #[error("Publishing gist failed: {0}")]
    Publish(String),

    /// A request did not complete within the configured timeout.
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        /// Whether the request was reading Last.fm or touching the gist
        side: Side,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// Writing rendered output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GistError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GistError::Fetch(_) | GistError::Timeout { .. })
    }

    /// Short name of the run stage that produced this error, used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            GistError::Config(_) => "config",
            GistError::Fetch(_) | GistError::Timeout { side: Side::Fetch, .. } => "fetch",
            GistError::Data(_) => "aggregate",
            GistError::Publish(_) | GistError::Timeout { side: Side::Publish, .. } => "publish",
            GistError::Io(_) => "output",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(GistError::Fetch("connection reset".to_string()).is_transient());
        assert!(GistError::Timeout {
            side: Side::Fetch,
            seconds: 30
        }
        .is_transient());
        assert!(!GistError::Publish("bad credentials".to_string()).is_transient());
        assert!(!GistError::Config("GH_TOKEN".to_string()).is_transient());
        assert!(!GistError::Data("missing recenttracks".to_string()).is_transient());
    }

    #[test]
    fn test_stage_names() {
        let fetch_timeout = GistError::Timeout {
            side: Side::Fetch,
            seconds: 1,
        };
        let publish_timeout = GistError::Timeout {
            side: Side::Publish,
            seconds: 1,
        };
        assert_eq!(fetch_timeout.stage(), "fetch");
        assert_eq!(publish_timeout.stage(), "publish");
        assert_eq!(GistError::Publish(String::new()).stage(), "publish");
    }
}
