//! Run configuration.
//!
//! Credentials come from the environment, everything else from command-line
//! options. The whole thing is assembled and validated once at startup,
//! before any network activity, and then passed by reference.

use crate::render::Layout;
use crate::retry::RetryConfig;
use crate::types::{GroupBy, RenderMode, SourceKind, TieBreak};
use crate::{GistError, Result};
use chrono::TimeDelta;
use std::time::Duration;

/// Accepted variable names for the gist id, primary first.
pub const GIST_ID_VARS: &[&str] = &["GIST_ID", "GITHUB_GIST_ID"];
/// Accepted variable names for the GitHub token, primary first.
pub const GITHUB_TOKEN_VARS: &[&str] = &["GH_TOKEN", "GITHUB_TOKEN"];
/// Accepted variable names for the Last.fm API key, primary first.
pub const LASTFM_API_KEY_VARS: &[&str] = &["LASTFM_API_KEY", "LASTFM_KEY"];
/// Accepted variable names for the Last.fm username, primary first.
pub const LASTFM_USERNAME_VARS: &[&str] = &["LASTFM_USERNAME", "LASTFM_USER"];

/// Longest accepted window, in days.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Read-side credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastFmCredentials {
    pub api_key: String,
    pub username: String,
}

/// Write-side target: which gist to overwrite and the token allowed to do it.
#[derive(Clone, PartialEq, Eq)]
pub struct GistTarget {
    pub gist_id: String,
    pub token: String,
}

impl std::fmt::Debug for GistTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GistTarget")
            .field("gist_id", &self.gist_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Tunables for fetching, aggregating and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Which Last.fm query to use
    pub source: SourceKind,
    /// Output layout
    pub mode: RenderMode,
    /// Grouping key for counting plays
    pub group_by: GroupBy,
    /// Ordering among equal counts
    pub tie_break: TieBreak,
    /// Maximum number of entries rendered
    pub limit: usize,
    /// Trailing window that plays must fall into
    pub window: TimeDelta,
    /// Column budgets
    pub layout: Layout,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on recent-track pages fetched (200 events each)
    pub max_pages: u32,
    /// Retry policy for transient fetch errors
    pub retry: RetryConfig,
    /// Print instead of publishing
    pub dry_run: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            mode: RenderMode::default(),
            group_by: GroupBy::default(),
            tie_break: TieBreak::default(),
            limit: 5,
            window: TimeDelta::days(7),
            layout: Layout::default(),
            timeout: Duration::from_secs(30),
            max_pages: 1,
            retry: RetryConfig::default(),
            dry_run: false,
        }
    }
}

impl Options {
    /// Set the window from a whole number of days.
    pub fn with_window_days(mut self, days: u32) -> Result<Self> {
        self.window = TimeDelta::try_days(i64::from(days))
            .ok_or_else(|| GistError::Config(format!("window of {days} days is out of range")))?;
        Ok(self)
    }

    /// Whole days in the window, for the placeholder message.
    pub fn window_days(&self) -> i64 {
        self.window.num_days()
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(GistError::Config("limit must be at least 1".to_string()));
        }
        if self.window <= TimeDelta::zero() {
            return Err(GistError::Config("window must be positive".to_string()));
        }
        if self.window > TimeDelta::days(MAX_WINDOW_DAYS) {
            return Err(GistError::Config(format!(
                "window must be at most {MAX_WINDOW_DAYS} days"
            )));
        }
        if self.max_pages == 0 {
            return Err(GistError::Config("max pages must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(GistError::Config("timeout must be positive".to_string()));
        }
        self.layout.validate()
    }
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct Config {
    pub lastfm: LastFmCredentials,
    /// `None` only on a dry run
    pub gist: Option<GistTarget>,
    pub options: Options,
}

impl Config {
    /// Build from the process environment.
    pub fn from_env(options: Options) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), options)
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// For every setting the first name in its list that is set to a
    /// non-blank value wins. Gist settings are optional on a dry run.
    ///
    /// ```rust
    /// use lastfm_gist::{Config, Options};
    /// use std::collections::HashMap;
    ///
    /// let env: HashMap<&str, &str> = [
    ///     ("GIST_ID", "abc123"),
    ///     ("GITHUB_TOKEN", "ghp_secret"),
    ///     ("LASTFM_API_KEY", "key"),
    ///     ("LASTFM_USER", "rj"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string()), Options::default())?;
    /// assert_eq!(config.lastfm.username, "rj");
    /// assert_eq!(config.gist.unwrap().token, "ghp_secret");
    /// # Ok::<(), lastfm_gist::GistError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F, options: Options) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        options.validate()?;

        let lastfm = LastFmCredentials {
            api_key: require(&lookup, LASTFM_API_KEY_VARS)?,
            username: require(&lookup, LASTFM_USERNAME_VARS)?,
        };

        let gist = if options.dry_run {
            match (
                first_set(&lookup, GIST_ID_VARS),
                first_set(&lookup, GITHUB_TOKEN_VARS),
            ) {
                (Some(gist_id), Some(token)) => Some(GistTarget { gist_id, token }),
                _ => None,
            }
        } else {
            Some(GistTarget {
                gist_id: require(&lookup, GIST_ID_VARS)?,
                token: require(&lookup, GITHUB_TOKEN_VARS)?,
            })
        };

        Ok(Self {
            lastfm,
            gist,
            options,
        })
    }
}

fn first_set<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        let value = lookup(name)?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            log::debug!("Using {name} from environment");
            Some(value.to_string())
        }
    })
}

fn require<F>(lookup: &F, names: &[&str]) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    first_set(lookup, names).ok_or_else(|| {
        GistError::Config(format!(
            "{} environment variable not set",
            names.join(" or ")
        ))
    })
}
