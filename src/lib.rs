//! # lastfm-gist
//!
//! Fetch recent listening history from Last.fm, count plays over a trailing
//! window, render the top tracks as a fixed-width chart and publish it as
//! the content of a GitHub gist.
//!
//! The pieces compose linearly and can be used on their own:
//!
//! ```rust
//! use chrono::Utc;
//! use lastfm_gist::aggregate::{aggregate, AggregateOptions};
//! use lastfm_gist::render::{render, Layout};
//! use lastfm_gist::{PlayEvent, RenderMode};
//!
//! let now = Utc::now().timestamp_millis();
//! let events = vec![
//!     PlayEvent::new("Roygbiv", "Boards of Canada", now - 60_000),
//!     PlayEvent::new("Roygbiv", "Boards of Canada", now - 120_000),
//!     PlayEvent::new("Xtal", "Aphex Twin", now - 180_000),
//! ];
//!
//! let ranked = aggregate(&events, Utc::now(), &AggregateOptions::default());
//! let text = render(&ranked, RenderMode::BarChart, &Layout::default(), 7);
//! assert_eq!(text.lines().count(), 2);
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod gist;
pub mod http;
pub mod pipeline;
pub mod render;
pub mod retry;
pub mod types;

pub use api::{LastFmApiClient, RecentTracksPage, ScrobbleSource};
pub use config::{Config, GistTarget, LastFmCredentials, Options};
pub use error::GistError;
pub use gist::{GistClient, SnippetPublisher};
pub use render::Layout;
pub use retry::RetryConfig;
pub use types::{GroupBy, PlayEvent, RankedEntry, RenderMode, RunReport, SourceKind, TieBreak};

#[cfg(feature = "mock")]
pub use api::MockScrobbleSource;
#[cfg(feature = "mock")]
pub use gist::MockSnippetPublisher;

pub type Result<T> = std::result::Result<T, GistError>;
