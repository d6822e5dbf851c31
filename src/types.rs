//! Data types shared by the fetch, aggregate and render stages.
//!
//! This module contains the play event and ranked entry structures, plus the
//! small enums that select between the interchangeable variants of each stage.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ================================================================================================
// LISTENING DATA
// ================================================================================================

/// A single scrobble as reported by Last.fm's recent tracks endpoint.
///
/// Events are built fresh from each fetch and never persisted. Fields that
/// Last.fm omitted or sent malformed end up as `None` so the aggregator can
/// skip the event instead of failing the run.
///
/// # Examples
///
/// ```rust
/// use lastfm_gist::PlayEvent;
///
/// let event = PlayEvent::new("Paranoid Android", "Radiohead", 1_640_995_200_000);
/// assert_eq!(event.played_at_millis, Some(1_640_995_200_000));
/// assert!(!event.now_playing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayEvent {
    /// The track name/title
    pub track: String,
    /// The artist name
    pub artist: String,
    /// When the scrobble happened, in milliseconds since the Unix epoch
    pub played_at_millis: Option<i64>,
    /// Whether Last.fm flagged this entry as the currently playing track
    pub now_playing: bool,
}

impl PlayEvent {
    /// Create a finished play at the given instant.
    pub fn new(track: impl Into<String>, artist: impl Into<String>, played_at_millis: i64) -> Self {
        Self {
            track: track.into(),
            artist: artist.into(),
            played_at_millis: Some(played_at_millis),
            now_playing: false,
        }
    }

    /// Create the "now playing" entry, which carries no timestamp.
    pub fn now_playing(track: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            artist: artist.into(),
            played_at_millis: None,
            now_playing: true,
        }
    }

    /// Convert the timestamp to a datetime, if present and representable.
    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        self.played_at_millis
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// A track with its play count over the window, in rank order.
///
/// Produced by the aggregator from [`PlayEvent`]s, or parsed directly from
/// Last.fm's pre-aggregated weekly chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankedEntry {
    /// The track name/title
    pub track: String,
    /// The artist name (the first one seen when grouping by track only)
    pub artist: String,
    /// Number of plays inside the window
    pub play_count: u32,
}

impl RankedEntry {
    pub fn new(track: impl Into<String>, artist: impl Into<String>, play_count: u32) -> Self {
        Self {
            track: track.into(),
            artist: artist.into(),
            play_count,
        }
    }
}

// ================================================================================================
// STAGE SELECTION
// ================================================================================================

/// Which Last.fm query feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum SourceKind {
    /// Individual scrobbles from `user.getrecenttracks`, windowed and counted locally
    #[default]
    Recent,
    /// Server-side aggregates from `user.getweeklytrackchart`, falling back to
    /// `user.gettoptracks` over the last seven days
    WeeklyChart,
}

/// How the ranked entries are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum RenderMode {
    /// `title ████░░░░ count`
    #[default]
    BarChart,
    /// `title ....... artist count`
    DotLeader,
}

/// Which fields make two plays "the same track".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum GroupBy {
    /// Track name and artist name must both match
    #[default]
    TrackAndArtist,
    /// Track name alone; the artist of the first play seen is reported
    Track,
}

/// Ordering among entries with the same play count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum TieBreak {
    /// Order in which the group was first encountered in the input
    #[default]
    FirstSeen,
    /// Track name, then artist name, by byte order
    Alphabetical,
}

// ================================================================================================
// RUN OUTCOME
// ================================================================================================

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Entries that were rendered, in display order
    pub entries: Vec<RankedEntry>,
    /// The full text block
    pub rendered: String,
    /// `gist_id/filename` that was overwritten, `None` on a dry run
    pub published_to: Option<String>,
}
