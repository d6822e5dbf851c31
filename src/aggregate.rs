//! Sliding-window play counting.
//!
//! Turns individual scrobbles into ranked `(track, artist, count)` entries
//! for a trailing window ending at "now".

use crate::config::Options;
use crate::types::{GroupBy, PlayEvent, RankedEntry, TieBreak};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// The subset of [`Options`] the aggregator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    pub window: TimeDelta,
    pub limit: usize,
    pub group_by: GroupBy,
    pub tie_break: TieBreak,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        AggregateOptions::from(&Options::default())
    }
}

impl From<&Options> for AggregateOptions {
    fn from(options: &Options) -> Self {
        Self {
            window: options.window,
            limit: options.limit,
            group_by: options.group_by,
            tie_break: options.tie_break,
        }
    }
}

/// Whether a play counts toward the window ending at `now`.
///
/// Plays exactly `window` old are kept; only strictly older ones are dropped.
/// The now-playing entry and plays without a timestamp never count.
pub fn in_window(event: &PlayEvent, now: DateTime<Utc>, window: TimeDelta) -> bool {
    if event.now_playing {
        return false;
    }
    let Some(played_at) = event.played_at_millis else {
        return false;
    };
    now.timestamp_millis().saturating_sub(played_at) <= window.num_milliseconds()
}

/// Count plays per track inside the window and return the top `limit`.
///
/// Names are trimmed before grouping but otherwise compared exactly. An
/// empty vector means nothing was played in the window.
///
/// ```rust
/// use chrono::{TimeDelta, Utc};
/// use lastfm_gist::aggregate::{aggregate, AggregateOptions};
/// use lastfm_gist::{PlayEvent, RankedEntry};
///
/// let now = Utc::now();
/// let ms = now.timestamp_millis();
/// let events = vec![
///     PlayEvent::new("A", "X", ms - 1_000),
///     PlayEvent::new("A", "X", ms - 2_000),
///     PlayEvent::new("B", "Y", ms - 3_000),
///     PlayEvent::new("C", "Z", ms - TimeDelta::days(8).num_milliseconds()),
/// ];
///
/// let ranked = aggregate(&events, now, &AggregateOptions::default());
/// assert_eq!(ranked, vec![RankedEntry::new("A", "X", 2), RankedEntry::new("B", "Y", 1)]);
/// ```
pub fn aggregate(
    events: &[PlayEvent],
    now: DateTime<Utc>,
    options: &AggregateOptions,
) -> Vec<RankedEntry> {
    let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();
    let mut groups: Vec<RankedEntry> = Vec::new();
    let mut skipped = 0usize;

    for event in events {
        if !in_window(event, now, options.window) {
            skipped += 1;
            continue;
        }

        let track = event.track.trim();
        let artist = event.artist.trim();
        let key = match options.group_by {
            GroupBy::TrackAndArtist => (track.to_string(), Some(artist.to_string())),
            GroupBy::Track => (track.to_string(), None),
        };

        match index.get(&key) {
            Some(&i) => groups[i].play_count += 1,
            None => {
                index.insert(key, groups.len());
                groups.push(RankedEntry::new(track, artist, 1));
            }
        }
    }

    log::debug!(
        "Aggregated {} plays into {} groups ({} outside window or now playing)",
        events.len() - skipped,
        groups.len(),
        skipped
    );

    rank(groups, options.limit, options.tie_break)
}

/// Order entries by descending play count and keep the first `limit`.
///
/// Also used for Last.fm's pre-aggregated charts, which are not guaranteed
/// to arrive sorted.
pub fn rank(mut entries: Vec<RankedEntry>, limit: usize, tie_break: TieBreak) -> Vec<RankedEntry> {
    match tie_break {
        // sort_by is stable, so equal counts keep their encounter order
        TieBreak::FirstSeen => entries.sort_by(|a, b| b.play_count.cmp(&a.play_count)),
        TieBreak::Alphabetical => entries.sort_by(|a, b| {
            b.play_count
                .cmp(&a.play_count)
                .then_with(|| a.track.cmp(&b.track))
                .then_with(|| a.artist.cmp(&b.artist))
        }),
    }
    entries.truncate(limit);
    entries
}
