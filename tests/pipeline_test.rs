use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lastfm_gist::api::parse_recent_tracks;
use lastfm_gist::pipeline::run;
use lastfm_gist::render::display_width;
use lastfm_gist::{
    Config, GistError, GistTarget, LastFmCredentials, Options, RankedEntry, RecentTracksPage,
    RenderMode, Result, RetryConfig, ScrobbleSource, SnippetPublisher,
};
use std::cell::RefCell;
use std::fs;

/// 2024-03-10 12:00:00 UTC
fn fixture_now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_710_072_000, 0).unwrap()
}

struct FixtureSource {
    path: &'static str,
}

#[async_trait(?Send)]
impl ScrobbleSource for FixtureSource {
    async fn recent_tracks_page(&self, _from: DateTime<Utc>, page: u32) -> Result<RecentTracksPage> {
        assert_eq!(page, 1, "fixture only has one page");
        let body = fs::read_to_string(self.path).expect("Could not read test fixture file");
        let json = serde_json::from_str(&body).expect("Fixture is not JSON");
        parse_recent_tracks(&json)
    }

    async fn weekly_track_chart(&self) -> Result<Vec<RankedEntry>> {
        Err(GistError::Fetch("not used".to_string()))
    }

    async fn top_tracks(&self, _limit: usize) -> Result<Vec<RankedEntry>> {
        Err(GistError::Fetch("not used".to_string()))
    }
}

#[derive(Default)]
struct RecordingPublisher {
    writes: RefCell<Vec<(String, String, String)>>,
}

#[async_trait(?Send)]
impl SnippetPublisher for RecordingPublisher {
    async fn first_filename(&self, _gist_id: &str) -> Result<String> {
        Ok("🎧 Weekly listening".to_string())
    }

    async fn write_file(&self, gist_id: &str, filename: &str, content: &str) -> Result<()> {
        self.writes.borrow_mut().push((
            gist_id.to_string(),
            filename.to_string(),
            content.to_string(),
        ));
        Ok(())
    }
}

fn config(options: Options) -> Config {
    Config {
        lastfm: LastFmCredentials {
            api_key: "key".to_string(),
            username: "testuser".to_string(),
        },
        gist: Some(GistTarget {
            gist_id: "deadbeef".to_string(),
            token: "token".to_string(),
        }),
        options: Options {
            retry: RetryConfig::disabled(),
            ..options
        },
    }
}

#[test_log::test(tokio::test)]
async fn test_fixture_to_bar_chart() {
    let source = FixtureSource {
        path: "tests/fixtures/recent_tracks.json",
    };
    let publisher = RecordingPublisher::default();

    let report = run(
        &config(Options::default()),
        &source,
        Some(&publisher),
        fixture_now(),
    )
    .await
    .unwrap();

    // Now playing, the whitespace variant and the play one second past the
    // window edge are all handled; the play exactly on the edge counts.
    assert_eq!(
        report.entries,
        vec![
            RankedEntry::new("夜に駆ける (Racing Into The Night) - Extended Mix", "YOASOBI", 3),
            RankedEntry::new("Weird Fishes/Arpeggi", "Radiohead", 2),
            RankedEntry::new("Hoppípolla", "Sigur Rós", 1),
        ]
    );

    let lines: Vec<&str> = report.rendered.lines().collect();
    assert_eq!(
        lines[0],
        "夜に駆ける (Racing Into T... ████████░░░░░░░░    3"
    );
    assert_eq!(
        lines[1],
        "Weird Fishes/Arpeggi         █████░░░░░░░░░░░    2"
    );
    assert_eq!(
        lines[2],
        "Hoppípolla                   ███░░░░░░░░░░░░░    1"
    );
    for line in &lines {
        assert_eq!(display_width(line), 28 + 1 + 16 + 1 + 4);
    }

    let writes = publisher.writes.borrow();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, "deadbeef");
    assert_eq!(writes[0].1, "🎧 Weekly listening");
    assert_eq!(writes[0].2, report.rendered);
    assert_eq!(
        report.published_to.as_deref(),
        Some("deadbeef/🎧 Weekly listening")
    );
}

#[test_log::test(tokio::test)]
async fn test_fixture_to_dot_leader() {
    let source = FixtureSource {
        path: "tests/fixtures/recent_tracks.json",
    };
    let publisher = RecordingPublisher::default();
    let options = Options {
        mode: RenderMode::DotLeader,
        ..Options::default()
    };

    let report = run(&config(options), &source, Some(&publisher), fixture_now())
        .await
        .unwrap();

    let columns: Vec<usize> = report
        .rendered
        .lines()
        .zip(["YOASOBI", "Radiohead", "Sigur Rós"])
        .map(|(line, artist)| display_width(&line[..line.find(artist).unwrap()]))
        .collect();
    assert_eq!(columns, vec![33, 33, 33]);
}

#[test_log::test(tokio::test)]
async fn test_window_with_nothing_in_it() {
    let source = FixtureSource {
        path: "tests/fixtures/recent_tracks.json",
    };
    let publisher = RecordingPublisher::default();

    // A month later every play in the fixture is stale
    let later = fixture_now() + chrono::TimeDelta::days(30);
    let report = run(&config(Options::default()), &source, Some(&publisher), later)
        .await
        .unwrap();

    assert!(report.entries.is_empty());
    assert_eq!(report.rendered, "No scrobbles in the last 7 days.");
    assert_eq!(
        publisher.writes.borrow()[0].2,
        "No scrobbles in the last 7 days."
    );
}
