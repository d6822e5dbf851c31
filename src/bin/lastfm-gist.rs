use clap::Parser;
use lastfm_gist::pipeline::run;
use lastfm_gist::{
    Config, GistClient, GistError, GroupBy, LastFmApiClient, Layout, Options, RenderMode,
    RetryConfig, RunReport, SnippetPublisher, SourceKind, TieBreak,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

/// Publish your recent Last.fm listening as a fixed-width chart in a GitHub gist
///
/// Credentials are read from the environment:
///   GIST_ID (or GITHUB_GIST_ID), GH_TOKEN (or GITHUB_TOKEN),
///   LASTFM_API_KEY (or LASTFM_KEY), LASTFM_USERNAME (or LASTFM_USER)
#[derive(Parser)]
#[command(name = "lastfm-gist", version, verbatim_doc_comment)]
struct Cli {
    /// Which Last.fm query to build the chart from
    #[arg(long, value_enum, default_value_t = SourceKind::Recent)]
    source: SourceKind,

    /// Output layout
    #[arg(long, value_enum, default_value_t = RenderMode::BarChart)]
    mode: RenderMode,

    /// Whether plays of the same title by different artists are counted together
    #[arg(long, value_enum, default_value_t = GroupBy::TrackAndArtist)]
    group_by: GroupBy,

    /// Ordering among tracks with the same play count
    #[arg(long, value_enum, default_value_t = TieBreak::FirstSeen)]
    tie_break: TieBreak,

    /// Number of tracks to show
    #[arg(long, default_value = "5")]
    limit: usize,

    /// Length of the trailing window in days
    #[arg(long, default_value = "7")]
    window_days: u32,

    /// Columns reserved for the track title
    #[arg(long, default_value = "28")]
    title_width: usize,

    /// Columns reserved for the artist name (dot-leader mode)
    #[arg(long, default_value = "20")]
    artist_width: usize,

    /// Glyphs per bar (bar-chart mode)
    #[arg(long, default_value = "16")]
    bar_length: usize,

    /// Maximum pages of 200 recent scrobbles to fetch
    #[arg(long, default_value = "1")]
    max_pages: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Extra attempts for a failed Last.fm request
    #[arg(long, default_value = "1")]
    retries: u32,

    /// Print the chart instead of updating the gist
    #[arg(long)]
    dry_run: bool,

    /// Show detailed debug information
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn options(&self) -> Result<Options, GistError> {
        let options = Options {
            source: self.source,
            mode: self.mode,
            group_by: self.group_by,
            tie_break: self.tie_break,
            limit: self.limit,
            layout: Layout {
                title_width: self.title_width,
                artist_width: self.artist_width,
                bar_length: self.bar_length,
                ..Layout::default()
            },
            timeout: Duration::from_secs(self.timeout_secs),
            max_pages: self.max_pages,
            retry: RetryConfig {
                max_retries: self.retries,
                ..RetryConfig::default()
            },
            dry_run: self.dry_run,
            ..Options::default()
        };
        options.with_window_days(self.window_days)
    }
}

fn exit_code(err: &GistError) -> i32 {
    match err {
        GistError::Config(_) => 2,
        _ => 1,
    }
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Validate everything before touching the network
    let config = match args.options().and_then(Config::from_env) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(exit_code(&e));
        }
    };

    let timeout = config.options.timeout;
    let http: Arc<dyn http_client::HttpClient + Send + Sync> =
        Arc::new(http_client::native::NativeClient::new());

    let source = LastFmApiClient::new(
        http.clone(),
        config.lastfm.username.clone(),
        config.lastfm.api_key.clone(),
        timeout,
    );
    let publisher = config
        .gist
        .as_ref()
        .map(|target| GistClient::new(http.clone(), target.token.clone(), timeout));

    log::info!(
        "Building {:?} chart for {} from {:?}",
        config.options.mode,
        source.username(),
        config.options.source
    );

    let publisher_ref = publisher.as_ref().map(|p| p as &dyn SnippetPublisher);
    let outcome = run(&config, &source, publisher_ref, chrono::Utc::now())
        .await
        .and_then(|report| report_outcome(&report));

    if let Err(e) = outcome {
        log::error!("Run failed during {}: {e}", e.stage());
        std::process::exit(exit_code(&e));
    }
}

fn report_outcome(report: &RunReport) -> Result<(), GistError> {
    match &report.published_to {
        Some(target) => {
            log::info!("Published {} entries to {target}", report.entries.len());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", report.rendered)?;
        }
    }
    Ok(())
}
