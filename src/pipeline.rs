//! One run: fetch → aggregate → render → publish.

use crate::aggregate::{aggregate, rank, AggregateOptions};
use crate::api::ScrobbleSource;
use crate::config::{Config, Options};
use crate::gist::SnippetPublisher;
use crate::render::render;
use crate::retry::retry_operation;
use crate::types::{RankedEntry, RunReport, SourceKind};
use crate::{GistError, Result};
use chrono::{DateTime, Utc};

/// Run `operation` with the configured retries, turning a malformed
/// response into `None` instead of an error.
async fn fetch_or_degrade<T, F, Fut>(
    options: &Options,
    name: &str,
    operation: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    match retry_operation(&options.retry, name, operation).await {
        Ok(retry_result) => Ok(Some(retry_result.result)),
        Err(GistError::Data(msg)) => {
            log::warn!("Ignoring malformed {name} response: {msg}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Fetch listening history and reduce it to the ranked entries to render.
///
/// An empty vector means there is nothing to report for the window.
pub async fn collect_entries(
    source: &dyn ScrobbleSource,
    options: &Options,
    now: DateTime<Utc>,
) -> Result<Vec<RankedEntry>> {
    match options.source {
        SourceKind::Recent => {
            let from = now.checked_sub_signed(options.window).ok_or_else(|| {
                GistError::Config(format!(
                    "window of {} days reaches before the earliest representable time",
                    options.window_days()
                ))
            })?;
            let mut events = Vec::new();
            let mut page = 1;

            loop {
                let fetched = fetch_or_degrade(options, "recent tracks", || {
                    source.recent_tracks_page(from, page)
                })
                .await?;
                let Some(fetched) = fetched else {
                    break;
                };

                log::debug!(
                    "Recent tracks page {}/{}: {} events",
                    fetched.page_number,
                    fetched.total_pages,
                    fetched.events.len()
                );
                let has_next = fetched.has_next_page();
                events.extend(fetched.events);

                if !has_next || page >= options.max_pages {
                    break;
                }
                page += 1;
            }

            log::info!("Fetched {} scrobbles", events.len());
            Ok(aggregate(&events, now, &AggregateOptions::from(options)))
        }
        SourceKind::WeeklyChart => {
            let mut chart = fetch_or_degrade(options, "weekly chart", || {
                source.weekly_track_chart()
            })
            .await?
            .unwrap_or_default();

            if chart.is_empty() {
                log::info!("Weekly chart is empty, falling back to top tracks for 7 days");
                chart = fetch_or_degrade(options, "top tracks", || {
                    source.top_tracks(options.limit)
                })
                .await?
                .unwrap_or_default();
            }

            log::info!("Fetched {} chart entries", chart.len());
            Ok(rank(chart, options.limit, options.tie_break))
        }
    }
}

/// Overwrite the gist's first file with `content`, returning `gist_id/filename`.
pub async fn publish(
    publisher: &dyn SnippetPublisher,
    gist_id: &str,
    content: &str,
) -> Result<String> {
    let filename = publisher.first_filename(gist_id).await?;
    log::info!("Updating {gist_id}/{filename}");
    publisher.write_file(gist_id, &filename, content).await?;
    Ok(format!("{gist_id}/{filename}"))
}

/// Run the whole pipeline once.
///
/// `publisher` may be `None` only on a dry run.
pub async fn run(
    config: &Config,
    source: &dyn ScrobbleSource,
    publisher: Option<&dyn SnippetPublisher>,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let options = &config.options;

    let entries = collect_entries(source, options, now).await?;
    if entries.is_empty() {
        log::info!(
            "Nothing played in the last {} days, publishing placeholder",
            options.window_days()
        );
    }

    let rendered = render(&entries, options.mode, &options.layout, options.window_days());

    let published_to = if options.dry_run {
        None
    } else {
        let target = config
            .gist
            .as_ref()
            .ok_or_else(|| GistError::Config("gist id and token are required".to_string()))?;
        let publisher = publisher
            .ok_or_else(|| GistError::Config("no gist publisher configured".to_string()))?;
        Some(publish(publisher, &target.gist_id, &rendered).await?)
    };

    Ok(RunReport {
        entries,
        rendered,
        published_to,
    })
}
