use std::collections::HashSet;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::crawler::{self, CrawlOptions};
use crate::db;
use crate::error::Result;
use crate::fetcher::Fetch;
use crate::parser;
use crate::sources;

/// Aggregate counts returned to whoever triggered the run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents_attempted: usize,
    pub documents_failed: usize,
    pub records_parsed: usize,
    pub records_inserted: usize,
}

pub struct IngestOptions {
    pub fetch_timeout: Duration,
    /// Pause between consecutive document fetches.
    pub delay: Duration,
    pub show_progress: bool,
}

/// Resolve the document list for this run: the configured source list when
/// there is one, otherwise a crawl from the seeds.
pub async fn resolve_sources<F: Fetch>(settings: &Settings, fetcher: &F) -> Result<Vec<String>> {
    match &settings.source_list {
        Some(location) => {
            sources::load_source_list(location, fetcher, settings.source_list_timeout()).await
        }
        None => {
            let allowed_hosts: HashSet<String> = settings.allowed_hosts.iter().cloned().collect();
            let opts = CrawlOptions {
                allowed_hosts: &allowed_hosts,
                max_pages: settings.max_pages,
                timeout: settings.crawl_timeout(),
                delay: settings.politeness_delay(),
            };
            Ok(crawler::discover(fetcher, &settings.seeds, &opts).await)
        }
    }
}

/// Full run: schema, sources, then every document. Only setup failures are
/// returned as errors; a bad document is logged and counted.
pub async fn run_ingestion<F: Fetch>(
    settings: &Settings,
    conn: &Connection,
    fetcher: &F,
) -> Result<IngestReport> {
    db::init_schema(conn)?;
    let urls = resolve_sources(settings, fetcher).await?;
    info!(documents = urls.len(), "indexing documents");

    let opts = IngestOptions {
        fetch_timeout: settings.fetch_timeout(),
        delay: settings.politeness_delay(),
        show_progress: true,
    };
    ingest_urls(conn, fetcher, &urls, &opts).await
}

/// Fetch, parse and store each document in turn.
pub async fn ingest_urls<F: Fetch>(
    conn: &Connection,
    fetcher: &F,
    urls: &[String],
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let urls = sources::dedup(urls);
    let mut report = IngestReport::default();

    let pb = if opts.show_progress {
        ProgressBar::new(urls.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
            .map_err(std::io::Error::other)?
            .progress_chars("=> "),
    );

    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
        report.documents_attempted += 1;

        let bytes = match fetcher.fetch(url, opts.fetch_timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "error indexing document");
                report.documents_failed += 1;
                pb.inc(1);
                continue;
            }
        };

        let rows = match parser::records_from_pdf(&bytes) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(url = %url, error = %e, "unreadable document");
                report.documents_failed += 1;
                pb.inc(1);
                continue;
            }
        };
        let added = match db::upsert_records(conn, &rows, url) {
            Ok(added) => added,
            Err(e) => {
                warn!(url = %url, error = %e, "could not store records");
                report.documents_failed += 1;
                pb.inc(1);
                continue;
            }
        };
        report.records_parsed += rows.len();
        report.records_inserted += added;
        info!(url = %url, parsed = rows.len(), inserted = added, "indexed");
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        attempted = report.documents_attempted,
        failed = report.documents_failed,
        parsed = report.records_parsed,
        inserted = report.records_inserted,
        "ingestion finished"
    );
    Ok(report)
}
