mod config;
mod crawler;
mod db;
mod download;
mod error;
mod fetcher;
mod indexer;
mod parser;
mod sources;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::crawler::CrawlOptions;
use crate::fetcher::HttpFetcher;

#[derive(Parser)]
#[command(name = "phonebook_indexer", about = "Phone book PDF discovery, parsing and search")]
struct Cli {
    /// SQLite database path (overrides PHONEBOOK_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the record table and search index
    Init,
    /// Crawl the seed pages and list every PDF found
    Discover {
        /// Max pages to visit
        #[arg(long)]
        max_pages: Option<usize>,
        /// Write the list here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fetch, parse and store every PDF in the source list (or crawl result)
    Index {
        /// URL list: file:<path>, a path, or an http(s) URL
        #[arg(short, long)]
        source: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Full-text search over stored records
    Search {
        query: String,
        /// Max rows to display
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Show store statistics
    Stats,
    /// Save every PDF in the source list (or crawl result) to a directory
    Download {
        dir: PathBuf,
        #[arg(short, long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Init => {
            let conn = open_store(&settings)?;
            db::init_schema(&conn)?;
            println!("Schema ready at {}", settings.db_path.display());
            Ok(())
        }
        Commands::Discover { max_pages, output } => {
            let fetcher = HttpFetcher::new(&settings.user_agent)?;
            let allowed_hosts: HashSet<String> = settings.allowed_hosts.iter().cloned().collect();
            let opts = CrawlOptions {
                allowed_hosts: &allowed_hosts,
                max_pages: max_pages.unwrap_or(settings.max_pages),
                timeout: settings.crawl_timeout(),
                delay: settings.politeness_delay(),
            };
            let urls = crawler::discover(&fetcher, &settings.seeds, &opts).await;
            match output {
                Some(path) => {
                    let mut body = String::from("# discovered by phonebook_indexer\n");
                    for url in &urls {
                        body.push_str(url);
                        body.push('\n');
                    }
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Found {} PDFs, written to {}", urls.len(), path.display());
                }
                None => {
                    println!("Found {} PDFs", urls.len());
                    for url in &urls {
                        println!("{}", url);
                    }
                }
            }
            Ok(())
        }
        Commands::Index { source, json } => {
            if source.is_some() {
                settings.source_list = source;
            }
            let conn = open_store(&settings)?;
            let fetcher = HttpFetcher::new(&settings.user_agent)?;
            let report = indexer::run_ingestion(&settings, &conn, &fetcher)
                .await
                .context("Ingestion failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Indexed {} PDFs ({} failed): parsed {} records, inserted {}.",
                    report.documents_attempted,
                    report.documents_failed,
                    report.records_parsed,
                    report.records_inserted
                );
            }
            Ok(())
        }
        Commands::Search { query, limit, json } => {
            let conn = open_store(&settings)?;
            db::init_schema(&conn)?;
            let rows = db::search(&conn, &query, limit.unwrap_or(settings.search_limit))
                .context("Search failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<28} | {:<36} | {:<16} | {:<30}",
                "#", "Name", "Address", "Phone", "Source"
            );
            println!("{}", "-".repeat(124));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<28} | {:<36} | {:<16} | {:<30}",
                    i + 1,
                    truncate(r.name.as_deref().unwrap_or("-"), 28),
                    truncate(r.address.as_deref().unwrap_or("-"), 36),
                    r.phone.as_deref().unwrap_or("-"),
                    truncate(file_name(&r.source_url), 30),
                );
            }
            println!("\n{} records", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = open_store(&settings)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Records:    {}", s.records);
            println!("Sources:    {}", s.sources);
            println!("With phone: {}", s.with_phone);
            Ok(())
        }
        Commands::Download { dir, source } => {
            if source.is_some() {
                settings.source_list = source;
            }
            let fetcher = HttpFetcher::new(&settings.user_agent)?;
            let urls = indexer::resolve_sources(&settings, &fetcher).await?;
            println!("Downloading {} PDFs to {}...", urls.len(), dir.display());
            let stats = download::download_all(
                &fetcher,
                &urls,
                &dir,
                settings.fetch_timeout(),
                settings.politeness_delay(),
            )
            .await?;
            println!(
                "Done: {} saved, {} already present, {} errors.",
                stats.saved, stats.skipped, stats.errors
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(settings: &Settings) -> anyhow::Result<rusqlite::Connection> {
    db::connect(&settings.db_path)
        .with_context(|| format!("Failed to open database {}", settings.db_path.display()))
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
