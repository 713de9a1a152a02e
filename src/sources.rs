use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::{Error, Result};
use crate::fetcher::Fetch;

/// Load a newline-delimited list of document URLs.
///
/// `location` is an http(s) URL, `file:<path>`, or a bare path; relative paths
/// resolve against the working directory.
pub async fn load_source_list<F: Fetch>(
    location: &str,
    fetcher: &F,
    timeout: Duration,
) -> Result<Vec<String>> {
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        let body = fetcher.fetch(location, timeout).await?;
        String::from_utf8_lossy(&body).into_owned()
    } else {
        let path = PathBuf::from(location.strip_prefix("file:").unwrap_or(location));
        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| Error::SourceList { path, source })?
    };

    let urls = parse_source_list(&text);
    info!(location, urls = urls.len(), "loaded source list");
    Ok(urls)
}

/// Blank lines and `#` comments are skipped; only `.pdf` URLs are kept.
/// Output is sorted and free of duplicates.
pub fn parse_source_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| line.to_ascii_lowercase().ends_with(".pdf"))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Drop repeats while keeping first-seen order.
pub fn dedup(urls: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.iter()
        .filter(|u| seen.insert(u.as_str()))
        .cloned()
        .collect()
}
