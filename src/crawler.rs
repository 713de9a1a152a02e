use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use crate::fetcher::Fetch;

/// Path segments that suggest a directory / download listing worth following.
static FOLLOW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/(page|directory|area|region|a-z|list|downloads?)(/|$)").unwrap()
});
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const DOCUMENT_EXT: &str = ".pdf";

pub struct CrawlOptions<'a> {
    pub allowed_hosts: &'a HashSet<String>,
    pub max_pages: usize,
    pub timeout: Duration,
    pub delay: Duration,
}

/// Per-invocation crawl bookkeeping.
#[derive(Default)]
struct CrawlState {
    visited: HashSet<String>,
    frontier: Vec<String>,
    found_documents: BTreeSet<String>,
}

/// Walk from `seeds` and collect every document link within the allowed hosts.
/// Stops once `max_pages` pages have been visited. Returns sorted, unique URLs.
pub async fn discover<F: Fetch>(fetcher: &F, seeds: &[String], opts: &CrawlOptions<'_>) -> Vec<String> {
    let mut state = CrawlState {
        frontier: seeds.to_vec(),
        ..Default::default()
    };

    while state.visited.len() < opts.max_pages {
        let Some(page_url) = state.frontier.pop() else {
            break;
        };
        if !state.visited.insert(page_url.clone()) {
            continue;
        }
        if state.visited.len() > 1 && !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }

        let html = match fetcher.fetch(&page_url, opts.timeout).await {
            Ok(body) => String::from_utf8_lossy(&body).into_owned(),
            Err(e) => {
                warn!(url = %page_url, error = %e, "skipping crawl page");
                continue;
            }
        };
        let Ok(base) = Url::parse(&page_url) else {
            debug!(url = %page_url, "unparsable page URL");
            continue;
        };

        for link in resolve_links(&base, &html) {
            match classify(&link, opts.allowed_hosts) {
                LinkKind::Document => {
                    state.found_documents.insert(link.into());
                }
                LinkKind::Navigation => {
                    let link = String::from(link);
                    if !state.visited.contains(&link) {
                        state.frontier.push(link);
                    }
                }
                LinkKind::Ignored => {}
            }
        }
    }

    info!(
        pages = state.visited.len(),
        documents = state.found_documents.len(),
        "crawl finished"
    );
    state.found_documents.into_iter().collect()
}

#[derive(Debug, PartialEq)]
enum LinkKind {
    Document,
    Navigation,
    Ignored,
}

fn classify(url: &Url, allowed_hosts: &HashSet<String>) -> LinkKind {
    match url.host_str() {
        Some(host) if allowed_hosts.contains(host) => {}
        _ => return LinkKind::Ignored,
    }
    let path = url.path();
    if path.to_ascii_lowercase().ends_with(DOCUMENT_EXT) {
        LinkKind::Document
    } else if FOLLOW_RE.is_match(path) {
        LinkKind::Navigation
    } else {
        LinkKind::Ignored
    }
}

/// Every anchor href on the page, resolved against `base`, minus any fragment.
fn resolve_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::FakeFetcher;

    fn hosts() -> HashSet<String> {
        ["www.bt.com", "bt.com"].iter().map(|h| h.to_string()).collect()
    }

    fn opts(hosts: &HashSet<String>, max_pages: usize) -> CrawlOptions<'_> {
        CrawlOptions {
            allowed_hosts: hosts,
            max_pages,
            timeout: Duration::from_secs(1),
            delay: Duration::ZERO,
        }
    }

    fn page(links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|l| format!("<a href=\"{}\">link</a>", l))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    #[tokio::test]
    async fn collects_documents_and_follows_listings() {
        let seed = "https://www.bt.com/help/a-z/";
        let fetcher = FakeFetcher::default()
            .with(
                seed,
                page(&[
                    "/directory/bournemouth/",
                    "/files/Poole.PDF",
                    "/about-us",
                    "mailto:someone@bt.com",
                ]),
            )
            .with(
                "https://www.bt.com/directory/bournemouth/",
                page(&["bournemouth-2024.pdf", "https://bt.com/files/Poole.PDF"]),
            );
        let hosts = hosts();

        let found = discover(&fetcher, &[seed.to_string()], &opts(&hosts, 50)).await;

        assert_eq!(
            found,
            vec![
                "https://bt.com/files/Poole.PDF",
                "https://www.bt.com/directory/bournemouth/bournemouth-2024.pdf",
                "https://www.bt.com/files/Poole.PDF",
            ]
        );
        let requested = fetcher.requested();
        assert!(!requested.iter().any(|u| u.contains("about-us")));
        assert!(!requested.iter().any(|u| u.ends_with(".PDF") || u.ends_with(".pdf")));
    }

    #[tokio::test]
    async fn foreign_hosts_are_never_collected_or_followed() {
        let seed = "https://www.bt.com/list/";
        let fetcher = FakeFetcher::default().with(
            seed,
            page(&[
                "https://evil.example.com/phonebook.pdf",
                "https://evil.example.com/directory/",
            ]),
        );
        let hosts = hosts();

        let found = discover(&fetcher, &[seed.to_string()], &opts(&hosts, 50)).await;

        assert!(found.is_empty());
        assert_eq!(fetcher.requested(), vec![seed.to_string()]);
    }

    #[tokio::test]
    async fn cyclic_links_stop_at_page_budget() {
        // ring of listing pages, each also linking back to the first
        let mut fetcher = FakeFetcher::default();
        for i in 0..20 {
            let url = format!("https://www.bt.com/page/{}/", i);
            let next = format!("/page/{}/", (i + 1) % 20);
            fetcher = fetcher.with(&url, page(&["/page/0/", next.as_str()]));
        }
        let hosts = hosts();

        discover(
            &fetcher,
            &["https://www.bt.com/page/0/".to_string()],
            &opts(&hosts, 5),
        )
        .await;

        let requested = fetcher.requested();
        assert!(requested.len() <= 5);
        let unique: HashSet<_> = requested.iter().collect();
        assert_eq!(unique.len(), requested.len());
    }

    #[tokio::test]
    async fn failed_pages_are_skipped() {
        let fetcher = FakeFetcher::default().with(
            "https://www.bt.com/region/south/",
            page(&["south.pdf"]),
        );
        let hosts = hosts();
        let seeds = vec![
            "https://www.bt.com/region/south/".to_string(),
            "https://www.bt.com/region/missing/".to_string(),
        ];

        let found = discover(&fetcher, &seeds, &opts(&hosts, 10)).await;

        assert_eq!(found, vec!["https://www.bt.com/region/south/south.pdf"]);
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn fragments_do_not_split_pages_or_documents() {
        let seed = "https://www.bt.com/area/";
        let fetcher = FakeFetcher::default()
            .with(
                seed,
                page(&[
                    "/directory/#top",
                    "/directory/",
                    "/files/poole.pdf",
                    "/files/poole.pdf#page=2",
                ]),
            )
            .with("https://www.bt.com/directory/", page(&["/area/#content"]));
        let hosts = hosts();

        let found = discover(&fetcher, &[seed.to_string()], &opts(&hosts, 50)).await;

        assert_eq!(found, vec!["https://www.bt.com/files/poole.pdf"]);
        assert_eq!(
            fetcher.requested(),
            vec![seed.to_string(), "https://www.bt.com/directory/".to_string()]
        );
    }

    #[test]
    fn navigation_pattern_is_case_insensitive() {
        let hosts = hosts();
        let url = Url::parse("https://www.bt.com/Downloads/2024").unwrap();
        assert_eq!(classify(&url, &hosts), LinkKind::Navigation);
        let url = Url::parse("https://www.bt.com/pages/about").unwrap();
        assert_eq!(classify(&url, &hosts), LinkKind::Ignored);
    }
}
