use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::Result;
use crate::fetcher::Fetch;

pub struct DownloadStats {
    pub saved: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Save each document under `dir`, named after the last path segment of its
/// URL. Files already on disk are left alone.
pub async fn download_all<F: Fetch>(
    fetcher: &F,
    urls: &[String],
    dir: &Path,
    timeout: Duration,
    delay: Duration,
) -> Result<DownloadStats> {
    tokio::fs::create_dir_all(dir).await?;
    let mut stats = DownloadStats {
        saved: 0,
        skipped: 0,
        errors: 0,
    };
    let mut fetched_any = false;

    for url in urls {
        let Some(target) = target_path(dir, url) else {
            warn!(url = %url, "no file name in URL");
            stats.errors += 1;
            continue;
        };
        if tokio::fs::try_exists(&target).await? {
            stats.skipped += 1;
            continue;
        }

        if fetched_any && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        fetched_any = true;

        match fetcher.fetch(url, timeout).await {
            Ok(bytes) => {
                tokio::fs::write(&target, &bytes).await?;
                info!(url = %url, path = %target.display(), bytes = bytes.len(), "saved");
                stats.saved += 1;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "download failed");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

fn target_path(dir: &Path, url: &str) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.next_back()?;
    if name.is_empty() {
        return None;
    }
    Some(dir.join(name))
}
