use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// Listing page for the phone book PDFs.
const DEFAULT_SEED: &str = "https://www.bt.com/help/the-phone-book/a-z-directory-finder";
const DEFAULT_HOSTS: &[&str] = &["www.bt.com", "bt.com"];

/// Runtime settings, resolved once in `main` and handed to every component.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    /// `file:<path>`, a bare path, or an http(s) URL. Crawl the seeds when unset.
    pub source_list: Option<String>,
    pub seeds: Vec<String>,
    pub allowed_hosts: Vec<String>,
    pub max_pages: usize,
    pub user_agent: String,
    pub crawl_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub source_list_timeout_secs: u64,
    pub politeness_delay_ms: u64,
    pub search_limit: usize,
}

impl Settings {
    /// Defaults, then `phonebook.toml` if present, then `PHONEBOOK_*` env vars.
    pub fn load() -> Result<Self> {
        let settings = defaults()?
            .add_source(File::with_name("phonebook").required(false))
            .add_source(
                Environment::with_prefix("PHONEBOOK")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("seeds")
                    .with_list_parse_key("allowed_hosts"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn crawl_timeout(&self) -> Duration {
        Duration::from_secs(self.crawl_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn source_list_timeout(&self) -> Duration {
        Duration::from_secs(self.source_list_timeout_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let builder = Config::builder()
        .set_default("db_path", "data/phonebook.sqlite")?
        .set_default("seeds", vec![DEFAULT_SEED])?
        .set_default("allowed_hosts", DEFAULT_HOSTS.to_vec())?
        .set_default("max_pages", 500)?
        .set_default("user_agent", "BT-Phonebook-Lookup/1.0")?
        .set_default("crawl_timeout_secs", 20)?
        .set_default("fetch_timeout_secs", 60)?
        .set_default("source_list_timeout_secs", 20)?
        .set_default("politeness_delay_ms", 250)?
        .set_default("search_limit", 50)?;
    Ok(builder)
}

#[cfg(test)]
impl Settings {
    /// Defaults only, with no file or environment overlay.
    pub fn for_tests() -> Self {
        defaults()
            .and_then(|b| Ok(b.build()?.try_deserialize()?))
            .unwrap()
    }
}
