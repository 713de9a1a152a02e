use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

/// Retrieves the body behind a URL. Crawling, source-list loading and document
/// ingestion all go through this seam so they can run against fakes in tests.
pub trait Fetch {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Plain GET over HTTP. No retries; a non-2xx status or a timeout is an error.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(Error::Client)?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = resp.bytes().await.map_err(http_err)?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_name_the_failure() {
        assert!(HttpFetcher::new("phonebook-test/1.0").is_ok());

        let err = HttpFetcher::new("bad\nagent").err().unwrap();
        assert!(matches!(err, Error::Client(_)));
        assert!(err.to_string().starts_with("could not build HTTP client"));
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory fetcher. Unknown URLs answer 404. Every request is recorded.
    #[derive(Default)]
    pub struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().ok_or_else(|| Error::Status {
                url: url.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            })
        }
    }
}
