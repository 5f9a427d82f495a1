//! Remote fetch: the `Fetcher` seam and its `ureq` implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use ureq::Agent;

/// Result of one remote retrieval that reached the server.
#[derive(Debug)]
pub enum FetchResponse {
    Found(Vec<u8>),
    NotFound,
}

/// Retrieves a payload by locator. Shared by all fetch workers.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Blocking HTTP fetcher. 404/410 are soft misses; other statuses and transport errors are hard failures.
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchResponse> {
        match self.agent.get(url).call() {
            Ok(response) => {
                let bytes = response
                    .into_body()
                    .read_to_vec()
                    .with_context(|| format!("read body of {url}"))?;
                Ok(FetchResponse::Found(bytes))
            }
            Err(ureq::Error::StatusCode(404 | 410)) => Ok(FetchResponse::NotFound),
            Err(ureq::Error::StatusCode(code)) => anyhow::bail!("GET {url}: HTTP {code}"),
            Err(err) => Err(err).with_context(|| format!("GET {url}")),
        }
    }
}
