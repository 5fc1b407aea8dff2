//! Upstream data sources
//!
//! The loaders only see these two traits. Production uses the reqwest
//! clients in [`crate::subgraph`] and [`crate::gateway`]; tests use the
//! in-memory fakes in [`crate::memory`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{retry_with_backoff, ChainConfig, RetryPolicy};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::{Result, RoundDataError};

/// GraphQL endpoint of a chain's indexer
#[async_trait]
pub trait SubgraphSource: Send + Sync {
    /// Run `query` and return its `data` object
    async fn query(&self, chain: &ChainConfig, query: &str, variables: Value) -> Result<Value>;
}

/// Content-addressed document store
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, pointer: &str) -> Result<Value>;
}

/// Settings shared by the HTTP-backed sources
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub timeout: Duration,
    pub max_concurrent_requests: usize,
    pub retry: RetryPolicy,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_concurrent_requests: 8,
            retry: RetryPolicy::default(),
        }
    }
}

/// JSON-over-HTTP plumbing: bounded concurrency, retry, status mapping
#[derive(Debug, Clone)]
pub(crate) struct JsonTransport {
    service: &'static str,
    client: Client,
    limiter: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl JsonTransport {
    pub(crate) fn new(service: &'static str, config: &HttpSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RoundDataError::Config(e.to_string()))?;

        Ok(Self {
            service,
            client,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            retry: config.retry,
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    pub(crate) async fn send<F>(&self, url: &str, build: F) -> Result<Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        retry_with_backoff(&self.retry, self.service, RoundDataError::is_transient, || {
            self.send_once(url, &build)
        })
        .await
    }

    async fn send_once<F>(&self, url: &str, build: &F) -> Result<Value>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let _permit = self.limiter.acquire().await.map_err(|e| self.unavailable(url, e))?;

        debug!(service = self.service, url, "Upstream request");
        let response = build(&self.client)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.unavailable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoundDataError::Status {
                service: self.service,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| self.decode(url, e))
    }

    pub(crate) fn unavailable(&self, url: &str, reason: impl ToString) -> RoundDataError {
        RoundDataError::Unavailable {
            service: self.service,
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(&self, url: &str, reason: impl ToString) -> RoundDataError {
        RoundDataError::Decode {
            service: self.service,
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
