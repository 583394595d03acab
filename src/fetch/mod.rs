//! Transport seam between batches and the report endpoint.
//!
//! A [`Fetcher`] performs one GET with a flat parameter map and hands back the
//! raw status and body. Interpreting the status is the batch's job, so a
//! `404` is a successful fetch here and only transport failures are errors.

pub mod mock;

pub use mock::MockFetcher;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::search::{Parameters, SearchError};
use crate::utils::HttpClient;

/// Raw outcome of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Issues requests against the report endpoint
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str, params: &Parameters) -> Result<FetchResponse, SearchError>;
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &Parameters) -> Result<FetchResponse, SearchError> {
        let query: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let response = self
            .client
            .client()
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SearchError::Network(format!("Failed to query {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!(status, bytes = body.len(), "received export response");

        Ok(FetchResponse { status, body })
    }
}
