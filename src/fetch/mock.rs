//! In-memory fetcher and export fixtures for tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;

use super::{FetchResponse, Fetcher};
use crate::search::{Parameters, SearchError};
use crate::utils::archive::{ANALYSIS_FILE_NAME, PUBLICATIONS_FILE_NAME};

/// A fetcher that serves canned responses and records every request.
///
/// Responses are looked up by the request's `year` parameter first, then
/// fall back to the default response. Without either it answers `404`.
#[derive(Debug, Default)]
pub struct MockFetcher {
    by_year: Mutex<HashMap<String, FetchResponse>>,
    fallback: Mutex<Option<FetchResponse>>,
    requests: Mutex<Vec<(String, Parameters)>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for requests whose `year` parameter equals `year`
    pub fn set_response_for_year(&self, year: impl Into<String>, response: FetchResponse) {
        let mut guard = self.by_year.lock().unwrap();
        guard.insert(year.into(), response);
    }

    /// Serve `response` for every request without a year-specific entry
    pub fn set_default_response(&self, response: FetchResponse) {
        let mut guard = self.fallback.lock().unwrap();
        *guard = Some(response);
    }

    /// Every `(url, parameters)` pair fetched so far, in order
    pub fn requests(&self) -> Vec<(String, Parameters)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, params: &Parameters) -> Result<FetchResponse, SearchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), params.clone()));

        let by_year = params
            .get("year")
            .and_then(|year| self.by_year.lock().unwrap().get(year).cloned());

        let response = by_year
            .or_else(|| self.fallback.lock().unwrap().clone())
            .unwrap_or_else(|| FetchResponse::new(404, Bytes::new()));

        Ok(response)
    }
}

/// Build an export archive the way the report endpoint ships it: a
/// publications CSV with `headers` and `rows`, plus an analysis CSV.
pub fn build_export(headers: &[&str], rows: &[Vec<&str>]) -> Result<Bytes, SearchError> {
    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    csv_writer.write_record(headers)?;
    for row in rows {
        csv_writer.write_record(row)?;
    }
    let publications = csv_writer
        .into_inner()
        .map_err(|e| SearchError::Csv(e.to_string()))?;

    let mut zip_writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip_writer.start_file(PUBLICATIONS_FILE_NAME, SimpleFileOptions::default())?;
    zip_writer.write_all(&publications)?;

    zip_writer.start_file(ANALYSIS_FILE_NAME, SimpleFileOptions::default())?;
    zip_writer.write_all(format!("type,count\nall,{}\n", rows.len()).as_bytes())?;

    let cursor = zip_writer.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_routes_by_year() {
        let mock = MockFetcher::new();
        mock.set_response_for_year("2018-2019", FetchResponse::ok("a"));
        mock.set_default_response(FetchResponse::ok("b"));

        let mut params = Parameters::new();
        params.insert("year".into(), "2018-2019".into());
        assert_eq!(mock.fetch("u", &params).await.unwrap().body, "a");

        params.insert("year".into(), "2020-2021".into());
        assert_eq!(mock.fetch("u", &params).await.unwrap().body, "b");

        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[0].0, "u");
    }

    #[tokio::test]
    async fn test_mock_without_responses_is_404() {
        let mock = MockFetcher::new();
        let response = mock.fetch("u", &Parameters::new()).await.unwrap();
        assert_eq!(response.status, 404);
    }
}
