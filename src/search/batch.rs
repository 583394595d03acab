//! A single export request and the records it produced.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{QueryOptions, SearchContext, SearchError};
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::models::Record;
use crate::utils::archive;

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Executing,
    Succeeded,
    Failed,
}

/// One concrete request against the report endpoint.
///
/// A batch starts out [`BatchState::Pending`]. [`SearchBatch::execute`]
/// fetches the export, unpacks it, and materializes one [`Record`] per row.
/// Calling `execute` again re-fetches; a failed batch can be retried that way.
///
/// ```no_run
/// # async fn example(mut batch: kitopen::search::SearchBatch) -> Result<(), kitopen::search::SearchError> {
/// batch.execute().await?;
/// while let Some(record) = batch.next_record()? {
///     println!("{}", record);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SearchBatch {
    context: SearchContext,
    options: QueryOptions,
    state: BatchState,
    records: Vec<Record>,
    cursor: usize,
}

impl SearchBatch {
    pub fn new(context: SearchContext, options: QueryOptions) -> Self {
        Self {
            context,
            options,
            state: BatchState::Pending,
            records: Vec::new(),
            cursor: 0,
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Whether the batch executed successfully and can be iterated
    pub fn is_succeeded(&self) -> bool {
        self.state == BatchState::Succeeded
    }

    /// Number of records; zero until the batch succeeded
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Send the request and materialize the records
    pub async fn execute(&mut self) -> Result<(), SearchError> {
        self.state = BatchState::Executing;

        match fetch_records(
            &self.context.config,
            self.context.fetcher.as_ref(),
            &self.options,
        )
        .await
        {
            Ok(records) => {
                self.complete(records);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    pub(crate) fn complete(&mut self, records: Vec<Record>) {
        info!(
            start = %self.options.start,
            end = %self.options.end,
            records = records.len(),
            "batch completed"
        );
        self.records = records;
        self.cursor = 0;
        self.state = BatchState::Succeeded;
    }

    pub(crate) fn fail(&mut self, error: &SearchError) {
        warn!(
            start = %self.options.start,
            end = %self.options.end,
            "batch failed: {}",
            error
        );
        self.state = BatchState::Failed;
    }

    /// Next record of this batch, `Ok(None)` once exhausted.
    ///
    /// Fails with [`SearchError::NotExecuted`] unless the batch succeeded.
    pub fn next_record(&mut self) -> Result<Option<Record>, SearchError> {
        if !self.is_succeeded() {
            return Err(SearchError::NotExecuted);
        }

        let record = self.records.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }

    /// Move the cursor back to the first record
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Move the unread records out; the batch reports no records afterwards
    pub(crate) fn take_records(&mut self) -> Vec<Record> {
        let mut records = std::mem::take(&mut self.records);
        records.drain(..self.cursor.min(records.len()));
        self.cursor = 0;
        records
    }

    /// Owned inputs for running this batch's request on another task
    pub(crate) fn job(&self) -> (Arc<Config>, Arc<dyn Fetcher>, QueryOptions) {
        (
            Arc::clone(&self.context.config),
            Arc::clone(&self.context.fetcher),
            self.options.clone(),
        )
    }
}

impl fmt::Debug for SearchBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchBatch")
            .field("options", &self.options.to_string())
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Fetch, unpack and parse one export.
///
/// The extracted archive lives only inside this call.
pub(crate) async fn fetch_records(
    config: &Config,
    fetcher: &dyn Fetcher,
    options: &QueryOptions,
) -> Result<Vec<Record>, SearchError> {
    let parameters = options.to_query_parameters()?;
    debug!(url = %config.search_url, ?parameters, "requesting export");

    let deadline = config.request_timeout();
    let response = tokio::time::timeout(deadline, fetcher.fetch(&config.search_url, &parameters))
        .await
        .map_err(|_| SearchError::Timeout(deadline))??;

    if !response.is_success() {
        return Err(SearchError::Connection {
            status: response.status,
            url: config.search_url.clone(),
        });
    }

    let table = {
        let dir = archive::unpack_in(&response.body, config.temp_dir.as_deref())?;
        archive::read_publications(dir.path())?
    };

    let view = Arc::new(options.view.clone());
    if table.headers.len() != view.len() {
        debug!(
            columns = table.headers.len(),
            fields = view.len(),
            "export column count differs from view; pairing by position"
        );
    }

    Ok(table
        .rows
        .into_iter()
        .map(|row| Record::from_row(Arc::clone(&view), row))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::build_export;
    use crate::fetch::{FetchResponse, MockFetcher};
    use crate::models::{views, RecordView};

    fn context(mock: Arc<MockFetcher>) -> SearchContext {
        SearchContext::new(Arc::new(Config::default()), mock)
    }

    fn title_view() -> RecordView {
        RecordView::new("titles", ["doi", "title"]).unwrap()
    }

    #[tokio::test]
    async fn test_execute_materializes_records_positionally() {
        let mock = Arc::new(MockFetcher::new());
        // Header names deliberately differ from the view's field ids
        mock.set_default_response(FetchResponse::ok(
            build_export(
                &["DOI", "Titel"],
                &[vec!["10.1/a", "Alpha"], vec!["10.1/b", "Beta"]],
            )
            .unwrap(),
        ));

        let options = QueryOptions::new("A", "2018", "2019", title_view());
        let mut batch = SearchBatch::new(context(mock.clone()), options);
        assert_eq!(batch.state(), BatchState::Pending);

        batch.execute().await.unwrap();
        assert!(batch.is_succeeded());
        assert_eq!(batch.len(), 2);

        let first = batch.next_record().unwrap().unwrap();
        assert_eq!(first.get("doi"), Some("10.1/a"));
        assert_eq!(first.get("title"), Some("Alpha"));
        assert_eq!(batch.next_record().unwrap().unwrap().get("title"), Some("Beta"));
        assert!(batch.next_record().unwrap().is_none());

        let requests = mock.requests();
        let (url, params) = &requests[0];
        assert_eq!(url, &Config::default().search_url);
        assert_eq!(params["year"], "2018-2019");
        assert_eq!(params["table_fields"], "doi,title");
    }

    #[test]
    fn test_iterating_unexecuted_batch_fails() {
        let options = QueryOptions::new("A", "2018", "2019", views().basic());
        let mut batch = SearchBatch::new(context(Arc::new(MockFetcher::new())), options);

        assert!(matches!(batch.next_record(), Err(SearchError::NotExecuted)));
    }

    #[test]
    fn test_non_success_status_is_connection_error() {
        let mock = Arc::new(MockFetcher::new());
        mock.set_default_response(FetchResponse::new(503, "busy"));

        let options = QueryOptions::new("A", "2018", "2019", views().basic());
        let mut batch = SearchBatch::new(context(mock.clone()), options);

        let err = tokio_test::block_on(batch.execute()).unwrap_err();
        assert!(matches!(err, SearchError::Connection { status: 503, .. }));
        assert_eq!(batch.state(), BatchState::Failed);
        assert!(matches!(batch.next_record(), Err(SearchError::NotExecuted)));

        // Retrying is up to the caller
        mock.set_default_response(FetchResponse::ok(
            build_export(&["doi"], &[vec!["10.1/a"]]).unwrap(),
        ));
        tokio_test::block_on(batch.execute()).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_rewind() {
        let mock = Arc::new(MockFetcher::new());
        mock.set_default_response(FetchResponse::ok(
            build_export(&["doi"], &[vec!["x"]]).unwrap(),
        ));
        let options = QueryOptions::new("A", "2018", "2019", views().basic());
        let mut batch = SearchBatch::new(context(mock), options);

        batch.execute().await.unwrap();
        assert!(batch.next_record().unwrap().is_some());
        assert!(batch.next_record().unwrap().is_none());

        batch.rewind();
        assert_eq!(batch.next_record().unwrap().unwrap().get("doi"), Some("x"));
    }

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Run one batch against `body` with archives extracted under a fresh root
    async fn execute_in_root(body: Vec<u8>) -> (Result<(), SearchError>, tempfile::TempDir) {
        let root = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.temp_dir = Some(root.path().to_path_buf());

        let mock = Arc::new(MockFetcher::new());
        mock.set_default_response(FetchResponse::ok(body));
        let context = SearchContext::new(Arc::new(config), mock);
        let mut batch =
            SearchBatch::new(context, QueryOptions::new("A", "2018", "2019", views().basic()));

        (batch.execute().await, root)
    }

    fn is_empty_dir(path: &std::path::Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_extraction_dir_removed_after_success() {
        let (result, root) =
            execute_in_root(build_export(&["doi"], &[vec!["10.1/a"]]).unwrap().to_vec()).await;

        result.unwrap();
        assert!(is_empty_dir(root.path()));
    }

    #[tokio::test]
    async fn test_extraction_dir_removed_when_publications_missing() {
        let body = zip_of(&[(archive::ANALYSIS_FILE_NAME, &b"a,b\n1,2\n"[..])]);
        let (result, root) = execute_in_root(body).await;

        assert!(matches!(result, Err(SearchError::Archive(_))));
        assert!(is_empty_dir(root.path()));
    }

    #[tokio::test]
    async fn test_extraction_dir_removed_on_malformed_csv() {
        // Not valid UTF-8, so the CSV reader fails on the first row
        let body = zip_of(&[(archive::PUBLICATIONS_FILE_NAME, &b"doi\n\xff\xfe\n"[..])]);
        let (result, root) = execute_in_root(body).await;

        assert!(matches!(result, Err(SearchError::Csv(_))));
        assert!(is_empty_dir(root.path()));
    }

    #[tokio::test]
    async fn test_take_records_skips_read_ones() {
        let mock = Arc::new(MockFetcher::new());
        mock.set_default_response(FetchResponse::ok(
            build_export(&["doi"], &[vec!["x"], vec!["y"], vec!["z"]]).unwrap(),
        ));
        let options = QueryOptions::new("A", "2018", "2019", views().basic());
        let mut batch = SearchBatch::new(context(mock), options);

        batch.execute().await.unwrap();
        batch.next_record().unwrap();

        let rest = batch.take_records();
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].get("doi"), Some("y"));
        assert!(batch.is_empty());
        assert!(batch.next_record().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slow_fetch_hits_deadline() {
        #[derive(Debug)]
        struct Stalled;

        #[async_trait::async_trait]
        impl Fetcher for Stalled {
            async fn fetch(
                &self,
                _url: &str,
                _params: &crate::search::Parameters,
            ) -> Result<FetchResponse, SearchError> {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(FetchResponse::ok(""))
            }
        }

        let mut config = Config::default();
        config.http.request_timeout_secs = 1;
        let context = SearchContext::new(Arc::new(config), Arc::new(Stalled));
        let mut batch =
            SearchBatch::new(context, QueryOptions::new("A", "2018", "2019", views().basic()));

        let err = batch.execute().await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)));
    }
}
