//! The aggregated result of one search: an ordered record stream across all
//! batches, executed lazily.

use futures_util::stream::Stream;
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::batch::fetch_records;
use super::{
    BatchingStrategy, OptionsInput, QueryOptions, SearchBatch, SearchContext, SearchError,
};
use crate::models::Record;

type Prefetch = JoinHandle<Result<Vec<Record>, SearchError>>;

/// Records of a search, pulled one at a time.
///
/// The batches are created up front by the configured batching strategy but
/// none of them runs until [`SearchResult::next`] reaches it. Records come out
/// in batch order, then row order; batches without rows are skipped.
///
/// With `prefetch > 0` the next few batches are requested in the background
/// while the current one is drained. Delivery order and the point at which an
/// error surfaces stay the same.
///
/// ```no_run
/// # async fn example(client: kitopen::KitOpen) -> Result<(), kitopen::search::SearchError> {
/// use kitopen::search::OptionsInput;
///
/// let mut result = client.search(OptionsInput::new().author("KOPMANN, A*").start("2019"))?;
/// while let Some(record) = result.next().await? {
///     println!("{}", record.get("title").unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
pub struct SearchResult {
    input: OptionsInput,
    options: QueryOptions,
    batches: Vec<SearchBatch>,
    /// Records of the batch being drained, moved out of it
    current: std::vec::IntoIter<Record>,
    /// Next batch to execute
    index: usize,
    prefetch: usize,
    pending: HashMap<usize, Prefetch>,
    finished: bool,
}

impl SearchResult {
    /// Default the raw input from the config and partition it with the
    /// configured strategy
    pub fn new(context: SearchContext, input: OptionsInput) -> Result<Self, SearchError> {
        let options = QueryOptions::from_partial(input.clone(), &context.config.defaults);
        let strategy = context.config.batching.strategy(&context, &options)?;
        let prefetch = context.config.prefetch;

        let mut result = Self::from_strategy(input, options, strategy.as_ref());
        result.prefetch = prefetch;
        Ok(result)
    }

    /// Build from an already constructed strategy
    pub fn from_strategy(
        input: OptionsInput,
        options: QueryOptions,
        strategy: &dyn BatchingStrategy,
    ) -> Self {
        let batches = strategy.batches();
        debug!(
            strategy = strategy.name(),
            batches = batches.len(),
            "created search batches"
        );
        Self::from_batches(input, options, batches)
    }

    pub fn from_batches(input: OptionsInput, options: QueryOptions, batches: Vec<SearchBatch>) -> Self {
        Self {
            input,
            options,
            batches,
            current: Vec::new().into_iter(),
            index: 0,
            prefetch: 0,
            pending: HashMap::new(),
            finished: false,
        }
    }

    /// Request up to `depth` upcoming batches in the background
    pub fn with_prefetch(mut self, depth: usize) -> Self {
        self.prefetch = depth;
        self
    }

    /// The options exactly as passed in
    pub fn input(&self) -> &OptionsInput {
        &self.input
    }

    /// The defaulted options of the whole search
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn batches(&self) -> &[SearchBatch] {
        &self.batches
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The next record, `Ok(None)` when every batch is exhausted.
    ///
    /// An error ends the iteration: later calls return `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<Record>, SearchError> {
        if self.finished {
            return Ok(None);
        }

        let outcome = self.advance().await;
        if !matches!(outcome, Ok(Some(_))) {
            self.finished = true;
            self.abort_pending();
        }
        outcome
    }

    async fn advance(&mut self) -> Result<Option<Record>, SearchError> {
        loop {
            if let Some(record) = self.current.next() {
                return Ok(Some(record));
            }
            if self.index >= self.batches.len() {
                return Ok(None);
            }

            self.schedule_prefetch();
            self.ensure_executed(self.index).await?;

            let records = self.batches[self.index].take_records();
            trace!(batch = self.index, records = records.len(), "draining batch");
            self.current = records.into_iter();
            self.index += 1;
        }
    }

    async fn ensure_executed(&mut self, index: usize) -> Result<(), SearchError> {
        let batch = &mut self.batches[index];
        if batch.is_succeeded() {
            return Ok(());
        }

        match self.pending.remove(&index) {
            Some(handle) => {
                let outcome = handle.await.unwrap_or_else(|e| {
                    Err(SearchError::Network(format!("prefetch task failed: {}", e)))
                });
                match outcome {
                    Ok(records) => {
                        batch.complete(records);
                        Ok(())
                    }
                    Err(e) => {
                        batch.fail(&e);
                        Err(e)
                    }
                }
            }
            None => batch.execute().await,
        }
    }

    fn schedule_prefetch(&mut self) {
        if self.prefetch == 0 {
            return;
        }

        let last = (self.index + self.prefetch).min(self.batches.len().saturating_sub(1));
        for index in (self.index + 1)..=last {
            if self.batches[index].is_succeeded() || self.pending.contains_key(&index) {
                continue;
            }

            let (config, fetcher, options) = self.batches[index].job();
            trace!(batch = index, "prefetching batch");
            let handle = tokio::spawn(async move {
                fetch_records(&config, fetcher.as_ref(), &options).await
            });
            self.pending.insert(index, handle);
        }
    }

    fn abort_pending(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }

    /// Drain every remaining record into a vector
    pub async fn collect_all(&mut self) -> Result<Vec<Record>, SearchError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// The remaining records as a [`Stream`]; the stream ends after the first error
    pub fn into_stream(mut self) -> impl Stream<Item = Result<Record, SearchError>> + Send {
        async_stream::try_stream! {
            while let Some(record) = self.next().await? {
                yield record;
            }
        }
    }
}

impl Drop for SearchResult {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

impl std::fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("options", &self.options.to_string())
            .field("batches", &self.batches)
            .field("index", &self.index)
            .field("prefetch", &self.prefetch)
            .field("finished", &self.finished)
            .finish()
    }
}
