//! Entry point for running searches against KITopen.

use std::sync::Arc;

use crate::config::Config;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::search::{
    BatchingStrategy, OptionsInput, Parameters, QueryOptions, SearchContext, SearchError,
    SearchResult,
};
use crate::utils::HttpClient;

/// A configured KITopen client.
///
/// Holds the shared configuration and transport; every call to
/// [`KitOpen::search`] produces an independent, lazily executed
/// [`SearchResult`].
///
/// ```no_run
/// use kitopen::{config::Config, search::OptionsInput, KitOpen};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = KitOpen::new(Config::default())?;
/// let mut result = client.search(
///     OptionsInput::new()
///         .author(vec!["KOPMANN, A*", "MUSTERMANN, M*"])
///         .start("2019")
///         .end("2021"),
/// )?;
///
/// while let Some(record) = result.next().await? {
///     println!("{}", record.get("title").unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct KitOpen {
    context: SearchContext,
}

impl KitOpen {
    /// Create a client that talks HTTP to the configured endpoint
    pub fn new(config: Config) -> Result<Self, SearchError> {
        let client = HttpClient::new(&config.http)?;
        Ok(Self::with_fetcher(config, Arc::new(HttpFetcher::new(client))))
    }

    /// Create a client with a custom transport
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            context: SearchContext::new(Arc::new(config), fetcher),
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Fill in defaults for the unset options
    pub fn options(&self, input: OptionsInput) -> QueryOptions {
        QueryOptions::from_partial(input, &self.context.config.defaults)
    }

    /// The query parameters a single unsplit request for `input` would send
    pub fn parameters(&self, input: OptionsInput) -> Result<Parameters, SearchError> {
        Ok(self.options(input).to_query_parameters()?)
    }

    /// Prepare a search with the configured batching strategy.
    ///
    /// No request is sent until the result is pulled.
    pub fn search(&self, input: OptionsInput) -> Result<SearchResult, SearchError> {
        SearchResult::new(self.context.clone(), input)
    }

    /// Prepare a search with an explicit batching strategy
    pub fn search_with(
        &self,
        input: OptionsInput,
        strategy: &dyn BatchingStrategy,
    ) -> SearchResult {
        let options = self.options(input.clone());
        SearchResult::from_strategy(input, options, strategy).with_prefetch(self.config().prefetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::build_export;
    use crate::fetch::{FetchResponse, MockFetcher};
    use crate::search::{BatchingKind, YearSplit};

    #[test]
    fn test_parameters_use_config_defaults() {
        let mut config = Config::default();
        config.defaults.default_start = "2010".to_string();

        let client = KitOpen::with_fetcher(config, Arc::new(MockFetcher::new()));
        let params = client.parameters(OptionsInput::new()).unwrap();

        assert_eq!(params["authors"], "MUSTERMANN, M*");
        assert_eq!(params["year"], "2010-");
    }

    #[tokio::test]
    async fn test_search_uses_configured_batching() {
        let mock = Arc::new(MockFetcher::new());
        mock.set_default_response(FetchResponse::ok(
            build_export(&["doi"], &[vec!["10.1/a"]]).unwrap(),
        ));

        let config = Config {
            batching: BatchingKind::YearSplit,
            ..Config::default()
        };
        let client = KitOpen::with_fetcher(config, mock.clone());

        let mut result = client
            .search(OptionsInput::new().start("2018").end("2020"))
            .unwrap();
        assert_eq!(result.batches().len(), 2);

        let records = result.collect_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_search_with_explicit_strategy() {
        let mock = Arc::new(MockFetcher::new());
        let client = KitOpen::with_fetcher(Config::default(), mock.clone());

        let input = OptionsInput::new().start("2020").end("2020");
        let strategy =
            YearSplit::new(client.context().clone(), client.options(input.clone())).unwrap();
        let mut result = client.search_with(input, &strategy);

        assert!(result.next().await.unwrap().is_none());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_invalid_years_fail_at_search_time() {
        let config = Config {
            batching: BatchingKind::YearSplit,
            ..Config::default()
        };
        let client = KitOpen::with_fetcher(config, Arc::new(MockFetcher::new()));

        let err = client
            .search(OptionsInput::new().start("soon"))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidOptions(_)));
    }
}
