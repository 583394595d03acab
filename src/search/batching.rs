//! Batching strategies: how one logical search is split into requests.
//!
//! Large exports can run into server-side timeouts, so a search may be
//! partitioned into several smaller requests whose results are concatenated
//! in order. A strategy is bound to its context and options when constructed
//! and produces the batches with a single call.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::{QueryOptions, SearchBatch, SearchContext, SearchError};

/// Partitions one search into an ordered list of batches
pub trait BatchingStrategy: Send + Sync + fmt::Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// The batches, in the order their records are delivered
    fn batches(&self) -> Vec<SearchBatch>;
}

/// Strategy selector as stored in the configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BatchingKind {
    #[default]
    NoSplit,
    YearSplit,
}

impl BatchingKind {
    /// Instantiate the selected strategy for one search
    pub fn strategy(
        self,
        context: &SearchContext,
        options: &QueryOptions,
    ) -> Result<Box<dyn BatchingStrategy>, SearchError> {
        let strategy: Box<dyn BatchingStrategy> = match self {
            BatchingKind::NoSplit => Box::new(NoSplit::new(context.clone(), options.clone())),
            BatchingKind::YearSplit => Box::new(YearSplit::new(context.clone(), options.clone())?),
        };
        Ok(strategy)
    }
}

impl fmt::Display for BatchingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchingKind::NoSplit => f.write_str("no_split"),
            BatchingKind::YearSplit => f.write_str("year_split"),
        }
    }
}

/// The whole search as a single request
#[derive(Debug, Clone)]
pub struct NoSplit {
    context: SearchContext,
    options: QueryOptions,
}

impl NoSplit {
    pub fn new(context: SearchContext, options: QueryOptions) -> Self {
        Self { context, options }
    }
}

impl BatchingStrategy for NoSplit {
    fn name(&self) -> &str {
        "no_split"
    }

    fn batches(&self) -> Vec<SearchBatch> {
        vec![SearchBatch::new(self.context.clone(), self.options.clone())]
    }
}

/// One request per year window.
///
/// `[start, end)` is cut into the unit windows `(start, start + 1)`, ...,
/// `(end - 1, end)`. An empty `end` means the current year. When
/// `end <= start` there are no windows and therefore no batches.
#[derive(Debug, Clone)]
pub struct YearSplit {
    context: SearchContext,
    options: QueryOptions,
    start: i32,
    end: i32,
}

impl YearSplit {
    pub fn new(context: SearchContext, options: QueryOptions) -> Result<Self, SearchError> {
        let current_year = chrono::Local::now().year();
        Self::with_current_year(context, options, current_year)
    }

    /// Like [`YearSplit::new`] with a fixed notion of "now"
    pub fn with_current_year(
        context: SearchContext,
        options: QueryOptions,
        current_year: i32,
    ) -> Result<Self, SearchError> {
        let start = parse_year("start", &options.start)?;
        let end = if options.end.trim().is_empty() {
            current_year
        } else {
            parse_year("end", &options.end)?
        };

        Ok(Self {
            context,
            options,
            start,
            end,
        })
    }

    /// Every adjacent `(year, year + 1)` pair covering `[start, end)`
    pub fn year_windows(&self) -> Vec<(i32, i32)> {
        (self.start..self.end).map(|year| (year, year + 1)).collect()
    }
}

impl BatchingStrategy for YearSplit {
    fn name(&self) -> &str {
        "year_split"
    }

    fn batches(&self) -> Vec<SearchBatch> {
        let windows = self.year_windows();
        debug!(
            start = self.start,
            end = self.end,
            batches = windows.len(),
            "splitting search by year"
        );

        windows
            .into_iter()
            .map(|(start, end)| {
                let options = self.options.with_years(start.to_string(), end.to_string());
                SearchBatch::new(self.context.clone(), options)
            })
            .collect()
    }
}

fn parse_year(field: &str, value: &str) -> Result<i32, SearchError> {
    value.trim().parse::<i32>().map_err(|_| {
        SearchError::InvalidOptions(format!("{} year \"{}\" is not an integer", field, value))
    })
}
