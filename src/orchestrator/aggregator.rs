use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::FileError;
use crate::models::JobResult;
use crate::orchestrator::sink::ResultSink;

/// Index-keyed result set of a batch, materialized to an optional sink
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: BTreeMap<usize, JobResult>,
    sink: Option<ResultSink>,
}

impl ResultAggregator {
    pub fn new(sink: Option<ResultSink>) -> Self {
        Self {
            results: BTreeMap::new(),
            sink,
        }
    }

    pub fn sink(&self) -> Option<&ResultSink> {
        self.sink.as_ref()
    }

    /// Insert a result, replacing any earlier one with the same index
    pub fn record(&mut self, result: JobResult) -> Option<JobResult> {
        self.results.insert(result.index(), result)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// External records, sorted by index
    pub fn records(&self) -> Vec<JsonValue> {
        self.results.values().map(JobResult::to_record).collect()
    }

    /// Write an empty document so the sink is valid before the first result
    pub async fn initialize(&self) -> Result<(), FileError> {
        match &self.sink {
            Some(sink) => sink.initialize().await,
            None => Ok(()),
        }
    }

    /// Write every recorded result to the sink
    pub async fn flush(&self) -> Result<(), FileError> {
        match &self.sink {
            Some(sink) => sink.write(&self.records()).await,
            None => Ok(()),
        }
    }

    pub fn into_results(self) -> Vec<JobResult> {
        self.results.into_values().collect()
    }
}
