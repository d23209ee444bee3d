//! Batch processor - orchestration layer
//!
//! ## Responsibilities
//!
//! 1. **Validation**: configuration, pool size, index uniqueness and session isolation
//!    are checked before anything starts
//! 2. **Pool lifetime**: provisions the bridge pool and closes it on every exit path
//! 3. **Fan-out**: one spawned task per job, each holding one pool slot for its
//!    whole run (retries included)
//! 4. **Aggregation**: results are recorded and flushed in completion order; the
//!    sink always holds a complete, index-sorted document
//! 5. **Statistics**: success / failure tally of the batch
//!
//! Individual job outcomes never fail the batch. Only configuration errors,
//! provisioning failures, a failed final flush or a total teardown fault do.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde_json::Value as JsonValue;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::config::Config;
use crate::error::{AppResult, ConfigError};
use crate::infrastructure::BridgeFactory;
use crate::models::{ensure_unique_indices, JobKind, JobResult, JobSpec};
use crate::orchestrator::aggregator::ResultAggregator;
use crate::orchestrator::pool::BridgePool;
use crate::orchestrator::sink::ResultSink;
use crate::services::strategy_for;
use crate::utils::logging;
use crate::workflow::{JobCtx, JobExecutor, RetryPolicy, Timeouts};

/// Per-batch state handed to the orchestrator: the span every log line of the
/// batch is attached to, and the result aggregator
pub struct BatchContext {
    span: Span,
    aggregator: ResultAggregator,
}

impl BatchContext {
    pub fn new(label: &str, sink: Option<ResultSink>) -> Self {
        Self {
            span: info_span!("batch", kind = %label),
            aggregator: ResultAggregator::new(sink),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    async fn record(&mut self, result: JobResult) {
        if self.aggregator.record(result).is_some() {
            warn!("⚠️ A result was recorded twice for the same job; keeping the latest");
        }
        if let Err(e) = self.aggregator.flush().await {
            warn!("⚠️ Failed to save intermediate results: {}", e);
        }
    }
}

/// Outcome of a finished batch
#[derive(Debug)]
pub struct BatchReport {
    results: Vec<JobResult>,
    elapsed: Duration,
    sink_path: Option<PathBuf>,
}

impl BatchReport {
    /// Results sorted by job index
    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    /// External records (index stripped), in input order
    pub fn records(&self) -> Vec<JsonValue> {
        self.results.iter().map(JobResult::to_record).collect()
    }

    /// The whole output document
    pub fn document(&self) -> JsonValue {
        JsonValue::Array(self.records())
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn log_summary(&self) {
        logging::print_final_stats(
            self.total(),
            self.succeeded(),
            self.failed(),
            self.elapsed,
            self.sink_path.as_deref(),
        );
    }
}

/// Drives a batch of jobs across a pool of bridges
pub struct Orchestrator {
    config: Config,
    factory: Arc<dyn BridgeFactory>,
}

impl Orchestrator {
    pub fn new(config: Config, factory: Arc<dyn BridgeFactory>) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `jobs`, writing snapshots to `sink` when given
    pub async fn run(&self, jobs: Vec<JobSpec>, sink: Option<ResultSink>) -> AppResult<BatchReport> {
        let label = batch_label(&jobs);
        self.run_with_context(jobs, BatchContext::new(&label, sink)).await
    }

    pub async fn run_with_context(
        &self,
        jobs: Vec<JobSpec>,
        mut ctx: BatchContext,
    ) -> AppResult<BatchReport> {
        let span = ctx.span.clone();
        let started = Instant::now();

        self.config.validate()?;
        ensure_unique_indices(&jobs)?;
        let pool_size = self.pool_size(jobs.len())?;

        ctx.aggregator.initialize().await?;
        let sink_path = ctx.aggregator.sink().map(|s| s.path().to_path_buf());

        if jobs.is_empty() {
            info!(parent: &span, "⚠️ No jobs to run");
            return Ok(BatchReport {
                results: Vec::new(),
                elapsed: started.elapsed(),
                sink_path,
            });
        }

        span.in_scope(|| logging::log_startup(jobs.len(), pool_size, self.factory.name()));
        let pool = BridgePool::provision(self.factory.as_ref(), pool_size)
            .instrument(span.clone())
            .await?;

        let mut executors: HashMap<JobKind, Arc<JobExecutor>> = HashMap::new();
        let total = jobs.len();
        let mut tasks = FuturesUnordered::new();

        for (position, spec) in jobs.into_iter().enumerate() {
            let pool = Arc::clone(&pool);
            let executor = Arc::clone(
                executors
                    .entry(spec.kind)
                    .or_insert_with(|| self.executor_for(spec.kind)),
            );
            let job_ctx = JobCtx::for_batch(position, total, pool_size, self.config.stagger());
            let task_spec = spec.clone();

            let task = async move {
                match pool.checkout().await {
                    Ok(slot) => executor.execute(&task_spec, slot.bridge(), &job_ctx).await,
                    Err(e) => JobResult::error(&task_spec, e.to_string(), 0),
                }
            }
            .instrument(span.clone());

            tasks.push(tokio::spawn(task).map(move |joined| (spec, joined)));
        }

        while let Some((spec, joined)) = tasks.next().await {
            let result = joined.unwrap_or_else(|e| {
                error!(parent: &span, "❌ Task for {} did not finish: {}", spec.label(), e);
                JobResult::error(&spec, format!("job task failed: {e}"), 0)
            });
            ctx.record(result).instrument(span.clone()).await;
        }

        let teardown = pool.shutdown().instrument(span.clone()).await;
        ctx.aggregator.flush().await?;
        teardown?;

        Ok(BatchReport {
            results: ctx.aggregator.into_results(),
            elapsed: started.elapsed(),
            sink_path,
        })
    }

    /// Effective pool size: never more bridges than jobs
    fn pool_size(&self, job_count: usize) -> Result<usize, ConfigError> {
        let size = self.config.max_concurrent.min(job_count.max(1));
        if size > 1 && !self.factory.isolated() && !self.config.allow_shared_session_concurrency {
            return Err(ConfigError::SharedSessionConcurrency {
                factory: self.factory.name().to_string(),
                requested: self.config.max_concurrent,
            });
        }
        Ok(size)
    }

    fn executor_for(&self, kind: JobKind) -> Arc<JobExecutor> {
        Arc::new(JobExecutor::new(
            strategy_for(kind, &self.config),
            RetryPolicy::from_config(&self.config),
            Timeouts::from_config(&self.config),
        ))
    }
}

fn batch_label(jobs: &[JobSpec]) -> String {
    match jobs.first() {
        Some(first) if jobs.iter().all(|j| j.kind == first.kind) => first.kind.to_string(),
        Some(_) => "mixed".to_string(),
        None => "empty".to_string(),
    }
}
