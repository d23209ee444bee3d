//! Orchestration layer
//!
//! ## Responsibilities
//!
//! Runs whole batches: owns the bridge pool, bounds concurrency and keeps the
//! ordered result document up to date.
//!
//! ## Modules
//!
//! ### `batch_processor`
//! - `Orchestrator`: validates, provisions the pool, fans jobs out, collects results
//! - `BatchContext`: the batch's tracing span and result aggregator
//! - `BatchReport`: sorted results and the success / failure tally
//!
//! ### `limiter` / `pool`
//! - `ConcurrencyLimiter`: at most `max_concurrent` jobs hold a slot
//! - `BridgePool`: fixed set of bridges, one per slot, closed when the batch ends
//!
//! ### `aggregator` / `sink`
//! - `ResultAggregator`: index → result map, flushed after every completion
//! - `ResultSink`: JSON array file replaced atomically on each write
//!
//! ## Layering
//!
//! ```text
//! batch_processor (Vec<JobSpec>)
//!     ↓
//! workflow::JobExecutor (one JobSpec, retries)
//!     ↓
//! services (strategies: actions + interpretation)
//!     ↓
//! infrastructure (Bridge, payload extraction)
//! ```

pub mod aggregator;
pub mod batch_processor;
pub mod limiter;
pub mod pool;
pub mod sink;

pub use aggregator::ResultAggregator;
pub use batch_processor::{BatchContext, BatchReport, Orchestrator};
pub use limiter::ConcurrencyLimiter;
pub use pool::{BridgePool, PoolSlot};
pub use sink::ResultSink;
