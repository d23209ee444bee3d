//! # LCSC Bulk
//!
//! Bulk pricing lookups, catalog searches and cart operations against the LCSC
//! storefront, run concurrently across a pool of browser instances.
//!
//! ## Architecture
//!
//! ### ① Infrastructure
//! - `browser/` - launches isolated headless Chrome instances or attaches to a
//!   logged-in browser
//! - `infrastructure/` - the `Bridge` operation-call interface, its Chrome
//!   implementation and the payload extraction adapter
//!
//! ### ② Services
//! - `services/` - one `JobStrategy` per job kind: which actions to run and how to
//!   read what came back (including "not found" vs "page never rendered")
//!
//! ### ③ Workflow
//! - `workflow/` - `JobExecutor` runs a single job: identifier resolution,
//!   timeouts, fixed-backoff retries
//!
//! ### ④ Orchestration
//! - `orchestrator/` - `Orchestrator` fans a batch out over a `BridgePool`,
//!   bounded by a `ConcurrencyLimiter`, and keeps the `ResultSink` document current
//!
//! ## Modules

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{Bridge, BridgeFactory, BridgeResponse, HeadlessChromeFactory, SessionChromeFactory};
pub use models::{Identifier, JobKind, JobParams, JobResult, JobSpec, JobStatus};
pub use orchestrator::{BatchContext, BatchReport, Orchestrator, ResultSink};
pub use workflow::{JobCtx, JobExecutor};
