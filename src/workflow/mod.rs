pub mod job_ctx;
pub mod job_flow;
pub mod retry;

pub use job_ctx::JobCtx;
pub use job_flow::JobExecutor;
pub use retry::{RetryPolicy, Timeouts};
