//! Job flow - workflow layer
//!
//! Runs one job to completion on one bridge:
//! 1. resolve the identifier when the strategy asks for it (cached across attempts)
//! 2. run the strategy's action sequence, every call under its own timeout
//! 3. interpret the captured payloads
//!
//! Transport faults and empty renders are retried with a fixed backoff; "not found"
//! outcomes end the job at once, as does any failure after a non-replayable action
//! went out. Whatever happens, the caller gets a `JobResult`.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, PayloadError};
use crate::infrastructure::{extract_payload, Bridge};
use crate::models::{JobResult, JobSpec, JsonMap};
use crate::services::{Action, Extraction, JobStrategy, Resolution};
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::retry::{RetryPolicy, Timeouts};

/// Why a single action sequence stopped early
#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("unreadable result from '{operation}': {source}")]
    Payload {
        operation: String,
        source: PayloadError,
    },
}

/// An action sequence that stopped early
#[derive(Debug)]
struct Interrupted {
    source: StepError,
    /// A non-replayable action had already been issued
    committed: bool,
}

impl Interrupted {
    fn into_attempt(self) -> Attempt {
        let message = self.source.to_string();
        if self.committed {
            Attempt::Abort(message)
        } else {
            Attempt::Retry(Transient::Transport(message))
        }
    }
}

/// A failure worth another attempt
#[derive(Debug, Clone, PartialEq)]
enum Transient {
    /// Bridge error, timeout or unreadable payload
    Transport(String),
    /// The page produced nothing meaningful
    Unrendered(String),
}

impl Transient {
    fn message(&self) -> &str {
        match self {
            Transient::Transport(message) | Transient::Unrendered(message) => message,
        }
    }
}

enum Attempt {
    Done(JsonMap),
    Definitive(String),
    Retry(Transient),
    /// Transport failure after a state-changing call; repeating could apply it twice
    Abort(String),
}

/// Catalog code found by the resolution sub-step
#[derive(Debug, Clone)]
struct Resolved {
    code: String,
    details: JsonMap,
}

/// Executes jobs of one kind
pub struct JobExecutor {
    strategy: Arc<dyn JobStrategy>,
    retry: RetryPolicy,
    timeouts: Timeouts,
}

impl JobExecutor {
    pub fn new(strategy: Arc<dyn JobStrategy>, retry: RetryPolicy, timeouts: Timeouts) -> Self {
        Self {
            strategy,
            retry,
            timeouts,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `spec` on `bridge` until it succeeds, fails definitively or runs out of attempts
    pub async fn execute(&self, spec: &JobSpec, bridge: &dyn Bridge, ctx: &JobCtx) -> JobResult {
        if let Some(delay) = ctx.stagger {
            sleep(delay).await;
        }
        info!("Processing {}/{}: {}", ctx.position, ctx.total, spec.label());

        let mut resolved: Option<Resolved> = None;
        let mut attempt = 1;
        loop {
            let outcome = self.attempt(spec, bridge, &mut resolved).await;
            match outcome {
                Attempt::Done(payload) => {
                    info!("✓ {} {}", ctx, spec.label());
                    return JobResult::success(spec, payload, attempt);
                }
                Attempt::Definitive(message) => {
                    info!("✗ {} {}: {}", ctx, spec.label(), message);
                    return JobResult::failed(spec, message, attempt);
                }
                Attempt::Abort(message) => {
                    warn!(
                        "✗ {} {} failed after a non-replayable step, not retrying: {}",
                        ctx,
                        spec.label(),
                        message
                    );
                    return JobResult::error(spec, message, attempt);
                }
                Attempt::Retry(failure) if self.retry.has_attempts_left(attempt) => {
                    warn!(
                        "⚠️ {} {} attempt {}/{} failed: {}, retrying in {:?}",
                        ctx,
                        spec.label(),
                        attempt,
                        self.retry.max_attempts,
                        failure.message(),
                        self.retry.backoff
                    );
                    if !self.retry.backoff.is_zero() {
                        sleep(self.retry.backoff).await;
                    }
                    attempt += 1;
                }
                Attempt::Retry(failure) => {
                    warn!(
                        "✗ {} {} gave up after {} attempts: {}",
                        ctx,
                        spec.label(),
                        attempt,
                        failure.message()
                    );
                    return match failure {
                        Transient::Transport(message) => JobResult::error(spec, message, attempt),
                        Transient::Unrendered(message) => JobResult::failed(spec, message, attempt),
                    };
                }
            }
        }
    }

    async fn attempt(
        &self,
        spec: &JobSpec,
        bridge: &dyn Bridge,
        resolved: &mut Option<Resolved>,
    ) -> Attempt {
        if self.strategy.needs_resolution(spec) && resolved.is_none() {
            let actions = self.strategy.resolution_actions(spec);
            let captured = match self.run_actions(bridge, &actions).await {
                Ok(captured) => captured,
                Err(e) => return e.into_attempt(),
            };
            match self.strategy.interpret_resolution(spec, &captured) {
                Resolution::Resolved { code, details } => {
                    info!("Resolved {} -> {}", spec.identifier, code);
                    *resolved = Some(Resolved { code, details });
                }
                Resolution::NotFound(message) => return Attempt::Definitive(message),
                Resolution::Unrendered(message) => {
                    return Attempt::Retry(Transient::Unrendered(message))
                }
            }
        }

        let target = match resolved.as_ref() {
            Some(found) => found.code.clone(),
            None => spec.identifier.as_str().to_string(),
        };

        let actions = self.strategy.actions(spec, &target);
        let captured = match self.run_actions(bridge, &actions).await {
            Ok(captured) => captured,
            Err(e) => return e.into_attempt(),
        };

        match self.strategy.interpret(spec, &target, &captured) {
            Extraction::Data(mut payload) => {
                if let Some(found) = resolved.as_ref() {
                    payload
                        .entry("lcsc_code".to_string())
                        .or_insert_with(|| json!(found.code));
                    for (key, value) in &found.details {
                        payload.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                Attempt::Done(payload)
            }
            Extraction::NotFound(message) => Attempt::Definitive(message),
            Extraction::Empty(message) => Attempt::Retry(Transient::Unrendered(message)),
        }
    }

    /// Run actions in order and collect the payloads of capturing ones
    async fn run_actions(
        &self,
        bridge: &dyn Bridge,
        actions: &[Action],
    ) -> Result<Vec<JsonValue>, Interrupted> {
        let mut captured = Vec::new();
        let mut committed = false;

        for action in actions {
            committed |= !action.replayable;
            self.run_action(bridge, action, &mut captured)
                .await
                .map_err(|source| Interrupted { source, committed })?;
            if action.capture
                && action.stop_on_failure
                && captured.last().and_then(|p| p.get("success")).and_then(JsonValue::as_bool)
                    == Some(false)
            {
                debug!("Stopping sequence after unsuccessful {}", action.operation);
                break;
            }

            if let Some(delay) = action.settle {
                sleep(delay).await;
            }
        }

        Ok(captured)
    }

    async fn run_action(
        &self,
        bridge: &dyn Bridge,
        action: &Action,
        captured: &mut Vec<JsonValue>,
    ) -> Result<(), StepError> {
        let limit = self.timeouts.for_operation(action.operation);
        debug!("→ {} {}", action.operation, action_summary(action));

        let response = timeout(limit, bridge.call(action.operation, action.args.clone()))
            .await
            .map_err(|_| BridgeError::Timeout {
                operation: action.operation.to_string(),
                after: limit,
            })??;

        if action.capture {
            let payload = extract_payload(&response)
                .map_err(|source| StepError::Payload {
                    operation: action.operation.to_string(),
                    source,
                })?
                .unwrap_or(JsonValue::Null);
            captured.push(payload);
        } else if response.reports_failure() {
            return Err(
                BridgeError::operation_failed(action.operation, "bridge reported failure").into(),
            );
        }
        Ok(())
    }
}

fn action_summary(action: &Action) -> String {
    if let Some(url) = action.args.get("url").and_then(JsonValue::as_str) {
        return url.to_string();
    }
    if let Some(text) = action.args.get("text").and_then(JsonValue::as_str) {
        return format!("text \"{text}\"");
    }
    if let Some(secs) = action.args.get("time").and_then(JsonValue::as_f64) {
        return format!("{secs}s");
    }
    String::new()
}
