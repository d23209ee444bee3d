//! Bridge pool
//!
//! A fixed set of bridges provisioned once per batch. Every running job checks
//! out exactly one member and gives it back when its `PoolSlot` is dropped; the
//! limiter guarantees a member is free whenever a permit is granted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{AppResult, BridgeError};
use crate::infrastructure::{Bridge, BridgeFactory};
use crate::orchestrator::limiter::ConcurrencyLimiter;

type Member = (usize, Arc<dyn Bridge>);

/// Upper bound on closing one member; a browser that never exits counts as a failed close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct BridgePool {
    limiter: ConcurrencyLimiter,
    idle: Mutex<Vec<Member>>,
    members: Vec<Member>,
    factory_name: String,
}

impl BridgePool {
    /// Provision `size` bridges from `factory`.
    /// When any of them fails, the ones already up are closed again.
    pub async fn provision(factory: &dyn BridgeFactory, size: usize) -> AppResult<Arc<Self>> {
        let limiter = ConcurrencyLimiter::new(size)?;
        info!("🚀 Provisioning {} bridge(s) from {}", size, factory.name());

        let outcomes = join_all((0..size).map(|slot| factory.provision(slot))).await;

        let mut members = Vec::with_capacity(size);
        let mut first_error = None;
        for (slot, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(bridge) => members.push((slot, bridge)),
                Err(e) => {
                    warn!("❌ Slot {} failed to start: {}", slot, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(err) = first_error {
            close_all(&members, CLOSE_TIMEOUT).await;
            return Err(err.into());
        }

        info!("✓ {} bridge(s) ready", members.len());
        Ok(Arc::new(Self {
            limiter,
            idle: Mutex::new(members.iter().rev().cloned().collect()),
            members,
            factory_name: factory.name().to_string(),
        }))
    }

    /// Wait for a free member and hold it until the returned slot is dropped
    pub async fn checkout(self: &Arc<Self>) -> Result<PoolSlot, BridgeError> {
        let permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| BridgeError::operation_failed("pool checkout", e))?;

        let member = self
            .idle
            .lock()
            .map_err(|_| BridgeError::operation_failed("pool checkout", "idle list poisoned"))?
            .pop()
            .ok_or_else(|| BridgeError::operation_failed("pool checkout", "no idle bridge"))?;

        Ok(PoolSlot {
            member,
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn in_use(&self) -> usize {
        self.limiter.max() - self.limiter.available()
    }

    /// Close every member. Fails only when none of them could be closed.
    pub async fn shutdown(&self) -> Result<(), BridgeError> {
        info!("🧹 Closing {} bridge(s) from {}", self.members.len(), self.factory_name);
        let failed = close_all(&self.members, CLOSE_TIMEOUT).await;
        if failed > 0 && failed == self.members.len() {
            return Err(BridgeError::TeardownFailed { failed });
        }
        Ok(())
    }

    fn give_back(&self, member: Member) {
        match self.idle.lock() {
            Ok(mut idle) => idle.push(member),
            Err(poisoned) => poisoned.into_inner().push(member),
        }
    }
}

/// Close every member concurrently and return how many failed
async fn close_all(members: &[Member], limit: Duration) -> usize {
    let outcomes = join_all(
        members
            .iter()
            .map(|(_, bridge)| timeout(limit, bridge.close())),
    )
    .await;

    let mut failed = 0;
    for (outcome, (slot, _)) in outcomes.into_iter().zip(members) {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("⚠️ Failed to close slot {}: {}", slot, e);
                failed += 1;
            }
            Err(_) => {
                warn!("⚠️ Slot {} did not close within {:?}", slot, limit);
                failed += 1;
            }
        }
    }
    failed
}

/// A checked-out pool member
pub struct PoolSlot {
    member: Member,
    pool: Arc<BridgePool>,
    _permit: OwnedSemaphorePermit,
}

impl PoolSlot {
    pub fn slot(&self) -> usize {
        self.member.0
    }

    pub fn bridge(&self) -> &dyn Bridge {
        self.member.1.as_ref()
    }
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        // back on the idle list before the permit is released
        self.pool.give_back(self.member.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value as JsonValue;

    use crate::error::AppError;
    use crate::infrastructure::BridgeResponse;

    struct CountingBridge {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Bridge for CountingBridge {
        async fn call(&self, _operation: &str, _args: JsonValue) -> Result<BridgeResponse, BridgeError> {
            Ok(BridgeResponse::default())
        }

        async fn close(&self) -> Result<(), BridgeError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Factory {
        fail_slot: Option<usize>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BridgeFactory for Factory {
        fn name(&self) -> &str {
            "counting"
        }

        fn isolated(&self) -> bool {
            true
        }

        async fn provision(&self, slot: usize) -> Result<Arc<dyn Bridge>, BridgeError> {
            if self.fail_slot == Some(slot) {
                return Err(BridgeError::LaunchFailed {
                    slot,
                    message: "no chrome".to_string(),
                });
            }
            Ok(Arc::new(CountingBridge {
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn factory(fail_slot: Option<usize>) -> Factory {
        Factory {
            fail_slot,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[tokio::test]
    async fn test_slots_are_exclusive_and_returned() {
        let pool = BridgePool::provision(&factory(None), 2).await.unwrap();

        let a = pool.checkout().await.unwrap();
        let b = pool.checkout().await.unwrap();
        assert_ne!(a.slot(), b.slot());
        assert_eq!(pool.in_use(), 2);

        let a_slot = a.slot();
        drop(a);
        assert_eq!(pool.in_use(), 1);
        let c = pool.checkout().await.unwrap();
        assert_eq!(c.slot(), a_slot);
        assert!(c.bridge().call("browser_snapshot", JsonValue::Null).await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_provisioning_closes_started_members() {
        let factory = factory(Some(2));
        let err = BridgePool::provision(&factory, 3).await.err().unwrap();

        assert!(matches!(err, AppError::Bridge(BridgeError::LaunchFailed { slot: 2, .. })));
        assert_eq!(factory.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let factory = factory(None);
        let pool = BridgePool::provision(&factory, 3).await.unwrap();
        pool.shutdown().await.unwrap();
        assert_eq!(factory.closed.load(Ordering::SeqCst), 3);
    }

    struct StuckBridge;

    #[async_trait]
    impl Bridge for StuckBridge {
        async fn call(&self, _operation: &str, _args: JsonValue) -> Result<BridgeResponse, BridgeError> {
            Ok(BridgeResponse::default())
        }

        async fn close(&self) -> Result<(), BridgeError> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hung_close_counts_as_failure() {
        let closed = Arc::new(AtomicUsize::new(0));
        let stuck: Arc<dyn Bridge> = Arc::new(StuckBridge);
        let counting: Arc<dyn Bridge> = Arc::new(CountingBridge {
            closed: Arc::clone(&closed),
        });
        let members: Vec<Member> = vec![(0, stuck), (1, counting)];

        let failed = close_all(&members, Duration::from_millis(20)).await;

        assert_eq!(failed, 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        let err = BridgePool::provision(&factory(None), 0).await.err().unwrap();
        assert!(matches!(
            err,
            AppError::Config(crate::error::ConfigError::InvalidPoolSize { value: 0 })
        ));
    }
}
