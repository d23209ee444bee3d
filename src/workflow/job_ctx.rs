//! Job context
//!
//! Where a job sits in its batch, for logging and start-up staggering.

use std::fmt::Display;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 1-based position among the jobs of the batch
    pub position: usize,

    pub total: usize,

    /// Delay before the first action; only the opening wave is staggered
    pub stagger: Option<Duration>,
}

impl JobCtx {
    pub fn new(position: usize, total: usize) -> Self {
        Self {
            position,
            total,
            stagger: None,
        }
    }

    pub fn with_stagger(mut self, delay: Duration) -> Self {
        self.stagger = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Context for the job at `index` in a batch of `total` run by `pool_size` slots.
    /// Jobs of the opening wave start `index * step` apart.
    pub fn for_batch(index: usize, total: usize, pool_size: usize, step: Duration) -> Self {
        let ctx = Self::new(index + 1, total);
        if index < pool_size {
            ctx.with_stagger(step * index as u32)
        } else {
            ctx
        }
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}]", self.position, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_opening_wave_is_staggered() {
        let step = Duration::from_millis(250);
        assert_eq!(JobCtx::for_batch(0, 10, 3, step).stagger, None);
        assert_eq!(
            JobCtx::for_batch(2, 10, 3, step).stagger,
            Some(Duration::from_millis(500))
        );
        assert_eq!(JobCtx::for_batch(3, 10, 3, step).stagger, None);
        assert_eq!(JobCtx::for_batch(4, 10, 3, step).to_string(), "[5/10]");
    }
}
