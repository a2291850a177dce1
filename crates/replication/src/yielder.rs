//! Cooperative yielding for long calculations.
//!
//! Placement runs on a shared async executor next to unrelated work. A
//! `LongCalculationYielder` is created at the start of a calculation and
//! `maybe_yield` is called in every loop that may run many times. It only
//! hands the thread back to the scheduler once the calculation has held it
//! for at least the yield interval, so calling it in a tight inner loop is
//! cheap. Every call also checks the interruptor, independently of whether it
//! yielded.
//!
//! The interval check is inclusive: a zero interval yields on every call,
//! which lets tests count yields deterministically. For any nonzero interval
//! this is indistinguishable from a strict "longer than" check.
//!
//! Both the scheduler and the interruptor are traits so the engine can be
//! driven without a real executor in tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{PlacementError, Result};

/// Something that can give the CPU back to other runnable tasks.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn yield_now(&self);
}

/// Yields to the Tokio runtime the calculation runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}

/// A cancellation signal the calculation polls.
pub trait Interruptor: Send + Sync {
    fn is_signaled(&self) -> bool;
}

impl Interruptor for AtomicBool {
    fn is_signaled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInterrupt;

impl Interruptor for NeverInterrupt {
    fn is_signaled(&self) -> bool {
        false
    }
}

/// Shareable one-shot cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    fired: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.fired.store(true, Ordering::Release);
    }
}

impl Interruptor for CancelSignal {
    fn is_signaled(&self) -> bool {
        self.fired.is_signaled()
    }
}

/// Time-boxes CPU ownership of a calculation and honors cancellation.
pub struct LongCalculationYielder<'a, S: Scheduler + ?Sized> {
    scheduler: &'a S,
    interval: Duration,
    last_yield: Instant,
    yields: u64,
}

impl<'a, S: Scheduler + ?Sized> LongCalculationYielder<'a, S> {
    pub fn new(scheduler: &'a S, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
            last_yield: Instant::now(),
            yields: 0,
        }
    }

    /// Yields if the interval has elapsed since the last yield, then fails
    /// with `Cancelled` if `interruptor` has fired.
    pub async fn maybe_yield(&mut self, interruptor: &dyn Interruptor) -> Result<()> {
        let now = Instant::now();
        if now.duration_since(self.last_yield) >= self.interval {
            self.scheduler.yield_now().await;
            self.last_yield = now;
            self.yields += 1;
        }
        if interruptor.is_signaled() {
            return Err(PlacementError::Cancelled);
        }
        Ok(())
    }

    /// Number of times the calculation has yielded so far.
    pub fn yields(&self) -> u64 {
        self.yields
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts yields instead of suspending.
    #[derive(Debug, Default)]
    pub(crate) struct CountingScheduler {
        pub(crate) yields: AtomicUsize,
    }

    #[async_trait]
    impl Scheduler for CountingScheduler {
        async fn yield_now(&self) {
            self.yields.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[tokio::test]
    async fn test_zero_interval_yields_every_call() {
        let scheduler = CountingScheduler::default();
        let mut yielder = LongCalculationYielder::new(&scheduler, Duration::ZERO);
        for _ in 0..5 {
            yielder.maybe_yield(&NeverInterrupt).await.unwrap();
        }
        assert_eq!(scheduler.yields.load(Ordering::Relaxed), 5);
        assert_eq!(yielder.yields(), 5);
    }

    #[tokio::test]
    async fn test_long_interval_never_yields() {
        let scheduler = CountingScheduler::default();
        let mut yielder = LongCalculationYielder::new(&scheduler, Duration::from_secs(3600));
        for _ in 0..1000 {
            yielder.maybe_yield(&NeverInterrupt).await.unwrap();
        }
        assert_eq!(scheduler.yields.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_cancellation_checked_without_yielding() {
        let scheduler = CountingScheduler::default();
        let mut yielder = LongCalculationYielder::new(&scheduler, Duration::from_secs(3600));
        let cancel = CancelSignal::new();
        assert!(yielder.maybe_yield(&cancel).await.is_ok());

        cancel.clone().signal();
        assert_eq!(
            yielder.maybe_yield(&cancel).await,
            Err(PlacementError::Cancelled)
        );
        assert_eq!(scheduler.yields.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_yields() {
        let mut yielder = LongCalculationYielder::new(&TokioScheduler, Duration::ZERO);
        yielder.maybe_yield(&AtomicBool::new(false)).await.unwrap();
        assert_eq!(yielder.yields(), 1);
    }
}
