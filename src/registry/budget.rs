//! Sample budget management
//!
//! A single process-wide [`SampleLimit`] caps how many samples any one owner's
//! shapes may add up to. Each owner keeps a [`BudgetLedger`] with the running
//! total of its shapes' sample counts.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::Error;
use crate::core::types::Result;

/// Sample counts beyond `i64::MAX` clamp to it
fn signed(samples: u64) -> i64 {
    i64::try_from(samples).unwrap_or(i64::MAX)
}

/// Process-wide per-owner sample limit, adjustable at runtime
#[derive(Debug)]
pub struct SampleLimit {
    value: AtomicU64,
}

impl SampleLimit {
    pub fn new(limit: u64) -> Self {
        Self { value: AtomicU64::new(limit) }
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Change the limit. Existing shapes are kept even if they now exceed it.
    pub fn set(&self, limit: u64) {
        self.value.store(limit, Ordering::Release);
    }
}

/// Running sample total for one owner
///
/// Only mutated under the owner's lock, in the same step as the shape maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetLedger {
    used: u64,
}

impl BudgetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Query methods ---

    /// Samples currently committed
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Samples still free under `limit`. Negative once the limit has been
    /// lowered below current usage.
    pub fn available(&self, limit: u64) -> i64 {
        signed(limit).saturating_sub(signed(self.used))
    }

    // --- Decision methods ---

    /// Total after swapping `released` samples for `requested` ones, or the
    /// shortfall if that total would exceed `limit`. Does not mutate.
    pub fn project(&self, released: u64, requested: u64, limit: u64) -> Result<u64> {
        let base = self.used.saturating_sub(released);
        let projected = base.saturating_add(requested);
        if projected > limit {
            return Err(Error::BudgetExceeded {
                available: signed(limit).saturating_sub(signed(base)),
                requested,
            });
        }
        Ok(projected)
    }

    // --- Tracking methods ---

    /// Commit a total produced by [`project`](Self::project) or a recount
    pub fn commit(&mut self, total: u64) {
        self.used = total;
    }

    /// Give back samples from removed shapes
    pub fn release(&mut self, samples: u64) {
        self.used = self.used.saturating_sub(samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_new() {
        let ledger = BudgetLedger::new();
        assert_eq!(ledger.used(), 0);
        assert_eq!(ledger.available(100), 100);
    }

    #[test]
    fn test_project_accepts_within_limit() {
        let mut ledger = BudgetLedger::new();
        ledger.commit(40);
        assert_eq!(ledger.project(0, 60, 100).unwrap(), 100);
        // Not committed yet
        assert_eq!(ledger.used(), 40);
    }

    #[test]
    fn test_project_reports_shortfall() {
        let mut ledger = BudgetLedger::new();
        ledger.commit(40);
        match ledger.project(0, 70, 100) {
            Err(Error::BudgetExceeded { available, requested }) => {
                assert_eq!(available, 60);
                assert_eq!(requested, 70);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_project_credits_replaced_shape() {
        let mut ledger = BudgetLedger::new();
        ledger.commit(90);
        // Replacing a 50-sample shape with a 60-sample one fits in 100
        assert_eq!(ledger.project(50, 60, 100).unwrap(), 100);
        assert!(ledger.project(50, 61, 100).is_err());
    }

    #[test]
    fn test_available_negative_after_limit_drop() {
        let mut ledger = BudgetLedger::new();
        ledger.commit(150);
        assert_eq!(ledger.available(100), -50);
        match ledger.project(0, 1, 100) {
            Err(Error::BudgetExceeded { available, .. }) => assert_eq!(available, -50),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_release_saturates() {
        let mut ledger = BudgetLedger::new();
        ledger.commit(10);
        ledger.release(25);
        assert_eq!(ledger.used(), 0);
    }

    #[test]
    fn test_available_saturates_for_huge_limits() {
        let mut ledger = BudgetLedger::new();
        assert_eq!(ledger.available(u64::MAX), i64::MAX);
        ledger.commit(10);
        assert_eq!(ledger.available(u64::MAX), i64::MAX - 10);
        assert!(ledger.project(0, 5, u64::MAX).is_ok());

        ledger.commit(u64::MAX);
        assert_eq!(ledger.available(0), -i64::MAX);
        match ledger.project(0, 1, 3) {
            Err(Error::BudgetExceeded { available, .. }) => assert_eq!(available, 3 - i64::MAX),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_limit_set() {
        let limit = SampleLimit::new(10_000);
        assert_eq!(limit.get(), 10_000);
        limit.set(0);
        assert_eq!(limit.get(), 0);
    }
}
