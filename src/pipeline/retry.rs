//! Bounded per-resource failure tracking.

use std::collections::HashMap;
use std::sync::Mutex;

/// Number of recorded failures after which a resource is abandoned.
pub const DEFAULT_MAX_FAILURES: u32 = 3;

/// Disposition decided after recording one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Failure recorded; a redelivered event may try again.
    Retry {
        /// Consecutive failures recorded so far for the resource.
        attempt: u32,
    },
    /// Failure cap reached; the resource is abandoned and its counter removed.
    Drop {
        /// Consecutive failures recorded when the cap was hit.
        attempts: u32,
    },
}

/// In-process failure counters keyed by resource.
///
/// Counters live only as long as this instance: they are not durable and not shared with
/// concurrently running instances, so the cap is a per-instance guard against reprocessing
/// loops rather than a global correctness mechanism. The delivery platform, not this type,
/// is what produces any follow-up invocation.
pub struct RetryTracker {
    max_failures: u32,
    counters: Mutex<HashMap<String, u32>>,
}

impl RetryTracker {
    /// Create a tracker using the default failure cap.
    pub fn new() -> Self {
        Self::with_max_failures(DEFAULT_MAX_FAILURES)
    }

    /// Create a tracker with an explicit failure cap.
    pub fn with_max_failures(max_failures: u32) -> Self {
        Self {
            max_failures,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Record one failure for a resource and decide whether it stays retryable.
    ///
    /// The counter is removed when the cap is reached, leaving a clean slate should the
    /// platform deliver the same resource again much later.
    pub fn record_failure(&self, resource_key: &str) -> FailureDisposition {
        let mut counters = self.counters.lock().expect("retry counter lock poisoned");
        let counter = counters.entry(resource_key.to_string()).or_insert(0);
        *counter += 1;
        let attempts = *counter;

        if attempts >= self.max_failures {
            counters.remove(resource_key);
            FailureDisposition::Drop { attempts }
        } else {
            FailureDisposition::Retry { attempt: attempts }
        }
    }

    /// Remove any counter entry for a resource after a successful run.
    pub fn clear(&self, resource_key: &str) {
        let mut counters = self.counters.lock().expect("retry counter lock poisoned");
        counters.remove(resource_key);
    }

    /// Current failure count recorded for a resource, zero when absent.
    pub fn attempt_count(&self, resource_key: &str) -> u32 {
        let counters = self.counters.lock().expect("retry counter lock poisoned");
        counters.get(resource_key).copied().unwrap_or(0)
    }
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new()
    }
}
