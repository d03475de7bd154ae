//! Additive auto-throttle for politeness delays
//!
//! Every fetch attempt is followed by a sleep of the current delay. Once the
//! number of consecutive failures exceeds the threshold, each further failure
//! adds one second to the delay up to the cap. A success resets the failure
//! count but keeps the delay that was reached.

use std::time::Duration;
use tracing::{info, warn};

/// Tracks consecutive failures and the resulting inter-request delay
#[derive(Debug, Clone)]
pub struct AutoThrottle {
    delay_secs: u64,
    max_delay_secs: u64,
    error_threshold: u32,
    consecutive_errors: u32,
}

impl AutoThrottle {
    /// Create a throttle starting at `initial_secs`
    pub fn new(initial_secs: u64, error_threshold: u32, max_delay_secs: u64) -> Self {
        Self {
            delay_secs: initial_secs,
            max_delay_secs,
            error_threshold,
            consecutive_errors: 0,
        }
    }

    /// Record a successful fetch
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }

    /// Record a failed fetch, growing the delay when past the threshold
    pub fn record_failure(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.consecutive_errors > self.error_threshold && self.delay_secs < self.max_delay_secs {
            self.delay_secs = (self.delay_secs + 1).min(self.max_delay_secs);
            info!("Auto-throttling applied. Current delay: {}s", self.delay_secs);
        } else if self.consecutive_errors > self.error_threshold {
            warn!(
                "{} consecutive failures, delay held at {}s",
                self.consecutive_errors, self.delay_secs
            );
        }
    }

    /// Number of failures since the last success
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Current delay in whole seconds
    pub fn delay_secs(&self) -> u64 {
        self.delay_secs
    }

    /// Current delay
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    /// Sleep for the current delay
    pub async fn pause(&self) {
        if self.delay_secs > 0 {
            tokio::time::sleep(self.delay()).await;
        }
    }
}
