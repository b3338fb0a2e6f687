//! Flow Control Configuration
//!
//! Timing policy shared by producer and consumer loops.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for producer/consumer back-off behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowControlConfig {
    /// Interval between checks while probing a full queue
    pub probe_interval_ms: u64,

    /// How long a producer probes before switching to monitored waiting
    pub probe_window_ms: u64,

    /// Length of one timed wait on the queue's wake signal
    pub wait_slice_ms: u64,

    /// Interval between "still waiting" status reports
    pub status_interval_ms: u64,

    /// Whether consumers finish draining a non-empty queue after shutdown
    pub drain_on_shutdown: bool,
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 1000,
            probe_window_ms: 30_000,
            wait_slice_ms: 1000,
            status_interval_ms: 30_000,
            drain_on_shutdown: true,
        }
    }
}

impl FlowControlConfig {
    /// Short intervals for interactive demos and tests
    pub fn responsive() -> Self {
        Self {
            probe_interval_ms: 10,
            probe_window_ms: 100,
            wait_slice_ms: 10,
            status_interval_ms: 200,
            drain_on_shutdown: true,
        }
    }

    /// Same timings, consumers exit on shutdown without draining
    pub fn without_drain(self) -> Self {
        Self {
            drain_on_shutdown: false,
            ..self
        }
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }

    pub fn wait_slice(&self) -> Duration {
        Duration::from_millis(self.wait_slice_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    /// Validate flow control parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.probe_interval_ms == 0 {
            return Err("Probe interval must be greater than 0".to_string());
        }

        if self.probe_window_ms < self.probe_interval_ms {
            return Err("Probe window must be greater than or equal to probe interval".to_string());
        }

        if self.wait_slice_ms == 0 {
            return Err("Wait slice must be greater than 0".to_string());
        }

        if self.status_interval_ms < self.wait_slice_ms {
            return Err("Status interval must be greater than or equal to wait slice".to_string());
        }

        Ok(())
    }
}
