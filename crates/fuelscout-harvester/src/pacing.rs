//! Deliberate pacing between source page loads.
//!
//! A fixed delay plus random jitter keeps the request pattern from looking
//! machine-generated. These sleeps are suspension points, never busy-waits.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub delay_ms: u64,
    pub jitter_ms: u64,
}

impl Pacing {
    #[must_use]
    pub fn new(delay_ms: u64, jitter_ms: u64) -> Self {
        Self { delay_ms, jitter_ms }
    }

    /// Zero-length pacing for tests.
    #[must_use]
    pub fn none() -> Self {
        Self {
            delay_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Sleep for the fixed delay plus a uniformly random jitter.
    pub async fn pause(self) {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        let total = self.delay_ms + jitter;
        if total > 0 {
            tokio::time::sleep(Duration::from_millis(total)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_pacing_returns_immediately() {
        let started = std::time::Instant::now();
        Pacing::none().pause().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
