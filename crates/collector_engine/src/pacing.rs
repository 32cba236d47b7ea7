use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use collector_logging::collector_trace;
use tokio::time::Instant;

/// Spaces request starts at least `min_interval` apart.
#[derive(Debug, Default)]
pub struct Pacer {
    min_interval: Option<Duration>,
    last_start: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Option<Duration>) -> Self {
        Self {
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Waits until the next request may start, then claims that slot.
    pub async fn wait_turn(&self) {
        let Some(interval) = self.min_interval else {
            return;
        };

        let last = *self.slot();
        let wait = last
            .map(|last| interval.saturating_sub(last.elapsed()))
            .filter(|wait| !wait.is_zero());
        if let Some(wait) = wait {
            collector_trace!("Pacing: sleeping {:?}", wait);
            tokio::time::sleep(wait).await;
        }

        *self.slot() = Some(Instant::now());
    }

    fn slot(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_start
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
