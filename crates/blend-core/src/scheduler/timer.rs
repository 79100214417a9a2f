//! One-shot phase timer.
//!
//! At most one deadline is outstanding. Arming replaces the previous
//! deadline, so a stale firing can never be observed after a re-arm.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Deadline used when `now + after` is not representable
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Default)]
pub struct PhaseTimer {
    deadline: Option<Instant>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, after: Duration) {
        let now = Instant::now();
        self.deadline = Some(now.checked_add(after).unwrap_or(now + FAR_FUTURE));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when the armed deadline passes; never resolves while disarmed.
    ///
    /// The deadline is consumed on firing.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
