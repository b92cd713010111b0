use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Deadline used when `now + delay` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A single-slot timer holding one pending action.
///
/// Arming replaces whatever was pending; cancelling hands the action back.
/// [`fired`](Scheduled::fired) is cancel-safe, so it can sit in a
/// `tokio::select!` loop next to other branches.
#[derive(Debug)]
pub struct Scheduled<T> {
    slot: Option<(Instant, T)>,
}

impl<T> Default for Scheduled<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Scheduled<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` to fire after `delay`. Returns the action it replaced.
    pub fn arm(&mut self, delay: Duration, action: T) -> Option<T> {
        let now = Instant::now();
        let deadline = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.slot
            .replace((deadline, action))
            .map(|(_, previous)| previous)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.slot.take().map(|(_, action)| action)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Wait for the deadline and take the action.
    ///
    /// Never completes while nothing is armed.
    pub async fn fired(&mut self) -> T {
        loop {
            match self.slot.as_ref() {
                Some((deadline, _)) => sleep_until(*deadline).await,
                None => std::future::pending::<()>().await,
            }
            if let Some((_, action)) = self.slot.take() {
                return action;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let mut timer = Scheduled::new();
        let start = Instant::now();
        timer.arm(Duration::from_millis(4000), "decline");

        assert_eq!(timer.fired().await, "decline");
        assert!(start.elapsed() >= Duration::from_millis(4000));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_rearm() {
        let mut timer = Scheduled::new();
        timer.arm(Duration::from_secs(1), 1);
        assert_eq!(timer.arm(Duration::from_secs(2), 2), Some(1));
        assert_eq!(timer.cancel(), Some(2));
        assert!(timer.deadline().is_none());

        let waited = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_delay_does_not_overflow() {
        let mut timer = Scheduled::new();
        let start = Instant::now();
        timer.arm(Duration::from_secs(u64::MAX), "never");

        assert!(timer.deadline().unwrap() > start + Duration::from_secs(86400 * 365));
        let waited = tokio::time::timeout(Duration::from_secs(3600), timer.fired()).await;
        assert!(waited.is_err());
        assert!(timer.is_armed());
    }
}
