//! Runtime configuration for the coordinator.
//!
//! These are validated values; reading them from a file is the embedding
//! binary's concern.

use crate::classifier::DEFAULT_DECLINE_DELAY;
use std::time::Duration;

/// Default dwell time before EXIT after a precondition failure.
pub const DEFAULT_EXIT_DELAY: Duration = Duration::from_millis(4000);

/// Default bound on the wait for the host's DATA reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Delay before a decline-family step is sent.
    pub decline_delay: Duration,
    /// Delay before EXIT when the launch parameters are insufficient.
    pub exit_delay: Duration,
    /// How long to wait for the host reply; `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            decline_delay: DEFAULT_DECLINE_DELAY,
            exit_delay: DEFAULT_EXIT_DELAY,
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
        }
    }
}
