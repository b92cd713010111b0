//! Event channel factories and handles.

use super::types::FlowEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for FlowEvent events.
pub type FlowEventSender = mpsc::Sender<FlowEvent>;
/// Receiver handle for FlowEvent events.
pub type FlowEventReceiver = mpsc::Receiver<FlowEvent>;

/// Create a new FlowEvent channel.
///
/// Returns a (sender, receiver) pair for FlowEvent events.
pub fn flow_event_channel() -> (FlowEventSender, FlowEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Optional, non-blocking reporter for flow events.
///
/// Events are reported from synchronous code paths (message dispatch), so
/// they are offered with `try_send`: when nobody listens or the buffer is
/// full the event is only logged.
#[derive(Clone, Default)]
pub struct FlowReporter {
    tx: Option<FlowEventSender>,
}

impl FlowReporter {
    pub fn new(tx: FlowEventSender) -> Self {
        Self { tx: Some(tx) }
    }

    /// A reporter that only logs.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, event: FlowEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(event = %event, "Flow event channel full, event dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
