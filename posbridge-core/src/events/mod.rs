//! Event system for the step flow.
//!
//! # Event Flow
//!
//! 1. `CoordinatorHandle` sends a `Command` -> `TransactionCoordinator`
//! 2. `HostChannel::dispatch` delivers the host reply to the coordinator's
//!    one-shot subscription
//! 3. `TransactionCoordinator` reports `FlowEvent`s for anything that did not
//!    go to plan

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, FlowEventReceiver, FlowEventSender, FlowReporter, flow_event_channel,
};

pub use types::FlowEvent;
