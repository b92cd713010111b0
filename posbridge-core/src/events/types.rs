//! Flow event definitions.
//!
//! Flow events report problems the cashier may never see on screen: dropped
//! host messages, abandoned attempts, failed deliveries. They are
//! informational; the coordinator has already acted on each of them by the
//! time it is emitted.

use crate::channel::ReplyParseError;
use crate::gateway::GatewayError;
use uuid::Uuid;

/// An observable problem in the step flow.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// An inbound message from the expected origin could not be decoded as a
    /// host reply. The listener stays armed.
    ReplyDropped(ReplyParseError),

    /// An attempt was refused because too few launch parameters were present.
    PreconditionFailed { attempt: Uuid, present: usize },

    /// An attempt was abandoned because the bridge is not embedded.
    NotEmbedded { attempt: Uuid },

    /// The settlement call failed without a gateway response.
    GatewayFailed { attempt: Uuid, error: GatewayError },

    /// The host never answered the DATA step.
    ReplyTimedOut { attempt: Uuid },

    /// A step could not be posted to the host window.
    StepDeliveryFailed { step: &'static str, error: String },
}

impl std::fmt::Display for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowEvent::ReplyDropped(e) => write!(f, "reply dropped: {e}"),
            FlowEvent::PreconditionFailed { attempt, present } => {
                write!(f, "attempt {attempt}: only {present} launch parameters present")
            }
            FlowEvent::NotEmbedded { attempt } => {
                write!(f, "attempt {attempt}: not embedded in a host window")
            }
            FlowEvent::GatewayFailed { attempt, error } => {
                write!(f, "attempt {attempt}: {error}")
            }
            FlowEvent::ReplyTimedOut { attempt } => {
                write!(f, "attempt {attempt}: host reply timed out")
            }
            FlowEvent::StepDeliveryFailed { step, error } => {
                write!(f, "failed to deliver {step}: {error}")
            }
        }
    }
}
