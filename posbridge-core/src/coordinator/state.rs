//! Attempt state owned by the coordinator.

use crate::channel::{ChannelError, ReplySubscription};
use crate::context::SettlementInput;
use crate::gateway::GatewayError;
use posbridge_sdk::objects::{GatewayResponse, HostReply};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Observable phase of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingHostReply,
    Settling,
    Terminal,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::AwaitingHostReply => write!(f, "awaiting host reply"),
            Phase::Settling => write!(f, "settling"),
            Phase::Terminal => write!(f, "terminal"),
        }
    }
}

/// A settlement call running on its own task.
///
/// Dropping it aborts the call, so leaving the Settling state never leaves a
/// request behind that could still produce a step.
#[derive(Debug)]
pub(crate) struct SettlementTask(pub(crate) JoinHandle<Result<GatewayResponse, GatewayError>>);

impl SettlementTask {
    async fn join(&mut self) -> Result<GatewayResponse, GatewayError> {
        match (&mut self.0).await {
            Ok(outcome) => outcome,
            Err(e) => Err(GatewayError::Aborted(e.to_string())),
        }
    }
}

impl Drop for SettlementTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What the current attempt is waiting on.
///
/// The reply subscription lives only in `AwaitingHostReply`, so there is
/// never more than one armed listener and replacing the state disarms it.
#[derive(Debug)]
pub(crate) enum AttemptState {
    Idle,
    AwaitingHostReply {
        attempt: Uuid,
        input: SettlementInput,
        subscription: ReplySubscription,
    },
    Settling {
        attempt: Uuid,
        task: SettlementTask,
    },
    Terminal {
        attempt: Uuid,
    },
}

/// Completion of whatever the attempt was waiting on.
#[derive(Debug)]
pub(crate) enum AttemptEvent {
    Reply(Result<HostReply, ChannelError>),
    Settled(Result<GatewayResponse, GatewayError>),
}

impl AttemptState {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            AttemptState::Idle => Phase::Idle,
            AttemptState::AwaitingHostReply { .. } => Phase::AwaitingHostReply,
            AttemptState::Settling { .. } => Phase::Settling,
            AttemptState::Terminal { .. } => Phase::Terminal,
        }
    }

    pub(crate) fn attempt(&self) -> Option<Uuid> {
        match self {
            AttemptState::Idle => None,
            AttemptState::AwaitingHostReply { attempt, .. }
            | AttemptState::Settling { attempt, .. }
            | AttemptState::Terminal { attempt } => Some(*attempt),
        }
    }

    pub(crate) fn is_waiting(&self) -> bool {
        matches!(
            self,
            AttemptState::AwaitingHostReply { .. } | AttemptState::Settling { .. }
        )
    }

    /// Wait for the host reply or the settlement outcome. Cancel-safe; never
    /// completes in the other states.
    pub(crate) async fn next_event(&mut self) -> AttemptEvent {
        match self {
            AttemptState::AwaitingHostReply { subscription, .. } => {
                AttemptEvent::Reply(subscription.recv().await)
            }
            AttemptState::Settling { task, .. } => AttemptEvent::Settled(task.join().await),
            AttemptState::Idle | AttemptState::Terminal { .. } => std::future::pending().await,
        }
    }
}
