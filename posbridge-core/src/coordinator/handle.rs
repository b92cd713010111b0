//! Command channel into a running coordinator.

use super::CoordinatorError;
use crate::context::{FlowKind, SettlementInput};
use crate::events::DEFAULT_CHANNEL_BUFFER;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

/// Cashier and administrative actions.
#[derive(Debug)]
pub enum Command {
    Begin {
        input: SettlementInput,
        reply: Reply<Uuid>,
    },
    Cancel {
        kind: FlowKind,
        reply: Reply<()>,
    },
    AllowClose {
        reply: Reply<()>,
    },
    Print {
        receipt_html: String,
        reply: Reply<()>,
    },
}

/// Sender handle for Command messages.
pub type CommandSender = mpsc::Sender<Command>;
/// Receiver handle for Command messages.
pub type CommandReceiver = mpsc::Receiver<Command>;

/// Create a new Command channel.
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Cloneable front end of a [`TransactionCoordinator`](super::TransactionCoordinator).
///
/// Each call waits for the coordinator to act on the command and returns its
/// verdict; [`CoordinatorError::Stopped`] means the coordinator is gone.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: CommandSender,
}

impl CoordinatorHandle {
    pub fn new(tx: CommandSender) -> Self {
        Self { tx }
    }

    /// Start a payment attempt. Returns the attempt id.
    pub async fn begin_payment(
        &self,
        payment_code: impl Into<String>,
    ) -> Result<Uuid, CoordinatorError> {
        let input = SettlementInput::Payment {
            payment_code: payment_code.into(),
        };
        self.request(|reply| Command::Begin { input, reply }).await
    }

    /// Start a refund attempt. Returns the attempt id.
    pub async fn begin_refund(
        &self,
        purchase_number: Option<String>,
    ) -> Result<Uuid, CoordinatorError> {
        let input = SettlementInput::Refund { purchase_number };
        self.request(|reply| Command::Begin { input, reply }).await
    }

    pub async fn cancel_payment(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Command::Cancel {
            kind: FlowKind::Payment,
            reply,
        })
        .await
    }

    pub async fn cancel_refund(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Command::Cancel {
            kind: FlowKind::Refund,
            reply,
        })
        .await
    }

    /// Re-enable the host's close button.
    pub async fn allow_close(&self) -> Result<(), CoordinatorError> {
        self.request(|reply| Command::AllowClose { reply }).await
    }

    pub async fn print_receipt(
        &self,
        receipt_html: impl Into<String>,
    ) -> Result<(), CoordinatorError> {
        let receipt_html = receipt_html.into();
        self.request(|reply| Command::Print {
            receipt_html,
            reply,
        })
        .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, CoordinatorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(command(reply_tx))
            .await
            .map_err(|_| CoordinatorError::Stopped)?;
        reply_rx.await.map_err(|_| CoordinatorError::Stopped)?
    }
}
