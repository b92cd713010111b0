//! Cashier actions and host messages read as JSON lines.
//!
//! Each input line is one object tagged by `action`:
//!
//! ```text
//! {"action":"pay","payment_code":"1234"}
//! {"action":"refund","purchase_number":"P-100"}
//! {"action":"cancel_payment"}
//! {"action":"cancel_refund"}
//! {"action":"allow_close"}
//! {"action":"print","receipt_html":"<p>Thanks</p>"}
//! {"action":"message","origin":"https://a.test","data":{"register_sale":{"client_sale_id":"s-1"}}}
//! ```

use posbridge_core::channel::{DispatchOutcome, HostChannel, InboundMessage};
use posbridge_core::coordinator::{CoordinatorError, CoordinatorHandle};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConsoleAction {
    Pay {
        payment_code: String,
    },
    Refund {
        #[serde(default)]
        purchase_number: Option<String>,
    },
    CancelPayment,
    CancelRefund,
    AllowClose,
    Print {
        receipt_html: String,
    },
    /// A message event from the host window. `data` may be the raw string
    /// the host posted or the JSON value itself.
    Message {
        origin: String,
        data: Value,
    },
}

impl ConsoleAction {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

fn message_data(data: Value) -> String {
    match data {
        Value::String(raw) => raw,
        other => other.to_string(),
    }
}

/// Feeds console input to the coordinator and the host channel.
pub struct Console {
    handle: CoordinatorHandle,
    channel: HostChannel,
}

impl Console {
    pub fn new(handle: CoordinatorHandle, channel: HostChannel) -> Self {
        Self { handle, channel }
    }

    /// Read actions until end of input. Bad lines and refused commands are
    /// logged and skipped; only read errors end the loop early.
    pub async fn run<R>(&self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match ConsoleAction::parse(line) {
                Ok(action) => {
                    if let Err(e) = self.apply(action).await {
                        warn!(error = %e, "Action refused");
                    }
                }
                Err(e) => warn!(error = %e, line = line, "Unrecognized input line"),
            }
        }
        Ok(())
    }

    pub async fn apply(&self, action: ConsoleAction) -> Result<(), CoordinatorError> {
        match action {
            ConsoleAction::Pay { payment_code } => {
                let attempt = self.handle.begin_payment(payment_code).await?;
                info!(attempt = %attempt, "Payment started");
            }
            ConsoleAction::Refund { purchase_number } => {
                let attempt = self.handle.begin_refund(purchase_number).await?;
                info!(attempt = %attempt, "Refund started");
            }
            ConsoleAction::CancelPayment => self.handle.cancel_payment().await?,
            ConsoleAction::CancelRefund => self.handle.cancel_refund().await?,
            ConsoleAction::AllowClose => self.handle.allow_close().await?,
            ConsoleAction::Print { receipt_html } => {
                self.handle.print_receipt(receipt_html).await?
            }
            ConsoleAction::Message { origin, data } => {
                let outcome = self
                    .channel
                    .dispatch(InboundMessage::new(origin, message_data(data)));
                if outcome != DispatchOutcome::Delivered {
                    info!(outcome = ?outcome, "Host message not delivered");
                }
            }
        }
        Ok(())
    }
}
