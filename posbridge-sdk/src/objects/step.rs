//! Outbound Payments API steps.
//!
//! Every message posted to the host window is a JSON object tagged by its
//! `"step"` field:
//!
//! ```json
//! {"step":"SETUP","setup":{"enable_close":false}}
//! {"step":"DATA"}
//! {"step":"ACCEPT","transaction_id":"123","receipt_html_extra":"..."}
//! {"step":"DECLINE","print":false,"receipt_html_extra":"..."}
//! {"step":"PRINT","receipt_html_extra":"..."}
//! {"step":"EXIT"}
//! ```

use serde::{Deserialize, Serialize};

/// One message of the fixed step vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepMessage {
    /// Customize the payment dialog.
    Setup { setup: SetupOptions },

    /// Ask the host for sale, payment and line item data.
    Data,

    /// Successful transaction; the host prints an approved receipt.
    Accept {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transaction_id: Option<String>,
        receipt_html_extra: String,
    },

    /// Return to the pay screen without taking payment.
    Decline {
        print: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receipt_html_extra: Option<String>,
    },

    /// Manually trigger a receipt print.
    Print { receipt_html_extra: String },

    /// Cleanly exit the payment dialog.
    Exit,
}

impl StepMessage {
    /// The wire name of the step, as it appears in the `"step"` field.
    pub fn name(&self) -> &'static str {
        match self {
            StepMessage::Setup { .. } => "SETUP",
            StepMessage::Data => "DATA",
            StepMessage::Accept { .. } => "ACCEPT",
            StepMessage::Decline { .. } => "DECLINE",
            StepMessage::Print { .. } => "PRINT",
            StepMessage::Exit => "EXIT",
        }
    }

    /// ACCEPT, DECLINE and EXIT end an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepMessage::Accept { .. } | StepMessage::Decline { .. } | StepMessage::Exit
        )
    }
}

/// Options carried by the SETUP step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupOptions {
    /// Whether the cashier may close the payment dialog.
    pub enable_close: bool,
}
