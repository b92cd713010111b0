//! Maps gateway responses to the step the host should see next.
//!
//! Every non-success outcome funnels into the same action: show the reason,
//! wait, then DECLINE. Only the fragment and receipt text differ.

use crate::ui::{StatusFragment, escape_html};
use posbridge_sdk::objects::{GatewayResponse, GatewayStatus};
use std::time::Duration;

/// Default dwell time before a decline-family step is sent.
pub const DEFAULT_DECLINE_DELAY: Duration = Duration::from_millis(4000);

/// What the coordinator does with a gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send ACCEPT right away.
    Accept {
        receipt_html: String,
        transaction_id: Option<String>,
    },
    /// Show `fragment`, then send DECLINE after `delay`.
    DelayedDecline {
        fragment: StatusFragment,
        receipt_html: Option<String>,
        delay: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseClassifier {
    decline_delay: Duration,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DECLINE_DELAY)
    }
}

impl ResponseClassifier {
    pub fn new(decline_delay: Duration) -> Self {
        Self { decline_delay }
    }

    pub fn classify(&self, response: &GatewayResponse) -> Action {
        let status = response.status.as_str().to_lowercase();
        let message = response.message.clone().unwrap_or_default();

        match &response.status {
            GatewayStatus::Accepted => Action::Accept {
                receipt_html: response
                    .id
                    .as_deref()
                    .map(approved_receipt)
                    .unwrap_or_default(),
                transaction_id: response.id.clone(),
            },
            GatewayStatus::Declined => Action::DelayedDecline {
                fragment: StatusFragment::Declined { status, message },
                receipt_html: Some("<div>Declined</div>".to_owned()),
                delay: self.decline_delay,
            },
            GatewayStatus::Failed => Action::DelayedDecline {
                receipt_html: Some(format!(
                    "<div><h2>DECLINED</h2><span> {}</span></div>",
                    escape_html(&message)
                )),
                fragment: StatusFragment::Failed { status, message },
                delay: self.decline_delay,
            },
            GatewayStatus::Timeout => Action::DelayedDecline {
                fragment: StatusFragment::Timeout,
                receipt_html: Some("<div>TIMEOUT</div>".to_owned()),
                delay: self.decline_delay,
            },
            // Unrecognized statuses read as a failure with no detail.
            GatewayStatus::Other(_) => Action::DelayedDecline {
                fragment: StatusFragment::Failed {
                    status,
                    message: String::new(),
                },
                receipt_html: None,
                delay: self.decline_delay,
            },
        }
    }
}

fn approved_receipt(id: &str) -> String {
    format!(
        "<div><h2>APPROVED</h2><span>Purchase #: {} </span></div>",
        escape_html(id)
    )
}
