//! Transaction context taken from the launch query string.
//!
//! The host opens the bridge with `?amount=..&origin=..&register_id=..`.
//! Extraction never fails: missing keys are simply absent, and the
//! coordinator decides whether what is left is enough to start a flow.

use posbridge_sdk::objects::{HostReply, PayRequest, RefundRequest, SettlementRequest};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Minimum number of launch parameters needed to start a flow.
pub const MIN_CONTEXT_FIELDS: usize = 2;

/// Launch parameters of the current page load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionContext {
    pub amount: Option<String>,
    pub origin: Option<String>,
    pub register_id: Option<String>,
}

impl TransactionContext {
    /// Parse a raw query string (with or without the leading `?`).
    ///
    /// The whole string is URL-decoded before it is split, then each
    /// `key=value` pair is applied in order so the last occurrence of a key
    /// wins. A bare key without `=` clears that field.
    pub fn extract(raw_query: &str) -> Self {
        let raw = raw_query.strip_prefix('?').unwrap_or(raw_query);
        let decoded = match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes()))
                .into_owned(),
        };

        let mut context = Self::default();
        for pair in decoded.split('&') {
            let mut parts = pair.split('=');
            let key = parts.next().unwrap_or_default();
            let value = parts.next().map(str::to_owned);
            match key {
                "amount" => context.amount = value,
                "origin" => context.origin = value,
                "register_id" => context.register_id = value,
                _ => {}
            }
        }
        context
    }

    /// Number of recognized fields that are present.
    pub fn present_fields(&self) -> usize {
        [&self.amount, &self.origin, &self.register_id]
            .iter()
            .filter(|field| field.is_some())
            .count()
    }

    /// Whether enough context is present to start a flow.
    pub fn is_sufficient(&self) -> bool {
        self.present_fields() >= MIN_CONTEXT_FIELDS
    }

    /// The amount as a decimal, if present and well formed.
    pub fn amount_decimal(&self) -> Option<Decimal> {
        self.amount
            .as_deref()
            .and_then(|amount| Decimal::from_str(amount.trim()).ok())
    }

    /// Combine this context with the host's sale reference into the request
    /// for the chosen settlement operation.
    pub fn settlement_request(
        &self,
        sale: SaleReference,
        input: &SettlementInput,
    ) -> SettlementRequest {
        match input {
            SettlementInput::Payment { payment_code } => SettlementRequest::Pay(PayRequest {
                amount: self.amount.clone(),
                origin: self.origin.clone(),
                register_id: self.register_id.clone(),
                sale_id: sale.sale_id,
                paymentcode: payment_code.clone(),
            }),
            SettlementInput::Refund { .. } => SettlementRequest::Refund(RefundRequest {
                amount: self.amount.clone(),
                origin: self.origin.clone(),
                sale_id: sale.sale_id,
                register_id: self.register_id.clone(),
                purchaseno: sale.purchase_number,
            }),
        }
    }
}

/// Which settlement the cashier asked for, with the value they entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementInput {
    Payment { payment_code: String },
    Refund { purchase_number: Option<String> },
}

impl SettlementInput {
    pub fn kind(&self) -> FlowKind {
        match self {
            SettlementInput::Payment { .. } => FlowKind::Payment,
            SettlementInput::Refund { .. } => FlowKind::Refund,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Payment,
    Refund,
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowKind::Payment => write!(f, "payment"),
            FlowKind::Refund => write!(f, "refund"),
        }
    }
}

/// The sale being settled, as identified by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleReference {
    pub sale_id: String,
    pub purchase_number: Option<String>,
}

impl SaleReference {
    /// Correlate a host reply with the cashier's input.
    pub fn from_reply(reply: HostReply, input: &SettlementInput) -> Self {
        let purchase_number = match input {
            SettlementInput::Refund { purchase_number } => purchase_number.clone(),
            SettlementInput::Payment { .. } => None,
        };
        Self {
            sale_id: reply.register_sale.client_sale_id,
            purchase_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posbridge_sdk::objects::RegisterSale;

    #[test]
    fn test_extract_all_fields() {
        let ctx = TransactionContext::extract(
            "?amount=12.50&origin=https%3A%2F%2Fstore.example.com&register_id=reg-1",
        );
        assert_eq!(ctx.amount.as_deref(), Some("12.50"));
        assert_eq!(ctx.origin.as_deref(), Some("https://store.example.com"));
        assert_eq!(ctx.register_id.as_deref(), Some("reg-1"));
        assert_eq!(ctx.present_fields(), 3);
        assert_eq!(ctx.amount_decimal(), Decimal::from_str("12.50").ok());
    }

    #[test]
    fn test_extract_ignores_unknown_and_last_wins() {
        let ctx = TransactionContext::extract("amount=1&foo=bar&amount=2&register_id=r");
        assert_eq!(ctx.amount.as_deref(), Some("2"));
        assert_eq!(ctx.origin, None);
        assert_eq!(ctx.register_id.as_deref(), Some("r"));
        assert!(ctx.is_sufficient());
    }

    #[test]
    fn test_extract_degraded() {
        let ctx = TransactionContext::extract("amount=3.00");
        assert_eq!(ctx.present_fields(), 1);
        assert!(!ctx.is_sufficient());

        let empty = TransactionContext::extract("");
        assert_eq!(empty, TransactionContext::default());
    }

    #[test]
    fn test_bare_key_clears_field() {
        let ctx = TransactionContext::extract("amount=5&origin=o&amount");
        assert_eq!(ctx.amount, None);
        assert_eq!(ctx.present_fields(), 1);
    }

    #[test]
    fn test_malformed_amount_has_no_decimal() {
        let ctx = TransactionContext::extract("amount=twelve&origin=o");
        assert_eq!(ctx.amount.as_deref(), Some("twelve"));
        assert_eq!(ctx.amount_decimal(), None);
    }

    #[test]
    fn test_settlement_request_composition() {
        let ctx = TransactionContext::extract("amount=9.99&origin=https://pos.test&register_id=r9");
        let reply = HostReply {
            register_sale: RegisterSale {
                client_sale_id: "sale-7".to_string(),
            },
        };

        let refund_input = SettlementInput::Refund {
            purchase_number: Some("P-100".to_string()),
        };
        let sale = SaleReference::from_reply(reply.clone(), &refund_input);
        assert_eq!(
            ctx.settlement_request(sale, &refund_input),
            SettlementRequest::Refund(RefundRequest {
                amount: Some("9.99".to_string()),
                origin: Some("https://pos.test".to_string()),
                sale_id: "sale-7".to_string(),
                register_id: Some("r9".to_string()),
                purchaseno: Some("P-100".to_string()),
            })
        );

        let pay_input = SettlementInput::Payment {
            payment_code: "4321".to_string(),
        };
        let sale = SaleReference::from_reply(reply, &pay_input);
        assert_eq!(sale.purchase_number, None);
        assert_eq!(
            ctx.settlement_request(sale, &pay_input),
            SettlementRequest::Pay(PayRequest {
                amount: Some("9.99".to_string()),
                origin: Some("https://pos.test".to_string()),
                register_id: Some("r9".to_string()),
                sale_id: "sale-7".to_string(),
                paymentcode: "4321".to_string(),
            })
        );
    }
}
