//! Inbound messages from the host window.

use serde::{Deserialize, Serialize};

/// The host's answer to a DATA step.
///
/// The host sends a much larger object (payment, line items, customer); only
/// the sale identifier is needed to settle, everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReply {
    pub register_sale: RegisterSale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSale {
    pub client_sale_id: String,
}

impl HostReply {
    pub fn sale_id(&self) -> &str {
        &self.register_sale.client_sale_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_ignores_extra_fields() {
        let raw = r#"{
            "register_sale": {
                "client_sale_id": "sale-42",
                "register_id": "reg-1",
                "line_items": []
            },
            "payment": {"amount": "12.50"}
        }"#;
        let reply: HostReply = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.sale_id(), "sale-42");
    }

    #[test]
    fn test_reply_requires_sale_id() {
        assert!(serde_json::from_str::<HostReply>(r#"{"register_sale":{}}"#).is_err());
        assert!(serde_json::from_str::<HostReply>(r#"{"step":"DATA"}"#).is_err());
    }
}
