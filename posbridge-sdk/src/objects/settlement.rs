//! Settlement requests sent to the gateway and its responses.

use serde::{Deserialize, Serialize};

/// Body of `POST /pay`.
///
/// Context fields are optional because the launch parameters may be
/// partially present; absent fields are left out of the form body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_id: Option<String>,
    pub sale_id: String,
    pub paymentcode: String,
}

/// Body of `POST /refund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub sale_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchaseno: Option<String>,
}

/// A request for one of the two settlement operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementRequest {
    Pay(PayRequest),
    Refund(RefundRequest),
}

impl SettlementRequest {
    pub fn sale_id(&self) -> &str {
        match self {
            SettlementRequest::Pay(req) => &req.sale_id,
            SettlementRequest::Refund(req) => &req.sale_id,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SettlementRequest::Pay(_) => "pay",
            SettlementRequest::Refund(_) => "refund",
        }
    }
}

/// Outcome reported by the gateway.
///
/// Statuses outside the known set are kept verbatim in [`GatewayStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayStatus {
    Accepted,
    Declined,
    Failed,
    Timeout,
    Other(String),
}

impl GatewayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Accepted => "ACCEPTED",
            GatewayStatus::Declined => "DECLINED",
            GatewayStatus::Failed => "FAILED",
            GatewayStatus::Timeout => "TIMEOUT",
            GatewayStatus::Other(s) => s,
        }
    }
}

impl From<String> for GatewayStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ACCEPTED" => GatewayStatus::Accepted,
            "DECLINED" => GatewayStatus::Declined,
            "FAILED" => GatewayStatus::Failed,
            "TIMEOUT" => GatewayStatus::Timeout,
            _ => GatewayStatus::Other(s),
        }
    }
}

impl From<GatewayStatus> for String {
    fn from(status: GatewayStatus) -> Self {
        match status {
            GatewayStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body returned by both settlement endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: GatewayStatus,
    /// Settlement identifier, present on ACCEPTED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
