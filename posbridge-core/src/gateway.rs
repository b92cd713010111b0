//! Settlement seam between the coordinator and the payment backend.

use async_trait::async_trait;
use posbridge_sdk::client::{ClientError, GatewayClient};
use posbridge_sdk::objects::{GatewayResponse, PayRequest, RefundRequest, SettlementRequest};
use thiserror::Error;

/// Failures that prevent a gateway response from being obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never completed (connection, DNS, TLS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The gateway answered with a non-success HTTP status.
    #[error("gateway rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body was not a valid gateway response.
    #[error("malformed gateway response: {0}")]
    Decode(String),

    /// The settlement task ended before producing a response.
    #[error("settlement aborted: {0}")]
    Aborted(String),
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) if e.is_decode() => GatewayError::Decode(e.to_string()),
            ClientError::Http(e) => GatewayError::Transport(e.to_string()),
            ClientError::Api { status, body } => GatewayError::Rejected {
                status: status.as_u16(),
                body,
            },
            ClientError::Json(e) => GatewayError::Decode(e.to_string()),
            ClientError::Url(e) => GatewayError::Transport(e.to_string()),
        }
    }
}

/// The two settlement operations.
///
/// Calls are single-shot and not idempotent from the caller's side: an
/// implementation must not retry on its own.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    async fn submit_payment(&self, request: PayRequest) -> Result<GatewayResponse, GatewayError>;
    async fn submit_refund(&self, request: RefundRequest)
    -> Result<GatewayResponse, GatewayError>;
}

/// Dispatch a composed request to the matching operation.
pub async fn submit(
    gateway: &dyn SettlementGateway,
    request: SettlementRequest,
) -> Result<GatewayResponse, GatewayError> {
    match request {
        SettlementRequest::Pay(req) => gateway.submit_payment(req).await,
        SettlementRequest::Refund(req) => gateway.submit_refund(req).await,
    }
}

#[async_trait]
impl SettlementGateway for GatewayClient {
    async fn submit_payment(&self, request: PayRequest) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayClient::submit_payment(self, &request).await?)
    }

    async fn submit_refund(
        &self,
        request: RefundRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        Ok(GatewayClient::submit_refund(self, &request).await?)
    }
}
