//! Settlement gateway client (bridge → payment backend).
//!
//! Both operations are single-shot: nothing is retried here, the cashier
//! retries by starting a new attempt.

use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::objects::settlement::{GatewayResponse, PayRequest, RefundRequest};

const PAY_PATH: &str = "/pay";
const REFUND_PATH: &str = "/refund";

/// Typed HTTP client for the settlement gateway.
///
/// Requests are sent form-encoded, the way the gateway's browser-facing
/// handlers expect them; responses are JSON [`GatewayResponse`] bodies.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a new `GatewayClient`.
    ///
    /// * `base_url` – root URL of the gateway (e.g. `https://pay.example.com`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /pay` – settle a sale.
    pub async fn submit_payment(
        &self,
        request: &PayRequest,
    ) -> Result<GatewayResponse, ClientError> {
        let url = self.base_url.join(PAY_PATH)?;

        let resp = self.http.post(url).form(request).send().await?;

        parse_response(resp).await
    }

    /// `POST /refund` – refund a previously settled sale.
    pub async fn submit_refund(
        &self,
        request: &RefundRequest,
    ) -> Result<GatewayResponse, ClientError> {
        let url = self.base_url.join(REFUND_PATH)?;

        let resp = self.http.post(url).form(request).send().await?;

        parse_response(resp).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StatusCode;
    use crate::objects::settlement::GatewayStatus;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// What the stub gateway saw on the wire.
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
    }

    /// Accept one connection, record the request, answer with `status`
    /// and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = Url::parse(&format!("http://{addr}")).unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers ended");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = find_header_end(&buf) {
                    break end;
                }
            };

            let head = String::from_utf8(buf[..header_end].to_vec()).unwrap();
            let mut lines = head.split("\r\n").filter(|line| !line.is_empty());
            let request_line = lines.next().unwrap().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .collect();
            let content_length: usize = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .map(|(_, value)| value.parse().unwrap())
                .unwrap_or(0);

            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body ended");
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_body =
                String::from_utf8(buf[header_end..header_end + content_length].to_vec()).unwrap();

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            Captured {
                request_line,
                headers,
                body: request_body,
            }
        });

        (base_url, handle)
    }

    /// Talks to the local stub directly, whatever proxy the environment sets.
    fn stub_client(base_url: Url) -> GatewayClient {
        let http = Client::builder().no_proxy().build().unwrap();
        GatewayClient::new(base_url).with_http_client(http)
    }

    fn pay_request() -> PayRequest {
        PayRequest {
            amount: Some("25.00".to_string()),
            origin: None,
            register_id: Some("reg-1".to_string()),
            sale_id: "sale-1".to_string(),
            paymentcode: "1234".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_payment_posts_form_to_pay() {
        let (base_url, server) = serve_once("200 OK", r#"{"status":"ACCEPTED","id":"tx-9"}"#).await;
        let client = stub_client(base_url);

        let response = client.submit_payment(&pay_request()).await.unwrap();
        assert_eq!(response.status, GatewayStatus::Accepted);
        assert_eq!(response.id.as_deref(), Some("tx-9"));

        let captured = server.await.unwrap();
        assert_eq!(captured.request_line, "POST /pay HTTP/1.1");
        assert_eq!(
            captured.header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            captured.body,
            "amount=25.00&register_id=reg-1&sale_id=sale-1&paymentcode=1234"
        );
    }

    #[tokio::test]
    async fn test_submit_refund_posts_form_to_refund() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"status":"DECLINED","message":"already refunded"}"#).await;
        let client = stub_client(base_url);

        let request = RefundRequest {
            amount: None,
            origin: Some("https://shop.test".to_string()),
            sale_id: "sale-2".to_string(),
            register_id: None,
            purchaseno: Some("P-100".to_string()),
        };
        let response = client.submit_refund(&request).await.unwrap();
        assert_eq!(response.status, GatewayStatus::Declined);
        assert_eq!(response.message.as_deref(), Some("already refunded"));

        let captured = server.await.unwrap();
        assert_eq!(captured.request_line, "POST /refund HTTP/1.1");
        assert_eq!(
            captured.body,
            "origin=https%3A%2F%2Fshop.test&sale_id=sale-2&purchaseno=P-100"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (base_url, server) = serve_once("502 Bad Gateway", "upstream down").await;
        let client = stub_client(base_url);

        let err = client.submit_payment(&pay_request()).await.unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "upstream down");
            }
            other => unreachable!("expected api error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let (base_url, server) = serve_once("200 OK", "<html>oops</html>").await;
        let client = stub_client(base_url);

        let err = client.submit_payment(&pay_request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)), "got {err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = stub_client(Url::parse(&format!("http://{addr}")).unwrap());

        let err = client.submit_payment(&pay_request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)), "got {err:?}");
    }
}
