//! Refresh-token redemption at the token endpoint
//!
//! `TokenExchanger` is the seam the credential manager calls through. The
//! HTTP implementation POSTs a `refresh_token` grant to the configured token
//! endpoint and maps every non-success outcome to an error; interpreting that
//! error is the caller's business.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Successful token endpoint response (RFC 6749 §5.1).
///
/// `expires_in` is a delta in seconds from the response time. Servers may omit
/// it; a missing value reads as `0`, so the token serves the current call and
/// the next lookup refreshes again. `scope` is only present when the server
/// granted something other than what was asked for; `refresh_token` only when
/// the server rotates it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

pub type ExchangeFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenResponse>> + Send + 'a>>;

/// Redeems a refresh token for a new access token.
///
/// Implementations apply their own network timeout and report a single
/// pass/fail outcome. Uses `Pin<Box<dyn Future>>` return types for
/// dyn-compatibility (`Arc<dyn TokenExchanger>`).
pub trait TokenExchanger: Send + Sync {
    fn exchange_refresh_token<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a>;
}

/// `TokenExchanger` backed by the client's token endpoint.
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    config: Arc<dyn ClientConfig>,
}

impl HttpTokenExchanger {
    pub fn new(client: reqwest::Client, config: Arc<dyn ClientConfig>) -> Self {
        Self { client, config }
    }

    /// Refresh an access token using a refresh token.
    ///
    /// Confidential clients authenticate with HTTP Basic; public clients send
    /// `client_id` in the form body.
    pub async fn refresh(&self, refresh: &str) -> Result<TokenResponse> {
        let mut form = vec![("grant_type", "refresh_token"), ("refresh_token", refresh)];
        let mut request = self.client.post(self.config.token_endpoint());
        match self.config.client_secret() {
            Some(secret) => {
                request = request.basic_auth(self.config.client_id(), Some(secret));
            }
            None => form.push(("client_id", self.config.client_id())),
        }

        debug!(endpoint = self.config.token_endpoint(), "requesting token refresh");
        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));

            // invalid_grant / invalid_client
            if status.as_u16() == 400 || status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(Error::InvalidCredentials(format!(
                    "refresh token rejected ({status}): {body}"
                )));
            }

            return Err(Error::TokenExchange(format!(
                "token refresh returned {status}: {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
    }
}

impl TokenExchanger for HttpTokenExchanger {
    fn exchange_refresh_token<'a>(&'a self, refresh_token: &'a str) -> ExchangeFuture<'a> {
        Box::pin(self.refresh(refresh_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticClientConfig;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response and hand back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/token"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn exchanger(token_endpoint: String, secret: Option<&str>) -> HttpTokenExchanger {
        let mut config = StaticClientConfig::new(
            "my-client",
            "https://auth.example.org/authorize",
            token_endpoint,
        );
        if let Some(secret) = secret {
            config = config.with_client_secret(secret);
        }
        HttpTokenExchanger::new(reqwest::Client::new(), Arc::new(config))
    }

    #[test]
    fn token_response_deserializes_optional_fields() {
        let json = r#"{"access_token":"at_abc","token_type":"Bearer","expires_in":3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);
        assert!(token.scope.is_none());
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn token_response_without_expires_in_reads_as_zero() {
        let json = r#"{"access_token":"at_abc","token_type":"Bearer","refresh_token":"rt_next"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_in, 0);
        assert_eq!(token.refresh_token.as_deref(), Some("rt_next"));
    }

    #[test]
    fn token_response_serializes_without_absent_fields() {
        let token = TokenResponse {
            access_token: "at_test".into(),
            token_type: "Bearer".into(),
            expires_in: 60,
            scope: None,
            refresh_token: Some("rt_next".into()),
        };
        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("\"refresh_token\":\"rt_next\""));
        assert!(!json.contains("scope"));
    }

    #[tokio::test]
    async fn refresh_posts_grant_with_client_id() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"access_token":"at_new","token_type":"Bearer","expires_in":3600,"refresh_token":"rt_new","scope":"read"}"#,
        )
        .await;

        let response = exchanger(url, None)
            .exchange_refresh_token("rt_old")
            .await
            .unwrap();
        assert_eq!(response.access_token, "at_new");
        assert_eq!(response.refresh_token.as_deref(), Some("rt_new"));
        assert_eq!(response.scope.as_deref(), Some("read"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /token"), "got: {request}");
        assert!(request.contains("grant_type=refresh_token"));
        assert!(request.contains("refresh_token=rt_old"));
        assert!(request.contains("client_id=my-client"));
        assert!(!request.to_ascii_lowercase().contains("authorization: basic"));
    }

    #[tokio::test]
    async fn confidential_client_uses_basic_auth() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"access_token":"at_new","token_type":"Bearer","expires_in":10}"#,
        )
        .await;

        exchanger(url, Some("s3cr3t"))
            .exchange_refresh_token("rt_old")
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.to_ascii_lowercase().contains("authorization: basic"));
        assert!(!request.contains("client_id=my-client"));
    }

    #[tokio::test]
    async fn rejected_grant_is_invalid_credentials() {
        let (url, _server) = serve_once("400 Bad Request", r#"{"error":"invalid_grant"}"#).await;
        let err = exchanger(url, None)
            .exchange_refresh_token("rt_revoked")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn server_error_is_token_exchange_error() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = exchanger(url, None)
            .exchange_refresh_token("rt_any")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_token_exchange_error() {
        let (url, _server) = serve_once("200 OK", r#"{"token_type":"Bearer"}"#).await;
        let err = exchanger(url, None)
            .exchange_refresh_token("rt_any")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn response_without_expires_in_is_accepted() {
        let (url, _server) =
            serve_once("200 OK", r#"{"access_token":"at_new","token_type":"Bearer"}"#).await;
        let response = exchanger(url, None)
            .exchange_refresh_token("rt_old")
            .await
            .unwrap();
        assert_eq!(response.access_token, "at_new");
        assert_eq!(response.expires_in, 0);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = exchanger(format!("http://{addr}/token"), None)
            .exchange_refresh_token("rt_any")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
