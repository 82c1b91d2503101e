//! Payload sources
//!
//! The cache never talks to the network directly; it asks a
//! [`PayloadFetcher`] for the bytes behind a locator.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_runtime::logging::redact_locator;
use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;

/// Fetches the encoded payload for a locator.
///
/// Implementations report transport failures as [`FetchError`] and should
/// not apply their own timeout; the cache wraps every call in one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Bytes, FetchError>;
}

/// [`PayloadFetcher`] that issues a GET through the host [`HttpClient`].
pub struct HttpPayloadFetcher {
    client: Arc<dyn HttpClient>,
}

impl HttpPayloadFetcher {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PayloadFetcher for HttpPayloadFetcher {
    async fn fetch(&self, locator: &str) -> Result<Bytes, FetchError> {
        let redacted = redact_locator(locator);
        debug!(locator = %redacted, "Fetching payload");

        let response = self
            .client
            .execute(HttpRequest::get(locator))
            .await
            .map_err(|e| FetchError::Network {
                locator: redacted.clone(),
                message: bridge_message(e),
            })?;

        if !response.is_success() {
            return Err(FetchError::Status {
                locator: redacted,
                status: response.status,
            });
        }

        if response.body.is_empty() {
            return Err(FetchError::EmptyPayload { locator: redacted });
        }

        Ok(response.body)
    }
}

fn bridge_message(error: BridgeError) -> String {
    match error {
        BridgeError::OperationFailed(message) | BridgeError::NotAvailable(message) => message,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use std::collections::HashMap;

    struct CannedHttp {
        status: u16,
        body: &'static [u8],
    }

    #[async_trait]
    impl HttpClient for CannedHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from_static(self.body),
            })
        }
    }

    struct OfflineHttp;

    #[async_trait]
    impl HttpClient for OfflineHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::OperationFailed("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let fetcher = HttpPayloadFetcher::new(Arc::new(CannedHttp {
            status: 200,
            body: b"ID3\x04",
        }));

        let bytes = fetcher.fetch("https://cdn.example/a.mp3").await.unwrap();
        assert_eq!(bytes.as_ref(), b"ID3\x04");
    }

    #[tokio::test]
    async fn test_status_error_uses_redacted_locator() {
        let fetcher = HttpPayloadFetcher::new(Arc::new(CannedHttp {
            status: 404,
            body: b"",
        }));

        let error = fetcher
            .fetch("https://cdn.example/music/a.mp3?sig=secret")
            .await
            .unwrap_err();
        match error {
            FetchError::Status { locator, status } => {
                assert_eq!(status, 404);
                assert!(!locator.contains("secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_an_error() {
        let fetcher = HttpPayloadFetcher::new(Arc::new(CannedHttp {
            status: 200,
            body: b"",
        }));

        assert!(matches!(
            fetcher.fetch("a.mp3").await,
            Err(FetchError::EmptyPayload { .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let fetcher = HttpPayloadFetcher::new(Arc::new(OfflineHttp));

        match fetcher.fetch("a.mp3").await {
            Err(FetchError::Network { message, .. }) => {
                assert_eq!(message, "connection refused")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
