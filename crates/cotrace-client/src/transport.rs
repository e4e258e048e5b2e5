//! HTTP transport abstraction.
//!
//! The APIs talk to the backend through [`HttpTransport`] so tests can run
//! against a recording mock instead of a live server. The production
//! implementation is a thin wrapper over `reqwest` with a fixed request
//! timeout; transport-level timeout is the only cancellation mechanism for
//! in-flight calls.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::error::{ClientError, Result};

/// HTTP method used by the backend contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Create or announce.
    Post,
    /// Partial update.
    Patch,
}

/// One backend request: method, absolute URL, and a JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute endpoint URL.
    pub url: Url,
    /// JSON request body.
    pub body: Value,
}

/// Join a relative endpoint path onto a base URL.
///
/// Keeps any path prefix the base carries (for example a reverse-proxy
/// mount point such as `https://host/sonar`), with or without a trailing
/// slash.
///
/// # Errors
///
/// Returns an error when the combined URL cannot be parsed.
pub(crate) fn join_endpoint(base: &Url, path: &str) -> Result<Url> {
    if base.path().ends_with('/') {
        Ok(base.join(path)?)
    } else {
        let mut base = base.clone();
        base.set_path(&format!("{}/", base.path()));
        Ok(base.join(path)?)
    }
}

/// Asynchronous JSON-over-HTTP transport.
pub trait HttpTransport: Send + Sync {
    /// Send one request and return the parsed response body.
    ///
    /// An empty success body is returned as [`Value::Null`].
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value>> + Send;
}

impl<T: HttpTransport> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        (**self).send(request).await
    }
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the default 15 second timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the underlying client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(15))
    }

    /// Build a transport with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the underlying client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let builder = match request.method {
            HttpMethod::Post => self.client.post(request.url),
            HttpMethod::Patch => self.client.patch(request.url),
        };
        let response = builder.json(&request.body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::MalformedResponse {
            reason: format!("response is not valid JSON: {e}"),
        })
    }
}

#[cfg(any(test, feature = "mock-transport"))]
pub mod mock {
    //! Recording transport for tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::Value;

    use super::{ApiRequest, HttpTransport};
    use crate::error::{ClientError, Result};

    /// Transport that records requests and replays queued responses.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<Result<Value>>>,
    }

    impl MockTransport {
        /// Create an empty mock.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a success response body.
        pub fn queue_success(&self, body: Value) {
            self.responses.lock().unwrap().push_back(Ok(body));
        }

        /// Queue an error outcome.
        pub fn queue_error(&self, error: ClientError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        /// All requests sent so far, in order.
        #[must_use]
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// The most recent request, if any.
        #[must_use]
        pub fn last_request(&self) -> Option<ApiRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    impl HttpTransport for MockTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ClientError::Transport("no queued response".to_string()))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use serde_json::json;

    fn request() -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Post,
            url: Url::parse("http://api.example.com/api/devices").unwrap(),
            body: json!({"pushToken": "token"}),
        }
    }

    #[test]
    fn test_join_endpoint_preserves_base_path_prefix() {
        let base = Url::parse("http://api.example.com/sonar").unwrap();
        let url = join_endpoint(&base, "api/devices").unwrap();
        assert_eq!(url.as_str(), "http://api.example.com/sonar/api/devices");

        let base = Url::parse("http://api.example.com/sonar/").unwrap();
        let url = join_endpoint(&base, "api/devices").unwrap();
        assert_eq!(url.as_str(), "http://api.example.com/sonar/api/devices");
    }

    #[test]
    fn test_join_endpoint_on_origin_only_base() {
        let base = Url::parse("http://api.example.com").unwrap();
        let url = join_endpoint(&base, "api/devices/registrations").unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.example.com/api/devices/registrations"
        );
    }

    #[tokio::test]
    async fn test_mock_replays_queued_responses_in_order() {
        let mock = MockTransport::new();
        mock.queue_success(json!({"first": true}));
        mock.queue_error(ClientError::UnexpectedStatus { status: 500 });

        assert_eq!(mock.send(request()).await.unwrap(), json!({"first": true}));
        assert!(matches!(
            mock.send(request()).await.unwrap_err(),
            ClientError::UnexpectedStatus { status: 500 }
        ));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockTransport::new();
        mock.queue_success(Value::Null);
        mock.send(request()).await.unwrap();

        let recorded = mock.last_request().unwrap();
        assert_eq!(recorded.method, HttpMethod::Post);
        assert_eq!(recorded.body["pushToken"], "token");
    }

    #[tokio::test]
    async fn test_mock_without_queue_fails_as_transport_error() {
        let mock = MockTransport::new();
        assert!(matches!(
            mock.send(request()).await.unwrap_err(),
            ClientError::Transport(_)
        ));
    }
}
