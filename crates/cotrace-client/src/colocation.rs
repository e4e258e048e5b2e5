//! Encounter batch upload.
//!
//! Submits an encoded batch to the backend. The client reports success or
//! failure and nothing else: no retry, no backoff, no status-code
//! interpretation. Callers clear the event store only after a successful
//! upload, never preemptively.

use tracing::debug;
use url::Url;

use cotrace_core::EncodedBatch;

use crate::error::Result;
use crate::transport::{join_endpoint, ApiRequest, HttpMethod, HttpTransport};

/// Client for the encounter upload endpoint.
pub struct ColocationApi<T> {
    base_url: Url,
    transport: T,
}

impl<T: HttpTransport> ColocationApi<T> {
    /// Create a new upload client.
    pub fn new(base_url: Url, transport: T) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    /// Submit an encoded batch for the resident it was built for.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the backend is unreachable or
    /// rejects the batch. The batch is discarded either way; retrying with
    /// a freshly encoded batch is the scheduling collaborator's job.
    pub async fn upload(&self, batch: &EncodedBatch) -> Result<()> {
        let request = ApiRequest {
            method: HttpMethod::Patch,
            url: join_endpoint(
                &self.base_url,
                &format!("api/residents/{}", batch.resident_id),
            )?,
            body: batch.to_body(),
        };
        self.transport.send(request).await?;
        debug!(events = batch.events.len(), "encounter batch uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{json, Value};

    use cotrace_core::{encode_batch, EncodingVersion, ProximityEvent, Registration};

    use crate::error::ClientError;
    use crate::transport::mock::MockTransport;

    fn batch() -> EncodedBatch {
        let first_seen = chrono::DateTime::parse_from_rfc3339("2026-02-14T10:30:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let event =
            ProximityEvent::new(vec![0xAB], vec![-60], vec![first_seen], first_seen, 0).unwrap();
        encode_batch(
            &[event],
            &Registration::new(uuid::Uuid::from_u128(7)),
            EncodingVersion::V1,
        )
    }

    fn api() -> (ColocationApi<Arc<MockTransport>>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let api = ColocationApi::new(
            Url::parse("http://api.example.com").unwrap(),
            Arc::clone(&transport),
        );
        (api, transport)
    }

    #[tokio::test]
    async fn test_upload_request_shape() {
        let (api, transport) = api();
        transport.queue_success(Value::Null);

        api.upload(&batch()).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://api.example.com/api/residents/00000000-0000-0000-0000-000000000007"
        );
        assert_eq!(
            request.body["residentId"],
            "00000000-0000-0000-0000-000000000007"
        );
        assert_eq!(
            request.body["contactEvents"][0]["rssiOffsets"],
            json!([0])
        );
    }

    #[tokio::test]
    async fn test_upload_keeps_base_url_path_prefix() {
        let transport = Arc::new(MockTransport::new());
        let api = ColocationApi::new(
            Url::parse("http://api.example.com/sonar").unwrap(),
            Arc::clone(&transport),
        );
        transport.queue_success(Value::Null);

        api.upload(&batch()).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(
            request.url.as_str(),
            "http://api.example.com/sonar/api/residents/00000000-0000-0000-0000-000000000007"
        );
    }

    #[tokio::test]
    async fn test_upload_surfaces_failure() {
        let (api, transport) = api();
        transport.queue_error(ClientError::UnexpectedStatus { status: 500 });

        let err = api.upload(&batch()).await.unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStatus { status: 500 }));
    }
}
