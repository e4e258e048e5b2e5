//! Scheduled upload and retention cycles.
//!
//! One upload cycle snapshots the ledger, encodes it with the configured
//! wire version, and submits it. The ledger is cleared only after the
//! upload succeeded: a transient failure leaves every unconfirmed event in
//! place for the next scheduled cycle.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use cotrace_client::{ColocationApi, HttpTransport};
use cotrace_core::{encode_batch, EncodingVersion, EventStore, KeyStore};

use crate::error::AgentError;

/// What one upload cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A batch of this many events was uploaded and the ledger cleared.
    Uploaded(usize),
    /// The ledger was empty; nothing was sent.
    NothingToUpload,
    /// The device has no registration yet; nothing was sent.
    NotRegistered,
}

/// Runs upload cycles against one event store.
pub struct Uploader<'a, T> {
    events: &'a EventStore,
    keys: &'a KeyStore,
    api: &'a ColocationApi<T>,
    encoding: EncodingVersion,
}

impl<'a, T: HttpTransport> Uploader<'a, T> {
    /// Wire an uploader to its collaborators.
    pub fn new(
        events: &'a EventStore,
        keys: &'a KeyStore,
        api: &'a ColocationApi<T>,
        encoding: EncodingVersion,
    ) -> Self {
        Self {
            events,
            keys,
            api,
            encoding,
        }
    }

    /// Run one upload cycle.
    ///
    /// # Errors
    ///
    /// Propagates store errors and upload transport errors. On an upload
    /// error the ledger is left untouched.
    pub async fn run_once(&self) -> Result<UploadOutcome, AgentError> {
        let Some(registration) = self.keys.get_registration()? else {
            warn!("skipping upload: device is not registered");
            return Ok(UploadOutcome::NotRegistered);
        };

        let snapshot = self.events.get_all()?;
        if snapshot.is_empty() {
            debug!("skipping upload: no recorded encounters");
            return Ok(UploadOutcome::NothingToUpload);
        }

        let batch = encode_batch(&snapshot, &registration, self.encoding);
        self.api.upload(&batch).await?;

        // Clearing is safe only now that the upload is confirmed.
        self.events.clear()?;
        info!(events = snapshot.len(), "uploaded and cleared encounter batch");
        Ok(UploadOutcome::Uploaded(snapshot.len()))
    }
}

/// Run one retention eviction cycle.
///
/// # Errors
///
/// Propagates store errors.
pub fn run_eviction(
    events: &EventStore,
    retention_window: Duration,
    now: DateTime<Utc>,
) -> Result<(), AgentError> {
    events.evict_older_than(retention_window, now)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::Value;
    use url::Url;

    use cotrace_client::{ClientError, MockTransport};
    use cotrace_core::{ProximityEvent, Registration, Storage};

    struct Fixture {
        _dir: tempfile::TempDir,
        events: EventStore,
        keys: KeyStore,
        api: ColocationApi<Arc<MockTransport>>,
        transport: Arc<MockTransport>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        let events = EventStore::open(storage.clone()).unwrap();
        let keys = KeyStore::open(storage).unwrap();
        let transport = Arc::new(MockTransport::new());
        let api = ColocationApi::new(
            Url::parse("http://api.example.com").unwrap(),
            Arc::clone(&transport),
        );
        Fixture {
            _dir: dir,
            events,
            keys,
            api,
            transport,
        }
    }

    fn record_event(events: &EventStore) {
        let first_seen = Utc.with_ymd_and_hms(2026, 8, 20, 14, 0, 0).unwrap();
        events
            .record_or_update(
                ProximityEvent::new(vec![0x01], vec![-62], vec![first_seen], first_seen, 0)
                    .unwrap(),
            )
            .unwrap();
    }

    fn register(keys: &KeyStore) {
        keys.put_registration(Registration::new(uuid::Uuid::from_u128(9)))
            .unwrap();
    }

    #[tokio::test]
    async fn test_successful_upload_clears_store() {
        let f = fixture();
        register(&f.keys);
        record_event(&f.events);
        f.transport.queue_success(Value::Null);

        let uploader = Uploader::new(&f.events, &f.keys, &f.api, EncodingVersion::V2);
        let outcome = uploader.run_once().await.unwrap();

        assert_eq!(outcome, UploadOutcome::Uploaded(1));
        assert!(f.events.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_store_untouched() {
        let f = fixture();
        register(&f.keys);
        record_event(&f.events);
        f.transport
            .queue_error(ClientError::Transport("backend unreachable".to_string()));

        let uploader = Uploader::new(&f.events, &f.keys, &f.api, EncodingVersion::V2);
        let err = uploader.run_once().await.unwrap_err();

        assert!(matches!(err, AgentError::Client(_)));
        assert_eq!(f.events.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_ledger_skips_upload() {
        let f = fixture();
        register(&f.keys);

        let uploader = Uploader::new(&f.events, &f.keys, &f.api, EncodingVersion::V2);
        let outcome = uploader.run_once().await.unwrap();

        assert_eq!(outcome, UploadOutcome::NothingToUpload);
        assert!(f.transport.last_request().is_none());
    }

    #[tokio::test]
    async fn test_unregistered_device_skips_upload() {
        let f = fixture();
        record_event(&f.events);

        let uploader = Uploader::new(&f.events, &f.keys, &f.api, EncodingVersion::V2);
        let outcome = uploader.run_once().await.unwrap();

        assert_eq!(outcome, UploadOutcome::NotRegistered);
        assert!(f.transport.last_request().is_none());
        assert_eq!(f.events.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_eviction_cycle_prunes_outdated_events() {
        let f = fixture();
        let now = Utc.with_ymd_and_hms(2026, 9, 30, 0, 0, 0).unwrap();
        let old_seen = now - Duration::days(40);
        f.events
            .record_or_update(
                ProximityEvent::new(vec![0x02], vec![-70], vec![old_seen], old_seen, 0).unwrap(),
            )
            .unwrap();

        run_eviction(&f.events, Duration::days(30), now).unwrap();
        assert!(f.events.is_empty().unwrap());
    }
}
