//! Proximity event ledger.
//!
//! Records close-range encounters delivered by the BLE collaborator. Remote
//! identities arrive already encrypted; this module only stores and serves
//! the opaque bytes. The store serializes every operation behind one mutex
//! per instance, so retention eviction can never tear a concurrent
//! read/clear pair used for upload.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::storage::Storage;

/// A recorded BLE encounter with a remote device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityEvent {
    /// Encrypted remote identifier, opaque to this component.
    pub remote_id: Vec<u8>,

    /// Signal strength samples, in dBm.
    pub rssi_values: Vec<i8>,

    /// Absolute timestamp of each RSSI sample, non-decreasing.
    pub rssi_timestamps: Vec<DateTime<Utc>>,

    /// When the encounter was first observed.
    pub first_seen: DateTime<Utc>,

    /// Total encounter duration, in seconds.
    pub duration_secs: i64,
}

impl ProximityEvent {
    /// Create a new event, checking the sample invariants.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the sample series are mismatched in
    /// length, the timestamps are not non-decreasing, any sample precedes
    /// `first_seen`, or the duration is negative.
    pub fn new(
        remote_id: Vec<u8>,
        rssi_values: Vec<i8>,
        rssi_timestamps: Vec<DateTime<Utc>>,
        first_seen: DateTime<Utc>,
        duration_secs: i64,
    ) -> Result<Self> {
        let event = Self {
            remote_id,
            rssi_values,
            rssi_timestamps,
            first_seen,
            duration_secs,
        };
        event.check_invariants()?;
        Ok(event)
    }

    fn check_invariants(&self) -> Result<()> {
        if self.rssi_values.len() != self.rssi_timestamps.len() {
            return Err(CoreError::Precondition(format!(
                "sample series mismatch: {} RSSI values, {} timestamps",
                self.rssi_values.len(),
                self.rssi_timestamps.len()
            )));
        }
        if self.rssi_timestamps.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoreError::Precondition(
                "sample timestamps must be non-decreasing".to_string(),
            ));
        }
        if let Some(first_sample) = self.rssi_timestamps.first() {
            if *first_sample < self.first_seen {
                return Err(CoreError::Precondition(
                    "samples must not precede first_seen".to_string(),
                ));
            }
        }
        if self.duration_secs < 0 {
            return Err(CoreError::Precondition(
                "duration must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Append-oriented ledger of proximity events, persisted as one JSON document.
///
/// All operations are synchronous and internally serialized; callers must
/// not assume atomicity across two separate calls.
pub struct EventStore {
    storage: Storage,
    inner: Mutex<Vec<ProximityEvent>>,
}

impl EventStore {
    /// Open the store, loading any previously persisted ledger.
    pub fn open(storage: Storage) -> Result<Self> {
        let events = storage.load_events()?;
        Ok(Self {
            storage,
            inner: Mutex::new(events),
        })
    }

    /// Record a new encounter, or extend the open encounter it updates.
    ///
    /// The encounter boundary is the BLE collaborator's call: an incoming
    /// event with the same remote identifier and the same `first_seen`
    /// replaces the samples and duration of the event it extends; anything
    /// else is appended as a new encounter.
    pub fn record_or_update(&self, event: ProximityEvent) -> Result<()> {
        event.check_invariants()?;
        let mut events = self.lock()?;
        match events
            .iter_mut()
            .find(|e| e.remote_id == event.remote_id && e.first_seen == event.first_seen)
        {
            Some(existing) => *existing = event,
            None => events.push(event),
        }
        self.storage.save_events(&events)
    }

    /// Return a stable snapshot of all recorded events.
    pub fn get_all(&self) -> Result<Vec<ProximityEvent>> {
        Ok(self.lock()?.clone())
    }

    /// Drop all events. Called only after a confirmed successful upload.
    pub fn clear(&self) -> Result<()> {
        let mut events = self.lock()?;
        events.clear();
        self.storage.save_events(&events)
    }

    /// Delete events whose `first_seen` precedes `now - retention_window`.
    pub fn evict_older_than(&self, retention_window: Duration, now: DateTime<Utc>) -> Result<()> {
        let cutoff = now - retention_window;
        let mut events = self.lock()?;
        let before = events.len();
        events.retain(|e| e.first_seen >= cutoff);
        let evicted = before - events.len();
        if evicted > 0 {
            debug!(evicted, "evicted outdated proximity events");
            self.storage.save_events(&events)?;
        }
        Ok(())
    }

    /// Number of stored events.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ProximityEvent>>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Storage("event store mutex poisoned".to_string()))
    }
}
