//! Encounter batch encoding.
//!
//! Converts stored proximity events into the wire payload for upload. Two
//! encodings exist side by side: the legacy v1 shape carries per-sample
//! offsets in whole seconds since the encounter start, the current v2 shape
//! carries absolute per-sample timestamps. The active encoding is a
//! deployment-time configuration choice.
//!
//! Encoding is pure and deterministic: it never touches the store, and the
//! same input sequence always yields byte-identical output. Remote
//! identifiers are base64-encoded as stored; they arrive already encrypted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::config::EncodingVersion;
use crate::events::ProximityEvent;
use crate::keystore::Registration;

/// UTC ISO-8601 with second precision, the wire timestamp format.
const WIRE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A wire-ready batch of encoded encounters. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    /// The uploading resident's registration id.
    pub resident_id: uuid::Uuid,

    /// Encoding the batch was built with.
    pub version: EncodingVersion,

    /// Encoded events, one JSON object per encounter.
    pub events: Vec<Value>,
}

impl EncodedBatch {
    /// Render the upload request body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "residentId": self.resident_id.to_string(),
            "contactEvents": self.events,
        })
    }

    /// Whether the batch carries no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Encode a batch of events for the given resident.
#[must_use]
pub fn encode_batch(
    events: &[ProximityEvent],
    registration: &Registration,
    version: EncodingVersion,
) -> EncodedBatch {
    let events = events
        .iter()
        .map(|event| match version {
            EncodingVersion::V1 => encode_v1(event),
            EncodingVersion::V2 => encode_v2(event),
        })
        .collect();
    EncodedBatch {
        resident_id: registration.id,
        version,
        events,
    }
}

fn encode_v1(event: &ProximityEvent) -> Value {
    let offsets: Vec<i64> = event
        .rssi_timestamps
        .iter()
        .map(|ts| offset_seconds(event.first_seen, *ts))
        .collect();
    json!({
        "encryptedRemoteContactId": STANDARD.encode(&event.remote_id),
        "rssiValues": event.rssi_values,
        "rssiOffsets": offsets,
        "timestamp": wire_time(event.first_seen),
        "duration": event.duration_secs,
    })
}

fn encode_v2(event: &ProximityEvent) -> Value {
    let timestamps: Vec<String> = event.rssi_timestamps.iter().map(|ts| wire_time(*ts)).collect();
    json!({
        "encryptedRemoteContactId": STANDARD.encode(&event.remote_id),
        "rssiValues": event.rssi_values,
        "rssiTimestamps": timestamps,
        "timestamp": wire_time(event.first_seen),
        "duration": event.duration_secs,
    })
}

/// Whole seconds from encounter start to the sample, rounded, never negative.
fn offset_seconds(first_seen: DateTime<Utc>, sample: DateTime<Utc>) -> i64 {
    let millis = (sample - first_seen).num_milliseconds();
    ((millis + 500).div_euclid(1000)).max(0)
}

fn wire_time(ts: DateTime<Utc>) -> String {
    ts.format(WIRE_TIME_FORMAT).to_string()
}
