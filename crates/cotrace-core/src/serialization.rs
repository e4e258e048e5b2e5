//! User state persistence codec.
//!
//! Serializes the current [`UserState`] to a single JSON text blob for
//! cross-restart continuity: a variant tag, `until` as epoch milliseconds,
//! and for the symptomatic state an ordered list of canonical symptom
//! names.
//!
//! Decoding an unrecognized tag or malformed payload fails loudly with a
//! deserialization error. A silent fall-back to the default state would
//! mask data corruption.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::error::{CoreError, Result};
use crate::status::{Symptom, UserState};

const TAG_DEFAULT: &str = "Default";
const TAG_EXPOSED: &str = "Exposed";
const TAG_SYMPTOMATIC: &str = "Symptomatic";
const TAG_RECOVERY: &str = "Recovery";

/// Serialize a state to its durable text form.
#[must_use]
pub fn serialize(state: &UserState) -> String {
    let value = match state {
        UserState::Default { until } => json!({
            "type": TAG_DEFAULT,
            "until": until.timestamp_millis(),
        }),
        UserState::Exposed { until } => json!({
            "type": TAG_EXPOSED,
            "until": until.timestamp_millis(),
        }),
        UserState::Symptomatic { until, symptoms } => json!({
            "type": TAG_SYMPTOMATIC,
            "until": until.timestamp_millis(),
            "symptoms": symptoms
                .iter()
                .map(|s| s.canonical_name())
                .collect::<Vec<_>>(),
        }),
        UserState::Recovery { until } => json!({
            "type": TAG_RECOVERY,
            "until": until.timestamp_millis(),
        }),
    };
    value.to_string()
}

/// Decode a state from its durable text form.
///
/// # Errors
///
/// Returns [`CoreError::Deserialization`] on malformed JSON, an
/// unrecognized tag, a missing or malformed field, an unknown symptom
/// name, or an empty symptom list on the symptomatic state.
pub fn deserialize(text: &str) -> Result<UserState> {
    let value: Value = serde_json::from_str(text).map_err(|e| CoreError::Deserialization {
        reason: format!("user state is not valid JSON: {e}"),
    })?;

    let tag = require_str(&value, "type")?;
    let until = parse_until(&value)?;

    match tag {
        TAG_DEFAULT => Ok(UserState::Default { until }),
        TAG_EXPOSED => Ok(UserState::Exposed { until }),
        TAG_SYMPTOMATIC => Ok(UserState::Symptomatic {
            until,
            symptoms: parse_symptoms(&value)?,
        }),
        TAG_RECOVERY => Ok(UserState::Recovery { until }),
        other => Err(CoreError::Deserialization {
            reason: format!("unknown state tag '{other}'"),
        }),
    }
}

fn require_str<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::Deserialization {
            reason: format!("missing or non-string field '{field}'"),
        })
}

fn parse_until(value: &Value) -> Result<DateTime<Utc>> {
    let millis = value
        .get("until")
        .and_then(Value::as_i64)
        .ok_or_else(|| CoreError::Deserialization {
            reason: "missing or non-integer field 'until'".to_string(),
        })?;
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| CoreError::Deserialization {
        reason: format!("'until' is out of range: {millis}"),
    })
}

fn parse_symptoms(value: &Value) -> Result<BTreeSet<Symptom>> {
    let names = value
        .get("symptoms")
        .and_then(Value::as_array)
        .ok_or_else(|| CoreError::Deserialization {
            reason: "missing or non-array field 'symptoms'".to_string(),
        })?;

    let mut symptoms = BTreeSet::new();
    for name in names {
        let name = name.as_str().ok_or_else(|| CoreError::Deserialization {
            reason: "symptom entries must be strings".to_string(),
        })?;
        let symptom =
            Symptom::from_canonical_name(name).ok_or_else(|| CoreError::Deserialization {
                reason: format!("unknown symptom '{name}'"),
            })?;
        symptoms.insert(symptom);
    }

    if symptoms.is_empty() {
        return Err(CoreError::Deserialization {
            reason: "symptomatic state carries no symptoms".to_string(),
        });
    }
    Ok(symptoms)
}
