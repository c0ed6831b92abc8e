//! Event ingestion and normalization.
//!
//! Producers send loosely-shaped JSON (camera pipelines, access control,
//! manual reports), so the wire type [`RawEvent`] accepts several field
//! spellings and keeps everything it does not recognize. [`Event`] is the
//! canonical form the matching engine consumes.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoutingError;
use crate::rule::Priority;

// ============================================================================
// Wire type
// ============================================================================

/// An event exactly as submitted, before normalization. Every field is
/// optional; unknown fields are preserved in `raw_data` for downstream
/// consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    /// Producer-supplied id. Generated when absent.
    #[serde(default, alias = "event_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    /// Primary classification of what happened.
    #[serde(default, rename = "type", alias = "event_type", alias = "detection_name")]
    pub event_type: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// RFC 3339 timestamp. Falls back to receipt time when absent or
    /// unparseable.
    #[serde(default, alias = "creation_time")]
    pub timestamp: Option<String>,

    /// Free-form severity hint ("High", "critical", ...).
    #[serde(default, alias = "severity_hint")]
    pub severity: Option<String>,

    /// Detector confidence, either a fraction in [0, 1] or a percentage.
    #[serde(default, alias = "raw_confidence")]
    pub confidence: Option<f64>,

    /// Everything else the producer sent.
    #[serde(flatten)]
    pub raw_data: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Canonical event
// ============================================================================

/// A normalized event, ready for predicate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_id: String,
    pub source: String,
    pub event_type: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    /// Parsed severity hint; may escalate the matched rule's priority.
    pub severity_hint: Option<Priority>,
    /// Detector confidence normalized to [0.0, 1.0].
    pub raw_confidence: f64,
    /// Unrecognized producer fields, carried through untouched.
    pub raw_data: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Normalize a raw submission into the canonical form.
    ///
    /// Fails only when the event is unroutable: both `event_type` and
    /// `location` absent or empty. Every other gap gets a defined default
    /// (source "unknown", receipt-time timestamp, confidence 1.0).
    pub fn normalize(raw: RawEvent) -> Result<Event, RoutingError> {
        let event_type = raw.event_type.unwrap_or_default().trim().to_string();
        let location = raw.location.unwrap_or_default().trim().to_string();
        if event_type.is_empty() && location.is_empty() {
            return Err(RoutingError::MalformedEvent {
                reason: "event has neither a type nor a location".to_string(),
            });
        }

        let event_id = match raw.id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => generate_event_id(),
        };

        let source = raw
            .source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let timestamp = raw
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let severity_hint = raw.severity.as_deref().and_then(Priority::from_hint);

        let confidence_field = raw.confidence.or_else(|| {
            raw.raw_data.get("confidence").and_then(serde_json::Value::as_f64)
        });
        let raw_confidence = normalize_confidence(confidence_field);

        Ok(Event {
            event_id,
            source,
            event_type,
            location,
            timestamp,
            severity_hint,
            raw_confidence,
            raw_data: raw.raw_data,
        })
    }

    /// Hour of day (0..=23, UTC) used by time-window predicates.
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Fresh id in the producer convention: `evt_` + 8 hex chars.
pub fn generate_event_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("evt_{}", &uuid[..8])
}

/// Map producer confidence onto [0.0, 1.0]. Values in (1, 100] are treated
/// as percentages; missing or non-finite values default to full confidence.
fn normalize_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => {
            let fraction = if v > 1.0 && v <= 100.0 { v / 100.0 } else { v };
            fraction.clamp(0.0, 1.0)
        }
        _ => 1.0,
    }
}
