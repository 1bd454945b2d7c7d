//! Recent alert events shown under the dashboard.

use std::collections::VecDeque;

use serde_json::Value as Json;
use sflow_types::Metadata;

/// Detector state carried by an event's `is` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStatus {
    /// Back to normal.
    Ok,
    /// Anything else (`anomalous`, `too high`, ...), kept verbatim.
    Triggered(String),
}

impl EventStatus {
    fn from_property(value: Option<&str>) -> Self {
        match value {
            Some("ok") => EventStatus::Ok,
            Some(other) => EventStatus::Triggered(other.to_string()),
            None => EventStatus::Triggered(String::new()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, EventStatus::Ok)
    }
}

/// An event, with its input identifiers already resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp_ms: i64,
    pub incident_id: String,
    pub status: EventStatus,
    /// `(input identifier, source)` pairs.
    pub sources: Vec<(String, String)>,
    /// `(input identifier, value)` pairs.
    pub values: Vec<(String, String)>,
}

impl EventRecord {
    /// Builds a record from an event message's properties.
    ///
    /// `series_metadata` is the metadata of the event's series; its
    /// `sf_detectInputContexts` maps input keys to readable identifiers.
    /// Unknown keys are shown as-is.
    pub fn from_properties(
        timestamp_ms: i64,
        properties: &Metadata,
        series_metadata: Option<&Metadata>,
    ) -> Self {
        let contexts = series_metadata
            .and_then(|m| m.get("sf_detectInputContexts"))
            .and_then(maybe_json)
            .unwrap_or_default();

        let identifier = |key: &str| -> String {
            contexts
                .get(key)
                .and_then(|c| c.get("identifier"))
                .and_then(Json::as_str)
                .unwrap_or(key)
                .to_string()
        };

        let pairs = |name: &str| -> Vec<(String, String)> {
            properties
                .get(name)
                .and_then(maybe_json)
                .map(|map| {
                    map.iter()
                        .map(|(k, v)| (identifier(k), plain(v)))
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            timestamp_ms,
            incident_id: properties
                .get("incidentId")
                .map(plain)
                .unwrap_or_default(),
            status: EventStatus::from_property(properties.get("is").and_then(Json::as_str)),
            sources: pairs("inputSources"),
            values: pairs("inputValues"),
        }
    }
}

/// Object properties may arrive either inline or as a JSON-encoded string.
fn maybe_json(value: &Json) -> Option<Metadata> {
    match value {
        Json::Object(map) => Some(map.clone()),
        Json::String(s) => serde_json::from_str::<Json>(s)
            .ok()
            .and_then(|v| v.as_object().cloned()),
        _ => None,
    }
}

fn plain(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bounded list of the most recent events, newest first.
///
/// Inserting into a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct EventRingBuffer {
    capacity: usize,
    records: VecDeque<EventRecord>,
}

impl EventRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, record: EventRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    /// Records, newest first.
    pub fn all(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
