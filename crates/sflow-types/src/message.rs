//! Messages emitted by a running computation.
//!
//! Messages are serializable so recorded computations can be replayed from
//! JSON lines.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Value;

/// Raw series metadata as returned by the backend (`sf_type`, `sf_key`, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Opaque time series identifier, stable for the lifetime of one computation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeriesId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message from a computation's stream, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComputationMessage {
    /// The backend accepted the program and started the job.
    JobStart,

    /// Progress of the historical catch-up phase, 0 to 100.
    JobProgress { percent: u8 },

    /// A batch of values for one logical timestamp.
    Data {
        logical_timestamp_ms: i64,
        #[serde(default)]
        values: BTreeMap<SeriesId, Value>,
    },

    /// An alert/event emitted by a detector.
    Event {
        timestamp_ms: i64,
        series_id: SeriesId,
        #[serde(default)]
        properties: Metadata,
    },

    /// Any message kind this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ComputationMessage {
    /// Short kind name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ComputationMessage::JobStart => "job_start",
            ComputationMessage::JobProgress { .. } => "job_progress",
            ComputationMessage::Data { .. } => "data",
            ComputationMessage::Event { .. } => "event",
            ComputationMessage::Unknown => "unknown",
        }
    }
}
