//! Scripted computation used by unit tests.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use serde_json::json;
use sflow_types::{ComputationMessage, Metadata, SeriesId, Value};

use crate::core::computation::Computation;
use crate::error::SessionError;

pub enum Step {
    Message(ComputationMessage),
    Fail(&'static str),
}

/// Serves a fixed list of messages and counts `close()` calls.
pub struct ScriptedComputation {
    steps: VecDeque<Step>,
    metadata: HashMap<SeriesId, Metadata>,
    known: Vec<SeriesId>,
    last_ts: Option<i64>,
    resolution: Option<i64>,
    pub closes: Rc<Cell<u32>>,
}

impl ScriptedComputation {
    pub fn new(messages: Vec<ComputationMessage>) -> Self {
        Self {
            steps: messages.into_iter().map(Step::Message).collect(),
            metadata: HashMap::new(),
            known: Vec::new(),
            last_ts: None,
            resolution: Some(1000),
            closes: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_failure(mut self, reason: &'static str) -> Self {
        self.steps.push_back(Step::Fail(reason));
        self
    }

    /// Registers metric metadata so `id` is named `metric`.
    pub fn with_metric(mut self, id: &str, metric: &str) -> Self {
        let meta = json!({"sf_type": "MetricTimeSeries", "sf_metric": metric, "sf_key": []});
        self.add_metadata(id, meta.as_object().cloned().unwrap_or_default());
        self
    }

    pub fn with_metadata(mut self, id: &str, meta: serde_json::Value) -> Self {
        self.add_metadata(id, meta.as_object().cloned().unwrap_or_default());
        self
    }

    fn add_metadata(&mut self, id: &str, meta: Metadata) {
        let id = SeriesId::from(id);
        if !self.known.contains(&id) {
            self.known.push(id.clone());
        }
        self.metadata.insert(id, meta);
    }
}

impl Computation for ScriptedComputation {
    fn next_message(&mut self) -> Result<Option<ComputationMessage>, SessionError> {
        match self.steps.pop_front() {
            None => Ok(None),
            Some(Step::Fail(reason)) => Err(SessionError::StreamFault(reason.to_string())),
            Some(Step::Message(message)) => {
                if let ComputationMessage::Data {
                    logical_timestamp_ms,
                    ..
                } = &message
                {
                    self.last_ts = Some(*logical_timestamp_ms);
                }
                Ok(Some(message))
            }
        }
    }

    fn metadata(&self, id: &SeriesId) -> Option<&Metadata> {
        self.metadata.get(id)
    }

    fn known_series(&self) -> Vec<SeriesId> {
        self.known.clone()
    }

    fn last_logical_timestamp(&self) -> Option<i64> {
        self.last_ts
    }

    fn resolution(&self) -> Option<i64> {
        self.resolution
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

pub fn data(ts: i64, values: &[(&str, Value)]) -> ComputationMessage {
    ComputationMessage::Data {
        logical_timestamp_ms: ts,
        values: values
            .iter()
            .map(|(id, v)| (SeriesId::from(*id), *v))
            .collect(),
    }
}

pub fn event(ts: i64, series: &str, status: &str, incident: &str) -> ComputationMessage {
    let properties = json!({"is": status, "incidentId": incident});
    ComputationMessage::Event {
        timestamp_ms: ts,
        series_id: SeriesId::from(series),
        properties: properties.as_object().cloned().unwrap_or_default(),
    }
}
