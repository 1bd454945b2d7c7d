//! Replays a recorded computation from a JSON-lines transcript.
//!
//! Each line is one record with a `type` field. Besides the computation
//! messages themselves (`job_start`, `job_progress`, `data`, `event`), a
//! transcript may carry:
//!
//! - `{"type":"metadata","series_id":..,"properties":{..}}` series metadata
//! - `{"type":"resolution","resolution_ms":..}` the compute resolution
//! - `{"type":"rejected","code":..,"message":..}` as the first record, to
//!   make the execution request itself fail
//! - `{"type":"failed","message":..}` a mid-stream computation failure
//!
//! Records of any other type replay as [`ComputationMessage::Unknown`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value as Json;
use sflow_types::{ComputationMessage, Metadata, SeriesId};
use tracing::{debug, warn};

use crate::core::computation::{Computation, ExecParams, Executor};
use crate::core::interrupt;
use crate::error::{ExecutionError, SessionError};

#[derive(Debug, Deserialize)]
struct MetadataRecord {
    series_id: SeriesId,
    #[serde(default)]
    properties: Metadata,
}

#[derive(Debug, Deserialize)]
struct ResolutionRecord {
    resolution_ms: i64,
}

#[derive(Debug, Default, Deserialize)]
struct FailureRecord {
    code: Option<i32>,
    message: Option<String>,
}

/// Longest uninterrupted sleep while pacing, so Ctrl+C is noticed promptly.
const PACE_SLICE: Duration = Duration::from_millis(50);

/// Starts computations by replaying a transcript file.
#[derive(Debug, Clone)]
pub struct ReplayExecutor {
    path: PathBuf,
    realtime: bool,
}

impl ReplayExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            realtime: false,
        }
    }

    /// Waits one resolution between data batches, like a live stream would.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

impl Executor for ReplayExecutor {
    type Computation = ReplayComputation<BufReader<File>>;

    fn execute(
        &self,
        program: &str,
        params: &ExecParams,
    ) -> Result<Self::Computation, ExecutionError> {
        if program.trim().is_empty() {
            return Err(ExecutionError::with_message("program is empty"));
        }
        debug!(path = %self.path.display(), ?params, "replaying computation");

        let file = File::open(&self.path).map_err(|e| {
            ExecutionError::with_message(format!(
                "cannot open transcript {}: {e}",
                self.path.display()
            ))
        })?;
        ReplayComputation::start(BufReader::new(file), self.realtime)
    }
}

/// A computation served from a transcript.
pub struct ReplayComputation<R: BufRead> {
    lines: Lines<R>,
    pending: Option<String>,
    line_no: usize,
    metadata: HashMap<SeriesId, Metadata>,
    known: Vec<SeriesId>,
    last_logical_ts: Option<i64>,
    resolution: Option<i64>,
    realtime: bool,
    seen_data: bool,
    closed: bool,
}

impl<R: BufRead> ReplayComputation<R> {
    /// Reads up to the first record to decide whether the request was accepted.
    ///
    /// # Errors
    /// Returns an [`ExecutionError`] if the transcript starts with a
    /// `rejected` record or cannot be read.
    pub fn start(reader: R, realtime: bool) -> Result<Self, ExecutionError> {
        let mut computation = Self {
            lines: reader.lines(),
            pending: None,
            line_no: 0,
            metadata: HashMap::new(),
            known: Vec::new(),
            last_logical_ts: None,
            resolution: None,
            realtime,
            seen_data: false,
            closed: false,
        };

        let first = computation
            .next_line()
            .map_err(|e| ExecutionError::with_message(e.to_string()))?;
        if let Some(line) = first {
            if let Ok(record) = serde_json::from_str::<Json>(&line)
                && record.get("type").and_then(Json::as_str) == Some("rejected")
            {
                let failure: FailureRecord = serde_json::from_value(record).unwrap_or_default();
                return Err(ExecutionError {
                    code: failure.code,
                    message: failure.message,
                });
            }
            computation.pending = Some(line);
        }
        Ok(computation)
    }

    /// Next non-blank line, or `None` at end of input.
    fn next_line(&mut self) -> Result<Option<String>, SessionError> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn fault(&self, reason: impl std::fmt::Display) -> SessionError {
        SessionError::StreamFault(format!("transcript line {}: {reason}", self.line_no))
    }

    fn pace(&mut self) {
        if self.realtime && self.seen_data {
            if let Some(ms) = self.resolution.filter(|ms| *ms > 0) {
                let deadline = Instant::now() + Duration::from_millis(ms.unsigned_abs());
                while !interrupt::is_interrupted() {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        break;
                    }
                    thread::sleep(left.min(PACE_SLICE));
                }
            }
        }
        self.seen_data = true;
    }
}

impl<R: BufRead> Computation for ReplayComputation<R> {
    fn next_message(&mut self) -> Result<Option<ComputationMessage>, SessionError> {
        while !self.closed {
            let Some(line) = self.next_line()? else {
                return Ok(None);
            };
            let record: Json = serde_json::from_str(&line).map_err(|e| self.fault(e))?;

            match record.get("type").and_then(Json::as_str) {
                Some("metadata") => {
                    let meta: MetadataRecord =
                        serde_json::from_value(record).map_err(|e| self.fault(e))?;
                    if !self.metadata.contains_key(&meta.series_id) {
                        self.known.push(meta.series_id.clone());
                    }
                    self.metadata.insert(meta.series_id, meta.properties);
                }
                Some("resolution") => {
                    let res: ResolutionRecord =
                        serde_json::from_value(record).map_err(|e| self.fault(e))?;
                    self.resolution = Some(res.resolution_ms);
                }
                Some("failed") => {
                    let failure: FailureRecord =
                        serde_json::from_value(record).map_err(|e| self.fault(e))?;
                    return Err(SessionError::StreamFault(
                        failure
                            .message
                            .unwrap_or_else(|| "computation failed".to_string()),
                    ));
                }
                _ => {
                    let message: ComputationMessage =
                        serde_json::from_value(record).map_err(|e| self.fault(e))?;
                    if let ComputationMessage::Data {
                        logical_timestamp_ms,
                        ..
                    } = &message
                    {
                        self.pace();
                        self.last_logical_ts = Some(*logical_timestamp_ms);
                    }
                    return Ok(Some(message));
                }
            }
        }
        Ok(None)
    }

    fn metadata(&self, id: &SeriesId) -> Option<&Metadata> {
        self.metadata.get(id)
    }

    fn known_series(&self) -> Vec<SeriesId> {
        self.known.clone()
    }

    fn last_logical_timestamp(&self) -> Option<i64> {
        self.last_logical_ts
    }

    fn resolution(&self) -> Option<i64> {
        self.resolution
    }

    fn close(&mut self) {
        if self.closed {
            warn!("replay computation closed twice");
        }
        self.closed = true;
    }
}
