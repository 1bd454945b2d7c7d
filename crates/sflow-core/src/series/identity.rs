//! Human-readable series names.
//!
//! A series name has up to three parts: the stream label (only when
//! present), the fixed dimension (metric or event type) and the variable
//! dimensions, e.g. `cpu: cpu.utilization/host=web1.region=us`.

use std::collections::HashMap;

use sflow_types::{Metadata, SeriesId};
use tracing::debug;

use crate::error::IdentityError;

/// Names starting with this prefix are generated by the backend and
/// meaningless to users.
const GENERATED_PREFIX: &str = "_sf_";

/// Bookkeeping dimensions never shown in a series name.
const IGNORED_DIMENSIONS: [&str; 6] = [
    "sf_metric",
    "sf_originatingMetric",
    "sf_eventType",
    "sf_originatingEventType",
    "jobId",
    "programId",
];

const METRIC_CANDIDATES: [&str; 2] = ["sf_metric", "sf_originatingMetric"];
const EVENT_CANDIDATES: [&str; 2] = ["sf_eventType", "sf_originatingEventType"];

/// Formats a series name from its metadata.
///
/// Returns `Ok(None)` when there is no metadata to work from.
///
/// # Errors
/// Returns [`IdentityError::UnrecognizedMetadataKind`] for any `sf_type`
/// other than `MetricTimeSeries` or `EventTimeSeries`.
pub fn format(metadata: Option<&Metadata>) -> Result<Option<String>, IdentityError> {
    let Some(obj) = metadata.filter(|m| !m.is_empty()) else {
        return Ok(None);
    };

    let candidates = match obj.get("sf_type").and_then(|v| v.as_str()) {
        Some("MetricTimeSeries") => &METRIC_CANDIDATES,
        Some("EventTimeSeries") => &EVENT_CANDIDATES,
        other => {
            return Err(IdentityError::UnrecognizedMetadataKind(
                other.unwrap_or("<none>").to_string(),
            ));
        }
    };

    let primary = candidates
        .iter()
        .filter_map(|c| obj.get(*c).and_then(|v| v.as_str()))
        .find(|name| !name.to_lowercase().starts_with(GENERATED_PREFIX));

    let dimensions = dimension_name(obj);

    let name = [primary.unwrap_or_default(), dimensions.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    match obj.get("sf_streamLabel").and_then(|v| v.as_str()) {
        Some(label) if !label.is_empty() => Ok(Some(format!("{label}: {name}"))),
        _ => Ok(Some(name)),
    }
}

/// Sorted `key=value` pairs of the variable dimensions, dot-separated.
fn dimension_name(obj: &Metadata) -> String {
    let mut keys: Vec<&str> = obj
        .get("sf_key")
        .and_then(|v| v.as_array())
        .map(|keys| keys.iter().filter_map(|k| k.as_str()).collect())
        .unwrap_or_default();
    keys.retain(|k| !IGNORED_DIMENSIONS.contains(k));
    keys.sort_unstable();
    keys.dedup();

    keys.into_iter()
        .filter_map(|k| {
            let value = obj.get(k)?;
            let value = value
                .as_str()
                .map_or_else(|| value.to_string(), str::to_string);
            Some(format!("{k}={value}"))
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Per-session memo of resolved series names.
///
/// A name is cached the first time it resolves and never changes afterwards.
/// Series without metadata yet are not cached, so they can still resolve
/// once their metadata shows up.
#[derive(Debug, Default)]
pub struct IdentityCache {
    resolved: HashMap<SeriesId, String>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name for `id`, resolving it from `metadata` on first use.
    ///
    /// Missing metadata yields an empty placeholder name.
    ///
    /// # Errors
    /// Propagates [`IdentityError`] from [`format`]; nothing is cached then.
    pub fn resolve(
        &mut self,
        id: &SeriesId,
        metadata: Option<&Metadata>,
    ) -> Result<String, IdentityError> {
        if let Some(name) = self.resolved.get(id) {
            return Ok(name.clone());
        }
        match format(metadata)? {
            Some(name) => {
                debug!(series = %id, name = %name, "resolved series identity");
                self.resolved.insert(id.clone(), name.clone());
                Ok(name)
            }
            None => Ok(String::new()),
        }
    }
}
