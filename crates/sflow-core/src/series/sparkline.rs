//! Rolling per-series value history, rendered as sparklines.

use std::collections::{HashMap, VecDeque};

use sflow_types::{SeriesId, Value};

use crate::config::DisplayConfig;
use crate::error::SparkStyleError;

/// Glyphs used to draw a sparkline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparkStyle {
    /// Ordered ramp; index 0 is the blank glyph for missing values.
    ticks: Vec<char>,
    /// Index of the glyph used when all present values are equal.
    flat_tick: usize,
}

impl SparkStyle {
    /// Builds a style from a glyph ramp.
    ///
    /// # Errors
    /// Returns an error if the ramp has fewer than three glyphs or
    /// `flat_tick` does not index into it.
    pub fn new(ticks: Vec<char>, flat_tick: usize) -> Result<Self, SparkStyleError> {
        if ticks.len() < 3 {
            return Err(SparkStyleError::RampTooShort(ticks.len()));
        }
        if flat_tick >= ticks.len() {
            return Err(SparkStyleError::FlatTickOutOfRange {
                index: flat_tick,
                len: ticks.len(),
            });
        }
        Ok(Self { ticks, flat_tick })
    }

    pub fn blank(&self) -> char {
        self.ticks[0]
    }

    pub fn flat(&self) -> char {
        self.ticks[self.flat_tick]
    }

    /// Renders one glyph per slot of `window`.
    ///
    /// Values are min-max normalized over the present slots. Index 1 means
    /// "present, at the minimum" and the last glyph means "at the maximum".
    pub fn render<I>(&self, window: I) -> String
    where
        I: IntoIterator<Item = Option<Value>>,
        I::IntoIter: Clone,
    {
        let window = window.into_iter();
        let (min, max) = window
            .clone()
            .flatten()
            .map(Value::as_f64)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 0.0));

        let steps = (self.ticks.len() - 2) as f64;
        let last = self.ticks.len() - 1;

        window
            .map(|slot| match slot {
                None => self.blank(),
                Some(_) if min == max => self.flat(),
                Some(v) => {
                    let ratio = (v.as_f64() - min) / (max - min);
                    let index = 1 + (steps * ratio).floor() as usize;
                    self.ticks[index.min(last)]
                }
            })
            .collect()
    }
}

impl TryFrom<&DisplayConfig> for SparkStyle {
    type Error = SparkStyleError;

    fn try_from(config: &DisplayConfig) -> Result<Self, Self::Error> {
        Self::new(config.tick_glyphs(), config.flat_tick)
    }
}

/// Fixed-length value history for every series seen in a session.
///
/// Each buffer holds exactly `width` slots, newest at the tail. Series are
/// kept in first-seen order.
#[derive(Debug, Clone)]
pub struct SeriesHistoryTracker {
    width: usize,
    style: SparkStyle,
    order: Vec<SeriesId>,
    buffers: HashMap<SeriesId, VecDeque<Option<Value>>>,
}

impl SeriesHistoryTracker {
    pub fn new(width: usize, style: SparkStyle) -> Self {
        Self {
            width: width.max(1),
            style,
            order: Vec::new(),
            buffers: HashMap::new(),
        }
    }

    /// # Errors
    /// Returns an error if the configured glyph ramp is unusable.
    pub fn from_config(config: &DisplayConfig) -> Result<Self, SparkStyleError> {
        Ok(Self::new(config.sparkline_width, SparkStyle::try_from(config)?))
    }

    /// Advances every buffer by one slot: the oldest value is dropped and
    /// an empty slot is appended.
    pub fn tick(&mut self) {
        for buffer in self.buffers.values_mut() {
            buffer.pop_front();
            buffer.push_back(None);
        }
    }

    /// Stores `value` in the newest slot of the series' buffer, creating an
    /// empty buffer on first sight.
    pub fn record(&mut self, id: &SeriesId, value: Value) {
        let width = self.width;
        let buffer = self.buffers.entry(id.clone()).or_insert_with(|| {
            self.order.push(id.clone());
            VecDeque::from(vec![None; width])
        });
        if let Some(slot) = buffer.back_mut() {
            *slot = Some(value);
        }
    }

    /// Series ids in first-seen order.
    pub fn series(&self) -> impl Iterator<Item = &SeriesId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn window(&self, id: &SeriesId) -> Option<&VecDeque<Option<Value>>> {
        self.buffers.get(id)
    }

    /// Value in the newest slot, if the series reported one this tick.
    pub fn latest(&self, id: &SeriesId) -> Option<Value> {
        self.buffers.get(id).and_then(|b| b.back().copied().flatten())
    }

    /// Renders the series' window as a sparkline; unknown series render blank.
    pub fn render_line(&self, id: &SeriesId) -> String {
        match self.buffers.get(id) {
            Some(buffer) => self.style.render(buffer.iter().copied()),
            None => self.style.blank().to_string().repeat(self.width),
        }
    }
}
