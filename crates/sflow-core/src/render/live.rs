//! Self-redrawing terminal dashboard.
//!
//! Every data batch or event redraws the whole block in place: each line is
//! cleared before it is written, and afterwards the cursor is moved back up
//! by exactly the number of lines printed so the next redraw overwrites it.
//! Lines are clipped to the terminal width, so each one is one physical row.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{self, Clear, ClearType};
use sflow_types::{ComputationMessage, SeriesId, Value};
use tracing::{debug, trace, warn};

use super::Sink;
use super::text::{fit_to_width, single_line, truncate_with_ellipsis};
use crate::config::DisplayConfig;
use crate::core::computation::Computation;
use crate::error::{ExecutionError, IdentityError, SparkStyleError};
use crate::events::{EventRecord, EventRingBuffer};
use crate::series::identity::IdentityCache;
use crate::series::sparkline::SeriesHistoryTracker;
use crate::timeexpr::{render_delta, render_lag};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z%z";
const STATUS_REQUESTING: &str = "Requesting computation...";
const STATUS_STARTED: &str = " started; waiting for data...";
const VALUE_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingStart,
    Streaming,
    Closed,
}

/// Columns available on stdout, or `None` when it is not a terminal.
pub fn terminal_width() -> Option<usize> {
    if !io::stdout().is_terminal() {
        return None;
    }
    terminal::size().ok().map(|(cols, _)| usize::from(cols))
}

/// Line advances still owed below the cursor.
///
/// Shared with the Ctrl+C restore hook, which settles it when the process
/// is force-exited in the middle of a redraw cycle.
#[derive(Debug, Clone, Default)]
pub struct CursorDebt(Arc<AtomicUsize>);

impl CursorDebt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, lines: usize) {
        self.0.store(lines, Ordering::SeqCst);
    }

    /// Writes the owed line breaks to `out` and clears the debt.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn settle_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let lines = self.0.swap(0, Ordering::SeqCst);
        write!(out, "{}", "\n".repeat(lines))?;
        out.flush()
    }

    /// Settles on stderr; stdout may still be locked by the renderer.
    pub fn settle(&self) {
        let _ = self.settle_to(&mut io::stderr());
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Plain,
    Bold,
    Green,
    Red,
}

/// A piece of a dashboard line with its styling.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    tone: Tone,
}

impl Span {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Plain)
    }

    fn bold(text: impl Into<String>) -> Self {
        Self::new(text, Tone::Bold)
    }
}

/// Joins `spans` into one styled line of at most `width` columns.
///
/// Clipping works on the visible text, so escape sequences are never cut.
fn compose(spans: &[Span], width: Option<usize>) -> String {
    let visible: String = spans.iter().map(|span| span.text.as_str()).collect();
    let clipped = match width {
        Some(width) => truncate_with_ellipsis(&visible, width),
        None => visible,
    };

    let mut chars = clipped.chars();
    let mut line = String::new();
    for span in spans {
        let piece: String = chars.by_ref().take(span.text.chars().count()).collect();
        if piece.is_empty() {
            continue;
        }
        match span.tone {
            Tone::Plain => line.push_str(&piece),
            Tone::Bold => line.push_str(&piece.bold().to_string()),
            Tone::Green => line.push_str(&piece.green().to_string()),
            Tone::Red => line.push_str(&piece.red().to_string()),
        }
    }
    line
}

/// Everything the dashboard shows, owned by one session.
#[derive(Debug)]
pub struct DisplayState {
    pub tracker: SeriesHistoryTracker,
    pub events: EventRingBuffer,
    identities: IdentityCache,
    identity_errors: BTreeMap<SeriesId, IdentityError>,
    seen_data: bool,
}

impl DisplayState {
    /// # Errors
    /// Returns an error if the configured glyph ramp is unusable.
    pub fn new(display: &DisplayConfig) -> Result<Self, SparkStyleError> {
        Ok(Self {
            tracker: SeriesHistoryTracker::from_config(display)?,
            events: EventRingBuffer::new(display.event_capacity),
            identities: IdentityCache::new(),
            identity_errors: BTreeMap::new(),
            seen_data: false,
        })
    }

    /// Name shown for `id`; a series whose metadata cannot be named shows
    /// as `<id>` and is reported once.
    fn identity(&mut self, id: &SeriesId, computation: &dyn Computation) -> String {
        match self.identities.resolve(id, computation.metadata(id)) {
            Ok(name) => single_line(&name),
            Err(err) => {
                if !self.identity_errors.contains_key(id) {
                    warn!(series = %id, error = %err, "cannot name series");
                    self.identity_errors.insert(id.clone(), err);
                }
                format!("<{id}>")
            }
        }
    }
}

/// Renders a computation as a live dashboard on `out`.
pub struct TerminalRenderer<W: Write> {
    out: W,
    state: DisplayState,
    tz: Tz,
    identity_width: usize,
    width: Option<usize>,
    debt: CursorDebt,
    clock: fn() -> i64,
    phase: Phase,
    status: String,
    status_open: bool,
    last_lines: usize,
    drawn: bool,
    closing_advance: Option<usize>,
}

impl<W: Write> TerminalRenderer<W> {
    /// # Errors
    /// Returns an error if the display settings cannot draw sparklines.
    pub fn new(out: W, tz: Tz, display: &DisplayConfig) -> Result<Self, SparkStyleError> {
        Ok(Self {
            out,
            state: DisplayState::new(display)?,
            tz,
            identity_width: display.identity_width,
            width: None,
            debt: CursorDebt::new(),
            clock: now_ms,
            phase: Phase::AwaitingStart,
            status: String::new(),
            status_open: false,
            last_lines: 0,
            drawn: false,
            closing_advance: None,
        })
    }

    /// Clips every dashboard line to `width` columns.
    pub fn with_width(mut self, width: Option<usize>) -> Self {
        self.width = width.filter(|w| *w > 0);
        self
    }

    /// Keeps `debt` up to date with the advance [`Sink::finish`] would print.
    pub fn with_cursor_debt(mut self, debt: CursorDebt) -> Self {
        self.debt = debt;
        self
    }

    /// Replaces the wall clock used for the lag column.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    /// Lines printed by the most recent redraw.
    pub fn last_lines(&self) -> usize {
        self.last_lines
    }

    /// Line advances printed by [`Sink::finish`], once it has run.
    pub fn closing_advance(&self) -> Option<usize> {
        self.closing_advance
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn format_date(&self, timestamp_ms: i64) -> String {
        match Utc.timestamp_millis_opt(timestamp_ms).single() {
            Some(dt) => dt.with_timezone(&self.tz).format(DATE_FORMAT).to_string(),
            None => timestamp_ms.to_string(),
        }
    }

    /// Clears the current line and writes `spans`, clipped to the terminal
    /// width, plus a line break.
    fn line(&mut self, spans: &[Span]) -> io::Result<usize> {
        let content = compose(spans, self.width);
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        writeln!(self.out, "{content}")?;
        Ok(1)
    }

    /// Advance needed to leave the cursor below everything printed so far.
    fn pending_advance(&self) -> usize {
        if self.last_lines > 0 {
            self.last_lines
        } else {
            usize::from(self.status_open)
        }
    }

    fn job_started(&mut self) -> io::Result<()> {
        if self.drawn || self.status.ends_with(STATUS_STARTED) {
            return Ok(());
        }
        write!(self.out, "{STATUS_STARTED}")?;
        self.status.push_str(STATUS_STARTED);
        self.status_open = true;
        self.debt.set(self.pending_advance());
        self.out.flush()
    }

    fn job_progress(&mut self, percent: u8) -> io::Result<()> {
        if self.drawn {
            debug!(percent, "job progress");
            return Ok(());
        }
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        write!(self.out, "{} {percent}%", self.status)?;
        self.status_open = true;
        self.debt.set(self.pending_advance());
        self.out.flush()
    }

    fn redraw(&mut self, computation: &dyn Computation) -> io::Result<()> {
        let mut lines = 0;
        if self.state.seen_data {
            lines += self.draw_data(computation)?;
        }
        if !self.state.events.is_empty() {
            lines += self.draw_events()?;
        }
        if lines > 0 {
            // crossterm encodes MoveUp(0) as a move of one line.
            let up = u16::try_from(lines).unwrap_or(u16::MAX);
            queue!(self.out, MoveUp(up))?;
            self.drawn = true;
            self.status_open = false;
        }
        self.out.flush()?;
        self.last_lines = lines;
        self.debt.set(self.pending_advance());
        Ok(())
    }

    fn draw_data(&mut self, computation: &dyn Computation) -> io::Result<usize> {
        let date = computation
            .last_logical_timestamp()
            .map_or_else(|| "-".to_string(), |ts| self.format_date(ts));
        let resolution = computation
            .resolution()
            .map_or_else(|| "-".to_string(), render_delta);
        let lag = computation
            .last_logical_timestamp()
            .map_or_else(|| "-".to_string(), |ts| render_lag(ts, (self.clock)()));

        let mut lines = self.line(&[
            Span::plain("At "),
            Span::bold(date),
            Span::plain(format!(" (@{resolution}, Δ: {lag}):")),
        ])?;

        let ids: Vec<SeriesId> = self.state.tracker.series().cloned().collect();
        for id in &ids {
            let name = self.state.identity(id, computation);
            let row = [
                Span::plain(format!(
                    "{}: [{}] ",
                    fit_to_width(&name, self.identity_width),
                    self.state.tracker.render_line(id),
                )),
                format_value(self.state.tracker.latest(id)),
            ];
            lines += self.line(&row)?;
        }
        Ok(lines)
    }

    fn draw_events(&mut self) -> io::Result<usize> {
        let rows: Vec<Vec<Span>> = self
            .state
            .events
            .all()
            .map(|record| self.format_event(record))
            .collect();

        let mut lines = self.line(&[])?;
        lines += self.line(&[Span::plain("Events:")])?;
        for row in &rows {
            lines += self.line(row)?;
        }
        Ok(lines)
    }

    fn format_event(&self, record: &EventRecord) -> Vec<Span> {
        let mark = if record.status.is_ok() {
            Span::new("✓", Tone::Green)
        } else {
            Span::new("✗", Tone::Red)
        };
        let mut spans = vec![
            Span::plain(" "),
            mark,
            Span::plain(" "),
            Span::bold(self.format_date(record.timestamp_ms)),
            Span::plain(format!(" [{}]: ", single_line(&record.incident_id))),
        ];
        for (i, (id, source)) in record.sources.iter().enumerate() {
            if i > 0 {
                spans.push(Span::plain(", "));
            }
            spans.push(Span::bold(single_line(id)));
            spans.push(Span::plain(format!(": {}", single_line(source))));
        }
        let values = record
            .values
            .iter()
            .map(|(id, value)| format!("{id}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        spans.push(Span::plain(format!(" | {}", single_line(&values))));
        spans
    }
}

impl<W: Write> Sink for TerminalRenderer<W> {
    fn announce(&mut self) -> io::Result<()> {
        write!(self.out, "{STATUS_REQUESTING}")?;
        self.status = STATUS_REQUESTING.to_string();
        self.status_open = true;
        self.out.flush()
    }

    fn request_failed(&mut self, error: &ExecutionError) -> io::Result<()> {
        let sep = if self.status.is_empty() { "" } else { " " };
        match (&error.message, error.code) {
            (Some(message), _) => {
                writeln!(self.out, "{sep}failed!")?;
                writeln!(self.out, "{}", message.as_str().red().bold())?;
            }
            (None, Some(code)) => writeln!(self.out, "{sep}failed ({code})!")?,
            (None, None) => writeln!(self.out, "{sep}failed!")?,
        }
        self.status_open = false;
        self.phase = Phase::Closed;
        self.debt.set(0);
        self.out.flush()
    }

    fn handle(
        &mut self,
        message: &ComputationMessage,
        computation: &dyn Computation,
    ) -> io::Result<()> {
        match self.phase {
            Phase::Closed => {
                debug!(kind = message.kind(), "message after close ignored");
                return Ok(());
            }
            Phase::AwaitingStart if !matches!(message, ComputationMessage::Unknown) => {
                self.phase = Phase::Streaming;
            }
            _ => {}
        }

        match message {
            ComputationMessage::JobStart => self.job_started(),
            ComputationMessage::JobProgress { percent } => self.job_progress(*percent),
            ComputationMessage::Data { values, .. } => {
                self.state.tracker.tick();
                for (id, value) in values {
                    self.state.tracker.record(id, *value);
                }
                self.state.seen_data = true;
                self.redraw(computation)
            }
            ComputationMessage::Event {
                timestamp_ms,
                series_id,
                properties,
            } => {
                let record = EventRecord::from_properties(
                    *timestamp_ms,
                    properties,
                    computation.metadata(series_id),
                );
                self.state.events.insert(record);
                self.redraw(computation)
            }
            ComputationMessage::Unknown => {
                trace!("ignoring unknown message");
                Ok(())
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.closing_advance.is_some() {
            return Ok(());
        }
        let advance = self.pending_advance();
        write!(self.out, "{}", "\n".repeat(advance))?;
        self.out.flush()?;
        self.debt.set(0);
        self.closing_advance = Some(advance);
        self.phase = Phase::Closed;
        Ok(())
    }

    fn diagnostics(&self) -> Vec<String> {
        self.state
            .identity_errors
            .iter()
            .map(|(id, err)| format!("series {id}: {err}"))
            .collect()
    }
}

fn format_value(value: Option<Value>) -> Span {
    match value {
        Some(Value::Int(v)) => Span::bold(format!("{v:>VALUE_WIDTH$}")),
        Some(Value::Float(v)) => Span::bold(format!("{v:>VALUE_WIDTH$.2}")),
        None => Span::plain(format!("{:>VALUE_WIDTH$}", "-")),
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use unicode_width::UnicodeWidthStr;

    use super::*;
    use crate::core::testing::{ScriptedComputation, data, event};

    fn renderer() -> TerminalRenderer<Vec<u8>> {
        TerminalRenderer::new(Vec::new(), chrono_tz::UTC, &DisplayConfig::default())
            .unwrap()
            .with_clock(|| 3_000)
    }

    /// Pulls every message from `computation` into `renderer`, returning the
    /// number of line breaks each one printed.
    fn feed(
        renderer: &mut TerminalRenderer<Vec<u8>>,
        computation: &mut ScriptedComputation,
    ) -> Vec<usize> {
        let mut breaks = Vec::new();
        while let Some(message) = computation.next_message().unwrap() {
            let before = renderer.get_ref().len();
            renderer.handle(&message, &*computation).unwrap();
            breaks.push(count_breaks(&renderer.get_ref()[before..]));
        }
        breaks
    }

    fn count_breaks(bytes: &[u8]) -> usize {
        bytes.iter().filter(|b| **b == b'\n').count()
    }

    fn output(renderer: &TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8_lossy(renderer.get_ref()).into_owned()
    }

    /// Printed lines with escape sequences removed.
    fn visible_lines(out: &str) -> Vec<String> {
        let mut text = String::new();
        let mut chars = out.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                // CSI sequences end at the first letter.
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            } else {
                text.push(c);
            }
        }
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_redraw_line_count_matches_printed_lines() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Int(1))]),
            data(2000, &[("a", Value::Int(2)), ("b", Value::Float(0.5))]),
            event(2500, "a", "anomalous", "I1"),
        ])
        .with_metric("a", "cpu")
        .with_metric("b", "mem");
        let mut r = renderer();

        let breaks = feed(&mut r, &mut computation);

        // header + 1 series; header + 2 series; header + 2 series + blank + title + 1 event
        assert_eq!(breaks, vec![2, 3, 6]);
        assert_eq!(r.last_lines(), 6);
    }

    #[test]
    fn test_block_rendering() {
        let mut computation =
            ScriptedComputation::new(vec![data(1000, &[("a", Value::Int(42))])])
                .with_metric("a", "cpu.util");
        let mut r = renderer();
        feed(&mut r, &mut computation);

        let out = output(&r);
        assert!(out.contains("1970-01-01 00:00:01 UTC+0000"));
        assert!(out.contains("(@1s, Δ: 2s):"));
        assert!(out.contains(&format!("{}: [", fit_to_width("cpu.util", 60))));
        assert!(out.contains("        42"));
        assert!(out.contains("\x1b[2A"));
    }

    #[test]
    fn test_event_block_marks_status() {
        let mut computation = ScriptedComputation::new(vec![
            event(1000, "d", "ok", "OK1"),
            event(2000, "d", "anomalous", "BAD1"),
        ]);
        let mut r = renderer();

        let breaks = feed(&mut r, &mut computation);

        // no data seen: blank + title + records
        assert_eq!(breaks, vec![3, 4]);
        let out = output(&r);
        assert!(out.contains("Events:"));
        assert!(out.contains("✓"));
        assert!(out.contains("✗"));
        assert!(out.contains("[BAD1]"));
    }

    #[test]
    fn test_missing_value_renders_dash() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Int(1))]),
            data(2000, &[]),
        ]);
        let mut r = renderer();
        feed(&mut r, &mut computation);

        let out = output(&r);
        assert!(out.trim_end().ends_with(&format!("{:>10}\n\x1b[2A", "-")));
    }

    #[test]
    fn test_finish_advances_last_block_height() {
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            data(1000, &[("a", Value::Int(1)), ("b", Value::Int(2))]),
        ]);
        let mut r = renderer();
        feed(&mut r, &mut computation);
        let before = r.get_ref().len();

        r.finish().unwrap();

        assert_eq!(r.closing_advance(), Some(3));
        assert_eq!(count_breaks(&r.get_ref()[before..]), 3);
        assert_eq!(r.phase(), Phase::Closed);
    }

    #[test]
    fn test_finish_terminates_bare_status_line() {
        let mut r = renderer();
        r.announce().unwrap();
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            ComputationMessage::JobProgress { percent: 10 },
        ]);
        feed(&mut r, &mut computation);

        r.finish().unwrap();

        assert_eq!(r.closing_advance(), Some(1));
        let out = output(&r);
        assert!(out.starts_with("Requesting computation... started; waiting for data..."));
        assert!(out.contains("Requesting computation... started; waiting for data... 10%"));
        assert_eq!(count_breaks(r.get_ref()), 1);
    }

    #[test]
    fn test_started_suffix_printed_once() {
        let mut r = renderer();
        r.announce().unwrap();
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            ComputationMessage::JobStart,
        ]);
        feed(&mut r, &mut computation);

        assert_eq!(output(&r).matches(STATUS_STARTED).count(), 1);
    }

    #[test]
    fn test_progress_after_block_is_not_printed() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Int(1))]),
            ComputationMessage::JobProgress { percent: 50 },
        ]);
        let mut r = renderer();
        let breaks = feed(&mut r, &mut computation);

        assert_eq!(breaks, vec![2, 0]);
        assert!(!output(&r).contains("50%"));
        assert_eq!(r.last_lines(), 2);
    }

    #[test]
    fn test_unknown_message_keeps_phase() {
        let mut computation = ScriptedComputation::new(vec![ComputationMessage::Unknown]);
        let mut r = renderer();
        feed(&mut r, &mut computation);

        assert_eq!(r.phase(), Phase::AwaitingStart);
        assert!(r.get_ref().is_empty());

        let mut computation = ScriptedComputation::new(vec![ComputationMessage::JobStart]);
        feed(&mut r, &mut computation);
        assert_eq!(r.phase(), Phase::Streaming);
    }

    #[test]
    fn test_unnameable_series_reported_once() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("x", Value::Int(1))]),
            data(2000, &[("x", Value::Int(2))]),
        ])
        .with_metadata("x", json!({"sf_type": "Mystery"}));
        let mut r = renderer();
        feed(&mut r, &mut computation);

        assert!(output(&r).contains("<x>"));
        let diagnostics = r.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("Mystery"));
    }

    #[test]
    fn test_unnameable_series_does_not_hide_others() {
        let mut computation = ScriptedComputation::new(vec![data(
            1000,
            &[("a", Value::Int(1)), ("x", Value::Int(2))],
        )])
        .with_metric("a", "cpu")
        .with_metadata("x", json!({"sf_type": "Mystery"}));
        let mut r = renderer();

        let breaks = feed(&mut r, &mut computation);

        assert_eq!(breaks, vec![3]);
        assert_eq!(r.last_lines(), 3);
        let out = output(&r);
        assert!(out.contains(&format!("{}: [", fit_to_width("cpu", 60))));
        assert!(out.contains(&format!("{}: [", fit_to_width("<x>", 60))));
        assert_eq!(r.diagnostics().len(), 1);
    }

    #[test]
    fn test_long_lines_clipped_to_terminal_width() {
        let sources: serde_json::Map<String, serde_json::Value> = (0..20)
            .map(|i| (format!("_S{i}"), json!(format!("host=web{i}.example.com"))))
            .collect();
        let long_event = ComputationMessage::Event {
            timestamp_ms: 2500,
            series_id: SeriesId::from("a"),
            properties: json!({"is": "anomalous", "incidentId": "I1", "inputSources": sources})
                .as_object()
                .cloned()
                .unwrap(),
        };
        let mut computation =
            ScriptedComputation::new(vec![data(1000, &[("a", Value::Int(1))]), long_event])
                .with_metric("a", "cpu");
        let mut r = renderer().with_width(Some(80));

        let breaks = feed(&mut r, &mut computation);

        assert_eq!(breaks, vec![2, 5]);
        assert_eq!(r.last_lines(), 5);
        for line in visible_lines(&output(&r)) {
            assert!(line.width() <= 80, "{} columns: {line}", line.width());
        }
        assert!(output(&r).contains("…"));
    }

    #[test]
    fn test_cursor_debt_follows_block_height() {
        let debt = CursorDebt::new();
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            data(1000, &[("a", Value::Int(1)), ("b", Value::Int(2))]),
        ]);
        let mut r = renderer().with_cursor_debt(debt.clone());
        r.announce().unwrap();

        let mut steps = Vec::new();
        while let Some(message) = computation.next_message().unwrap() {
            r.handle(&message, &computation).unwrap();
            steps.push(debt.get());
        }
        assert_eq!(steps, vec![1, 3]);

        let mut settled = Vec::new();
        debt.settle_to(&mut settled).unwrap();
        assert_eq!(settled, b"\n\n\n");
        assert_eq!(debt.get(), 0);

        r.finish().unwrap();
        assert_eq!(debt.get(), 0);
    }

    #[test]
    fn test_unusable_display_config_is_rejected() {
        let display = DisplayConfig {
            ticks: String::new(),
            ..DisplayConfig::default()
        };
        assert!(TerminalRenderer::new(Vec::new(), chrono_tz::UTC, &display).is_err());
    }

    #[test]
    fn test_request_failed_with_code() {
        let mut r = renderer();
        r.announce().unwrap();
        r.request_failed(&ExecutionError::with_code(400)).unwrap();

        assert_eq!(output(&r), "Requesting computation... failed (400)!\n");
        assert_eq!(r.phase(), Phase::Closed);
    }

    #[test]
    fn test_request_failed_with_message() {
        let mut r = renderer();
        r.announce().unwrap();
        r.request_failed(&ExecutionError::with_message("syntax error"))
            .unwrap();

        let out = output(&r);
        assert!(out.starts_with("Requesting computation... failed!\n"));
        assert!(out.contains("syntax error"));
    }
}
