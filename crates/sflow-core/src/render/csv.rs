//! CSV output: a header on the first data batch, then one row per batch.
//!
//! Header cells are always quoted, even when a series name looks numeric.
//! In data rows timestamps and values stay bare and missing values are
//! quoted empty strings.

use std::io::{self, Write};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use sflow_types::{ComputationMessage, SeriesId};
use tracing::{debug, warn};

use super::Sink;
use crate::core::computation::Computation;
use crate::error::ExecutionError;
use crate::series::identity::IdentityCache;

/// What a single message turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvOutput {
    /// An encoded CSV line, without terminator.
    Row(String),
    /// A progress note for the side channel.
    Status(String),
}

#[derive(Debug, Default)]
pub struct CsvSerializer {
    /// Frozen on the first data batch.
    columns: Option<Vec<SeriesId>>,
    identities: IdentityCache,
    diagnostics: Vec<String>,
}

impl CsvSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Series ids backing the value columns, once the header is out.
    pub fn columns(&self) -> Option<&[SeriesId]> {
        self.columns.as_deref()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Converts one message into zero or more outputs.
    ///
    /// # Errors
    /// Returns an error if a row cannot be encoded.
    pub fn push(
        &mut self,
        message: &ComputationMessage,
        computation: &dyn Computation,
    ) -> io::Result<Vec<CsvOutput>> {
        match message {
            ComputationMessage::JobStart => {
                Ok(vec![CsvOutput::Status("computation started".to_string())])
            }
            ComputationMessage::JobProgress { percent } => Ok(vec![CsvOutput::Status(format!(
                "computation {percent}% complete"
            ))]),
            ComputationMessage::Data {
                logical_timestamp_ms,
                values,
            } => {
                let mut out = Vec::with_capacity(2);
                if self.columns.is_none() {
                    let mut columns = computation.known_series();
                    for id in values.keys() {
                        if !columns.contains(id) {
                            columns.push(id.clone());
                        }
                    }
                    debug!(columns = columns.len(), "csv columns frozen");

                    let mut header = Vec::with_capacity(columns.len() + 1);
                    header.push("timestamp".to_string());
                    for id in &columns {
                        header.push(self.column_name(id, computation));
                    }
                    out.push(CsvOutput::Row(encode(&header, QuoteStyle::Always)?));
                    self.columns = Some(columns);
                }

                let columns = self.columns.as_deref().unwrap_or_default();
                let mut row = Vec::with_capacity(columns.len() + 1);
                row.push(logical_timestamp_ms.to_string());
                row.extend(
                    columns
                        .iter()
                        .map(|id| values.get(id).map(ToString::to_string).unwrap_or_default()),
                );
                out.push(CsvOutput::Row(encode(&row, QuoteStyle::NonNumeric)?));
                Ok(out)
            }
            ComputationMessage::Event { .. } | ComputationMessage::Unknown => Ok(Vec::new()),
        }
    }

    fn column_name(&mut self, id: &SeriesId, computation: &dyn Computation) -> String {
        match self.identities.resolve(id, computation.metadata(id)) {
            Ok(name) => name,
            Err(err) => {
                warn!(series = %id, error = %err, "cannot name series");
                self.diagnostics.push(format!("series {id}: {err}"));
                format!("<{id}>")
            }
        }
    }
}

fn encode(fields: &[String], quote_style: QuoteStyle) -> io::Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(quote_style)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

/// Writes rows to `out` and status notes to `status`.
pub struct CsvSink<W: Write, E: Write> {
    out: W,
    status: E,
    serializer: CsvSerializer,
}

impl<W: Write, E: Write> CsvSink<W, E> {
    pub fn new(out: W, status: E) -> Self {
        Self {
            out,
            status,
            serializer: CsvSerializer::new(),
        }
    }

    pub fn into_parts(self) -> (W, E) {
        (self.out, self.status)
    }
}

impl<W: Write, E: Write> Sink for CsvSink<W, E> {
    fn announce(&mut self) -> io::Result<()> {
        writeln!(self.status, "Requesting computation...")
    }

    fn request_failed(&mut self, error: &ExecutionError) -> io::Result<()> {
        writeln!(self.status, "Computation failed: {error}")
    }

    fn handle(
        &mut self,
        message: &ComputationMessage,
        computation: &dyn Computation,
    ) -> io::Result<()> {
        for output in self.serializer.push(message, computation)? {
            match output {
                CsvOutput::Row(line) => {
                    writeln!(self.out, "{line}")?;
                    self.out.flush()?;
                }
                CsvOutput::Status(note) => writeln!(self.status, "{note}")?,
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.status.flush()
    }

    fn diagnostics(&self) -> Vec<String> {
        self.serializer.diagnostics().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use sflow_types::Value;

    use super::*;
    use crate::core::testing::{ScriptedComputation, data, event};

    fn rows(outputs: &[CsvOutput]) -> Vec<&str> {
        outputs
            .iter()
            .filter_map(|o| match o {
                CsvOutput::Row(line) => Some(line.as_str()),
                CsvOutput::Status(_) => None,
            })
            .collect()
    }

    fn run(computation: &mut ScriptedComputation) -> (CsvSerializer, Vec<CsvOutput>) {
        let mut serializer = CsvSerializer::new();
        let mut outputs = Vec::new();
        while let Some(message) = computation.next_message().unwrap() {
            outputs.extend(serializer.push(&message, &*computation).unwrap());
        }
        (serializer, outputs)
    }

    #[test]
    fn test_job_messages_then_two_batches() {
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            ComputationMessage::JobProgress { percent: 10 },
            ComputationMessage::JobProgress { percent: 100 },
            data(1000, &[("a", Value::Int(5))]),
            data(2000, &[("a", Value::Int(7))]),
        ])
        .with_metric("a", "cpu");

        let (_, outputs) = run(&mut computation);

        assert_eq!(rows(&outputs), vec![r#""timestamp","cpu""#, "1000,5", "2000,7"]);
        let statuses = outputs
            .iter()
            .filter(|o| matches!(o, CsvOutput::Status(_)))
            .count();
        assert_eq!(statuses, 3);
    }

    #[test]
    fn test_header_emitted_once_and_late_series_dropped() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Int(1))]),
            data(2000, &[("a", Value::Int(2)), ("late", Value::Int(9))]),
        ])
        .with_metric("a", "cpu");

        let (serializer, outputs) = run(&mut computation);

        assert_eq!(rows(&outputs), vec![r#""timestamp","cpu""#, "1000,1", "2000,2"]);
        assert_eq!(serializer.columns(), Some(&[SeriesId::from("a")][..]));
    }

    #[test]
    fn test_missing_values_and_floats() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Float(1.5))]),
            data(2000, &[("b", Value::Int(3))]),
        ])
        .with_metric("a", "cpu")
        .with_metric("b", "mem");

        let (_, outputs) = run(&mut computation);

        assert_eq!(
            rows(&outputs),
            vec![r#""timestamp","cpu","mem""#, r#"1000,1.5,"""#, r#"2000,"",3"#]
        );
    }

    #[test]
    fn test_series_without_metadata_gets_column() {
        let mut computation =
            ScriptedComputation::new(vec![data(1000, &[("anon", Value::Int(4))])]);

        let (_, outputs) = run(&mut computation);

        assert_eq!(rows(&outputs), vec![r#""timestamp","""#, "1000,4"]);
    }

    #[test]
    fn test_numeric_looking_series_name_is_quoted() {
        let mut computation = ScriptedComputation::new(vec![data(1000, &[("a", Value::Int(1))])])
            .with_metric("a", "404");

        let (_, outputs) = run(&mut computation);

        assert_eq!(rows(&outputs), vec![r#""timestamp","404""#, "1000,1"]);
    }

    #[test]
    fn test_unnameable_series_keeps_header_columns() {
        let mut computation = ScriptedComputation::new(vec![
            data(1000, &[("a", Value::Int(1)), ("x", Value::Int(2))]),
            data(2000, &[("a", Value::Int(3)), ("x", Value::Int(4))]),
        ])
        .with_metric("a", "cpu")
        .with_metadata("x", serde_json::json!({"sf_type": "Mystery"}));

        let (serializer, outputs) = run(&mut computation);

        assert_eq!(
            rows(&outputs),
            vec![r#""timestamp","cpu","<x>""#, "1000,1,2", "2000,3,4"]
        );
        assert_eq!(serializer.diagnostics().len(), 1);
        assert!(serializer.diagnostics()[0].contains("Mystery"));
    }

    #[test]
    fn test_events_produce_nothing() {
        let mut computation = ScriptedComputation::new(vec![
            event(1000, "d", "anomalous", "I1"),
            ComputationMessage::Unknown,
        ]);

        let (_, outputs) = run(&mut computation);

        assert!(outputs.is_empty());
    }

    #[test]
    fn test_sink_splits_rows_and_status() {
        let mut computation = ScriptedComputation::new(vec![
            ComputationMessage::JobStart,
            data(1000, &[("a", Value::Int(5))]),
        ])
        .with_metric("a", "cpu");
        let mut sink = CsvSink::new(Vec::new(), Vec::new());

        while let Some(message) = computation.next_message().unwrap() {
            sink.handle(&message, &computation).unwrap();
        }
        sink.finish().unwrap();

        let (out, status) = sink.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "\"timestamp\",\"cpu\"\n1000,5\n");
        assert_eq!(String::from_utf8(status).unwrap(), "computation started\n");
    }
}
