// JSON formatter - writes one machine-readable document after the run

use super::{Capability, Formatter, Output};
use crate::notification::SummaryNotification;
use crate::state::Example;
use serde_json::{Value, json};
use std::io::{self, Write};

/// JSON formatter
pub struct JsonFormatter {
    name: String,
    output: Output,
}

impl JsonFormatter {
    pub fn new(name: impl Into<String>, output: Output) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }
}

pub(crate) fn example_json(example: &Example) -> Value {
    let mut value = json!({
        "id": example.id,
        "description": example.description,
        "full_description": example.full_description,
        "status": example.status.as_str(),
        "location": example.location,
        "run_time": example.duration.as_secs_f64(),
    });

    if let Some(reason) = &example.pending_message {
        value["pending_message"] = json!(reason);
    }

    if let Some(failure) = &example.failure {
        value["exception"] = json!({
            "class": failure.class,
            "message": failure.message,
            "backtrace": failure.backtrace,
        });
    }

    value
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::DumpSummary, Capability::Close]
    }

    fn dump_summary(&mut self, summary: &SummaryNotification<'_>) -> io::Result<()> {
        let document = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "examples": summary.examples.iter().map(example_json).collect::<Vec<_>>(),
            "summary": {
                "duration": summary.duration.as_secs_f64(),
                "example_count": summary.examples.len(),
                "failure_count": summary.failed.len(),
                "pending_count": summary.pending.len(),
                "errors_outside_of_examples_count": summary.errors_outside_of_examples,
                "load_time": summary.load_time.as_secs_f64(),
            },
            "summary_line": summary.totals_line(),
        });

        serde_json::to_writer_pretty(&mut self.output, &document)?;
        writeln!(self.output)
    }

    fn close(&mut self) -> io::Result<()> {
        self.output.close()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
