use serde_json::{Value, json};
use std::io::{self, Write};

use super::json::example_json;
use super::{Capability, Formatter, Output};
use crate::notification::{ExamplesNotification, SummaryNotification};
use crate::state::{Example, Group};

/// Newline-delimited JSON, one object per hook invocation
pub struct StreamingJsonFormatter {
    name: String,
    output: Output,
}

impl StreamingJsonFormatter {
    pub fn new(name: impl Into<String>, output: Output) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }

    fn emit(&mut self, mut event: Value) -> io::Result<()> {
        event["timestamp"] = json!(chrono::Utc::now().to_rfc3339());
        serde_json::to_writer(&mut self.output, &event)?;
        writeln!(self.output)?;
        self.output.flush()
    }

    fn emit_examples(&mut self, event: &str, examples: &[&Example]) -> io::Result<()> {
        let ids: Vec<&str> = examples.iter().map(|e| e.id.as_str()).collect();
        self.emit(json!({ "event": event, "examples": ids }))
    }
}

impl Formatter for StreamingJsonFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        Capability::ALL
    }

    fn group_started(&mut self, group: &Group) -> io::Result<()> {
        self.emit(json!({
            "event": "group_started",
            "description": group.description,
            "level": group.level,
        }))
    }

    fn group_finished(&mut self, group: &Group) -> io::Result<()> {
        self.emit(json!({
            "event": "group_finished",
            "description": group.description,
            "level": group.level,
        }))
    }

    fn example_passed(&mut self, example: &Example) -> io::Result<()> {
        self.emit(json!({ "event": "example_passed", "example": example_json(example) }))
    }

    fn example_pending(&mut self, example: &Example) -> io::Result<()> {
        self.emit(json!({ "event": "example_pending", "example": example_json(example) }))
    }

    fn example_failed(&mut self, example: &Example) -> io::Result<()> {
        self.emit(json!({ "event": "example_failed", "example": example_json(example) }))
    }

    fn message(&mut self, message: &str) -> io::Result<()> {
        self.emit(json!({ "event": "message", "message": message }))
    }

    fn stop(&mut self, notification: &ExamplesNotification<'_>) -> io::Result<()> {
        self.emit(json!({ "event": "stop", "example_count": notification.examples.len() }))
    }

    fn start_dump(&mut self) -> io::Result<()> {
        self.emit(json!({ "event": "start_dump" }))
    }

    fn dump_pending(&mut self, notification: &ExamplesNotification<'_>) -> io::Result<()> {
        self.emit_examples("dump_pending", notification.pending)
    }

    fn dump_failures(&mut self, notification: &ExamplesNotification<'_>) -> io::Result<()> {
        self.emit_examples("dump_failures", notification.failed)
    }

    fn dump_summary(&mut self, summary: &SummaryNotification<'_>) -> io::Result<()> {
        self.emit(json!({
            "event": "dump_summary",
            "summary": {
                "duration": summary.duration.as_secs_f64(),
                "example_count": summary.examples.len(),
                "failure_count": summary.failed.len(),
                "pending_count": summary.pending.len(),
                "errors_outside_of_examples_count": summary.errors_outside_of_examples,
                "load_time": summary.load_time.as_secs_f64(),
            }
        }))
    }

    fn close(&mut self) -> io::Result<()> {
        self.emit(json!({ "event": "close" }))?;
        self.output.close()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
