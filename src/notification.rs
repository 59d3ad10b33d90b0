// Notifications - events delivered by workers and payloads handed to formatters

use std::fmt;
use std::time::Duration;

use crate::state::{Example, Group};

/// One observable occurrence on a worker's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    GroupStarted(Group),
    GroupFinished(Group),
    ExamplePassed(Example),
    ExamplePending(Example),
    ExampleFailed(Example),
    Message(String),
    ErrorOutsideOfExamples(String),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::GroupStarted(_) => "group_started",
            Notification::GroupFinished(_) => "group_finished",
            Notification::ExamplePassed(_) => "example_passed",
            Notification::ExamplePending(_) => "example_pending",
            Notification::ExampleFailed(_) => "example_failed",
            Notification::Message(_) => "message",
            Notification::ErrorOutsideOfExamples(_) => "error_outside_of_examples",
        }
    }
}

/// Payload for `stop`, `dump_pending` and `dump_failures`
#[derive(Debug, Clone, Copy)]
pub struct ExamplesNotification<'a> {
    pub examples: &'a [Example],
    pub failed: &'a [&'a Example],
    pub pending: &'a [&'a Example],
}

/// Payload for `dump_summary`
#[derive(Debug, Clone, Copy)]
pub struct SummaryNotification<'a> {
    pub duration: Duration,
    pub examples: &'a [Example],
    pub failed: &'a [&'a Example],
    pub pending: &'a [&'a Example],
    pub load_time: Duration,
    pub errors_outside_of_examples: usize,
}

impl SummaryNotification<'_> {
    /// "3 examples, 1 failure, 1 pending" style totals line
    pub fn totals_line(&self) -> String {
        let mut line = format!(
            "{}, {}",
            pluralize(self.examples.len(), "example"),
            pluralize(self.failed.len(), "failure")
        );
        if !self.pending.is_empty() {
            line.push_str(&format!(", {} pending", self.pending.len()));
        }
        if self.errors_outside_of_examples > 0 {
            line.push_str(&format!(
                ", {} occurred outside of examples",
                pluralize(self.errors_outside_of_examples, "error")
            ));
        }
        line
    }

    /// "Finished in 1.23 seconds (files took 0.4 seconds to load)"
    pub fn duration_line(&self) -> String {
        format!(
            "Finished in {} (files took {} to load)",
            format_seconds(self.duration),
            format_seconds(self.load_time)
        )
    }
}

/// Informational seed notice written once to the primary output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedNotice {
    pub seed: String,
    pub used: bool,
}

impl fmt::Display for SeedNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.used {
            write!(f, "Randomized with seed {}", self.seed)
        } else {
            write!(f, "Seed {} was not used for ordering", self.seed)
        }
    }
}

pub fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

pub fn format_seconds(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let minutes = (secs / 60.0).floor();
        format!(
            "{} {} seconds",
            pluralize(minutes as usize, "minute"),
            trim_float(secs - minutes * 60.0)
        )
    } else if (secs - 1.0).abs() < f64::EPSILON {
        "1 second".to_string()
    } else {
        format!("{} seconds", trim_float(secs))
    }
}

fn trim_float(value: f64) -> String {
    let precision = if value < 1.0 { 5 } else { 2 };
    let formatted = format!("{:.*}", precision, value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
