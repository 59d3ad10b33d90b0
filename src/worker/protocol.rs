// Worker wire protocol - newline-delimited JSON written by each worker to stdout

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::notification::Notification;
use crate::state::{Example, ExampleStatus, Failure, Group};

/// Example as serialized by the worker
#[derive(Debug, Clone, Deserialize)]
pub struct ExamplePayload {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub run_time: f64,
    #[serde(default)]
    pub pending_message: Option<String>,
    #[serde(default)]
    pub exception: Option<Failure>,
}

impl ExamplePayload {
    pub fn into_example(self, status: ExampleStatus) -> Example {
        let full_description = if self.full_description.is_empty() {
            self.description.clone()
        } else {
            self.full_description
        };
        Example {
            id: self.id,
            description: self.description,
            full_description,
            location: self.location,
            status,
            duration: seconds(self.run_time),
            failure: self.exception,
            pending_message: self.pending_message,
        }
    }
}

/// One protocol line
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    GroupStarted {
        group: Group,
    },
    GroupFinished {
        group: Group,
    },
    ExamplePassed {
        example: ExamplePayload,
    },
    ExamplePending {
        example: ExamplePayload,
    },
    ExampleFailed {
        example: ExamplePayload,
    },
    Message {
        message: String,
    },
    ErrorOutsideOfExamples {
        #[serde(default)]
        message: String,
    },
    LoadSummary {
        load_time: f64,
    },
    Seed {
        seed: Value,
        #[serde(default)]
        used: bool,
    },
    Close,
}

/// What a worker task forwards to the multiplexer
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Notification(Notification),
    LoadTime(Duration),
    Seed {
        seed: String,
        used: bool,
    },
    /// The worker sent its close marker
    Closed,
    /// The worker process ended
    Exited {
        success: bool,
        code: Option<i32>,
        stopped: bool,
    },
    /// The stream broke; fatal for the run
    Failed(String),
}

impl From<WorkerMessage> for WorkerEvent {
    fn from(message: WorkerMessage) -> Self {
        match message {
            WorkerMessage::GroupStarted { group } => {
                WorkerEvent::Notification(Notification::GroupStarted(group))
            }
            WorkerMessage::GroupFinished { group } => {
                WorkerEvent::Notification(Notification::GroupFinished(group))
            }
            WorkerMessage::ExamplePassed { example } => WorkerEvent::Notification(
                Notification::ExamplePassed(example.into_example(ExampleStatus::Passed)),
            ),
            WorkerMessage::ExamplePending { example } => WorkerEvent::Notification(
                Notification::ExamplePending(example.into_example(ExampleStatus::Pending)),
            ),
            WorkerMessage::ExampleFailed { example } => WorkerEvent::Notification(
                Notification::ExampleFailed(example.into_example(ExampleStatus::Failed)),
            ),
            WorkerMessage::Message { message } => {
                WorkerEvent::Notification(Notification::Message(message))
            }
            WorkerMessage::ErrorOutsideOfExamples { message } => {
                WorkerEvent::Notification(Notification::ErrorOutsideOfExamples(message))
            }
            WorkerMessage::LoadSummary { load_time } => WorkerEvent::LoadTime(seconds(load_time)),
            WorkerMessage::Seed { seed, used } => WorkerEvent::Seed {
                seed: match seed {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                used,
            },
            WorkerMessage::Close => WorkerEvent::Closed,
        }
    }
}

/// Parse one stdout line.
///
/// Blank lines yield `None`. Lines that do not start with `{` are plain
/// output and become messages. A `{` line that does not parse is an error.
pub fn parse_line(line: &str) -> Result<Option<WorkerEvent>, String> {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return Ok(None);
    }

    if !trimmed.trim_start().starts_with('{') {
        return Ok(Some(WorkerEvent::Notification(Notification::Message(
            trimmed.to_string(),
        ))));
    }

    serde_json::from_str::<WorkerMessage>(trimmed)
        .map(|message| Some(message.into()))
        .map_err(|e| format!("malformed protocol line ({}): {}", e, truncate(trimmed, 120)))
}

fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
