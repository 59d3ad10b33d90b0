// Example records - one per test case outcome

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a single example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleStatus {
    Passed,
    Failed,
    Pending,
}

impl ExampleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExampleStatus::Passed => "passed",
            ExampleStatus::Failed => "failed",
            ExampleStatus::Pending => "pending",
        }
    }
}

/// Failure detail reported by the worker
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Failure {
    #[serde(default)]
    pub class: Option<String>,
    pub message: String,
    #[serde(default)]
    pub backtrace: Vec<String>,
}

/// Recorded example
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub id: String,
    pub description: String,
    pub full_description: String,
    pub location: String,
    pub status: ExampleStatus,
    pub duration: Duration,
    pub failure: Option<Failure>,
    pub pending_message: Option<String>,
}

impl Example {
    /// Create a passed example
    pub fn passed(id: impl Into<String>, description: impl Into<String>, duration: Duration) -> Self {
        let description = description.into();
        Self {
            id: id.into(),
            full_description: description.clone(),
            description,
            location: String::new(),
            status: ExampleStatus::Passed,
            duration,
            failure: None,
            pending_message: None,
        }
    }

    /// Create a failed example
    pub fn failed(
        id: impl Into<String>,
        description: impl Into<String>,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            status: ExampleStatus::Failed,
            failure: Some(Failure {
                class: None,
                message: message.into(),
                backtrace: Vec::new(),
            }),
            ..Self::passed(id, description, duration)
        }
    }

    /// Create a pending example
    pub fn pending(
        id: impl Into<String>,
        description: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: ExampleStatus::Pending,
            pending_message: Some(reason.into()),
            ..Self::passed(id, description, Duration::ZERO)
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_full_description(mut self, full_description: impl Into<String>) -> Self {
        self.full_description = full_description.into();
        self
    }

    /// Location used by re-run hints, falling back to the id.
    pub fn rerun_target(&self) -> &str {
        if self.location.is_empty() {
            &self.id
        } else {
            &self.location
        }
    }
}

/// Example group (a `describe`/`context` block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub description: String,
    #[serde(default)]
    pub level: usize,
}

impl Group {
    pub fn new(description: impl Into<String>, level: usize) -> Self {
        Self {
            description: description.into(),
            level,
        }
    }
}
