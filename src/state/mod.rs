// State module - run state owned by the reporter
// Append-only record of every example outcome plus derived failed/pending views

pub mod example;

pub use example::{Example, ExampleStatus, Failure, Group};

use serde::Serialize;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Mutable state of one run. Created at run start and mutated only by the reporter.
#[derive(Debug)]
pub struct RunState {
    start: Instant,
    end: Option<Instant>,
    load_time: Duration,
    examples: Vec<Example>,
    ids: HashSet<String>,
    failed: Vec<usize>,
    pending: Vec<usize>,
    messages: Vec<String>,
    errors_outside_of_examples: usize,
}

impl RunState {
    pub fn new(start: Instant) -> Self {
        Self {
            start,
            end: None,
            load_time: Duration::ZERO,
            examples: Vec::new(),
            ids: HashSet::new(),
            failed: Vec::new(),
            pending: Vec::new(),
            messages: Vec::new(),
            errors_outside_of_examples: 0,
        }
    }

    /// Append an example. Returns `false` and leaves the state untouched when
    /// the id was already recorded.
    pub fn record(&mut self, example: Example) -> bool {
        if !self.ids.insert(example.id.clone()) {
            return false;
        }

        let index = self.examples.len();
        match example.status {
            ExampleStatus::Failed => self.failed.push(index),
            ExampleStatus::Pending => self.pending.push(index),
            ExampleStatus::Passed => {}
        }
        self.examples.push(example);
        true
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn add_error_outside_of_examples(&mut self) {
        self.errors_outside_of_examples += 1;
    }

    /// Keep the slowest load time reported by any worker.
    pub fn observe_load_time(&mut self, load_time: Duration) {
        self.load_time = self.load_time.max(load_time);
    }

    /// Stamp the end time. Later calls keep the first stamp.
    pub fn mark_finished(&mut self, now: Instant) -> Duration {
        let end = *self.end.get_or_insert(now);
        end.saturating_duration_since(self.start)
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn failed(&self) -> Vec<&Example> {
        self.failed.iter().map(|&i| &self.examples[i]).collect()
    }

    pub fn pending(&self) -> Vec<&Example> {
        self.pending.iter().map(|&i| &self.examples[i]).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn passed_count(&self) -> usize {
        self.examples.len() - self.failed.len() - self.pending.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn errors_outside_of_examples(&self) -> usize {
        self.errors_outside_of_examples
    }

    pub fn load_time(&self) -> Duration {
        self.load_time
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn summary(&self, duration: Duration) -> RunSummary {
        RunSummary {
            total: self.examples.len(),
            passed: self.passed_count(),
            failed: self.failed_count(),
            pending: self.pending_count(),
            errors_outside_of_examples: self.errors_outside_of_examples,
            duration,
            load_time: self.load_time,
        }
    }
}

/// Final counts produced once by `Reporter::finish`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub errors_outside_of_examples: usize,
    pub duration: Duration,
    pub load_time: Duration,
}

impl RunSummary {
    /// Check if the aggregated run has no failures of any kind
    pub fn success(&self) -> bool {
        self.failed == 0 && self.errors_outside_of_examples == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RunState {
        RunState::new(Instant::now())
    }

    #[test]
    fn test_record_partitions_by_status() {
        let mut state = state();
        assert!(state.record(Example::passed("a", "a", Duration::ZERO)));
        assert!(state.record(Example::failed("b", "b", "boom", Duration::ZERO)));
        assert!(state.record(Example::pending("c", "c", "later")));

        assert_eq!(state.examples().len(), 3);
        assert_eq!(state.passed_count(), 1);
        assert_eq!(state.failed()[0].id, "b");
        assert_eq!(state.pending()[0].id, "c");
    }

    #[test]
    fn test_record_rejects_duplicate_id() {
        let mut state = state();
        assert!(state.record(Example::failed("a", "a", "boom", Duration::ZERO)));
        assert!(!state.record(Example::passed("a", "a", Duration::ZERO)));
        assert_eq!(state.examples().len(), 1);
        assert_eq!(state.failed_count(), 1);
    }

    #[test]
    fn test_errors_outside_do_not_create_examples() {
        let mut state = state();
        state.add_error_outside_of_examples();
        state.add_error_outside_of_examples();
        assert!(state.examples().is_empty());
        assert_eq!(state.errors_outside_of_examples(), 2);
        assert!(!state.summary(Duration::ZERO).success());
    }

    #[test]
    fn test_load_time_keeps_maximum() {
        let mut state = state();
        state.observe_load_time(Duration::from_millis(300));
        state.observe_load_time(Duration::from_millis(100));
        assert_eq!(state.load_time(), Duration::from_millis(300));
    }

    #[test]
    fn test_mark_finished_is_stable() {
        let start = Instant::now();
        let mut state = RunState::new(start);
        let first = state.mark_finished(start + Duration::from_secs(2));
        let second = state.mark_finished(start + Duration::from_secs(5));
        assert_eq!(first, Duration::from_secs(2));
        assert_eq!(second, first);
    }
}
