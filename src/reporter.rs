//! Reporter - the single consumer of the merged worker event stream.
//!
//! Every notification mutates [`RunState`] first and is then fanned out to the
//! registered formatters in registration order. Formatters only receive the
//! hooks they declare in [`Formatter::capabilities`]. A hook returning an error
//! aborts the run with [`Error::Render`].

use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{ConfigError, Error, Result};
use crate::notification::{ExamplesNotification, Notification, SeedNotice, SummaryNotification};
use crate::report::{Capability, Formatter, FormatterRegistry, Output};
use crate::state::{Example, ExampleStatus, Group, RunState, RunSummary};

/// A formatter kind bound to one or more destinations (`-` is stdout)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSpec {
    pub name: String,
    pub outputs: Vec<String>,
}

impl FormatterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Vec::new(),
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.outputs.push(output.into());
        self
    }
}

pub struct Reporter {
    formatters: Vec<Box<dyn Formatter>>,
    state: RunState,
    primary: Output,
    fail_fast: Option<usize>,
    summary: Option<RunSummary>,
}

impl Reporter {
    /// Reporter with no formatters, writing notices to stdout
    pub fn new(start: Instant) -> Self {
        Self {
            formatters: Vec::new(),
            state: RunState::new(start),
            primary: Output::stdout(),
            fail_fast: None,
            summary: None,
        }
    }

    /// Resolve every formatter spec against `registry`, then open the outputs.
    ///
    /// All names are checked before any file is created so an unknown
    /// formatter never leaves a truncated output behind.
    pub fn from_specs(
        specs: &[FormatterSpec],
        registry: &FormatterRegistry,
        start: Instant,
    ) -> Result<Self, ConfigError> {
        for spec in specs {
            registry.ensure_known(&spec.name)?;
        }

        let mut reporter = Self::new(start);
        for spec in specs {
            let outputs = spec
                .outputs
                .iter()
                .map(|destination| Output::open(destination))
                .collect::<Result<Vec<_>, _>>()?;
            reporter.register(&spec.name, outputs, registry)?;
        }
        Ok(reporter)
    }

    /// Bind `name` to each output; one formatter instance per output
    pub fn register(
        &mut self,
        name: &str,
        outputs: Vec<Output>,
        registry: &FormatterRegistry,
    ) -> Result<(), ConfigError> {
        registry.ensure_known(name)?;
        for output in outputs {
            debug!("Registering formatter '{}' -> {}", name, output.label());
            let formatter = registry.create(name, output)?;
            self.formatters.push(formatter);
        }
        Ok(())
    }

    /// Add an already constructed formatter
    pub fn add_formatter(&mut self, formatter: Box<dyn Formatter>) {
        self.formatters.push(formatter);
    }

    /// Destination for the seed notice
    pub fn with_primary_output(mut self, output: Output) -> Self {
        self.primary = output;
        self
    }

    pub fn with_fail_fast(mut self, threshold: Option<usize>) -> Self {
        self.fail_fast = threshold;
        self
    }

    pub fn formatter_names(&self) -> Vec<&str> {
        self.formatters.iter().map(|f| f.name()).collect()
    }

    pub fn formatter_count(&self) -> usize {
        self.formatters.len()
    }

    /// Apply one notification to the run state and fan it out
    pub fn handle(&mut self, notification: Notification) -> Result<()> {
        trace!("Handling {}", notification.kind());
        match notification {
            Notification::GroupStarted(group) => self.group_started(&group),
            Notification::GroupFinished(group) => self.group_finished(&group),
            Notification::ExamplePassed(example) => self.example_passed(example),
            Notification::ExamplePending(example) => self.example_pending(example),
            Notification::ExampleFailed(example) => self.example_failed(example),
            Notification::Message(message) => self.message(message),
            Notification::ErrorOutsideOfExamples(message) => {
                debug!("Error outside of examples: {}", message);
                self.error_outside_of_examples();
                Ok(())
            }
        }
    }

    pub fn group_started(&mut self, group: &Group) -> Result<()> {
        dispatch(&mut self.formatters, Capability::GroupStarted, |f| {
            f.group_started(group)
        })
    }

    pub fn group_finished(&mut self, group: &Group) -> Result<()> {
        dispatch(&mut self.formatters, Capability::GroupFinished, |f| {
            f.group_finished(group)
        })
    }

    pub fn example_passed(&mut self, example: Example) -> Result<()> {
        self.record(example, ExampleStatus::Passed, Capability::ExamplePassed)
    }

    pub fn example_pending(&mut self, example: Example) -> Result<()> {
        self.record(example, ExampleStatus::Pending, Capability::ExamplePending)
    }

    pub fn example_failed(&mut self, example: Example) -> Result<()> {
        self.record(example, ExampleStatus::Failed, Capability::ExampleFailed)
    }

    fn record(
        &mut self,
        mut example: Example,
        status: ExampleStatus,
        capability: Capability,
    ) -> Result<()> {
        example.status = status;
        let id = example.id.clone();
        if !self.state.record(example) {
            return Err(Error::DuplicateExample(id));
        }

        let Some(example) = self.state.examples().last() else {
            return Ok(());
        };
        dispatch(&mut self.formatters, capability, |f| match status {
            ExampleStatus::Passed => f.example_passed(example),
            ExampleStatus::Pending => f.example_pending(example),
            ExampleStatus::Failed => f.example_failed(example),
        })
    }

    pub fn message(&mut self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.state.push_message(message.clone());
        dispatch(&mut self.formatters, Capability::Message, |f| {
            f.message(&message)
        })
    }

    pub fn error_outside_of_examples(&mut self) {
        self.state.add_error_outside_of_examples();
    }

    pub fn set_load_time(&mut self, load_time: Duration) {
        self.state.observe_load_time(load_time);
    }

    /// Fail-fast query. Never turns false again once true.
    pub fn should_stop(&self) -> bool {
        self.fail_fast
            .is_some_and(|threshold| self.state.failed_count() >= threshold)
    }

    /// Run the finish sequence once and return the summary.
    ///
    /// Hooks run in the order stop, start_dump, dump_pending, dump_failures,
    /// dump_summary, close. A second call returns the same summary without
    /// touching the formatters.
    pub fn finish(&mut self) -> Result<RunSummary> {
        if let Some(summary) = self.summary {
            return Ok(summary);
        }

        let duration = self.state.mark_finished(Instant::now());
        let summary = self.state.summary(duration);
        self.summary = Some(summary);

        let state = &self.state;
        let failed = state.failed();
        let pending = state.pending();
        let examples = ExamplesNotification {
            examples: state.examples(),
            failed: &failed,
            pending: &pending,
        };
        let totals = SummaryNotification {
            duration,
            examples: state.examples(),
            failed: &failed,
            pending: &pending,
            load_time: state.load_time(),
            errors_outside_of_examples: state.errors_outside_of_examples(),
        };

        let formatters = &mut self.formatters;
        dispatch(formatters, Capability::Stop, |f| f.stop(&examples))?;
        dispatch(formatters, Capability::StartDump, |f| f.start_dump())?;
        dispatch(formatters, Capability::DumpPending, |f| f.dump_pending(&examples))?;
        dispatch(formatters, Capability::DumpFailures, |f| {
            f.dump_failures(&examples)
        })?;
        dispatch(formatters, Capability::DumpSummary, |f| f.dump_summary(&totals))?;
        dispatch(formatters, Capability::Close, |f| f.close())?;

        debug!(
            "Run finished: {} examples, {} failures, {} pending",
            summary.total, summary.failed, summary.pending
        );
        Ok(summary)
    }

    /// Best-effort flush of every formatter after a fatal error
    pub fn abort(&mut self) {
        for formatter in self.formatters.iter_mut() {
            if let Err(e) = formatter.flush() {
                warn!("Failed to flush formatter '{}': {}", formatter.name(), e);
            }
        }
        let _ = self.primary.flush();
    }

    /// Write the seed notice once to the primary output, bypassing formatters
    pub fn emit_seed_notice(&mut self, seed: &str, used: bool) -> io::Result<()> {
        let notice = SeedNotice {
            seed: seed.to_string(),
            used,
        };
        writeln!(self.primary, "{}", notice)?;
        writeln!(self.primary)?;
        self.primary.flush()
    }

    pub fn examples(&self) -> &[Example] {
        self.state.examples()
    }

    pub fn failed_examples(&self) -> Vec<&Example> {
        self.state.failed()
    }

    pub fn pending_examples(&self) -> Vec<&Example> {
        self.state.pending()
    }

    pub fn messages(&self) -> &[String] {
        self.state.messages()
    }

    pub fn errors_outside_of_examples(&self) -> usize {
        self.state.errors_outside_of_examples()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }
}

fn dispatch(
    formatters: &mut [Box<dyn Formatter>],
    capability: Capability,
    mut call: impl FnMut(&mut dyn Formatter) -> io::Result<()>,
) -> Result<()> {
    for formatter in formatters.iter_mut() {
        if !formatter.supports(capability) {
            continue;
        }
        call(formatter.as_mut()).map_err(|source| Error::Render {
            formatter: formatter.name().to_string(),
            hook: capability,
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SharedBuffer;

    fn reporter() -> Reporter {
        Reporter::new(Instant::now())
    }

    #[test]
    fn test_status_is_set_by_the_hook() {
        let mut reporter = reporter();
        reporter
            .example_failed(Example::passed("a", "a", Duration::ZERO))
            .expect("record");
        assert_eq!(reporter.examples()[0].status, ExampleStatus::Failed);
        assert_eq!(reporter.failed_examples().len(), 1);
    }

    #[test]
    fn test_duplicate_example_is_rejected() {
        let mut reporter = reporter();
        reporter
            .example_passed(Example::passed("a", "a", Duration::ZERO))
            .expect("first");
        let err = reporter
            .example_failed(Example::passed("a", "a", Duration::ZERO))
            .expect_err("duplicate");
        assert!(matches!(err, Error::DuplicateExample(ref id) if id == "a"));
        assert_eq!(reporter.examples().len(), 1);
        assert!(reporter.failed_examples().is_empty());
    }

    #[test]
    fn test_fail_fast_is_monotonic() {
        let mut reporter = reporter().with_fail_fast(Some(2));
        assert!(!reporter.should_stop());
        reporter
            .example_failed(Example::passed("a", "a", Duration::ZERO))
            .expect("a");
        assert!(!reporter.should_stop());
        reporter
            .example_failed(Example::passed("b", "b", Duration::ZERO))
            .expect("b");
        assert!(reporter.should_stop());
        reporter
            .example_passed(Example::passed("c", "c", Duration::ZERO))
            .expect("c");
        assert!(reporter.should_stop());
    }

    #[test]
    fn test_without_threshold_never_stops() {
        let mut reporter = reporter();
        reporter
            .example_failed(Example::passed("a", "a", Duration::ZERO))
            .expect("a");
        assert!(!reporter.should_stop());
    }

    #[test]
    fn test_seed_notice_goes_to_primary_only() {
        let primary = SharedBuffer::new();
        let sink = SharedBuffer::new();
        let registry = FormatterRegistry::with_builtins();
        let mut reporter = reporter().with_primary_output(Output::writer("primary", primary.clone()));
        reporter
            .register("progress", vec![Output::writer("sink", sink.clone())], &registry)
            .expect("register");

        reporter.emit_seed_notice("4242", true).expect("notice");

        assert_eq!(primary.contents(), "Randomized with seed 4242\n\n");
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_finish_twice_reuses_summary() {
        let mut reporter = reporter();
        reporter
            .example_passed(Example::passed("a", "a", Duration::ZERO))
            .expect("a");
        let first = reporter.finish().expect("finish");
        let second = reporter.finish().expect("finish again");
        assert_eq!(first, second);
        assert_eq!(first.total, 1);
        assert!(first.success());
    }
}
