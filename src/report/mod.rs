// Report module - formatter sinks and the capability protocol

pub mod documentation;
pub mod json;
pub mod junit;
pub mod output;
pub mod progress;
pub mod registry;
pub mod streaming;

use std::fmt;
use std::io;

use crate::notification::{ExamplesNotification, SummaryNotification};
use crate::state::{Example, Group};

pub use documentation::DocumentationFormatter;
pub use json::JsonFormatter;
pub use junit::JunitFormatter;
pub use output::{Output, SharedBuffer, STDOUT_SENTINEL};
pub use progress::ProgressFormatter;
pub use registry::{FormatterConstructor, FormatterRegistry};
pub use streaming::StreamingJsonFormatter;

/// Hooks a formatter may opt into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GroupStarted,
    GroupFinished,
    ExamplePassed,
    ExamplePending,
    ExampleFailed,
    Message,
    Stop,
    StartDump,
    DumpPending,
    DumpFailures,
    DumpSummary,
    Close,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::GroupStarted,
        Capability::GroupFinished,
        Capability::ExamplePassed,
        Capability::ExamplePending,
        Capability::ExampleFailed,
        Capability::Message,
        Capability::Stop,
        Capability::StartDump,
        Capability::DumpPending,
        Capability::DumpFailures,
        Capability::DumpSummary,
        Capability::Close,
    ];

    /// Hooks run by `Reporter::finish`, in the order they are invoked
    pub const FINISH_SEQUENCE: &'static [Capability] = &[
        Capability::Stop,
        Capability::StartDump,
        Capability::DumpPending,
        Capability::DumpFailures,
        Capability::DumpSummary,
        Capability::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GroupStarted => "group_started",
            Capability::GroupFinished => "group_finished",
            Capability::ExamplePassed => "example_passed",
            Capability::ExamplePending => "example_pending",
            Capability::ExampleFailed => "example_failed",
            Capability::Message => "message",
            Capability::Stop => "stop",
            Capability::StartDump => "start_dump",
            Capability::DumpPending => "dump_pending",
            Capability::DumpFailures => "dump_failures",
            Capability::DumpSummary => "dump_summary",
            Capability::Close => "close",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renderer bound to one output destination.
///
/// Every hook is optional. The reporter only calls hooks listed in
/// [`Formatter::capabilities`]; the default bodies do nothing so an
/// implementation only writes the hooks it declares.
pub trait Formatter: Send {
    /// Registry name this formatter was created under
    fn name(&self) -> &str;

    /// Hooks this formatter wants to receive
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    fn group_started(&mut self, _group: &Group) -> io::Result<()> {
        Ok(())
    }

    fn group_finished(&mut self, _group: &Group) -> io::Result<()> {
        Ok(())
    }

    fn example_passed(&mut self, _example: &Example) -> io::Result<()> {
        Ok(())
    }

    fn example_pending(&mut self, _example: &Example) -> io::Result<()> {
        Ok(())
    }

    fn example_failed(&mut self, _example: &Example) -> io::Result<()> {
        Ok(())
    }

    fn message(&mut self, _message: &str) -> io::Result<()> {
        Ok(())
    }

    fn stop(&mut self, _notification: &ExamplesNotification<'_>) -> io::Result<()> {
        Ok(())
    }

    fn start_dump(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn dump_pending(&mut self, _notification: &ExamplesNotification<'_>) -> io::Result<()> {
        Ok(())
    }

    fn dump_failures(&mut self, _notification: &ExamplesNotification<'_>) -> io::Result<()> {
        Ok(())
    }

    fn dump_summary(&mut self, _summary: &SummaryNotification<'_>) -> io::Result<()> {
        Ok(())
    }

    /// Flush and release the output. Called at most once.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Best-effort flush used when a run aborts before `close`
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
