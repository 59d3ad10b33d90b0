// Documentation formatter - nested group/example tree

use std::io::{self, Write};

use super::progress::{Palette, write_failures, write_pending, write_summary};
use super::{Capability, Formatter, Output};
use crate::notification::{ExamplesNotification, SummaryNotification};
use crate::state::{Example, Group};

/// Documentation formatter
///
/// Indentation follows the `level` of the most recent group event. Groups from
/// different workers may interleave, so the tree is only exact for one worker.
pub struct DocumentationFormatter {
    name: String,
    output: Output,
    palette: Palette,
    depth: usize,
    failure_index: usize,
}

impl DocumentationFormatter {
    pub fn new(name: impl Into<String>, output: Output) -> Self {
        let palette = Palette::for_output(&output);
        Self {
            name: name.into(),
            output,
            palette,
            depth: 0,
            failure_index: 0,
        }
    }

    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Formatter for DocumentationFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
            Capability::GroupStarted,
            Capability::GroupFinished,
            Capability::ExamplePassed,
            Capability::ExamplePending,
            Capability::ExampleFailed,
            Capability::Message,
            Capability::StartDump,
            Capability::DumpPending,
            Capability::DumpFailures,
            Capability::DumpSummary,
            Capability::Close,
        ]
    }

    fn group_started(&mut self, group: &Group) -> io::Result<()> {
        self.depth = group.level;
        if self.depth == 0 {
            writeln!(self.output)?;
        }
        writeln!(self.output, "{}{}", self.indent(), group.description)?;
        self.depth = group.level + 1;
        Ok(())
    }

    fn group_finished(&mut self, group: &Group) -> io::Result<()> {
        self.depth = group.level;
        Ok(())
    }

    fn example_passed(&mut self, example: &Example) -> io::Result<()> {
        let line = self.palette.success(&example.description);
        writeln!(self.output, "{}{}", self.indent(), line)
    }

    fn example_pending(&mut self, example: &Example) -> io::Result<()> {
        let reason = example
            .pending_message
            .as_deref()
            .unwrap_or("No reason given");
        let line = self
            .palette
            .pending(&format!("{} (PENDING: {})", example.description, reason));
        writeln!(self.output, "{}{}", self.indent(), line)
    }

    fn example_failed(&mut self, example: &Example) -> io::Result<()> {
        self.failure_index += 1;
        let line = self.palette.failure(&format!(
            "{} (FAILED - {})",
            example.description, self.failure_index
        ));
        writeln!(self.output, "{}{}", self.indent(), line)
    }

    fn message(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    fn start_dump(&mut self) -> io::Result<()> {
        self.depth = 0;
        Ok(())
    }

    fn dump_pending(&mut self, notification: &ExamplesNotification<'_>) -> io::Result<()> {
        write_pending(&mut self.output, self.palette, notification.pending)
    }

    fn dump_failures(&mut self, notification: &ExamplesNotification<'_>) -> io::Result<()> {
        write_failures(&mut self.output, self.palette, notification.failed)
    }

    fn dump_summary(&mut self, summary: &SummaryNotification<'_>) -> io::Result<()> {
        write_summary(&mut self.output, self.palette, summary)
    }

    fn close(&mut self) -> io::Result<()> {
        self.output.close()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SharedBuffer;
    use std::time::Duration;

    #[test]
    fn test_documentation_tree() {
        let buffer = SharedBuffer::new();
        let mut formatter =
            DocumentationFormatter::new("documentation", Output::writer("buf", buffer.clone()));

        formatter.group_started(&Group::new("Calculator", 0)).expect("group");
        formatter.group_started(&Group::new("#add", 1)).expect("group");
        formatter
            .example_passed(&Example::passed("1", "adds numbers", Duration::ZERO))
            .expect("passed");
        formatter
            .example_failed(&Example::failed("2", "overflows", "boom", Duration::ZERO))
            .expect("failed");
        formatter.group_finished(&Group::new("#add", 1)).expect("group");
        formatter
            .example_pending(&Example::pending("3", "divides", "todo"))
            .expect("pending");

        assert_eq!(
            buffer.contents(),
            "\nCalculator\n  #add\n    adds numbers\n    overflows (FAILED - 1)\n  divides (PENDING: todo)\n"
        );
    }
}
