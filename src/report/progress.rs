// Progress formatter - one character per example, details dumped at the end

use std::io::{self, Write};

use console::Style;

use super::{Capability, Formatter, Output};
use crate::notification::{ExamplesNotification, SummaryNotification};
use crate::state::Example;

const LINE_WIDTH: usize = 80;

/// Colors applied only when the sink is a terminal
#[derive(Debug, Clone, Copy)]
pub(crate) struct Palette {
    enabled: bool,
}

impl Palette {
    pub(crate) fn for_output(output: &Output) -> Self {
        Self {
            enabled: output.is_terminal(),
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.enabled {
            style.force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn success(&self, text: &str) -> String {
        self.paint(text, Style::new().green())
    }

    pub(crate) fn failure(&self, text: &str) -> String {
        self.paint(text, Style::new().red())
    }

    pub(crate) fn pending(&self, text: &str) -> String {
        self.paint(text, Style::new().yellow())
    }

    pub(crate) fn detail(&self, text: &str) -> String {
        self.paint(text, Style::new().cyan())
    }
}

/// Progress formatter
pub struct ProgressFormatter {
    name: String,
    output: Output,
    palette: Palette,
    column: usize,
}

impl ProgressFormatter {
    pub fn new(name: impl Into<String>, output: Output) -> Self {
        let palette = Palette::for_output(&output);
        Self {
            name: name.into(),
            output,
            palette,
            column: 0,
        }
    }

    fn tick(&mut self, mark: String) -> io::Result<()> {
        write!(self.output, "{}", mark)?;
        self.column += 1;
        if self.column >= LINE_WIDTH {
            writeln!(self.output)?;
            self.column = 0;
        }
        self.output.flush()
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.column > 0 {
            writeln!(self.output)?;
            self.column = 0;
        }
        Ok(())
    }
}

impl Formatter for ProgressFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[
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

    fn example_passed(&mut self, _example: &Example) -> io::Result<()> {
        let mark = self.palette.success(".");
        self.tick(mark)
    }

    fn example_pending(&mut self, _example: &Example) -> io::Result<()> {
        let mark = self.palette.pending("*");
        self.tick(mark)
    }

    fn example_failed(&mut self, _example: &Example) -> io::Result<()> {
        let mark = self.palette.failure("F");
        self.tick(mark)
    }

    fn message(&mut self, message: &str) -> io::Result<()> {
        self.end_line()?;
        writeln!(self.output, "{}", message)
    }

    fn start_dump(&mut self) -> io::Result<()> {
        self.end_line()
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

pub(crate) fn write_pending(
    out: &mut impl Write,
    palette: Palette,
    pending: &[&Example],
) -> io::Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(
        out,
        "Pending: (Failures listed here are expected and do not affect your suite's status)"
    )?;
    for (index, example) in pending.iter().enumerate() {
        writeln!(out)?;
        writeln!(
            out,
            "  {}) {}",
            index + 1,
            palette.pending(&example.full_description)
        )?;
        let reason = example
            .pending_message
            .as_deref()
            .unwrap_or("No reason given");
        writeln!(out, "     {}", palette.detail(&format!("# {}", reason)))?;
        writeln!(
            out,
            "     {}",
            palette.detail(&format!("# {}", example.rerun_target()))
        )?;
    }
    Ok(())
}

pub(crate) fn write_failures(
    out: &mut impl Write,
    palette: Palette,
    failed: &[&Example],
) -> io::Result<()> {
    if failed.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "Failures:")?;
    for (index, example) in failed.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "  {}) {}", index + 1, example.full_description)?;
        if let Some(failure) = &example.failure {
            let class = failure.class.as_deref().map(|c| format!("{}: ", c));
            for (line_no, line) in failure.message.lines().enumerate() {
                let text = if line_no == 0 {
                    format!("Failure/Error: {}{}", class.as_deref().unwrap_or(""), line)
                } else {
                    format!("  {}", line)
                };
                writeln!(out, "     {}", palette.failure(&text))?;
            }
            for frame in &failure.backtrace {
                writeln!(out, "     {}", palette.detail(&format!("# {}", frame)))?;
            }
        }
        writeln!(
            out,
            "     {}",
            palette.detail(&format!("# {}", example.rerun_target()))
        )?;
    }
    Ok(())
}

pub(crate) fn write_summary(
    out: &mut impl Write,
    palette: Palette,
    summary: &SummaryNotification<'_>,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", summary.duration_line())?;

    let totals = summary.totals_line();
    let totals = if !summary.failed.is_empty() || summary.errors_outside_of_examples > 0 {
        palette.failure(&totals)
    } else if !summary.pending.is_empty() {
        palette.pending(&totals)
    } else {
        palette.success(&totals)
    };
    writeln!(out, "{}", totals)?;

    if !summary.failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed examples:")?;
        writeln!(out)?;
        for example in summary.failed {
            writeln!(
                out,
                "{} {}",
                palette.failure(&format!("rspec {}", example.rerun_target())),
                palette.detail(&format!("# {}", example.full_description))
            )?;
        }
    }
    writeln!(out)?;
    out.flush()
}
