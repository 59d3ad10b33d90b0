// JUnit formatter - outputs results in JUnit XML format after the run

use super::{Capability, Formatter, Output};
use crate::notification::SummaryNotification;
use crate::state::ExampleStatus;
use std::io::{self, Write};

/// JUnit formatter
pub struct JunitFormatter {
    name: String,
    output: Output,
}

impl JunitFormatter {
    pub fn new(name: impl Into<String>, output: Output) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Class name derived from the spec file part of the location
fn classname(location: &str) -> String {
    let file = location.split(':').next().unwrap_or(location);
    let file = file.trim_start_matches("./");
    let file = file.strip_suffix(".rb").unwrap_or(file);
    file.replace('/', ".")
}

impl Formatter for JunitFormatter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::DumpSummary, Capability::Close]
    }

    fn dump_summary(&mut self, summary: &SummaryNotification<'_>) -> io::Result<()> {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuite name=\"turbotests\" tests=\"{}\" skipped=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.6}\" timestamp=\"{}\">\n",
            summary.examples.len(),
            summary.pending.len(),
            summary.failed.len(),
            summary.errors_outside_of_examples,
            summary.duration.as_secs_f64(),
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
        ));

        for example in summary.examples {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\" file=\"{}\" time=\"{:.6}\">\n",
                escape(&classname(&example.location)),
                escape(&example.full_description),
                escape(example.rerun_target()),
                example.duration.as_secs_f64()
            ));

            match example.status {
                ExampleStatus::Failed => {
                    let failure = example.failure.clone().unwrap_or_default();
                    let kind = failure.class.as_deref().unwrap_or("Failure");
                    xml.push_str(&format!(
                        "    <failure message=\"{}\" type=\"{}\">{}</failure>\n",
                        escape(&failure.message),
                        escape(kind),
                        escape(&failure.backtrace.join("\n"))
                    ));
                }
                ExampleStatus::Pending => {
                    let reason = example.pending_message.as_deref().unwrap_or("pending");
                    xml.push_str(&format!("    <skipped message=\"{}\"/>\n", escape(reason)));
                }
                ExampleStatus::Passed => {}
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        self.output.write_all(xml.as_bytes())
    }

    fn close(&mut self) -> io::Result<()> {
        self.output.close()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}
