use chrono::Local;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Diagnostics go to stderr; stdout belongs to the formatters.
pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let timestamp = Local::now().format("%H:%M:%S");

        let (emoji, level_str) = match *metadata.level() {
            tracing::Level::TRACE => ("🔬", "TRACE"),
            tracing::Level::DEBUG => ("🐛", "DEBUG"),
            tracing::Level::INFO => ("ℹ️ ", "INFO"),
            tracing::Level::WARN => ("⚠️ ", "WARN"),
            tracing::Level::ERROR => ("❌", "ERROR"),
        };

        write!(writer, "{} {} [{}]: ", emoji, level_str, timestamp)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Default filter directive for the given verbosity
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "turbotests=debug,warn"
    } else {
        "turbotests=warn,error"
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .event_format(CustomFormatter)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_follows_verbosity() {
        assert_eq!(default_filter(true), "turbotests=debug,warn");
        assert_eq!(default_filter(false), "turbotests=warn,error");
    }
}
