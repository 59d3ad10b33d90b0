// CLI argument definitions using Clap

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::report::STDOUT_SENTINEL;
use crate::reporter::FormatterSpec;
use crate::worker::GroupBy;

/// Formatter used when none is declared
pub const DEFAULT_FORMATTER: &str = "progress";

/// Run a test suite in parallel worker processes and report results incrementally
#[derive(Parser, Debug, Clone)]
#[command(name = "turbotests")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Run all tests in parallel, giving each process TEST_ENV_NUMBER ('1', '2', '3', ...)",
    long_about = None
)]
pub struct Cli {
    /// Only selected files & folders (default: spec)
    #[arg(value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// How many processes to use, default: available CPUs
    #[arg(short = 'n', long = "processes", value_name = "PROCESSES")]
    pub processes: Option<usize>,

    /// Require a file in every worker
    #[arg(short = 'r', long = "require", value_name = "PATH")]
    pub requires: Vec<String>,

    /// Choose a formatter. Available formatters: progress (p), documentation (d), json (j), junit, stream
    #[arg(short = 'f', long = "format", value_name = "FORMATTER")]
    pub format: Vec<String>,

    /// Run tests matching this regex pattern
    #[arg(short = 'p', long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Exclude tests matching this regex pattern
    #[arg(long, value_name = "PATTERN")]
    pub exclude_pattern: Option<String>,

    /// Group tests by strategy
    #[arg(long, value_enum, default_value_t = GroupBy::Default)]
    pub group_by: GroupBy,

    /// Run examples with the specified tag
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Write output of the most recent formatter to a file instead of stdout
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    pub out: Vec<String>,

    /// Location of previously recorded test runtimes
    #[arg(long, value_name = "FILE")]
    pub runtime_log: Option<PathBuf>,

    /// More output
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Stop after N failures (default 1)
    #[arg(
        long,
        value_name = "N",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1"
    )]
    pub fail_fast: Option<String>,

    /// Seed for the test engine
    #[arg(long, value_name = "SEED")]
    pub seed: Option<String>,

    /// Show current configuration and exit
    #[arg(long, default_value_t = false)]
    pub config: bool,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Print shell completion (bash, zsh, fish, elvish, powershell)
    #[arg(long, value_name = "SHELL_TYPE", value_parser = ["bash", "zsh", "fish", "elvish", "powershell"])]
    pub completion: Option<String>,
}

/// A `--format` or `--out` occurrence in command line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatterArg {
    Format(String),
    Out(String),
}

impl Cli {
    /// Parse the process arguments, keeping `--format`/`--out` ordering
    pub fn parse_with_formatters() -> (Self, Vec<FormatterSpec>) {
        match Self::try_parse_with_formatters(std::env::args_os()) {
            Ok(parsed) => parsed,
            Err(e) => e.exit(),
        }
    }

    pub fn try_parse_with_formatters<I, T>(
        args: I,
    ) -> Result<(Self, Vec<FormatterSpec>), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let cli = Self::from_arg_matches(&matches)?;

        let mut ordered: Vec<(usize, FormatterArg)> = indexed(&matches, "format")
            .into_iter()
            .map(|(i, name)| (i, FormatterArg::Format(name)))
            .chain(
                indexed(&matches, "out")
                    .into_iter()
                    .map(|(i, file)| (i, FormatterArg::Out(file))),
            )
            .collect();
        ordered.sort_by_key(|(index, _)| *index);

        let specs = formatter_specs(ordered.into_iter().map(|(_, arg)| arg));
        Ok((cli, specs))
    }

    /// Fail-fast threshold; a missing, unparsable or non-positive value means 1
    pub fn fail_fast_threshold(&self) -> Option<usize> {
        self.fail_fast.as_ref().map(|value| {
            value
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .map(|n| n as usize)
                .unwrap_or(1)
        })
    }

    /// Positional paths, or `default_path` when none were given
    pub fn test_paths(&self, default_path: &str) -> Vec<PathBuf> {
        if self.files.is_empty() {
            vec![PathBuf::from(default_path)]
        } else {
            self.files.clone()
        }
    }
}

fn indexed(matches: &ArgMatches, id: &str) -> Vec<(usize, String)> {
    match (matches.indices_of(id), matches.get_many::<String>(id)) {
        (Some(indices), Some(values)) => indices.zip(values.cloned()).collect(),
        _ => Vec::new(),
    }
}

/// Build formatter specs from ordered `--format`/`--out` occurrences.
///
/// `--out` binds to the most recently declared formatter and creates an
/// implicit progress formatter when none was declared yet. Formatters left
/// without an output write to stdout; no declaration at all means one
/// progress formatter on stdout.
pub fn formatter_specs(args: impl IntoIterator<Item = FormatterArg>) -> Vec<FormatterSpec> {
    let mut specs: Vec<FormatterSpec> = Vec::new();

    for arg in args {
        match arg {
            FormatterArg::Format(name) => specs.push(FormatterSpec::new(name)),
            FormatterArg::Out(file) => {
                if specs.is_empty() {
                    specs.push(FormatterSpec::new(DEFAULT_FORMATTER));
                }
                if let Some(last) = specs.last_mut() {
                    last.outputs.push(file);
                }
            }
        }
    }

    if specs.is_empty() {
        specs.push(FormatterSpec::new(DEFAULT_FORMATTER));
    }

    for spec in specs.iter_mut() {
        if spec.outputs.is_empty() {
            spec.outputs.push(STDOUT_SENTINEL.to_string());
        }
    }

    specs
}
