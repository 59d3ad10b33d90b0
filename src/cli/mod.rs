// CLI module - command line surface

pub mod args;

pub use args::{Cli, DEFAULT_FORMATTER, FormatterArg, formatter_specs};
