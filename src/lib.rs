pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod notification;
pub mod report;
pub mod reporter;
pub mod state;
pub mod utils;
pub mod worker;

pub use error::{ConfigError, Error, Result};
pub use reporter::{FormatterSpec, Reporter};
