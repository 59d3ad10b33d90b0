// Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of worker processes ("auto" = available CPUs)
    #[serde(default = "default_processes")]
    pub processes: String,

    /// Path searched when no files are given on the command line
    #[serde(default = "default_path")]
    pub default_path: String,

    /// Suffix identifying test files during directory discovery
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,

    /// Runtime log used for balancing when --runtime-log is not given
    #[serde(default)]
    pub runtime_log: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            processes: default_processes(),
            default_path: default_path(),
            file_suffix: default_file_suffix(),
            runtime_log: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Program and leading arguments that run the test engine
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Arguments that make the engine emit the worker protocol
    #[serde(default = "default_format_args")]
    pub format_args: Vec<String>,

    /// Environment variable carrying the 1-based worker number
    #[serde(default = "default_env_var")]
    pub env_var: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            format_args: default_format_args(),
            env_var: default_env_var(),
        }
    }
}

// Default values
pub const ENV_TURBOTESTS_PROCESSES: &str = "TURBOTESTS_PROCESSES";

pub fn default_processes() -> String {
    String::from("auto")
}

pub fn default_path() -> String {
    String::from("spec")
}

pub fn default_file_suffix() -> String {
    String::from("_spec.rb")
}

fn default_command() -> Vec<String> {
    vec!["bundle".into(), "exec".into(), "rspec".into()]
}

fn default_format_args() -> Vec<String> {
    vec!["--format".into(), "TurboTests::JsonRowsFormatter".into()]
}

fn default_env_var() -> String {
    String::from("TEST_ENV_NUMBER")
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. .turbotestsrc (current directory)
        // 2. ~/.turbotestsrc (home directory)
        // 3. .turbotestsrc.toml (current directory)
        // 4. ~/.turbotestsrc.toml (home directory)

        let cwd = std::env::current_dir().ok()?;
        let home = dirs::home_dir()?;

        let paths = [
            cwd.join(".turbotestsrc"),
            home.join(".turbotestsrc"),
            cwd.join(".turbotestsrc.toml"),
            home.join(".turbotestsrc.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        None
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Option<Self> {
        toml::from_str(content).ok()
    }

    /// Generate default configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    /// Worker count: explicit value, then environment, then this file, then CPUs
    pub fn resolve_processes(&self, explicit: Option<usize>) -> usize {
        if let Some(n) = explicit.filter(|n| *n > 0) {
            return n;
        }

        let configured = std::env::var(ENV_TURBOTESTS_PROCESSES)
            .ok()
            .unwrap_or_else(|| self.general.processes.clone());

        match configured.trim() {
            "auto" | "" => available_cpus(),
            value => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .unwrap_or_else(available_cpus),
        }
    }
}

fn available_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
