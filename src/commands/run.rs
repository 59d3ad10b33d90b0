// Run command - discover, partition, spawn workers and aggregate their reports

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::{Config, WorkerConfig};
use crate::error::{Error, Result};
use crate::report::FormatterRegistry;
use crate::reporter::{FormatterSpec, Reporter};
use crate::state::RunSummary;
use crate::utils::{FileUtils, TestFilter};
use crate::worker::{
    self, GroupBy, Multiplexer, RuntimeLog, Shutdown, WorkerOptions, WorkerOutcome, WorkerPlan,
};

/// Everything a run needs, resolved from the command line and config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub formatters: Vec<FormatterSpec>,
    pub paths: Vec<PathBuf>,
    pub processes: usize,
    pub group_by: GroupBy,
    pub runtime_log: Option<PathBuf>,
    pub pattern: Option<String>,
    pub exclude_pattern: Option<String>,
    pub fail_fast: Option<usize>,
    pub file_suffix: String,
    pub worker: WorkerOptions,
    pub worker_config: WorkerConfig,
}

impl RunOptions {
    /// Command line values win over the config file
    pub fn from_cli(cli: &Cli, formatters: Vec<FormatterSpec>, config: &Config) -> Self {
        Self {
            formatters,
            paths: cli.test_paths(&config.general.default_path),
            processes: config.resolve_processes(cli.processes),
            group_by: cli.group_by,
            runtime_log: cli
                .runtime_log
                .clone()
                .or_else(|| config.general.runtime_log.as_ref().map(PathBuf::from)),
            pattern: cli.pattern.clone(),
            exclude_pattern: cli.exclude_pattern.clone(),
            fail_fast: cli.fail_fast_threshold(),
            file_suffix: config.general.file_suffix.clone(),
            worker: WorkerOptions {
                requires: cli.requires.clone(),
                tags: cli.tags.clone(),
                seed: cli.seed.clone(),
                verbose: cli.verbose,
            },
            worker_config: config.worker.clone(),
        }
    }
}

/// Result of a run that was not aborted
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub workers: WorkerOutcome,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.summary.success() && self.workers.all_succeeded()
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() { 0 } else { 1 }
    }
}

/// Resolve every configuration input. Nothing is spawned here.
fn prepare(options: &RunOptions, registry: &FormatterRegistry) -> Result<(Reporter, Vec<WorkerPlan>)> {
    let start = Instant::now();
    let reporter = Reporter::from_specs(&options.formatters, registry, start)?
        .with_fail_fast(options.fail_fast);

    let filter = TestFilter::new(options.pattern.as_deref(), options.exclude_pattern.as_deref())?;
    let files = FileUtils::discover(&options.paths, &options.file_suffix, &filter)?;

    let runtime_log = options
        .runtime_log
        .as_deref()
        .map(RuntimeLog::load)
        .transpose()?;
    let groups = worker::partition(&files, options.processes, options.group_by, runtime_log.as_ref())?;

    info!(
        "{} processes for {} specs, ~ {} specs per process",
        groups.len(),
        files.len(),
        files.len() / groups.len().max(1)
    );

    let plans = groups
        .iter()
        .enumerate()
        .map(|(index, files)| {
            WorkerPlan::build(index + 1, &options.worker_config, &options.worker, files)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((reporter, plans))
}

pub async fn run_tests(options: &RunOptions, registry: &FormatterRegistry) -> Result<RunReport> {
    let (mut reporter, plans) = prepare(options, registry)?;

    let mut mux = Multiplexer::new();
    let shutdown = Shutdown::new();
    let mut handles = Vec::with_capacity(plans.len());

    for plan in plans {
        if shutdown.is_requested() {
            break;
        }
        if options.worker.verbose {
            info!("Worker {}: {}", plan.worker, plan.command_line());
        }
        let sender = mux.channel(plan.worker);
        match worker::spawn(plan, sender, shutdown.subscribe()) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                shutdown.request();
                reporter.abort();
                return Err(e);
            }
        }
    }

    let outcome = match worker::collect(&mut mux, &mut reporter, &shutdown).await {
        Ok(outcome) => outcome,
        Err(e) => {
            shutdown.request();
            reporter.abort();
            return Err(e);
        }
    };

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Worker task ended abnormally: {}", e);
        }
    }

    let summary = match reporter.finish() {
        Ok(summary) => summary,
        Err(e) => {
            reporter.abort();
            return Err(e);
        }
    };

    let seed = options
        .worker
        .seed
        .as_ref()
        .map(|seed| (seed.clone(), true))
        .or_else(|| outcome.seed.as_ref().map(|s| (s.seed.clone(), s.used)));
    if let Some((seed, used)) = seed {
        reporter
            .emit_seed_notice(&seed, used)
            .map_err(Error::SeedNotice)?;
    }

    Ok(RunReport {
        summary,
        workers: outcome,
    })
}
