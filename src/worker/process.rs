// Worker processes - build the command line, spawn, and pump stdout into the multiplexer

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info};

use super::mux::WorkerSender;
use super::protocol::{WorkerEvent, parse_line};
use crate::config::WorkerConfig;
use crate::error::{ConfigError, Error, Result};

/// Options forwarded to every worker
#[derive(Debug, Clone, Default)]
pub struct WorkerOptions {
    pub requires: Vec<String>,
    pub tags: Vec<String>,
    pub seed: Option<String>,
    pub verbose: bool,
}

/// Fully resolved command for one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPlan {
    pub worker: usize,
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl WorkerPlan {
    /// `worker` is 1-based and becomes the worker's environment number
    pub fn build(
        worker: usize,
        config: &WorkerConfig,
        options: &WorkerOptions,
        files: &[PathBuf],
    ) -> Result<Self, ConfigError> {
        let (program, prefix) = config
            .command
            .split_first()
            .ok_or(ConfigError::EmptyWorkerCommand)?;

        let mut args: Vec<String> = prefix.to_vec();
        args.extend(config.format_args.iter().cloned());
        for require in &options.requires {
            args.push("--require".into());
            args.push(require.clone());
        }
        for tag in &options.tags {
            args.push("--tag".into());
            args.push(tag.clone());
        }
        if let Some(seed) = &options.seed {
            args.push("--seed".into());
            args.push(seed.clone());
        }
        args.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));

        Ok(Self {
            worker,
            program: program.clone(),
            args,
            env: vec![(config.env_var.clone(), worker.to_string())],
        })
    }

    /// Shell-like rendering for logs
    pub fn command_line(&self) -> String {
        let env = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {} {}", env, self.program, self.args.join(" "))
    }
}

/// Spawn the worker and a task that forwards its stdout as events.
///
/// On a shutdown request the child is killed, but lines it already wrote
/// are still read and forwarded until stdout closes.
pub fn spawn(
    plan: WorkerPlan,
    sender: WorkerSender,
    mut shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>> {
    let worker = plan.worker;
    let mut command = Command::new(&plan.program);
    command
        .args(&plan.args)
        .envs(plan.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| Error::worker(worker, format!("failed to spawn {}: {}", plan.program, e)))?;
    info!("Started worker {} (pid {:?})", worker, child.id());

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::worker(worker, "stdout not captured"))?;

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{}", line);
            }
        });
    }

    let handle = tokio::spawn(async move {
        let mut lines = LinesStream::new(BufReader::new(stdout).lines());
        let mut stopped = false;
        let mut watching = true;

        loop {
            tokio::select! {
                line = lines.next() => match line {
                    Some(Ok(line)) => match parse_line(&line) {
                        Ok(Some(event)) => {
                            sender.send(event);
                        }
                        Ok(None) => {}
                        Err(reason) => {
                            sender.send(WorkerEvent::Failed(reason));
                            let _ = child.start_kill();
                            break;
                        }
                    },
                    Some(Err(e)) => {
                        sender.send(WorkerEvent::Failed(format!("read error: {}", e)));
                        let _ = child.start_kill();
                        break;
                    }
                    None => break,
                },
                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    } else if *shutdown.borrow_and_update() {
                        debug!("Stopping worker {}", worker);
                        watching = false;
                        stopped = true;
                        let _ = child.start_kill();
                    }
                }
            }
        }

        let event = match child.wait().await {
            Ok(status) => WorkerEvent::Exited {
                success: status.success(),
                code: status.code(),
                stopped,
            },
            Err(e) => WorkerEvent::Failed(format!("failed to wait for worker: {}", e)),
        };
        sender.send(event);
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkerConfig {
        WorkerConfig {
            command: vec!["bundle".into(), "exec".into(), "rspec".into()],
            format_args: vec!["--format".into(), "TurboTests::JsonRowsFormatter".into()],
            env_var: "TEST_ENV_NUMBER".into(),
        }
    }

    #[test]
    fn test_plan_forwards_options_and_files() {
        let options = WorkerOptions {
            requires: vec!["./spec/support/boot.rb".into()],
            tags: vec!["~slow".into()],
            seed: Some("1234".into()),
            verbose: false,
        };
        let files = vec![PathBuf::from("spec/a_spec.rb"), PathBuf::from("spec/b_spec.rb")];
        let plan = WorkerPlan::build(2, &config(), &options, &files).expect("plan");

        assert_eq!(plan.program, "bundle");
        assert_eq!(
            plan.args,
            [
                "exec",
                "rspec",
                "--format",
                "TurboTests::JsonRowsFormatter",
                "--require",
                "./spec/support/boot.rb",
                "--tag",
                "~slow",
                "--seed",
                "1234",
                "spec/a_spec.rb",
                "spec/b_spec.rb",
            ]
        );
        assert_eq!(plan.env, [("TEST_ENV_NUMBER".to_string(), "2".to_string())]);
        assert!(plan.command_line().starts_with("TEST_ENV_NUMBER=2 bundle exec rspec"));
    }

    #[test]
    fn test_empty_command_is_config_error() {
        let mut config = config();
        config.command.clear();
        let result = WorkerPlan::build(1, &config, &WorkerOptions::default(), &[]);
        assert!(matches!(result, Err(ConfigError::EmptyWorkerCommand)));
    }
}
