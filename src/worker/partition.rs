// Partitioning - split discovered files into one non-empty group per worker

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use crate::error::ConfigError;

/// Grouping strategy selected with `--group-by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GroupBy {
    /// Order of finding files
    Found,
    /// Number of cucumber/spinach steps
    Steps,
    /// Individual cucumber scenarios
    Scenarios,
    /// Size of the file
    Filesize,
    /// Info from the runtime log
    Runtime,
    /// Runtime when the runtime log is filled, otherwise filesize
    #[default]
    Default,
}

/// Recorded per-file durations, one `path:seconds` entry per line
#[derive(Debug, Clone, Default)]
pub struct RuntimeLog {
    entries: HashMap<String, f64>,
}

impl RuntimeLog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::RuntimeLog {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Malformed lines are skipped
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let (path, seconds) = line.trim().rsplit_once(':')?;
                let seconds: f64 = seconds.trim().parse().ok()?;
                (seconds.is_finite() && seconds >= 0.0).then(|| (normalize(path), seconds))
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &Path) -> Option<f64> {
        self.entries
            .get(&normalize(&path.to_string_lossy()))
            .copied()
    }
}

fn normalize(path: &str) -> String {
    path.trim().trim_start_matches("./").to_string()
}

/// Split `files` into at most `count` non-empty groups
pub fn partition(
    files: &[PathBuf],
    count: usize,
    strategy: GroupBy,
    runtime_log: Option<&RuntimeLog>,
) -> Result<Vec<Vec<PathBuf>>, ConfigError> {
    let count = count.max(1).min(files.len().max(1));

    let groups = match strategy {
        GroupBy::Steps => return Err(ConfigError::UnsupportedGrouping("steps".into())),
        GroupBy::Scenarios => return Err(ConfigError::UnsupportedGrouping("scenarios".into())),
        GroupBy::Found => round_robin(files, count),
        GroupBy::Filesize => balance(files, count, file_size),
        GroupBy::Runtime => {
            let log = runtime_log.cloned().unwrap_or_default();
            by_runtime(files, count, &log)
        }
        GroupBy::Default => match runtime_log {
            Some(log) if !log.is_empty() => by_runtime(files, count, log),
            _ => balance(files, count, file_size),
        },
    };

    let groups: Vec<Vec<PathBuf>> = groups.into_iter().filter(|g| !g.is_empty()).collect();
    debug!(
        "Partitioned {} file(s) into {} group(s) using {:?}",
        files.len(),
        groups.len(),
        strategy
    );
    Ok(groups)
}

fn round_robin(files: &[PathBuf], count: usize) -> Vec<Vec<PathBuf>> {
    let mut groups = vec![Vec::new(); count];
    for (index, file) in files.iter().enumerate() {
        groups[index % count].push(file.clone());
    }
    groups
}

fn by_runtime(files: &[PathBuf], count: usize, log: &RuntimeLog) -> Vec<Vec<PathBuf>> {
    let known: Vec<f64> = files.iter().filter_map(|f| log.get(f)).collect();
    let fallback = if known.is_empty() {
        1.0
    } else {
        known.iter().sum::<f64>() / known.len() as f64
    };
    balance(files, count, |file| log.get(file).unwrap_or(fallback))
}

/// Greedy largest-first assignment onto the currently lightest group
fn balance(
    files: &[PathBuf],
    count: usize,
    weight: impl Fn(&Path) -> f64,
) -> Vec<Vec<PathBuf>> {
    let mut weighted: Vec<(f64, &PathBuf)> = files.iter().map(|f| (weight(f), f)).collect();
    weighted.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut groups = vec![Vec::new(); count];
    let mut totals = vec![0.0f64; count];
    for (weight, file) in weighted {
        let lightest = totals
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap_or(0);
        totals[lightest] += weight;
        groups[lightest].push(file.clone());
    }
    groups
}

fn file_size(path: &Path) -> f64 {
    std::fs::metadata(path).map(|m| m.len() as f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_found_is_round_robin() {
        let files = paths(&["a", "b", "c", "d", "e"]);
        let groups = partition(&files, 2, GroupBy::Found, None).expect("partition");
        assert_eq!(groups, vec![paths(&["a", "c", "e"]), paths(&["b", "d"])]);
    }

    #[test]
    fn test_never_more_groups_than_files() {
        let files = paths(&["a", "b"]);
        let groups = partition(&files, 8, GroupBy::Found, None).expect("partition");
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| !g.is_empty()));
    }

    #[test]
    fn test_runtime_balances_slow_files() {
        let log = RuntimeLog::parse("spec/slow_spec.rb:10\nspec/a_spec.rb:3\nspec/b_spec.rb:3\n./spec/c_spec.rb:4\n");
        let files = paths(&[
            "spec/a_spec.rb",
            "spec/b_spec.rb",
            "spec/c_spec.rb",
            "spec/slow_spec.rb",
        ]);
        let groups = partition(&files, 2, GroupBy::Runtime, Some(&log)).expect("partition");
        assert_eq!(groups[0], paths(&["spec/slow_spec.rb"]));
        assert_eq!(
            groups[1],
            paths(&["spec/c_spec.rb", "spec/a_spec.rb", "spec/b_spec.rb"])
        );
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let files: Vec<PathBuf> = (0..17).map(|i| PathBuf::from(format!("f{i}"))).collect();
        let groups = partition(&files, 4, GroupBy::Default, None).expect("partition");
        let mut all: Vec<PathBuf> = groups.into_iter().flatten().collect();
        all.sort();
        let mut expected = files.clone();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_cucumber_strategies_are_rejected() {
        let files = paths(&["a"]);
        assert!(matches!(
            partition(&files, 1, GroupBy::Steps, None),
            Err(ConfigError::UnsupportedGrouping(_))
        ));
        assert!(partition(&files, 1, GroupBy::Scenarios, None).is_err());
    }

    #[test]
    fn test_runtime_log_skips_malformed_lines() {
        let log = RuntimeLog::parse("no separator\nspec/a_spec.rb:abc\nspec/b_spec.rb:1.25\n");
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(Path::new("./spec/b_spec.rb")), Some(1.25));
    }
}
