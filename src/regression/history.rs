use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{
    domain::{RunResult, RunResultSet, VersionFilter},
    errors::GraphBenchError,
};

/// Directory of persisted runs, one `<epoch-millis>-<version>.json` file per run.
#[derive(Clone, Debug)]
pub struct PerformanceHistoryRepository {
    location: PathBuf,
}

impl PerformanceHistoryRepository {
    pub fn new<P: Into<PathBuf>>(location: P) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Persists `run` and returns the written file. The record appears atomically
    /// or not at all; an existing record for the same timestamp and version is
    /// never replaced.
    pub fn save(&self, run: &RunResult) -> Result<PathBuf, GraphBenchError> {
        fs::create_dir_all(&self.location).map_err(|e| {
            GraphBenchError::history(format!(
                "unable to create history directory {}: {e}",
                self.location.display()
            ))
        })?;
        let path = self.location.join(record_file_name(run));
        let data = serde_json::to_vec_pretty(run)
            .map_err(|e| GraphBenchError::history(e.to_string()))?;
        write_atomically(&self.location, &path, &data, false)?;
        debug!(path = %path.display(), "saved run result");
        Ok(path)
    }

    /// All readable runs ordered by timestamp. Unreadable records are skipped.
    pub fn results(&self) -> Result<RunResultSet, GraphBenchError> {
        if !self.location.exists() {
            return Ok(RunResultSet::new());
        }
        let entries = fs::read_dir(&self.location).map_err(|e| {
            GraphBenchError::history(format!(
                "unable to list history directory {}: {e}",
                self.location.display()
            ))
        })?;
        let mut runs = RunResultSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| GraphBenchError::history(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match load_record(&path) {
                Ok(run) => runs.add(run),
                Err(err) => warn!(path = %path.display(), %err, "skipping malformed history record"),
            }
        }
        runs.sort_by_timestamp();
        Ok(runs)
    }

    pub fn results_for_ga_releases(&self) -> Result<RunResultSet, GraphBenchError> {
        Ok(self.results()?.filter(&VersionFilter::GaOnly))
    }

    /// Writes the whole history as one JSON array, the format dashboards consume.
    pub fn export_history(&self, output: &Path) -> Result<(), GraphBenchError> {
        let runs = self.results()?;
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            GraphBenchError::history(format!(
                "unable to dump performance history to '{}': {e}",
                output.display()
            ))
        })?;
        let data = serde_json::to_vec_pretty(&runs)
            .map_err(|e| GraphBenchError::history(e.to_string()))?;
        write_atomically(&parent, output, &data, true)
    }
}

fn record_file_name(run: &RunResult) -> String {
    let version: String = run
        .tested_version()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{}-{version}.json", run.timestamp().timestamp_millis())
}

fn load_record(path: &Path) -> Result<RunResult, GraphBenchError> {
    let data = fs::read(path).map_err(|e| GraphBenchError::history(e.to_string()))?;
    serde_json::from_slice(&data).map_err(|e| GraphBenchError::history(e.to_string()))
}

/// `replace` decides whether an existing `target` may be overwritten.
fn write_atomically(
    dir: &Path,
    target: &Path,
    data: &[u8],
    replace: bool,
) -> Result<(), GraphBenchError> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| GraphBenchError::history(e.to_string()))?;
    tmp.write_all(data)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| GraphBenchError::history(e.to_string()))?;
    let persisted = if replace {
        tmp.persist(target)
    } else {
        tmp.persist_noclobber(target)
    };
    persisted.map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            GraphBenchError::history(format!("{} already exists", target.display()))
        } else {
            GraphBenchError::history(format!("unable to write {}: {}", target.display(), e.error))
        }
    })?;
    Ok(())
}
