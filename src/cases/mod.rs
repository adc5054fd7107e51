//! Benchmark cases and the plumbing shared between them.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::{
    domain::{CaseResult, RunResult},
    errors::GraphBenchError,
    store::SqliteStore,
};

pub mod mixedload;
pub mod traversal;

pub use mixedload::{MixedLoadBenchCase, MixedLoadDriver};
pub use traversal::TraversalQueriesCase;

/// One measured scenario. `tear_down` runs even when `run` failed.
pub trait BenchmarkCase {
    fn name(&self) -> &str;

    fn set_up(&mut self) -> Result<(), GraphBenchError> {
        Ok(())
    }

    fn run(&mut self) -> Result<CaseResult, GraphBenchError>;

    fn tear_down(&mut self) -> Result<(), GraphBenchError> {
        Ok(())
    }
}

/// Runs `cases` in order and adds each result to `run`. Stops at the first
/// failing case, after tearing it down.
pub fn run_cases(
    cases: &mut [Box<dyn BenchmarkCase>],
    run: &mut RunResult,
) -> Result<(), GraphBenchError> {
    for case in cases.iter_mut() {
        info!(case = case.name(), "setting up");
        case.set_up()?;
        let result = case.run();
        if let Err(err) = case.tear_down() {
            warn!(case = case.name(), %err, "tear down failed");
        }
        let result = result?;
        info!(case = case.name(), metrics = result.metrics().len(), "case finished");
        run.add_result(result);
    }
    Ok(())
}

/// A store owned by one case run. On-disk stores start empty; a temporary
/// directory is removed when the fixture drops.
pub struct StoreFixture {
    store: Arc<SqliteStore>,
    path: Option<PathBuf>,
    _tmp: Option<TempDir>,
}

impl StoreFixture {
    pub fn in_memory() -> Result<Self, GraphBenchError> {
        Ok(Self {
            store: Arc::new(SqliteStore::open_in_memory()?),
            path: None,
            _tmp: None,
        })
    }

    /// `<dir>/<name>.db` with `connections` connections, replacing a store left over
    /// from an earlier run.
    pub fn on_disk(
        dir: Option<&Path>,
        name: &str,
        connections: usize,
    ) -> Result<Self, GraphBenchError> {
        let (tmp, dir) = match dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| {
                    GraphBenchError::connection(format!("create {}: {e}", dir.display()))
                })?;
                (None, dir.to_path_buf())
            }
            None => {
                let tmp = TempDir::new()
                    .map_err(|e| GraphBenchError::connection(format!("temp dir: {e}")))?;
                let dir = tmp.path().to_path_buf();
                (Some(tmp), dir)
            }
        };
        let path = dir.join(format!("{name}.db"));
        for suffix in ["", "-wal", "-shm"] {
            let stale = PathBuf::from(format!("{}{suffix}", path.display()));
            if stale.exists() {
                fs::remove_file(&stale).map_err(|e| {
                    GraphBenchError::connection(format!("remove {}: {e}", stale.display()))
                })?;
            }
        }
        Ok(Self {
            store: Arc::new(SqliteStore::open_with_connections(&path, connections)?),
            path: Some(path),
            _tmp: tmp,
        })
    }

    pub fn store(&self) -> Arc<SqliteStore> {
        Arc::clone(&self.store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
