//! Worker tasks. Each task repeats one logical operation a fixed number of times,
//! every repetition in its own unit of work: committed on success, rolled back on
//! failure. A failed repetition counts neither reads nor writes, only
//! [`TaskOutcome::failed_ops`].

use std::time::Instant;

use tracing::trace;

use crate::{
    errors::GraphBenchError,
    store::{EntityHandle, Store, UnitOfWork},
};

use super::pool::EntityPool;

pub mod bulk;
pub mod create;
pub mod delete;
pub mod property_add;
pub mod sample_read;
pub mod values;

pub use bulk::{BulkCreateOp, BulkReadOp};
pub use create::CreateOp;
pub use delete::DeleteOp;
pub use property_add::PropertyAddOp;
pub use sample_read::SampleReadOp;

/// Relationship type linking consecutively created entities.
pub const LINK_TYPE: &str = "RELATED_TO";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Create,
    Delete,
    PropertyAdd,
    SampleRead,
    BulkCreate,
    BulkRead,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub reads: u64,
    pub writes: u64,
}

impl OpCounts {
    pub fn add(&mut self, other: OpCounts) {
        self.reads += other.reads;
        self.writes += other.writes;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub reads: u64,
    pub writes: u64,
    pub failed_ops: u64,
    pub elapsed_ms: u64,
}

/// One logical operation, applied inside a unit of work.
pub trait Operation {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError>;

    /// Runs after the unit of work was committed (`true`) or rolled back.
    fn finish(&mut self, _committed: bool) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub counts: OpCounts,
    pub failed_ops: u64,
}

pub fn run_ops<S, O>(store: &S, repetitions: usize, op: &mut O) -> Tally
where
    S: Store,
    O: Operation,
{
    let mut tally = Tally::default();
    for _ in 0..repetitions {
        let uow = match store.begin_unit_of_work() {
            Ok(uow) => uow,
            Err(err) => {
                trace!(%err, "unable to begin unit of work");
                tally.failed_ops += 1;
                continue;
            }
        };
        match op.apply(&uow) {
            Ok(counts) => match uow.commit() {
                Ok(()) => {
                    op.finish(true);
                    tally.counts.add(counts);
                }
                Err(err) => {
                    trace!(%err, "commit failed");
                    op.finish(false);
                    tally.failed_ops += 1;
                }
            },
            Err(err) => {
                trace!(%err, "operation rolled back");
                if let Err(err) = uow.rollback() {
                    trace!(%err, "rollback failed");
                }
                op.finish(false);
                tally.failed_ops += 1;
            }
        }
    }
    tally
}

/// A task the driver submits: which operation and how many repetitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerTask {
    kind: TaskKind,
    ops: usize,
    index: bool,
    commit_interval: usize,
}

impl WorkerTask {
    pub fn create(ops: usize) -> Self {
        Self::new(TaskKind::Create, ops, false)
    }

    pub fn delete(ops: usize) -> Self {
        Self::new(TaskKind::Delete, ops, false)
    }

    /// `index` mirrors every property write into the entity index.
    pub fn property_add(ops: usize, index: bool) -> Self {
        Self::new(TaskKind::PropertyAdd, ops, index)
    }

    /// `index` consults the entity index for every property read.
    pub fn sample_read(ops: usize, index: bool) -> Self {
        Self::new(TaskKind::SampleRead, ops, index)
    }

    pub fn bulk_create(ops: usize, commit_interval: usize) -> Self {
        Self {
            commit_interval: commit_interval.max(1),
            ..Self::new(TaskKind::BulkCreate, ops, false)
        }
    }

    pub fn bulk_read(ops: usize, commit_interval: usize) -> Self {
        Self {
            commit_interval: commit_interval.max(1),
            ..Self::new(TaskKind::BulkRead, ops, false)
        }
    }

    fn new(kind: TaskKind, ops: usize, index: bool) -> Self {
        Self {
            kind,
            ops,
            index,
            commit_interval: 1,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn ops(&self) -> usize {
        self.ops
    }

    pub fn run<S: Store>(&self, store: &S, pool: &EntityPool) -> TaskOutcome {
        let started = Instant::now();
        let mut rng = rand::thread_rng();
        let tally = match self.kind {
            TaskKind::Create => run_ops(store, self.ops, &mut CreateOp::new(pool)),
            TaskKind::Delete => run_ops(store, self.ops, &mut DeleteOp::new(pool, &mut rng)),
            TaskKind::PropertyAdd => run_ops(
                store,
                self.ops,
                &mut PropertyAddOp::new(pool, &mut rng, self.index),
            ),
            TaskKind::SampleRead => run_ops(
                store,
                self.ops,
                &mut SampleReadOp::new(pool, &mut rng, self.index),
            ),
            TaskKind::BulkCreate => {
                let mut op = BulkCreateOp::new(pool, self.ops, self.commit_interval);
                run_ops(store, op.units_of_work(), &mut op)
            }
            TaskKind::BulkRead => {
                let mut op = BulkReadOp::new(self.ops, self.commit_interval);
                run_ops(store, op.units_of_work(), &mut op)
            }
        };
        TaskOutcome {
            kind: self.kind,
            reads: tally.counts.reads,
            writes: tally.counts.writes,
            failed_ops: tally.failed_ops,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `Ok(None)` when `candidate` was deleted in the meantime.
pub(crate) fn still_exists<U: UnitOfWork>(
    uow: &U,
    candidate: Option<EntityHandle>,
) -> Result<Option<EntityHandle>, GraphBenchError> {
    let Some(handle) = candidate else {
        return Ok(None);
    };
    match uow.get_entity(handle.id()) {
        Ok(found) => Ok(Some(found)),
        Err(GraphBenchError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
