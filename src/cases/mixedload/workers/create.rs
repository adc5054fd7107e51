use crate::{
    cases::mixedload::pool::EntityPool,
    errors::GraphBenchError,
    store::{EntityHandle, UnitOfWork},
};

use super::{LINK_TYPE, OpCounts, Operation, still_exists};

/// Creates one entity per repetition and links it to the previous entity this
/// task created, if that one is still alive. New handles join the pool once
/// their unit of work committed.
pub struct CreateOp<'p> {
    pool: &'p EntityPool,
    previous: Option<EntityHandle>,
    pending: Option<EntityHandle>,
}

impl<'p> CreateOp<'p> {
    pub fn new(pool: &'p EntityPool) -> Self {
        Self {
            pool,
            previous: None,
            pending: None,
        }
    }
}

impl Operation for CreateOp<'_> {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let mut counts = OpCounts::default();
        let previous = still_exists(uow, self.previous)?;
        if self.previous.is_some() {
            counts.reads += 1;
        }
        self.previous = previous;
        let created = uow.create_entity()?;
        counts.writes += 1;
        if let Some(previous) = previous {
            uow.create_relationship(previous, created, LINK_TYPE)?;
            counts.writes += 1;
        }
        self.pending = Some(created);
        Ok(counts)
    }

    fn finish(&mut self, committed: bool) {
        let pending = self.pending.take();
        if !committed {
            return;
        }
        if let Some(handle) = pending {
            self.pool.offer(handle);
            self.previous = Some(handle);
        }
    }
}
