use std::hint::black_box;

use crate::{
    cases::mixedload::pool::EntityPool,
    errors::GraphBenchError,
    store::{EntityHandle, UnitOfWork},
};

use super::{LINK_TYPE, OpCounts, Operation, still_exists};

fn batches(ops: usize, interval: usize) -> usize {
    ops.div_ceil(interval.max(1))
}

/// Creates `ops` chained entities, `interval` of them per unit of work.
pub struct BulkCreateOp<'p> {
    pool: &'p EntityPool,
    remaining: usize,
    interval: usize,
    previous: Option<EntityHandle>,
    pending: Vec<EntityHandle>,
}

impl<'p> BulkCreateOp<'p> {
    pub fn new(pool: &'p EntityPool, ops: usize, interval: usize) -> Self {
        Self {
            pool,
            remaining: ops,
            interval: interval.max(1),
            previous: None,
            pending: Vec::new(),
        }
    }

    pub fn units_of_work(&self) -> usize {
        batches(self.remaining, self.interval)
    }
}

impl Operation for BulkCreateOp<'_> {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let batch = self.interval.min(self.remaining);
        self.remaining -= batch;
        let mut counts = OpCounts::default();
        let mut previous = still_exists(uow, self.previous)?;
        if self.previous.is_some() {
            counts.reads += 1;
        }
        for _ in 0..batch {
            let created = uow.create_entity()?;
            counts.writes += 1;
            if let Some(previous) = previous {
                uow.create_relationship(previous, created, LINK_TYPE)?;
                counts.writes += 1;
            }
            self.pending.push(created);
            previous = Some(created);
        }
        Ok(counts)
    }

    fn finish(&mut self, committed: bool) {
        if !committed {
            self.pending.clear();
            return;
        }
        for handle in self.pending.drain(..) {
            self.pool.offer(handle);
            self.previous = Some(handle);
        }
    }
}

/// Scans entities in id order, reading each one with its properties and
/// relationships. The cursor wraps to the lowest id at the end of the store.
pub struct BulkReadOp {
    remaining: usize,
    interval: usize,
    cursor: i64,
}

impl BulkReadOp {
    pub fn new(ops: usize, interval: usize) -> Self {
        Self {
            remaining: ops,
            interval: interval.max(1),
            cursor: 0,
        }
    }

    pub fn units_of_work(&self) -> usize {
        batches(self.remaining, self.interval)
    }
}

impl Operation for BulkReadOp {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let batch = self.interval.min(self.remaining);
        self.remaining -= batch;
        let mut counts = OpCounts::default();
        let mut scanned = uow.entity_ids(self.cursor, batch)?;
        if scanned.is_empty() && self.cursor > 0 {
            self.cursor = 0;
            scanned = uow.entity_ids(self.cursor, batch)?;
        }
        for handle in scanned {
            let entity = uow.get_entity(handle.id())?;
            counts.reads += 1;
            for (key, value) in uow.properties(entity)? {
                black_box((key, value));
                counts.reads += 1;
            }
            for rel in uow.relationships(entity)? {
                black_box(rel.id);
                counts.reads += 1;
            }
            self.cursor = entity.id();
        }
        Ok(counts)
    }
}
