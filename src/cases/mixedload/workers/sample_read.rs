use std::hint::black_box;

use rand::Rng;

use crate::{
    cases::mixedload::pool::EntityPool,
    errors::GraphBenchError,
    store::{ENTITY_INDEX, EntityHandle, UnitOfWork},
};

use super::{OpCounts, Operation};

/// Upper bound on the rotation before a sample is taken.
pub const SAMPLE_ROTATION: usize = 10;
/// Independent probability of walking the relationships, and of walking the
/// properties, of a sampled entity.
pub const DEEP_READ_PROBABILITY: f64 = 0.25;

/// Re-fetches a sampled entity by id and sometimes walks its relationships
/// and properties. Every store access counts as one read.
pub struct SampleReadOp<'p, R: ?Sized> {
    pool: &'p EntityPool,
    rng: &'p mut R,
    index: bool,
    taken: Option<EntityHandle>,
}

impl<'p, R: Rng + ?Sized> SampleReadOp<'p, R> {
    pub fn new(pool: &'p EntityPool, rng: &'p mut R, index: bool) -> Self {
        Self {
            pool,
            rng,
            index,
            taken: None,
        }
    }
}

impl<R: Rng + ?Sized> Operation for SampleReadOp<'_, R> {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let mut counts = OpCounts::default();
        let Some(sampled) = self.pool.take_sample(&mut *self.rng, SAMPLE_ROTATION) else {
            return Ok(counts);
        };
        self.taken = Some(sampled);
        let entity = uow.get_entity(sampled.id())?;
        counts.reads += 1;

        if self.rng.gen_bool(DEEP_READ_PROBABILITY) {
            for rel in uow.relationships(entity)? {
                black_box(rel.id);
                counts.reads += 1;
            }
        }
        if self.rng.gen_bool(DEEP_READ_PROBABILITY) {
            for (key, value) in uow.properties(entity)? {
                counts.reads += 1;
                black_box(value.to_string());
                counts.reads += 1;
                if self.index {
                    black_box(uow.index_lookup(ENTITY_INDEX, &key, &value)?);
                    counts.reads += 1;
                }
            }
        }
        Ok(counts)
    }

    fn finish(&mut self, _committed: bool) {
        if let Some(handle) = self.taken.take() {
            self.pool.offer(handle);
        }
    }
}
