use rand::Rng;

use crate::{
    cases::mixedload::pool::{EntityPool, MIN_POOL_FOR_DELETE},
    errors::GraphBenchError,
    store::{EntityHandle, UnitOfWork},
};

use super::{OpCounts, Operation};

/// Deletes a sampled entity together with its relationships. Leaves pools smaller
/// than [`MIN_POOL_FOR_DELETE`] untouched; a rolled back delete returns the
/// handle to the pool.
pub struct DeleteOp<'p, R: ?Sized> {
    pool: &'p EntityPool,
    rng: &'p mut R,
    taken: Option<EntityHandle>,
}

impl<'p, R: Rng + ?Sized> DeleteOp<'p, R> {
    pub fn new(pool: &'p EntityPool, rng: &'p mut R) -> Self {
        Self {
            pool,
            rng,
            taken: None,
        }
    }
}

impl<R: Rng + ?Sized> Operation for DeleteOp<'_, R> {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let mut counts = OpCounts::default();
        let size = self.pool.size();
        if size < MIN_POOL_FOR_DELETE {
            return Ok(counts);
        }
        let Some(victim) = self.pool.take_sample(&mut *self.rng, size) else {
            return Ok(counts);
        };
        self.taken = Some(victim);
        for rel in uow.relationships(victim)? {
            uow.delete_relationship(rel.id)?;
            counts.reads += 1;
            counts.writes += 1;
        }
        let victim = uow.get_entity(victim.id())?;
        counts.reads += 1;
        uow.delete_entity(victim)?;
        counts.writes += 1;
        Ok(counts)
    }

    fn finish(&mut self, committed: bool) {
        if let Some(handle) = self.taken.take() {
            if !committed {
                self.pool.offer(handle);
            }
        }
    }
}
