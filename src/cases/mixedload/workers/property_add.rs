use rand::Rng;

use crate::{
    cases::mixedload::pool::EntityPool,
    errors::GraphBenchError,
    store::{ENTITY_INDEX, EntityHandle, UnitOfWork},
};

use super::{
    OpCounts, Operation,
    values::{random_property_name, random_property_value},
};

/// Sets a randomly typed property on a sampled entity.
///
/// While rotating through up to a tenth of the pool it may borrow an existing
/// property name from the entities it passes, so keys get reused across entities;
/// otherwise (or when the target already has that key) the name is fresh.
pub struct PropertyAddOp<'p, R: ?Sized> {
    pool: &'p EntityPool,
    rng: &'p mut R,
    index: bool,
    taken: Option<EntityHandle>,
}

impl<'p, R: Rng + ?Sized> PropertyAddOp<'p, R> {
    pub fn new(pool: &'p EntityPool, rng: &'p mut R, index: bool) -> Self {
        Self {
            pool,
            rng,
            index,
            taken: None,
        }
    }

    fn borrow_name<U: UnitOfWork>(
        &mut self,
        uow: &U,
        counts: &mut OpCounts,
    ) -> Result<Option<String>, GraphBenchError> {
        let tenth = self.pool.size() / 10;
        let mut offset = if tenth > 0 {
            self.rng.gen_range(0..tenth)
        } else {
            0
        };
        let mut reuse = self.rng.gen_bool(0.5);
        let mut name = None;
        while offset > 0 {
            offset -= 1;
            let Some(passing) = self.pool.poll() else {
                break;
            };
            if !reuse {
                self.pool.offer(passing);
                continue;
            }
            let props = uow.properties(passing);
            self.pool.offer(passing);
            if let Some((key, _)) = props?.into_iter().next() {
                counts.reads += 1;
                name = Some(key);
                reuse = false;
            }
        }
        Ok(name)
    }
}

impl<R: Rng + ?Sized> Operation for PropertyAddOp<'_, R> {
    fn apply<U: UnitOfWork>(&mut self, uow: &U) -> Result<OpCounts, GraphBenchError> {
        let mut counts = OpCounts::default();
        let borrowed = self.borrow_name(uow, &mut counts)?;
        let Some(target) = self.pool.poll() else {
            return Ok(counts);
        };
        self.taken = Some(target);
        let key = match borrowed {
            Some(key) if !uow.properties(target)?.iter().any(|(k, _)| *k == key) => key,
            _ => random_property_name(),
        };
        let value = random_property_value(&mut *self.rng);
        if self.index {
            uow.index_add(ENTITY_INDEX, target, &key, &value)?;
        }
        uow.set_property(target, &key, value)?;
        counts.writes += 1;
        Ok(counts)
    }

    fn finish(&mut self, _committed: bool) {
        if let Some(handle) = self.taken.take() {
            self.pool.offer(handle);
        }
    }
}
