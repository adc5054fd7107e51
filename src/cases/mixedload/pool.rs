use crossbeam::queue::SegQueue;
use rand::Rng;

use crate::store::EntityHandle;

/// Below this population, deleting tasks leave the pool alone.
pub const MIN_POOL_FOR_DELETE: usize = 3;

/// Lock-free FIFO of live entity handles shared by every worker.
///
/// Random access is approximated by rotating the queue a random number of times
/// and taking the head; concurrent workers rotate the same queue, so the pick is
/// neither uniform nor repeatable.
#[derive(Debug, Default)]
pub struct EntityPool {
    queue: SegQueue<EntityHandle>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&self, handle: EntityHandle) {
        self.queue.push(handle);
    }

    pub fn poll(&self) -> Option<EntityHandle> {
        self.queue.pop()
    }

    pub fn size(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Moves up to `steps` handles from the head to the tail.
    pub fn rotate(&self, steps: usize) {
        for _ in 0..steps {
            match self.queue.pop() {
                Some(handle) => self.queue.push(handle),
                None => break,
            }
        }
    }

    /// Rotates by a random amount below `min(bound, size)` and takes the head.
    pub fn take_sample<R: Rng + ?Sized>(&self, rng: &mut R, bound: usize) -> Option<EntityHandle> {
        let limit = bound.min(self.size());
        if limit > 0 {
            self.rotate(rng.gen_range(0..limit));
        }
        self.poll()
    }
}
