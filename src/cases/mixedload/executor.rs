//! Fixed-size worker pool for one load phase.
//!
//! Tasks run on a dedicated rayon pool and report back over a crossbeam channel,
//! tagged with their submission id. The driver thread is the only consumer. A
//! task that outlives its drain wait is abandoned: it keeps running, but its
//! completion is dropped when it eventually arrives.

use std::{
    any::Any,
    collections::BTreeMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::warn;

use crate::{errors::GraphBenchError, store::Store};

use super::{
    pool::EntityPool,
    workers::{TaskKind, TaskOutcome, WorkerTask},
};

/// A task that left the in-flight set.
#[derive(Debug)]
pub struct Completion {
    pub kind: TaskKind,
    pub result: Result<TaskOutcome, GraphBenchError>,
}

struct Finished {
    id: u64,
    result: Result<TaskOutcome, GraphBenchError>,
}

struct InFlight {
    kind: TaskKind,
    submitted: Instant,
}

pub struct TaskExecutor<S> {
    workers: ThreadPool,
    store: Arc<S>,
    entities: Arc<EntityPool>,
    sender: Sender<Finished>,
    receiver: Receiver<Finished>,
    in_flight: BTreeMap<u64, InFlight>,
    next_id: u64,
    abandoned: u64,
}

impl<S: Store + 'static> TaskExecutor<S> {
    pub fn new(
        threads: usize,
        store: Arc<S>,
        entities: Arc<EntityPool>,
    ) -> Result<Self, GraphBenchError> {
        let workers = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("graphbench-worker-{i}"))
            .build()
            .map_err(|e| GraphBenchError::task_failed(format!("worker pool: {e}")))?;
        let (sender, receiver) = channel::unbounded();
        Ok(Self {
            workers,
            store,
            entities,
            sender,
            receiver,
            in_flight: BTreeMap::new(),
            next_id: 0,
            abandoned: 0,
        })
    }

    pub fn submit(&mut self, task: WorkerTask) {
        let id = self.next_id;
        self.next_id += 1;
        self.in_flight.insert(
            id,
            InFlight {
                kind: task.kind(),
                submitted: Instant::now(),
            },
        );
        let store = Arc::clone(&self.store);
        let entities = Arc::clone(&self.entities);
        let sender = self.sender.clone();
        self.workers.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| task.run(&*store, &entities)))
                .map_err(|payload| GraphBenchError::task_failed(panic_message(payload.as_ref())));
            // The receiver outlives every task unless the executor was dropped.
            let _ = sender.send(Finished { id, result });
        });
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn abandoned(&self) -> u64 {
        self.abandoned
    }

    /// Completions available right now, without blocking.
    pub fn try_drain(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Ok(finished) = self.receiver.try_recv() {
            self.accept(finished, &mut done);
        }
        done
    }

    /// Blocks up to `wait` for the next completion, then drains what else is ready.
    pub fn wait(&mut self, wait: Duration) -> Vec<Completion> {
        let mut done = Vec::new();
        if let Ok(finished) = self.receiver.recv_timeout(wait) {
            self.accept(finished, &mut done);
        }
        done.extend(self.try_drain());
        done
    }

    /// Collects every in-flight task, waiting at most `per_task` for each next
    /// completion. On timeout the oldest outstanding task is abandoned.
    pub fn drain_all(&mut self, per_task: Duration) -> Vec<Completion> {
        let mut done = Vec::new();
        while !self.in_flight.is_empty() {
            match self.receiver.recv_timeout(per_task) {
                Ok(finished) => self.accept(finished, &mut done),
                Err(RecvTimeoutError::Timeout) => {
                    if let Some((id, task)) = self.in_flight.pop_first() {
                        self.abandoned += 1;
                        warn!(
                            id,
                            kind = ?task.kind,
                            running_ms = task.submitted.elapsed().as_millis() as u64,
                            "task timed out, excluded from results"
                        );
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        done
    }

    fn accept(&mut self, finished: Finished, done: &mut Vec<Completion>) {
        if let Some(task) = self.in_flight.remove(&finished.id) {
            done.push(Completion {
                kind: task.kind,
                result: finished.result,
            });
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "worker task panicked".to_string()
    }
}
