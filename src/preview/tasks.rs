use std::cell::Cell;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{LocalBoxFuture, abortable};
use futures::task::LocalSpawnExt;

use crate::widget::{Lifecycle, Spawner};

/// Single-threaded queue for deferred widget work.
///
/// Nothing runs until the host drives the queue with
/// [`TaskQueue::run_until_stalled`]; each task is abortable through the
/// lifecycle of the widget that queued it.
#[derive(Debug)]
pub struct TaskQueue {
    pool: LocalPool,
    spawner: LocalSpawner,
    queued: Cell<usize>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            pool,
            spawner,
            queued: Cell::new(0),
        }
    }

    /// Run every task that can make progress.
    pub fn run_until_stalled(&mut self) {
        let _scope = crate::perf::scope("tasks.run");
        self.pool.run_until_stalled();
    }

    /// Total number of tasks ever queued.
    pub fn queued(&self) -> usize {
        self.queued.get()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawner for TaskQueue {
    fn spawn(&self, owner: &Lifecycle, task: LocalBoxFuture<'static, ()>) {
        let (task, handle) = abortable(task);
        owner.register(handle);
        let queued = self.spawner.spawn_local(async move {
            if task.await.is_err() {
                tracing::trace!("deferred widget task aborted");
            }
        });
        match queued {
            Ok(()) => self.queued.set(self.queued.get() + 1),
            Err(err) => tracing::warn!(%err, "failed to queue deferred widget task"),
        }
    }
}
