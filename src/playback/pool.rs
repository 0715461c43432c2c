//! Worker thread pool
//!
//! A fixed set of single-queue workers. Each worker owns a deque guarded
//! by a mutex and condition variable and runs a blocking pull-loop on a
//! dedicated OS thread. The pool assigns tasks round-robin with an
//! incrementing counter; there is no global queue and no cross-worker
//! rebalancing, so one slow worker can delay its assigned players.
//! `try_steal` exists as a primitive for future load balancing but the
//! pool never invokes it.
//!
//! Failures inside a task never crash a worker: panics are caught and
//! logged, and the loop continues. Shutdown drops pending tasks, which
//! releases the player references they hold.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// A unit of work: produce one frame for one player.
///
/// The closure captures a strong reference to the owning player, so the
/// player cannot be destroyed while the task is pending.
pub struct Task {
    pub player_id: u64,
    pub frame_index: u64,
    pub job: Box<dyn FnOnce() + Send + 'static>,
}

/// State shared between a worker's handle and its thread
struct WorkerShared {
    queue: Mutex<VecDeque<Task>>,
    condvar: Condvar,
    running: AtomicBool,
}

/// One worker: a private task deque drained by a dedicated thread
pub struct WorkerThread {
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
    fn start(worker_id: usize) -> Self {
        let shared = Arc::new(WorkerShared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            running: AtomicBool::new(true),
        });

        let shared_clone = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("opuscast-worker-{}", worker_id))
            .spawn(move || Self::run(worker_id, shared_clone))
            .expect("failed to spawn worker thread");

        Self {
            shared,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Append a task to this worker's queue and wake it
    pub fn submit(&self, task: Task) {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.push_back(task);
        }
        self.shared.condvar.notify_one();
    }

    /// Remove and return the front task without executing it.
    ///
    /// Present for future load balancing; the pool's round-robin
    /// submission never calls this (known asymmetry, see module docs).
    pub fn try_steal(&self) -> Option<Task> {
        self.shared.queue.lock().unwrap().pop_front()
    }

    /// Number of queued tasks (diagnostics)
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Signal the loop to exit and join the thread.
    ///
    /// Pending tasks are dropped with the queue.
    fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.condvar.notify_one();

        if let Some(handle) = self.handle.lock().unwrap().take() {
            if let Err(e) = handle.join() {
                error!("Worker join failed: {:?}", e);
            }
        }
    }

    fn run(worker_id: usize, shared: Arc<WorkerShared>) {
        debug!("Worker {} started", worker_id);

        loop {
            let task = {
                let mut queue = shared.queue.lock().unwrap();

                while queue.is_empty() && shared.running.load(Ordering::Acquire) {
                    queue = shared.condvar.wait(queue).unwrap();
                }

                if !shared.running.load(Ordering::Acquire) {
                    // Discard pending tasks, releasing the player
                    // references captured inside them
                    queue.clear();
                    break;
                }

                queue.pop_front()
            };

            if let Some(task) = task {
                // A panicking task must not take the worker down; the
                // player surfaces its own failures through metrics.
                let result = catch_unwind(AssertUnwindSafe(|| (task.job)()));
                if result.is_err() {
                    error!(
                        "Task panicked (player={}, frame={})",
                        task.player_id, task.frame_index
                    );
                }
            }
        }

        debug!("Worker {} exiting", worker_id);
    }
}

/// Fixed pool of workers with round-robin task assignment
pub struct ThreadPool {
    workers: Vec<WorkerThread>,
    next_worker: AtomicU32,
}

impl ThreadPool {
    /// Start `size` workers (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let workers = (0..size).map(WorkerThread::start).collect();

        info!("Thread pool started with {} workers", size);

        Self {
            workers,
            next_worker: AtomicU32::new(0),
        }
    }

    /// Assign a task to the next worker in round-robin order
    pub fn submit(&self, task: Task) {
        let idx =
            self.next_worker.fetch_add(1, Ordering::Relaxed) as usize % self.workers.len();
        self.workers[idx].submit(task);
    }

    /// Stop and join every worker.
    ///
    /// Must complete before the pool is dropped; pending tasks (and the
    /// player references inside them) are discarded. Safe to call twice.
    pub fn shutdown(&self) {
        debug!("Shutting down thread pool");
        for worker in &self.workers {
            worker.stop();
        }
        info!("Thread pool shut down");
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    #[cfg(test)]
    pub(crate) fn worker(&self, idx: usize) -> &WorkerThread {
        &self.workers[idx]
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
