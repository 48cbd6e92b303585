//! Fixed-size worker pool driving per-block stream work.
//!
//! Tasks are queued behind a mutex + condvar pair; futures carry a
//! binary done-signal. Shutdown is cooperative: the flag wakes every
//! worker, running tasks finish, queued tasks drain, then the workers
//! exit.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use lazy_static::lazy_static;
use parking_lot::{Condvar, Mutex};

pub struct Signal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cond.notify_all();
    }

    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }
}

/// Handle to a submitted task.
pub struct TaskFuture {
    signal: Arc<Signal>,
}

impl TaskFuture {
    pub fn wait(&self) {
        self.signal.wait();
    }
}

type Job = (Box<dyn FnOnce() + Send>, Arc<Signal>);

struct Inner {
    queue: Mutex<VecDeque<Job>>,
    has_task: Condvar,
    shutdown: AtomicBool,
}

pub struct Executor {
    inner: Arc<Inner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pool_size: usize,
}

impl Executor {
    pub fn new(pool_size: usize) -> Arc<Executor> {
        let inner = Arc::new(Inner {
            queue: Mutex::new(VecDeque::new()),
            has_task: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let workers = (0..pool_size)
            .map(|i| {
                let inner = Arc::clone(&inner);
                std::thread::Builder::new()
                    .name(format!("lmq-worker-{}", i))
                    .spawn(move || routine(inner))
                    .expect("spawning worker thread")
            })
            .collect();
        log::debug!("executor started with {} workers", pool_size);
        Arc::new(Executor {
            inner,
            workers: Mutex::new(workers),
            pool_size,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> TaskFuture {
        let signal = Arc::new(Signal::new());
        {
            let mut queue = self.inner.queue.lock();
            queue.push_back((Box::new(task), Arc::clone(&signal)));
            self.inner.has_task.notify_one();
        }
        TaskFuture { signal }
    }

    /// Flip the flag, wake every worker and join them. Queued tasks
    /// still drain; new submissions after this will never run.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.has_task.notify_all();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }

    /// Process-wide pool backing `Stream::parallel`, sized to the
    /// hardware concurrency and started on first use.
    pub fn default_pool() -> &'static Arc<Executor> {
        lazy_static! {
            static ref DEFAULT: Arc<Executor> = Executor::new(
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4),
            );
        }
        &DEFAULT
    }
}

fn routine(inner: Arc<Inner>) {
    loop {
        let (task, signal) = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.has_task.wait(&mut queue);
            }
        };
        if let Err(e) = catch_unwind(AssertUnwindSafe(task)) {
            log::error!("task aborted: {:?}", e);
        }
        signal.notify();
    }
}
