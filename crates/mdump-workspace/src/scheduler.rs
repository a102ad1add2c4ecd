use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use mdump_core::IndexReadiness;
use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use tokio_util::sync::CancellationToken;

enum BlockingPool {
    Rayon(ThreadPool),
    Inline,
}

impl BlockingPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            BlockingPool::Rayon(pool) => pool.spawn(job),
            BlockingPool::Inline => job(),
        }
    }
}

fn build_rayon_pool(prefix: &'static str, threads: usize) -> BlockingPool {
    // Thread creation can fail under low process limits; shrink the pool and
    // finally run jobs on the caller's thread.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()
        {
            Ok(pool) => return BlockingPool::Rayon(pool),
            Err(_) if threads > 1 => {
                threads = (threads / 2).max(1);
            }
            Err(err) => {
                tracing::warn!(
                    target: "mdump.workspace",
                    error = %err,
                    "failed to start indexing threads; indexing inline"
                );
                return BlockingPool::Inline;
            }
        }
    }
}

pub fn default_indexing_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .clamp(1, 8)
}

#[derive(Debug, Default)]
struct Progress {
    pending: usize,
    configured: bool,
}

struct Shared {
    pool: BlockingPool,
    progress: Mutex<Progress>,
    changed: Condvar,
    cancel: CancellationToken,
}

impl Shared {
    fn finish_job(&self) {
        let mut progress = self.progress.lock();
        progress.pending = progress.pending.saturating_sub(1);
        if progress.pending == 0 {
            self.changed.notify_all();
        }
    }
}

/// Runs per-file indexing jobs off the caller's thread and tracks whether any
/// are still outstanding.
///
/// The index is "ready" when no job is pending. It is "configured" once the
/// first workspace scan has queued its jobs.
#[derive(Clone)]
pub struct IndexScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for IndexScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let progress = self.shared.progress.lock();
        f.debug_struct("IndexScheduler")
            .field("pending", &progress.pending)
            .field("configured", &progress.configured)
            .field("cancelled", &self.shared.cancel.is_cancelled())
            .finish()
    }
}

impl IndexScheduler {
    pub fn new(threads: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool: build_rayon_pool("mdump-index", threads),
                progress: Mutex::new(Progress::default()),
                changed: Condvar::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// A scheduler that runs every job synchronously inside [`submit`](Self::submit).
    pub fn inline() -> Self {
        Self {
            shared: Arc::new(Shared {
                pool: BlockingPool::Inline,
                progress: Mutex::new(Progress::default()),
                changed: Condvar::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Queues a job. Jobs submitted after [`cancel`](Self::cancel), or still
    /// queued when it is called, are dropped without running.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.cancel.is_cancelled() {
            return;
        }

        self.shared.progress.lock().pending += 1;
        let shared = Arc::clone(&self.shared);
        self.shared.pool.spawn(move || {
            if shared.cancel.is_cancelled() {
                drop(job);
            } else if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                tracing::error!(
                    target: "mdump.workspace",
                    panic = %mdump_core::panic_payload_to_str(payload.as_ref()),
                    "indexing job panicked"
                );
            }
            // Captured state is released before waiters wake.
            shared.finish_job();
        });
    }

    pub fn pending(&self) -> usize {
        self.shared.progress.lock().pending
    }

    pub fn mark_configured(&self) {
        let mut progress = self.shared.progress.lock();
        if !progress.configured {
            progress.configured = true;
            self.shared.changed.notify_all();
        }
    }

    pub fn is_configured(&self) -> bool {
        self.shared.progress.lock().configured
    }

    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Blocks until every queued job has finished (or been dropped).
    pub fn wait_idle(&self) {
        let mut progress = self.shared.progress.lock();
        while progress.pending > 0 {
            self.shared.changed.wait(&mut progress);
        }
    }
}

impl IndexReadiness for IndexScheduler {
    fn is_ready(&self) -> bool {
        self.pending() == 0
    }

    fn await_ready(&self) {
        self.wait_idle();
    }

    fn await_configured(&self) {
        let mut progress = self.shared.progress.lock();
        while !progress.configured {
            self.shared.changed.wait(&mut progress);
        }
    }
}
