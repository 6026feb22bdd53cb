//! Background file hashing with progress reporting and cooperative cancellation.
//!
//! One worker per job reads the file in fixed-size chunks, feeds the running
//! hash state and reports progress. Every state transition and every event send
//! for a job happens under that job's lock, so once `cancel` has acknowledged a
//! cancellation the handle never sees another progress or result event.
//!
//! Progress travels over an unbounded channel, one event per chunk read. A
//! consumer that only calls `wait` at the end holds every report for the file
//! in memory until then (a few dozen bytes each); raise `chunk_size` for very
//! large files if that matters.
//!
//! Dropping a `JobHandle` cancels its job, so an abandoned job never keeps the
//! engine busy.

use crate::config::{BusyPolicy, EngineConfig};
use crate::error::EngineError;
use crate::file_ops;
use crate::hashers::StreamHasher;
use crate::models::{Algorithm, JobEvent, JobId, JobOutcome, JobState, ProgressEvent, ResultEvent};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use log::{debug, info, warn};
use std::fmt;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

struct JobShared {
    id: JobId,
    state: Mutex<JobState>,
    token: CancellationToken,
    events: UnboundedSender<JobEvent>,
}

impl JobShared {
    fn new(id: JobId) -> (Arc<Self>, UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded();
        let shared = Arc::new(JobShared {
            id,
            state: Mutex::new(JobState::Idle),
            token: CancellationToken::new(),
            events: tx,
        });
        (shared, rx)
    }

    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> JobState {
        *self.lock_state()
    }

    fn mark_running(&self) {
        let mut state = self.lock_state();
        if *state == JobState::Idle {
            *state = JobState::Running;
        }
    }

    /// Sends a progress event if the job is still running. Returns false once
    /// the job has left `Running`, telling the worker to stop.
    fn emit_progress(&self, progress: ProgressEvent) -> bool {
        let state = self.lock_state();
        if *state != JobState::Running {
            return false;
        }
        // a dropped handle just means nobody is listening any more
        let _ = self.events.unbounded_send(JobEvent::Progress(progress));
        true
    }

    /// Moves a running job to `terminal` and delivers its last event.
    fn finish(&self, terminal: JobState, event: JobEvent) -> bool {
        let mut state = self.lock_state();
        if *state != JobState::Running {
            return false;
        }
        *state = terminal;
        let _ = self.events.unbounded_send(event);
        true
    }

    fn cancel(&self) -> bool {
        let mut state = self.lock_state();
        if *state != JobState::Running {
            return false;
        }
        *state = JobState::Cancelled;
        self.token.cancel();
        let _ = self.events.unbounded_send(JobEvent::Cancelled);
        debug!("job {} cancelled", self.id);
        true
    }
}

/// Cloneable, thread-safe cancel switch for one job.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<JobShared>,
}

impl CancelHandle {
    pub fn job_id(&self) -> JobId {
        self.shared.id
    }

    /// Returns true when this call cancelled a running job.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }
}

/// Caller side of a running job: current state, events, cancellation.
pub struct JobHandle {
    shared: Arc<JobShared>,
    events: UnboundedReceiver<JobEvent>,
    path: PathBuf,
    algorithm: Algorithm,
    finished: bool,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.shared.id
    }

    pub fn state(&self) -> JobState {
        self.shared.state()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    pub fn canceller(&self) -> CancelHandle {
        CancelHandle { shared: self.shared.clone() }
    }

    /// Next event for this job; `None` after the terminal event was delivered.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        if self.finished {
            return None;
        }
        let ev = self.events.next().await;
        match &ev {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        ev
    }

    /// Drains the event stream and returns how the job ended.
    pub async fn wait(mut self) -> JobOutcome {
        while let Some(ev) = self.next_event().await {
            match ev {
                JobEvent::Progress(_) => {}
                JobEvent::Completed(result) => return JobOutcome::Completed(result),
                JobEvent::Failed(err) => return JobOutcome::Failed(err),
                JobEvent::Cancelled => return JobOutcome::Cancelled,
            }
        }
        JobOutcome::Failed(EngineError::WorkerExited)
    }

    /// Blocking variant of [`JobHandle::wait`] for callers without an async runtime.
    pub fn wait_blocking(self) -> JobOutcome {
        futures::executor::block_on(self.wait())
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("algorithm", &self.algorithm)
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if self.shared.cancel() {
            debug!("job {} handle dropped while running", self.shared.id);
        }
    }
}

pub struct FileHashEngine {
    config: EngineConfig,
    current: Mutex<Option<Arc<JobShared>>>,
}

impl FileHashEngine {
    pub fn new(config: EngineConfig) -> Self {
        if config.effective_chunk_size() != config.chunk_size {
            warn!(
                "chunk size {} out of range, using {}",
                config.chunk_size,
                config.effective_chunk_size()
            );
        }
        FileHashEngine { config, current: Mutex::new(None) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State of the most recently started job, `Idle` if there never was one.
    pub fn state(&self) -> JobState {
        self.lock_current()
            .as_ref()
            .map(|job| job.state())
            .unwrap_or(JobState::Idle)
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.lock_current().as_ref().map(|job| job.id)
    }

    pub fn start(&self, path: impl AsRef<Path>, algorithm_name: &str) -> Result<JobHandle, EngineError> {
        let algorithm: Algorithm = algorithm_name.parse()?;
        self.start_with(path, algorithm)
    }

    pub fn start_with(&self, path: impl AsRef<Path>, algorithm: Algorithm) -> Result<JobHandle, EngineError> {
        let path = path.as_ref().to_path_buf();
        let (file, total) = file_ops::open_regular_file(&path)?;

        let mut current = self.lock_current();
        if let Some(running) = current.as_ref().filter(|job| job.state() == JobState::Running) {
            match self.config.on_busy {
                BusyPolicy::Reject => return Err(EngineError::JobAlreadyRunning(running.id)),
                BusyPolicy::Preempt => {
                    info!("pre-empting job {}", running.id);
                    running.cancel();
                }
            }
        }

        let (shared, events) = JobShared::new(JobId::new());
        shared.mark_running();
        debug!(
            "job {} started: {} of {} ({} bytes)",
            shared.id,
            algorithm,
            path.display(),
            total
        );

        let worker = Worker {
            shared: shared.clone(),
            path: path.clone(),
            algorithm,
            chunk_size: self.config.effective_chunk_size(),
            total,
        };
        spawn_worker(worker, file)?;

        *current = Some(shared.clone());
        Ok(JobHandle { shared, events, path, algorithm, finished: false })
    }

    /// Cancels `handle`'s job. Same contract as [`JobHandle::cancel`].
    pub fn cancel(&self, handle: &JobHandle) -> bool {
        handle.cancel()
    }

    /// Cancels whatever job is running, if any.
    pub fn cancel_current(&self) -> bool {
        self.lock_current().as_ref().map(|job| job.cancel()).unwrap_or(false)
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Arc<JobShared>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Everything the worker owns for the lifetime of one job. Dropping it while
/// the job is still `Running` (panic, or a blocking task discarded at runtime
/// shutdown) fails the job so waiters are released.
struct Worker {
    shared: Arc<JobShared>,
    path: PathBuf,
    algorithm: Algorithm,
    chunk_size: usize,
    total: u64,
}

fn spawn_worker(worker: Worker, file: std::fs::File) -> Result<(), EngineError> {
    match tokio::runtime::Handle::try_current() {
        Ok(rt) => {
            rt.spawn_blocking(move || worker.run(file));
        }
        Err(_) => {
            // on failure the closure, and with it the worker, is dropped: the job ends Failed
            std::thread::Builder::new()
                .name(format!("freehash-{}", worker.shared.id))
                .spawn(move || worker.run(file))
                .map_err(EngineError::Spawn)?;
        }
    }
    Ok(())
}

impl Worker {
    fn run<R: Read>(self, mut reader: R) {
        let mut hasher = StreamHasher::new(self.algorithm);
        let mut buf = vec![0u8; self.chunk_size];
        let mut bytes_read: u64 = 0;
        let mut last_percent: u8 = 0;

        loop {
            if self.shared.token.is_cancelled() {
                debug!("job {} stopping after {} bytes", self.shared.id, bytes_read);
                return;
            }
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    warn!("job {} failed reading {}: {}", self.shared.id, self.path.display(), source);
                    let err = EngineError::Io { path: self.path.clone(), bytes_read, source };
                    self.shared.finish(JobState::Failed, JobEvent::Failed(err));
                    return;
                }
            };
            hasher.update(&buf[..n]);
            bytes_read += n as u64;
            // a file that grew past its opening size stays at 100 until EOF
            last_percent = file_ops::percent_complete(bytes_read, self.total).max(last_percent);
            if !self.progress(last_percent, bytes_read) {
                return;
            }
        }

        // empty or shrunk file: make sure the last report before the result is 100
        if last_percent < 100 {
            if !self.progress(100, bytes_read) {
                return;
            }
        }

        let digest = hasher.finalize_hex();
        let result = ResultEvent { algorithm: self.algorithm, digest, bytes_hashed: bytes_read };
        if self.shared.finish(JobState::Completed, JobEvent::Completed(result)) {
            info!("job {} completed: {} bytes of {}", self.shared.id, bytes_read, self.path.display());
        }
    }

    fn progress(&self, percent: u8, bytes_read: u64) -> bool {
        self.shared.emit_progress(ProgressEvent {
            percent,
            bytes_read,
            total_bytes: self.total,
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.shared.finish(JobState::Failed, JobEvent::Failed(EngineError::WorkerExited)) {
            warn!("job {} worker exited before finishing", self.shared.id);
        }
    }
}
