//! The job queue: single-flight, FIFO, with throttled export.
//!
//! ## Scheduling
//!
//! There is exactly one logical worker. After every state change that could
//! let work start (files enqueued, a job finished) the queue *kicks*: under
//! the lock it checks whether the in-flight slot is free and, if so, claims
//! the oldest `Pending` job and spawns one task for it.
//!
//! ```text
//! enqueue ──▶ kick ──▶ claim oldest Pending ──▶ pacing delay
//!                                                   │
//!     ┌─────────────────────────────────────────────┘
//!     ▼
//! transform (blocking thread) ──▶ Done | Error
//!     │
//!     ├── auto-export on + Done ──▶ export ──▶ cooldown
//!     ▼
//! free slot ──▶ kick
//! ```
//!
//! The slot, not the visible job list, is what enforces single-flight: a
//! [`clear`](JobQueue::clear) that hides the in-flight job does not free the
//! slot, so the next job still waits for the hidden one to end.
//!
//! ## Failures
//!
//! Every transform error (and a panic inside the codec) is caught at the job
//! boundary and stored as that job's `Error`. Nothing aborts the queue.

use crate::export::{ExportSink, ExportThrottle};
use crate::imaging::{ImageBackend, TransformConfig, transform};
use crate::job::{Job, JobId, JobRecord, JobStatus};
use crate::types::SourceImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Timing and export behaviour of a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Pause before each job starts; zero is fine headless.
    pub pacing_delay: Duration,
    /// Minimum spacing between consecutive exports. After an auto-export the
    /// next job also waits this long.
    pub export_cooldown: Duration,
    /// Export each job as soon as it is done.
    pub auto_export: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_millis(300),
            export_cooldown: Duration::from_millis(1000),
            auto_export: false,
        }
    }
}

/// Something observable happened in the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued { id: JobId, file_name: String },
    Started { id: JobId, file_name: String },
    /// A job reached `Done` or `Error`.
    Finished(JobRecord),
    /// A job finished after it was cleared; its result was dropped.
    Discarded { id: JobId },
    Exported { id: JobId, file_name: String },
    ExportFailed {
        id: JobId,
        file_name: String,
        reason: String,
    },
    Cleared { removed: usize },
}

/// Outcome of [`JobQueue::export_all`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub exported: Vec<String>,
    /// `(file name, reason)`
    pub failed: Vec<(String, String)>,
}

/// Counts over the visible jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub error: usize,
    /// Source bytes of the `Done` jobs.
    pub bytes_in: u64,
    /// Output bytes of the `Done` jobs.
    pub bytes_out: u64,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.done + self.error
    }
}

struct QueueState {
    jobs: Vec<Job>,
    next_id: u64,
    in_flight: Option<JobId>,
}

struct Inner {
    state: Mutex<QueueState>,
    backend: Arc<dyn ImageBackend>,
    throttle: ExportThrottle,
    pacing_delay: Duration,
    auto_export: AtomicBool,
    events: Option<mpsc::UnboundedSender<QueueEvent>>,
    busy: watch::Sender<bool>,
    runtime: Handle,
}

/// A claimed job, moved into its worker task.
struct Claim {
    id: JobId,
    source: SourceImage,
    config: TransformConfig,
}

/// Handle to a job queue. Clones share the same queue.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl JobQueue {
    /// Create a queue that runs its worker on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        sink: Arc<dyn ExportSink>,
        settings: QueueSettings,
    ) -> Self {
        Self::build(backend, sink, settings, None)
    }

    /// Like [`new`](Self::new), also publishing every [`QueueEvent`] on `events`.
    pub fn with_events(
        backend: Arc<dyn ImageBackend>,
        sink: Arc<dyn ExportSink>,
        settings: QueueSettings,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> Self {
        Self::build(backend, sink, settings, Some(events))
    }

    fn build(
        backend: Arc<dyn ImageBackend>,
        sink: Arc<dyn ExportSink>,
        settings: QueueSettings,
        events: Option<mpsc::UnboundedSender<QueueEvent>>,
    ) -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    jobs: Vec::new(),
                    next_id: 1,
                    in_flight: None,
                }),
                backend,
                throttle: ExportThrottle::new(sink, settings.export_cooldown),
                pacing_delay: settings.pacing_delay,
                auto_export: AtomicBool::new(settings.auto_export),
                events,
                busy,
                runtime: Handle::current(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(events) = &self.inner.events {
            // A dropped receiver just means nobody is watching.
            let _ = events.send(event);
        }
    }

    /// Append `sources` as `Pending` jobs, each with its own copy of `config`.
    ///
    /// Returns the new ids in the same order as `sources`.
    pub fn enqueue(&self, sources: Vec<SourceImage>, config: TransformConfig) -> Vec<JobId> {
        let added: Vec<(JobId, String)> = {
            let mut state = self.lock();
            sources
                .into_iter()
                .map(|source| {
                    let id = JobId(state.next_id);
                    state.next_id += 1;
                    let job = Job::new(id, source, config);
                    let entry = (id, job.file_name.clone());
                    state.jobs.push(job);
                    entry
                })
                .collect()
        };

        debug!("Enqueued {} job(s)", added.len());
        let ids = added.iter().map(|(id, _)| *id).collect();
        for (id, file_name) in added {
            self.emit(QueueEvent::Enqueued { id, file_name });
        }
        self.kick();
        ids
    }

    /// Start the oldest pending job if the worker slot is free.
    fn kick(&self) {
        let started = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                return;
            }
            let claim = state.jobs.iter_mut().find_map(|job| {
                let source = job.start()?;
                Some((
                    job.file_name.clone(),
                    Claim {
                        id: job.id,
                        source,
                        config: job.config,
                    },
                ))
            });
            match claim {
                Some((file_name, claim)) => {
                    state.in_flight = Some(claim.id);
                    self.inner.busy.send_replace(true);
                    Some((file_name, claim))
                }
                None => {
                    self.inner.busy.send_replace(false);
                    None
                }
            }
        };

        if let Some((file_name, claim)) = started {
            debug!("Starting {} ({})", claim.id, file_name);
            self.emit(QueueEvent::Started {
                id: claim.id,
                file_name,
            });
            let queue = self.clone();
            self.inner.runtime.spawn(async move { queue.run(claim).await });
        }
    }

    async fn run(self, claim: Claim) {
        if !self.inner.pacing_delay.is_zero() {
            tokio::time::sleep(self.inner.pacing_delay).await;
        }

        let Claim { id, source, config } = claim;
        let backend = Arc::clone(&self.inner.backend);
        // The source moves into the blocking task and is dropped with it.
        let outcome = tokio::task::spawn_blocking(move || {
            transform(backend.as_ref(), &source, &config).map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|e| Err(format!("Transform task failed: {e}")));

        let auto_export = self.auto_export();
        let finished = {
            let mut state = self.lock();
            state.jobs.iter_mut().find(|job| job.id == id).map(|job| {
                job.finish(outcome);
                let export = job
                    .output()
                    .filter(|_| auto_export)
                    .map(|output| (Arc::clone(&output.bytes), output.file_name.clone()));
                (job.record(), export)
            })
        };

        match finished {
            Some((record, export)) => {
                match &record.error {
                    Some(reason) => warn!("{} failed: {}", record.file_name, reason),
                    None => info!(
                        "{} done: {} → {} bytes",
                        record.file_name,
                        record.original_size,
                        record.output_size.unwrap_or_default()
                    ),
                }
                self.emit(QueueEvent::Finished(record));

                if let Some((bytes, file_name)) = export {
                    // Failures are reported as events; the job stays Done.
                    let _ = self.export_one(id, bytes, file_name).await;
                    tokio::time::sleep(self.inner.throttle.cooldown()).await;
                }
            }
            None => {
                debug!("{id} finished after clear; result dropped");
                self.emit(QueueEvent::Discarded { id });
            }
        }

        self.lock().in_flight = None;
        self.kick();
    }

    async fn export_one(
        &self,
        id: JobId,
        bytes: Arc<[u8]>,
        file_name: String,
    ) -> Result<(), String> {
        match self.inner.throttle.export(bytes, file_name.clone()).await {
            Ok(()) => {
                self.emit(QueueEvent::Exported { id, file_name });
                Ok(())
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("Export of {} failed: {}", file_name, reason);
                self.emit(QueueEvent::ExportFailed {
                    id,
                    file_name,
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    /// Export every `Done` job in arrival order, spaced by the cooldown.
    ///
    /// Independent of auto-export: jobs that were already auto-exported are
    /// exported again.
    pub async fn export_all(&self) -> ExportSummary {
        let done: Vec<(JobId, Arc<[u8]>, String)> = self
            .lock()
            .jobs
            .iter()
            .filter_map(|job| {
                job.output()
                    .map(|o| (job.id, Arc::clone(&o.bytes), o.file_name.clone()))
            })
            .collect();

        let mut summary = ExportSummary::default();
        for (id, bytes, file_name) in done {
            match self.export_one(id, bytes, file_name.clone()).await {
                Ok(()) => summary.exported.push(file_name),
                Err(reason) => summary.failed.push((file_name, reason)),
            }
        }
        summary
    }

    /// Remove every visible job and return how many were removed.
    ///
    /// A job that is mid-transform keeps running; when it ends its result is
    /// dropped because its entry is gone.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.lock();
            let removed = state.jobs.len();
            state.jobs.clear();
            removed
        };
        debug!("Cleared {removed} job(s)");
        self.emit(QueueEvent::Cleared { removed });
        removed
    }

    pub fn set_auto_export(&self, enabled: bool) {
        self.inner.auto_export.store(enabled, Ordering::SeqCst);
    }

    pub fn auto_export(&self) -> bool {
        self.inner.auto_export.load(Ordering::SeqCst)
    }

    /// Records for all visible jobs, in arrival order.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.lock().jobs.iter().map(Job::record).collect()
    }

    pub fn record(&self, id: JobId) -> Option<JobRecord> {
        self.lock()
            .jobs
            .iter()
            .find(|job| job.id == id)
            .map(Job::record)
    }

    pub fn summary(&self) -> QueueSummary {
        let state = self.lock();
        let mut summary = QueueSummary::default();
        for job in &state.jobs {
            match job.status() {
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Processing => summary.processing += 1,
                JobStatus::Error => summary.error += 1,
                JobStatus::Done => {
                    summary.done += 1;
                    summary.bytes_in += job.original_size;
                    summary.bytes_out += job.output().map_or(0, |o| o.size());
                }
            }
        }
        summary
    }

    /// Resolve once no job is in flight and none is pending.
    pub async fn wait_idle(&self) {
        let mut busy = self.inner.busy.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = busy.wait_for(|busy| !*busy).await;
    }
}
