//! Asynchronous outfit generation queue
//!
//! Jobs move through pending, processing, and a terminal completed or failed
//! state. A single worker services them in submission order, calling the
//! frame generator with bounded retries and stripping the studio background
//! from every returned frame. Subscribers and notifiers observe every
//! transition; a completed outfit is applied to the wardrobe only on
//! explicit acknowledgement.

pub mod job;
pub mod persist;

pub use job::{derive_display_name, GenerationJob, JobId, JobStatus};
pub use persist::{default_journal_path, JobJournal};

use crate::config::QueueConfig;
use crate::error::{PawdrobeError, Result};
use crate::generator::FrameGenerator;
use crate::notify::{JobEvent, JobNotifier};
use crate::retry::invoke_with_retry;
use crate::segmentation::{analyze_background, remove_border_background};
use crate::types::{FinishedFrame, FrameKind, FrameSet, ImageRef, ItemDescriptor};
use crate::wardrobe::WardrobeStore;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug as trace_debug, info as trace_info, instrument, span, Level};

type SubscriberFn = dyn Fn(&[GenerationJob]) + Send + Sync;

struct Subscriber {
    id: u64,
    callback: Arc<SubscriberFn>,
}

/// Lock a mutex, recovering the guard if a previous holder panicked
fn relock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between queue handles and the worker task
struct QueueInner {
    /// Live jobs in submission order
    jobs: Mutex<Vec<GenerationJob>>,
    /// Finished frames of completed jobs, held until acknowledge or dismiss
    frames: Mutex<HashMap<JobId, FrameSet>>,
    subscribers: Mutex<Vec<Subscriber>>,
    notifiers: Mutex<Vec<Arc<dyn JobNotifier>>>,
    watchers: Mutex<Vec<mpsc::Sender<Vec<GenerationJob>>>>,
    /// Serializes snapshot creation and delivery so subscribers never see a
    /// newer list before an older one
    publish_lock: Mutex<()>,
    next_subscriber_id: AtomicU64,
    journal: Option<JobJournal>,
}

impl QueueInner {
    /// Jobs ordered newest-first, the order subscribers and UIs consume
    fn snapshot(&self) -> Vec<GenerationJob> {
        relock(&self.jobs).iter().rev().cloned().collect()
    }

    /// Deliver one change to the journal, every notifier, every subscriber,
    /// and every watcher
    ///
    /// `changed` carries the job whose status transition triggered this;
    /// removals pass `None` since no status changed.
    fn publish(&self, changed: Option<&GenerationJob>) {
        let _ordering = relock(&self.publish_lock);

        let ordered: Vec<GenerationJob> = relock(&self.jobs).clone();
        let snapshot: Vec<GenerationJob> = ordered.iter().rev().cloned().collect();

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.write(&ordered) {
                warn!("Failed to journal job set: {e}");
            }
        }

        if let Some(job) = changed {
            let event = JobEvent {
                job_id: job.id,
                status: job.status,
                display_name: job.display_name.clone(),
                error_message: job.error_message.clone(),
            };
            let notifiers: Vec<Arc<dyn JobNotifier>> = relock(&self.notifiers).clone();
            for notifier in &notifiers {
                notifier.notify(event.clone());
            }
        }

        let callbacks: Vec<Arc<SubscriberFn>> = relock(&self.subscribers)
            .iter()
            .map(|s| Arc::clone(&s.callback))
            .collect();
        for callback in &callbacks {
            callback(&snapshot);
        }

        let mut watchers = relock(&self.watchers);
        watchers.retain(|tx| match tx.try_send(snapshot.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Watcher channel full, dropping one update");
                true
            },
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

/// Handle to the outfit generation queue
///
/// Cheap to clone; all clones share the same job set and worker. The worker
/// task shuts down once every handle has been dropped and the remaining
/// queued work has been drained from its channel.
#[derive(Clone)]
pub struct OutfitJobQueue {
    inner: Arc<QueueInner>,
    store: Arc<dyn WardrobeStore>,
    work_tx: mpsc::UnboundedSender<JobId>,
}

impl OutfitJobQueue {
    /// Create a queue and start its worker task
    ///
    /// Must be called from within a Tokio runtime. When the configuration
    /// names a journal file, jobs recorded there are restored first and any
    /// that were pending (or interrupted mid-processing) are requeued.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Failed to read an existing journal file
    pub fn new(
        generator: Arc<dyn FrameGenerator>,
        store: Arc<dyn WardrobeStore>,
        config: QueueConfig,
    ) -> Result<Self> {
        config.validate()?;

        let journal = config.journal_path.as_ref().map(|p| JobJournal::new(p.clone()));
        let restored = match &journal {
            Some(journal) => journal.load()?,
            None => Vec::new(),
        };
        let requeue: Vec<JobId> = restored
            .iter()
            .filter(|job| job.status == JobStatus::Pending)
            .map(|job| job.id)
            .collect();
        if !restored.is_empty() {
            info!(
                "Restored {} job(s) from journal, {} requeued",
                restored.len(),
                requeue.len()
            );
        }

        let inner = Arc::new(QueueInner {
            jobs: Mutex::new(restored),
            frames: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
            watchers: Mutex::new(Vec::new()),
            publish_lock: Mutex::new(()),
            next_subscriber_id: AtomicU64::new(0),
            journal,
        });

        let (work_tx, work_rx) = mpsc::unbounded_channel();
        for id in requeue {
            let _ = work_tx.send(id);
        }

        tokio::spawn(run_worker(Arc::clone(&inner), work_rx, generator, config));

        Ok(Self {
            inner,
            store,
            work_tx,
        })
    }

    /// Queue an outfit for generation and return its job id immediately
    ///
    /// Items are not validated here; invalid items surface later as a failed
    /// job so the caller never has to handle synchronous rejection. An empty
    /// `display_name` falls back to one derived from the items.
    pub fn submit(
        &self,
        pet_id: impl Into<String>,
        display_name: impl Into<String>,
        items: Vec<ItemDescriptor>,
    ) -> JobId {
        let job = GenerationJob::new(pet_id, display_name, items);
        let id = job.id;
        info!("Queued outfit job {} ('{}')", id, job.display_name);

        relock(&self.inner.jobs).push(job.clone());
        self.inner.publish(Some(&job));

        if self.work_tx.send(id).is_err() {
            // The worker only stops when every handle is gone
            warn!("Worker is not running; job {id} will not be processed");
        }
        id
    }

    /// Snapshot of all live jobs, newest first
    #[must_use]
    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.inner.snapshot()
    }

    /// Look up a single job by id
    #[must_use]
    pub fn job(&self, id: JobId) -> Option<GenerationJob> {
        relock(&self.inner.jobs).iter().find(|j| j.id == id).cloned()
    }

    /// Finished frames of a completed job, if it has not been acknowledged
    #[must_use]
    pub fn frame_set(&self, id: JobId) -> Option<FrameSet> {
        relock(&self.inner.frames).get(&id).cloned()
    }

    /// Register a callback invoked with the full job list (newest first)
    /// after every state change
    ///
    /// The callback runs on whichever task triggered the transition, so it
    /// must be fast and must not call back into the queue; use
    /// [`watch_updates`](Self::watch_updates) for consumers that need to
    /// react with their own queue operations. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[GenerationJob]) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        relock(&self.inner.subscribers).push(Subscriber {
            id,
            callback: Arc::new(callback),
        });
        Subscription {
            inner: Arc::clone(&self.inner),
            id,
        }
    }

    /// Stream of job-list snapshots, one per state change
    ///
    /// Backed by a bounded channel; a consumer that falls far behind misses
    /// intermediate snapshots rather than stalling the queue.
    #[must_use]
    pub fn watch_updates(&self) -> ReceiverStream<Vec<GenerationJob>> {
        let (tx, rx) = mpsc::channel(32);
        relock(&self.inner.watchers).push(tx);
        ReceiverStream::new(rx)
    }

    /// Attach a notifier that receives an event per job status transition
    pub fn add_notifier(&self, notifier: Arc<dyn JobNotifier>) {
        relock(&self.inner.notifiers).push(notifier);
    }

    /// Apply a completed job's outfit to its pet and drop the job record
    ///
    /// Equipping is a full replacement: the pet ends up wearing exactly the
    /// job's items, nothing merged from before. A job that is missing or not
    /// completed is left alone with a warning rather than an error.
    ///
    /// # Errors
    /// - The wardrobe store rejected the replacement; the job stays in the
    ///   list and can be acknowledged again
    pub async fn acknowledge(&self, id: JobId) -> Result<()> {
        let job = {
            let jobs = relock(&self.inner.jobs);
            jobs.iter().find(|j| j.id == id).cloned()
        };

        let Some(job) = job else {
            warn!("Cannot acknowledge job {id}: not found");
            return Ok(());
        };
        if job.status != JobStatus::Completed {
            warn!("Cannot acknowledge job {} while {}", id, job.status);
            return Ok(());
        }

        let assets = job.result.clone().unwrap_or_default();
        self.store
            .replace_equipped(&job.pet_id, &job.items, &assets)
            .await?;

        relock(&self.inner.jobs).retain(|j| j.id != id);
        relock(&self.inner.frames).remove(&id);
        self.inner.publish(None);

        info!(
            "Acknowledged job {}; '{}' is now worn by {}",
            id, job.display_name, job.pet_id
        );
        Ok(())
    }

    /// Remove a finished job without equipping anything
    ///
    /// This is how failed jobs (and completed ones the user declines) leave
    /// the list. Unknown or still-running jobs are left alone with a warning.
    pub fn dismiss(&self, id: JobId) {
        let removed = {
            let mut jobs = relock(&self.inner.jobs);
            let Some(position) = jobs.iter().position(|j| j.id == id) else {
                warn!("Cannot dismiss job {id}: not found");
                return;
            };
            if !jobs[position].is_terminal() {
                warn!("Cannot dismiss job {} while {}", id, jobs[position].status);
                return;
            }
            jobs.remove(position)
        };

        relock(&self.inner.frames).remove(&id);
        self.inner.publish(None);
        debug!("Dismissed job {} ('{}')", id, removed.display_name);
    }
}

/// Active subscriber registration; dropping it unsubscribes
pub struct Subscription {
    inner: Arc<QueueInner>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        relock(&self.inner.subscribers).retain(|s| s.id != self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Single consumer servicing jobs in submission order
async fn run_worker(
    inner: Arc<QueueInner>,
    mut work_rx: mpsc::UnboundedReceiver<JobId>,
    generator: Arc<dyn FrameGenerator>,
    config: QueueConfig,
) {
    debug!("Outfit worker started");
    while let Some(job_id) = work_rx.recv().await {
        let Some(job) = claim_job(&inner, job_id) else {
            continue;
        };
        process_job(&inner, &generator, &config, job).await;

        if config.inter_job_delay > Duration::ZERO {
            tokio::time::sleep(config.inter_job_delay).await;
        }
    }
    debug!("Outfit worker stopped; all queue handles dropped");
}

/// Move a queued job into processing and hand back a working copy
fn claim_job(inner: &QueueInner, id: JobId) -> Option<GenerationJob> {
    let claimed = {
        let mut jobs = relock(&inner.jobs);
        let job = jobs.iter_mut().find(|j| j.id == id)?;
        if job.status != JobStatus::Pending {
            return None;
        }
        job.mark_processing();
        job.clone()
    };
    inner.publish(Some(&claimed));
    Some(claimed)
}

/// Generate every frame for one job and publish its terminal state
///
/// All failures end in a failed-job transition; nothing escapes to the
/// worker loop, so one bad job cannot halt the ones behind it.
#[instrument(
    skip(inner, generator, config, job),
    fields(job_id = %job.id, pet_id = %job.pet_id)
)]
async fn process_job(
    inner: &QueueInner,
    generator: &Arc<dyn FrameGenerator>,
    config: &QueueConfig,
    job: GenerationJob,
) {
    let started = Instant::now();
    trace_info!(
        outfit = %job.display_name,
        items = job.items.len(),
        "🎨 Generating outfit frames"
    );

    let outcome = generate_outfit(generator, config, &job).await;

    // Pad the job so completions never look instantaneous to the user
    let elapsed = started.elapsed();
    if let Some(pad) = config.min_job_latency.checked_sub(elapsed) {
        if pad > Duration::ZERO {
            trace_debug!(pad_ms = pad.as_millis() as u64, "Padding job latency");
            tokio::time::sleep(pad).await;
        }
    }

    let finished = {
        let mut jobs = relock(&inner.jobs);
        let Some(entry) = jobs.iter_mut().find(|j| j.id == job.id) else {
            warn!("Job {} disappeared while processing", job.id);
            return;
        };
        match &outcome {
            Ok(frames) => entry.mark_completed(frames.bundle()),
            Err(e) => entry.mark_failed(user_facing_message(e)),
        }
        entry.clone()
    };

    if let Ok(frames) = outcome {
        relock(&inner.frames).insert(finished.id, frames);
    }
    inner.publish(Some(&finished));

    match finished.status {
        JobStatus::Completed => trace_info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Outfit job completed"
        ),
        _ => trace_info!(
            error = finished.error_message.as_deref().unwrap_or("unknown"),
            "❌ Outfit job failed"
        ),
    }
}

/// Failure text shown to the user, keeping upstream generator wording intact
fn user_facing_message(error: &PawdrobeError) -> String {
    match error {
        PawdrobeError::Generator { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Produce the full finished frame set for one job
async fn generate_outfit(
    generator: &Arc<dyn FrameGenerator>,
    config: &QueueConfig,
    job: &GenerationJob,
) -> Result<FrameSet> {
    for item in &job.items {
        item.validate()?;
    }

    let mut frames = FrameSet::new();

    let base_ref = ImageRef::Entity(job.pet_id.clone());
    let normal = finish_one_frame(generator, config, job, &base_ref, FrameKind::Normal).await?;
    let normal_png = normal.png.clone();
    frames.push(normal);

    // Animation frames derive from the finished base so the pose stays put
    let derived_ref = ImageRef::Inline(normal_png);
    for kind in &config.animation_frames {
        let frame = finish_one_frame(generator, config, job, &derived_ref, *kind).await?;
        frames.push(frame);
    }

    Ok(frames)
}

/// Generate, inspect, and background-strip a single frame
async fn finish_one_frame(
    generator: &Arc<dyn FrameGenerator>,
    config: &QueueConfig,
    job: &GenerationJob,
    base: &ImageRef,
    kind: FrameKind,
) -> Result<FinishedFrame> {
    let bytes = invoke_with_retry(&config.retry, || {
        generator.generate_frame(&job.items, base, kind)
    })
    .await?;

    let image = image::load_from_memory(&bytes)
        .map_err(|e| {
            PawdrobeError::decode(format!("Generated {kind} frame is not a valid image: {e}"))
        })?
        .to_rgba8();

    let frame = {
        let _span = span!(Level::DEBUG, "finishing", frame = %kind).entered();
        let assessment = analyze_background(&image);
        if assessment.has_issue {
            debug!(
                "{kind} frame arrived with a {} background ({:.1}% of pixels, {:.1}% of edge)",
                assessment.classification,
                assessment.background_percentage,
                assessment.edge_background_percentage
            );
        }
        let cleaned = remove_border_background(&image)?;
        FinishedFrame::from_image(kind, &cleaned)?
    };

    trace_debug!(frame = %kind, asset_id = %frame.asset_id, "Frame finished");
    Ok(frame)
}
