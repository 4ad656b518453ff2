//! Write-behind queue of remote mutations.
//!
//! Jobs are persisted as one JSON array under [`OUTBOX_KEY`] and replayed
//! strictly in enqueue order, one request at a time, by a single drain
//! loop per [`Outbox`]. A job leaves the queue only after the backend has
//! answered `ok`; any failure stops the loop with the failing job still at
//! the head, to be retried on the next trigger.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use crate::cache::Invalidate;
use crate::error::{RemoteError, Result, StorageError};
use crate::remote::RemoteEndpoint;
use crate::storage::Storage;

mod job;

pub use job::{invalidation_prefixes, Job, Mutation};

/// Storage key of the persisted job list.
pub const OUTBOX_KEY: &str = "kennel.outbox.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxConfig {
  /// Upper bound on a single replay.
  pub timeout: Duration,
  /// Start draining on its own after each enqueue and on reconnect.
  pub auto_drain: bool,
}

impl Default for OutboxConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(15),
      auto_drain: true,
    }
  }
}

/// Latest known state of synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
  pub syncing: bool,
  pub queued: usize,
  pub online: bool,
  pub last_error: Option<String>,
}

impl Default for SyncStatus {
  fn default() -> Self {
    Self {
      syncing: false,
      queued: 0,
      online: true,
      last_error: None,
    }
  }
}

/// Outcome of one call to [`Outbox::drain`].
#[derive(Debug, Clone, Default)]
pub struct DrainReport {
  /// Jobs confirmed by the backend and removed.
  pub replayed: usize,
  /// Jobs still queued when the loop stopped.
  pub remaining: usize,
  /// Why the loop stopped early.
  pub error: Option<RemoteError>,
  /// Another drain was already running; nothing was done.
  pub skipped: bool,
}

/// Clears the running flag when the drain loop exits, however it exits.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| RunGuard(flag))
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

struct Inner<S, E> {
  storage: S,
  endpoint: E,
  invalidator: Option<Arc<dyn Invalidate>>,
  config: OutboxConfig,
  running: AtomicBool,
  online: AtomicBool,
  /// Serializes read-modify-write cycles on the job list.
  jobs_lock: Mutex<()>,
  status: watch::Sender<SyncStatus>,
}

/// Persistent FIFO of remote mutations with a single-flight drain loop.
pub struct Outbox<S, E> {
  inner: Arc<Inner<S, E>>,
}

impl<S, E> Clone for Outbox<S, E> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<S, E> Outbox<S, E>
where
  S: Storage + 'static,
  E: RemoteEndpoint + 'static,
{
  pub fn new(storage: S, endpoint: E, config: OutboxConfig) -> Self {
    Self::build(storage, endpoint, config, None)
  }

  /// Drop cached reads through `invalidator` after each confirmed job.
  pub fn with_invalidator(
    storage: S,
    endpoint: E,
    config: OutboxConfig,
    invalidator: Arc<dyn Invalidate>,
  ) -> Self {
    Self::build(storage, endpoint, config, Some(invalidator))
  }

  fn build(
    storage: S,
    endpoint: E,
    config: OutboxConfig,
    invalidator: Option<Arc<dyn Invalidate>>,
  ) -> Self {
    let (status, _) = watch::channel(SyncStatus::default());
    let outbox = Self {
      inner: Arc::new(Inner {
        storage,
        endpoint,
        invalidator,
        config,
        running: AtomicBool::new(false),
        online: AtomicBool::new(true),
        jobs_lock: Mutex::new(()),
        status,
      }),
    };
    // Jobs left over from a previous session count from the start.
    outbox.inner.publish(|_| {});
    outbox
  }

  /// Append a job and, if idle, start draining in the background.
  ///
  /// Never waits on the network.
  pub fn enqueue(&self, action: impl Into<String>, payload: Value) -> Result<Job> {
    let job = Job::new(action, payload);
    self.inner.modify_jobs(|jobs| jobs.push(job.clone()))?;

    tracing::debug!(job_id = %job.job_id, action = %job.action, "enqueued job");

    let drain_now = self.inner.config.auto_drain && self.is_online();
    self.inner.publish(|status| status.syncing |= drain_now);
    if drain_now {
      self.spawn_drain();
    }
    Ok(job)
  }

  /// Replay queued jobs until the queue is empty or a job fails.
  pub async fn drain(&self) -> DrainReport {
    self.inner.drain().await
  }

  /// Kick off a background drain on the current tokio runtime.
  pub fn spawn_drain(&self) {
    if self.inner.running.load(Ordering::Acquire) {
      return;
    }
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
          inner.drain().await;
        });
      }
      Err(_) => tracing::debug!("no async runtime, drain deferred to next trigger"),
    }
  }

  /// Record connectivity. Coming back online starts a drain.
  pub fn set_online(&self, online: bool) {
    let was_online = self.inner.online.swap(online, Ordering::AcqRel);
    self.inner.publish(|_| {});

    if online && !was_online {
      tracing::info!("back online");
      if self.inner.config.auto_drain {
        self.spawn_drain();
      }
    }
  }

  pub fn is_online(&self) -> bool {
    self.inner.online.load(Ordering::Acquire)
  }

  pub fn is_draining(&self) -> bool {
    self.inner.running.load(Ordering::Acquire)
  }

  /// Snapshot of queued jobs, head first.
  pub fn pending(&self) -> Result<Vec<Job>> {
    self.inner.load_jobs()
  }

  pub fn queued_count(&self) -> usize {
    self.inner.load_jobs().map(|jobs| jobs.len()).unwrap_or(0)
  }

  pub fn status(&self) -> SyncStatus {
    self.inner.status.borrow().clone()
  }

  /// Follow status changes.
  pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
    self.inner.status.subscribe()
  }

  /// Drop every queued job.
  pub fn clear(&self) -> Result<()> {
    {
      let _guard = self.inner.jobs_lock.lock().map_err(|_| StorageError::Poisoned)?;
      self.inner.storage.remove(OUTBOX_KEY)?;
    }
    self.inner.publish(|status| status.last_error = None);
    Ok(())
  }
}

impl<S: Storage, E: RemoteEndpoint> Inner<S, E> {
  // ==========================================================================
  // Job list
  // ==========================================================================

  fn load_jobs(&self) -> Result<Vec<Job>> {
    let Some(raw) = self.storage.get(OUTBOX_KEY)? else {
      return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
      Ok(jobs) => Ok(jobs),
      Err(e) => {
        tracing::warn!(key = OUTBOX_KEY, error = %e, "stored job list is unreadable, treating as empty");
        Ok(Vec::new())
      }
    }
  }

  fn modify_jobs(&self, f: impl FnOnce(&mut Vec<Job>)) -> Result<()> {
    let _guard = self.jobs_lock.lock().map_err(|_| StorageError::Poisoned)?;
    let mut jobs = self.load_jobs()?;
    f(&mut jobs);
    self.storage.set(OUTBOX_KEY, &serde_json::to_string(&jobs)?)?;
    Ok(())
  }

  fn publish(&self, f: impl FnOnce(&mut SyncStatus)) {
    let queued = self.load_jobs().map(|jobs| jobs.len()).unwrap_or(0);
    let online = self.online.load(Ordering::Acquire);
    self.status.send_modify(|status| {
      status.queued = queued;
      status.online = online;
      f(status);
    });
  }

  // ==========================================================================
  // Drain loop
  // ==========================================================================

  async fn drain(&self) -> DrainReport {
    let mut report = self.drain_pass().await;

    // An enqueue landing between the last empty read and the flag release
    // saw a running loop and did not start one.
    while !report.skipped && report.error.is_none() && report.remaining > 0 {
      let next = self.drain_pass().await;
      if next.skipped {
        report.remaining = next.remaining;
        break;
      }
      report.replayed += next.replayed;
      report.remaining = next.remaining;
      report.error = next.error;
    }

    if !report.skipped {
      tracing::info!(
        replayed = report.replayed,
        remaining = report.remaining,
        "drain finished"
      );
    }
    report
  }

  /// One run of the loop while holding the running flag. `remaining` is read
  /// after the flag is released.
  async fn drain_pass(&self) -> DrainReport {
    let Some(running) = RunGuard::acquire(&self.running) else {
      tracing::debug!("drain already running");
      return DrainReport {
        skipped: true,
        remaining: self.load_jobs().map(|jobs| jobs.len()).unwrap_or(0),
        ..Default::default()
      };
    };

    let mut report = DrainReport::default();
    self.publish(|status| status.syncing = true);

    loop {
      let head = match self.load_jobs() {
        Ok(jobs) => jobs.into_iter().next(),
        Err(e) => {
          report.error = Some(RemoteError::Transport(format!("failed to read job list: {}", e)));
          break;
        }
      };
      let Some(job) = head else {
        break;
      };

      if let Err(e) = self.replay(&job).await {
        tracing::warn!(job_id = %job.job_id, action = %job.action, error = %e, "sync failed, job kept at head of queue");
        report.error = Some(e);
        break;
      }

      self.invalidate(&job);
      if let Err(e) = self.modify_jobs(|jobs| jobs.retain(|j| j.job_id != job.job_id)) {
        report.error = Some(RemoteError::Transport(format!("failed to dequeue job: {}", e)));
        break;
      }
      report.replayed += 1;
      self.publish(|_| {});
    }

    let last_error = report.error.as_ref().map(|e| e.to_string());
    self.publish(|status| {
      status.syncing = false;
      status.last_error = last_error;
    });
    drop(running);

    report.remaining = self.load_jobs().map(|jobs| jobs.len()).unwrap_or(0);
    report
  }

  async fn replay(&self, job: &Job) -> std::result::Result<(), RemoteError> {
    tracing::debug!(job_id = %job.job_id, action = %job.action, "replaying job");
    let timeout = self.config.timeout;

    let response = tokio::time::timeout(timeout, self.endpoint.call(&job.action, &job.payload, timeout))
      .await
      .map_err(|_| RemoteError::Timeout(timeout))??;

    response.into_result().map(|_| ())
  }

  fn invalidate(&self, job: &Job) {
    let Some(invalidator) = &self.invalidator else {
      return;
    };
    for prefix in job.invalidates() {
      let dropped = invalidator.invalidate_prefix(prefix);
      tracing::debug!(prefix, dropped, "invalidated cached reads");
    }
  }
}
