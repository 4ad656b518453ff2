//! Write-behind facade over the local store, the outbox and cached reads.
//!
//! Every mutation lands in the local store first and is then queued for the
//! backend. Callers see the local result immediately; the backend catches up
//! whenever the outbox drains. A local write whose job cannot be queued is
//! undone before the error is returned.

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::cache::{CacheResult, ReadCache};
use crate::error::{RemoteError, Result, StoreError};
use crate::model::{CompletionStatus, Entity, Kind, PaymentStatus};
use crate::outbox::{DrainReport, Job, Mutation, Outbox, OutboxConfig, SyncStatus};
use crate::registry::{self, IntoRecord};
use crate::remote::{actions, CachedReader, RemoteEndpoint};
use crate::remote::reader::ReadTtls;
use crate::storage::Storage;
use crate::store::LocalStore;

/// Tunables for a [`Workspace`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceSettings {
  pub ttls: ReadTtls,
  pub outbox: OutboxConfig,
}

/// Today's schedule together with the lookup lists.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
  pub lookups: Value,
  pub today: Value,
}

pub struct Workspace<S: Storage, E: RemoteEndpoint> {
  store: LocalStore<S>,
  outbox: Outbox<S, E>,
  reader: CachedReader<E>,
  cache: Arc<ReadCache<Value>>,
}

impl<S, E> Workspace<S, E>
where
  S: Storage + Clone + 'static,
  E: RemoteEndpoint + Clone + 'static,
{
  pub fn new(storage: S, endpoint: E, settings: WorkspaceSettings) -> Self {
    Self::with_store(LocalStore::new(storage.clone()), storage, endpoint, Arc::new(ReadCache::new()), settings)
  }

  /// Assemble from an already configured store and cache.
  pub fn with_store(
    store: LocalStore<S>,
    storage: S,
    endpoint: E,
    cache: Arc<ReadCache<Value>>,
    settings: WorkspaceSettings,
  ) -> Self {
    let outbox = Outbox::with_invalidator(storage, endpoint.clone(), settings.outbox, cache.clone());
    let reader = CachedReader::new(endpoint, cache.clone(), settings.ttls, settings.outbox.timeout);
    Self {
      store,
      outbox,
      reader,
      cache,
    }
  }

  pub fn store(&self) -> &LocalStore<S> {
    &self.store
  }

  pub fn outbox(&self) -> &Outbox<S, E> {
    &self.outbox
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  /// Store a record locally and queue `create<Kind>` or `update<Kind>`.
  ///
  /// If the job cannot be queued the local write is undone.
  pub fn save(&self, source: impl IntoRecord) -> Result<Entity> {
    let record = registry::flatten(source)?;
    let given_id = record
      .get("id")
      .and_then(Value::as_str)
      .filter(|id| !id.trim().is_empty());
    let previous = match given_id {
      Some(id) => self.store.get(registry::kind_of(&record)?, id).ok().flatten(),
      None => None,
    };
    let is_new = record.get("id").map_or(true, Value::is_null);

    let entity = self.store.save(record)?;
    let mutation = if is_new { Mutation::Create } else { Mutation::Update };
    self.enqueue_or_restore(
      &entity,
      previous,
      mutation.action(entity.kind()),
      entity.to_record(),
    )?;
    Ok(entity)
  }

  /// Mark a service or task done or scheduled.
  ///
  /// Applied locally right away. If the backend later refuses, the local
  /// change stays and the job stays queued.
  pub fn set_completion(&self, kind: Kind, id: &str, status: CompletionStatus) -> Result<Entity> {
    let current = self.existing(kind, id)?;
    let saved = self.store.save(&current.with_completion(status)?)?;
    self.enqueue_or_restore(
      &saved,
      Some(current),
      actions::SET_COMPLETION_STATUS,
      json!({ "kind": kind.as_str(), "id": id, "status": status.as_str() }),
    )?;
    Ok(saved)
  }

  /// Flip a record between scheduled and completed.
  pub fn toggle_completion(&self, kind: Kind, id: &str) -> Result<Entity> {
    let current = self
      .existing(kind, id)?
      .completion_status()
      .ok_or(StoreError::StatusNotApplicable {
        kind,
        field: "completionStatus",
      })?;
    self.set_completion(kind, id, current.toggled())
  }

  /// Mark a service paid or unpaid. Same optimistic rules as completion.
  pub fn set_payment(&self, kind: Kind, id: &str, status: PaymentStatus) -> Result<Entity> {
    let current = self.existing(kind, id)?;
    let saved = self.store.save(&current.with_payment(status)?)?;
    self.enqueue_or_restore(
      &saved,
      Some(current),
      actions::SET_PAYMENT_STATUS,
      json!({ "kind": kind.as_str(), "id": id, "status": status.as_str() }),
    )?;
    Ok(saved)
  }

  /// Delete locally and queue `delete<Kind>` if something was there.
  pub fn remove(&self, kind: Kind, id: &str) -> Result<bool> {
    let previous = self.store.get(kind, id).ok().flatten();
    if !self.store.remove(kind, id)? {
      return Ok(false);
    }

    let payload = json!({ "kind": kind.as_str(), "id": id });
    if let Err(e) = self.outbox.enqueue(Mutation::Delete.action(kind), payload) {
      self.undo(kind, id, previous);
      return Err(e);
    }
    Ok(true)
  }

  /// Queue a job for the local write that produced `written`; on failure
  /// put the store back to `previous`.
  fn enqueue_or_restore(
    &self,
    written: &Entity,
    previous: Option<Entity>,
    action: impl Into<String>,
    payload: Value,
  ) -> Result<()> {
    let Err(e) = self.outbox.enqueue(action, payload) else {
      return Ok(());
    };
    self.undo(written.kind(), written.id().unwrap_or_default(), previous);
    Err(e)
  }

  fn undo(&self, kind: Kind, id: &str, previous: Option<Entity>) {
    let restored = match previous {
      Some(entity) => self.store.save(&entity).map(|_| ()),
      None => self.store.remove(kind, id).map(|_| ()),
    };
    match restored {
      Ok(()) => tracing::warn!(%kind, id, "could not queue job, local write undone"),
      Err(e) => tracing::error!(%kind, id, error = %e, "could not queue job or undo local write"),
    }
  }

  fn existing(&self, kind: Kind, id: &str) -> Result<Entity> {
    self.store.get(kind, id)?.ok_or_else(|| StoreError::NotFound {
      kind,
      id: id.to_string(),
    })
  }

  /// Wipe local records, queued jobs and cached reads.
  pub fn reset(&self) -> Result<()> {
    self.store.clear_all()?;
    self.outbox.clear()?;
    self.cache.clear();
    tracing::info!("workspace reset");
    Ok(())
  }

  // ==========================================================================
  // Local reads
  // ==========================================================================

  pub fn get(&self, kind: Kind, id: &str) -> Result<Option<Entity>> {
    self.store.get(kind, id)
  }

  pub fn list(&self, family: &str) -> Result<Vec<Entity>> {
    self.store.list(family)
  }

  // ==========================================================================
  // Remote reads
  // ==========================================================================

  pub async fn today(&self, date: NaiveDate) -> std::result::Result<CacheResult<Value>, RemoteError> {
    self.reader.today(date).await
  }

  pub async fn lookups(&self) -> std::result::Result<CacheResult<Value>, RemoteError> {
    self.reader.lookups().await
  }

  pub async fn search(&self, q: &str) -> std::result::Result<CacheResult<Value>, RemoteError> {
    self.reader.search(q).await
  }

  /// Fetch lookups and the day's schedule concurrently.
  pub async fn refresh(&self, date: NaiveDate) -> std::result::Result<Snapshot, RemoteError> {
    let (lookups, today) = futures::try_join!(self.reader.lookups(), self.reader.today(date))?;
    Ok(Snapshot {
      lookups: lookups.data,
      today: today.data,
    })
  }

  pub async fn ping(&self) -> std::result::Result<(), RemoteError> {
    self.reader.ping().await
  }

  // ==========================================================================
  // Sync
  // ==========================================================================

  pub async fn sync(&self) -> DrainReport {
    self.outbox.drain().await
  }

  pub fn status(&self) -> SyncStatus {
    self.outbox.status()
  }

  pub fn pending(&self) -> Result<Vec<Job>> {
    self.outbox.pending()
  }

  pub fn set_online(&self, online: bool) {
    self.outbox.set_online(online);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{RegistryError, StorageError};
  use crate::outbox::OUTBOX_KEY;
  use crate::remote::Response;
  use crate::storage::MemoryStorage;
  use pretty_assertions::assert_eq;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Mutex;
  use std::time::Duration;

  /// Records calls; fails while `down` is set.
  #[derive(Default)]
  struct Backend {
    calls: Mutex<Vec<(String, Value)>>,
    down: Mutex<bool>,
  }

  impl Backend {
    fn actions(&self) -> Vec<String> {
      self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
    }

    fn set_down(&self, down: bool) {
      *self.down.lock().unwrap() = down;
    }
  }

  impl RemoteEndpoint for Backend {
    async fn call(
      &self,
      action: &str,
      payload: &Value,
      _timeout: Duration,
    ) -> std::result::Result<Response, RemoteError> {
      self.calls.lock().unwrap().push((action.to_string(), payload.clone()));
      if *self.down.lock().unwrap() {
        return Err(RemoteError::Transport("offline".to_string()));
      }
      Ok(Response::success().with_field("action", json!(action)))
    }
  }

  type TestWorkspace = Workspace<Arc<MemoryStorage>, Arc<Backend>>;

  fn settings() -> WorkspaceSettings {
    WorkspaceSettings {
      outbox: OutboxConfig {
        timeout: Duration::from_secs(1),
        auto_drain: false,
      },
      ..Default::default()
    }
  }

  fn workspace() -> (Arc<Backend>, TestWorkspace) {
    let backend = Arc::new(Backend::default());
    let ws = Workspace::new(Arc::new(MemoryStorage::new()), backend.clone(), settings());
    (backend, ws)
  }

  /// Memory storage that refuses writes to the job list while `broken` is set.
  #[derive(Default)]
  struct BrokenOutboxStorage {
    inner: MemoryStorage,
    broken: AtomicBool,
  }

  impl Storage for BrokenOutboxStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
      self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
      if key == OUTBOX_KEY && self.broken.load(Ordering::SeqCst) {
        return Err(StorageError::Backend("disk full".to_string()));
      }
      self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
      self.inner.remove(key)
    }
  }

  fn bath() -> Value {
    json!({ "kind": "BathService", "animalId": "dog_1", "date": "15-12-2025", "time": "10h30m" })
  }

  fn queued_actions<S: Storage + Clone + 'static>(ws: &Workspace<S, Arc<Backend>>) -> Vec<String> {
    ws.pending().unwrap().into_iter().map(|j| j.action).collect()
  }

  #[test]
  fn test_save_queues_create_then_update() {
    let (_, ws) = workspace();
    let saved = ws.save(bath()).unwrap();
    let id = saved.id().unwrap().to_string();
    ws.save(&saved).unwrap();

    assert_eq!(queued_actions(&ws), vec!["createBathService", "updateBathService"]);
    let pending = ws.pending().unwrap();
    assert_eq!(pending[0].payload["id"], json!(id));
    assert_eq!(pending[0].payload["kind"], "BathService");
  }

  #[test]
  fn test_invalid_save_queues_nothing() {
    let (_, ws) = workspace();
    let err = ws
      .save(json!({ "kind": "TransportationService", "animalId": "dog_1", "date": "15-12-2025", "direction": "To Hotel" }))
      .unwrap_err();
    assert!(matches!(err, StoreError::Registry(RegistryError::Validation(_))));
    assert!(ws.pending().unwrap().is_empty());
  }

  #[test]
  fn test_status_changes_apply_locally_and_queue() {
    let (_, ws) = workspace();
    let saved = ws.save(bath()).unwrap();
    let id = saved.id().unwrap();

    let done = ws.set_completion(Kind::BathService, id, CompletionStatus::Completed).unwrap();
    assert_eq!(done.completion_status(), Some(CompletionStatus::Completed));
    let paid = ws.set_payment(Kind::BathService, id, PaymentStatus::Paid).unwrap();
    assert_eq!(paid.payment_status(), Some(PaymentStatus::Paid));

    let stored = ws.get(Kind::BathService, id).unwrap().unwrap();
    assert_eq!(stored, paid);

    let pending = ws.pending().unwrap();
    assert_eq!(pending[1].action, "setCompletionStatus");
    assert_eq!(
      pending[2].payload,
      json!({ "kind": "BathService", "id": id, "status": "Paid" })
    );
  }

  #[test]
  fn test_toggle_and_inapplicable_status() {
    let (_, ws) = workspace();
    let task = ws
      .save(json!({ "kind": "Task", "title": "Sweep", "date": "02-01-2026" }))
      .unwrap();
    let id = task.id().unwrap();

    let toggled = ws.toggle_completion(Kind::Task, id).unwrap();
    assert_eq!(toggled.completion_status(), Some(CompletionStatus::Completed));
    let back = ws.toggle_completion(Kind::Task, id).unwrap();
    assert_eq!(back.completion_status(), Some(CompletionStatus::Scheduled));

    assert!(matches!(
      ws.set_payment(Kind::Task, id, PaymentStatus::Paid),
      Err(StoreError::StatusNotApplicable { .. })
    ));
    assert!(matches!(
      ws.set_completion(Kind::Task, "task_missing", CompletionStatus::Completed),
      Err(StoreError::NotFound { .. })
    ));
  }

  #[test]
  fn test_remove_queues_delete_only_when_something_was_removed() {
    let (_, ws) = workspace();
    let saved = ws.save(json!({ "kind": "Customer", "name": "Ana" })).unwrap();
    let id = saved.id().unwrap();

    assert!(ws.remove(Kind::Customer, id).unwrap());
    assert!(!ws.remove(Kind::Customer, id).unwrap());
    assert_eq!(queued_actions(&ws), vec!["createCustomer", "deleteCustomer"]);
    assert_eq!(ws.pending().unwrap()[1].payload, json!({ "kind": "Customer", "id": id }));
  }

  #[test]
  fn test_local_write_is_undone_when_job_cannot_be_queued() {
    let storage = Arc::new(BrokenOutboxStorage::default());
    let ws = Workspace::new(storage.clone(), Arc::new(Backend::default()), settings());
    let saved = ws.save(bath()).unwrap();
    let id = saved.id().unwrap().to_string();
    storage.broken.store(true, Ordering::SeqCst);

    let created = ws.save(json!({ "kind": "Customer", "name": "Ana" }));
    assert!(matches!(created, Err(StoreError::Storage(_))));
    assert!(ws.list("customers").unwrap().is_empty());

    let mut changed = saved.to_record();
    changed["time"] = json!("11h00m");
    assert!(ws.save(changed).is_err());
    assert!(ws.set_completion(Kind::BathService, &id, CompletionStatus::Completed).is_err());
    assert!(ws.set_payment(Kind::BathService, &id, PaymentStatus::Paid).is_err());
    assert_eq!(ws.get(Kind::BathService, &id).unwrap(), Some(saved.clone()));

    assert!(ws.remove(Kind::BathService, &id).is_err());
    assert_eq!(ws.get(Kind::BathService, &id).unwrap(), Some(saved));

    assert_eq!(queued_actions(&ws), vec!["createBathService"]);
  }

  #[tokio::test]
  async fn test_sync_drops_stale_reads() {
    let (backend, ws) = workspace();
    let date = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    ws.refresh(date).await.unwrap();
    assert!(ws.today(date).await.unwrap().is_cached());

    ws.save(bath()).unwrap();
    let report = ws.sync().await;
    assert_eq!(report.replayed, 1);

    // The day view was invalidated, lookups were not.
    assert!(!ws.today(date).await.unwrap().is_cached());
    assert!(ws.lookups().await.unwrap().is_cached());
    assert_eq!(
      backend.actions().iter().filter(|a| *a == "getToday").count(),
      2
    );
  }

  #[tokio::test]
  async fn test_failed_sync_keeps_local_change() {
    let (backend, ws) = workspace();
    let saved = ws.save(bath()).unwrap();
    let id = saved.id().unwrap();
    backend.set_down(true);
    ws.set_payment(Kind::BathService, id, PaymentStatus::Paid).unwrap();

    let report = ws.sync().await;
    assert_eq!(report.replayed, 0);
    assert_eq!(ws.status().queued, 2);
    assert!(ws.status().last_error.is_some());
    assert_eq!(
      ws.get(Kind::BathService, id).unwrap().unwrap().payment_status(),
      Some(PaymentStatus::Paid)
    );

    backend.set_down(false);
    assert_eq!(ws.sync().await.replayed, 2);
    assert_eq!(ws.status().queued, 0);
  }

  #[tokio::test]
  async fn test_refresh_reads_both_views() {
    let (_, ws) = workspace();
    let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
    let snapshot = ws.refresh(date).await.unwrap();
    assert_eq!(snapshot.lookups, json!({ "action": "getLookups" }));
    assert_eq!(snapshot.today, json!({ "action": "getToday" }));
  }

  #[tokio::test]
  async fn test_reset_clears_everything() {
    let (_, ws) = workspace();
    ws.save(bath()).unwrap();
    ws.lookups().await.unwrap();

    ws.reset().unwrap();
    assert!(ws.list("services").unwrap().is_empty());
    assert!(ws.pending().unwrap().is_empty());
    assert!(!ws.lookups().await.unwrap().is_cached());
  }
}
