//! Local-first data layer for a pet hotel and grooming scheduler.
//!
//! Records are validated into typed [`Entity`] values, kept in a local
//! [`LocalStore`], and pushed to the backend through a write-behind
//! [`Outbox`]. Reads from the backend go through a short-lived
//! [`ReadCache`]. [`Workspace`] ties the pieces together.

pub mod cache;
pub mod clock;
pub mod error;
pub mod model;
pub mod outbox;
pub mod registry;
pub mod remote;
pub mod storage;
pub mod store;
pub mod workspace;

pub use cache::ReadCache;
pub use error::{RegistryError, RemoteError, StorageError, StoreError, ValidationError};
pub use model::{Entity, Family, Kind};
pub use outbox::{DrainReport, Job, Outbox, OutboxConfig, SyncStatus};
pub use remote::{HttpEndpoint, RemoteEndpoint, Response};
pub use storage::{MemoryStorage, SqliteStorage, Storage};
pub use store::LocalStore;
pub use workspace::{Workspace, WorkspaceSettings};
