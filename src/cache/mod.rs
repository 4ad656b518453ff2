//! Read cache for remote queries.
//!
//! Entries live for a short TTL and are dropped by key prefix whenever a
//! write reaches the backend.

mod layer;
mod traits;

pub use layer::ReadCache;
pub use traits::{CacheResult, CacheSource, Invalidate};

/// Key prefixes used by the cached reader.
pub mod keys {
  pub const TODAY: &str = "today:";
  pub const LOOKUPS: &str = "lookups";
  pub const SEARCH: &str = "search:";

  /// Every read prefix.
  pub const ALL: [&str; 3] = [LOOKUPS, SEARCH, TODAY];
}
