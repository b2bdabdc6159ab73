//! Synchronization store for server state.
//!
//! This module keeps the last known server value for every query key and
//! decides when it has to be fetched again:
//! - Fresh values are served without a request until `stale_after` passes
//! - Concurrent fetches of one key share a single request
//! - Failed fetches are retried with exponential backoff
//! - Invalidation marks a key stale and supersedes any fetch in flight
//! - Entries nobody observes are evicted after `retain_after`

mod key;
mod options;
mod store;

pub use key::QueryKey;
pub use options::QueryOptions;
pub use store::{EntrySnapshot, EntryStatus, QueryStore, Subscription};
