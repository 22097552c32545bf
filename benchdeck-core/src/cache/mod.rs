//! Server-state cache: last known good collections, keyed by domain
//!
//! The cache is the single source of truth for fetched collections. Reads
//! return stale data immediately while a refetch runs in the background
//! (stale-while-revalidate); at most one fetch is in flight per key; errors
//! are retained against the key until the next successful fetch or explicit
//! invalidation; and a completion that is no longer current is discarded so
//! an older response can never overwrite newer state.

mod key;
mod store;

pub use key::{CacheKey, ResourceKind};
pub use store::{CacheSnapshot, QueryCache};
