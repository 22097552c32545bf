//! # Benchdeck - Test-Set Lifecycle & Evaluation-Run Coordination
//!
//! Benchdeck is the coordination core of an agent-evaluation dashboard:
//! - A typed repository client over a domain's ground-truth test sets
//! - A keyed, invalidation-driven server-state cache (stale-while-revalidate,
//!   single-flight fetches, last-completed-wins)
//! - A mutation coordinator serializing create/delete/run operations with
//!   pending-state tracking and user-visible notifications
//! - A pure view projection deriving renderable table state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use benchdeck_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = BenchdeckConfig::load()?;
//!     let repo: Arc<dyn TestSetRepository> =
//!         Arc::new(HttpTestSetRepository::from_config(&config.server)?);
//!     let cache = QueryCache::with_config(repo.clone(), &config.cache);
//!     let coordinator =
//!         MutationCoordinator::new(repo, cache.clone(), Arc::new(LoggingNotifier));
//!
//!     let key = CacheKey::test_sets("maps");
//!     let _watch = cache.subscribe(&key);
//!     cache.get(&key);
//!     let snapshot = cache.wait_for(&key, CacheSnapshot::is_settled).await;
//!
//!     let view = project_test_sets("maps", &snapshot, &coordinator.pending_snapshot("maps"));
//!     if view.run_enabled {
//!         coordinator.run_evaluation("maps").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Views read from the cache; user actions go through the coordinator; the
//! coordinator calls the repository and, on success, invalidates the
//! affected cache key; the cache refetches; views re-render from the new
//! snapshot. The coordinator is the sole writer of invalidation triggers.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod mutation;
pub mod notify;
pub mod repo;
pub mod view;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheKey, CacheSnapshot, QueryCache, ResourceKind};
    pub use crate::config::{BenchdeckConfig, CacheConfig, ServerConfig};
    pub use crate::error::{BenchdeckError, Result};
    pub use crate::model::{
        Difficulty, EvaluationRunResult, RunStatus, TestSet, TestSetDraft,
    };
    pub use crate::mutation::{
        MutationCoordinator, MutationKey, MutationKind, MutationPhase, PendingMutations,
        PendingSnapshot,
    };
    pub use crate::notify::{
        BufferingNotifier, LoggingNotifier, Notification, NotificationLevel, Notifier,
    };
    pub use crate::repo::{
        HttpTestSetRepository, InMemoryTestSetRepository, TestSetRepository,
    };
    pub use crate::view::{
        project_test_sets, StatusMarker, TableState, TestSetRow, TestSetView,
    };
}
