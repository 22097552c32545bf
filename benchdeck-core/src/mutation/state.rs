//! Pending-mutation state tracking
//!
//! Pending flags are owned here, keyed by (kind, domain, target), independent
//! of any view's lifetime. Views read a [`PendingSnapshot`] to disable the
//! controls whose mutation is in flight.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Kind of write operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Delete,
    RunEvaluation,
}

impl MutationKind {
    /// Stable name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Delete => "delete",
            MutationKind::RunEvaluation => "run-evaluation",
        }
    }
}

/// Identity of one mutation instance
///
/// Deletes carry the targeted test-set id so two rows' deletes never share
/// a pending flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub kind: MutationKind,
    pub domain_id: String,
    pub target: Option<String>,
}

impl MutationKey {
    /// Key for creating a test set in a domain.
    pub fn create(domain_id: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Create,
            domain_id: domain_id.into(),
            target: None,
        }
    }

    /// Key for deleting a specific test set.
    pub fn delete(domain_id: impl Into<String>, test_set_id: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Delete,
            domain_id: domain_id.into(),
            target: Some(test_set_id.into()),
        }
    }

    /// Key for running an evaluation in a domain.
    pub fn run(domain_id: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::RunEvaluation,
            domain_id: domain_id.into(),
            target: None,
        }
    }
}

impl std::fmt::Display for MutationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}:{}:{}", self.kind.as_str(), self.domain_id, target),
            None => write!(f, "{}:{}", self.kind.as_str(), self.domain_id),
        }
    }
}

/// Phase of one mutation instance
///
/// Terminal phases are retained for inspection; the next `begin` on the same
/// key re-arms the instance from either terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationPhase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Table of mutation phases, shared between coordinator and views
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct PendingMutations {
    inner: Arc<Mutex<HashMap<MutationKey, MutationPhase>>>,
}

/// Pending flags projected for one domain, consumed by the view layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSnapshot {
    /// A create is in flight for the domain
    pub create: bool,

    /// An evaluation run is in flight for the domain
    pub run: bool,

    /// Test-set ids with a delete in flight
    pub deletes: HashSet<String>,
}

impl PendingMutations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to move a key into `Pending`. Returns false if the key is already
    /// pending, in which case the trigger must not proceed.
    pub fn begin(&self, key: &MutationKey) -> bool {
        let mut table = self.inner.lock().unwrap();
        let phase = table.entry(key.clone()).or_default();
        if *phase == MutationPhase::Pending {
            return false;
        }
        *phase = MutationPhase::Pending;
        true
    }

    /// Record the outcome of a pending mutation.
    pub fn complete(&self, key: &MutationKey, success: bool) {
        let mut table = self.inner.lock().unwrap();
        let phase = table.entry(key.clone()).or_default();
        *phase = if success {
            MutationPhase::Succeeded
        } else {
            MutationPhase::Failed
        };
    }

    /// Current phase of a key; `Idle` when the key was never begun.
    pub fn phase(&self, key: &MutationKey) -> MutationPhase {
        let table = self.inner.lock().unwrap();
        table.get(key).copied().unwrap_or_default()
    }

    /// Whether a key is currently pending.
    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.phase(key) == MutationPhase::Pending
    }

    /// Project the pending flags relevant to one domain.
    pub fn snapshot(&self, domain_id: &str) -> PendingSnapshot {
        let table = self.inner.lock().unwrap();
        let mut snapshot = PendingSnapshot::default();
        for (key, phase) in table.iter() {
            if key.domain_id != domain_id || *phase != MutationPhase::Pending {
                continue;
            }
            match key.kind {
                MutationKind::Create => snapshot.create = true,
                MutationKind::RunEvaluation => snapshot.run = true,
                MutationKind::Delete => {
                    if let Some(target) = &key.target {
                        snapshot.deletes.insert(target.clone());
                    }
                }
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_blocks_reentry_until_complete() {
        let pending = PendingMutations::new();
        let key = MutationKey::run("maps");

        assert_eq!(pending.phase(&key), MutationPhase::Idle);
        assert!(pending.begin(&key));
        assert!(pending.is_pending(&key));

        // Re-entrant trigger is refused while pending
        assert!(!pending.begin(&key));

        pending.complete(&key, true);
        assert_eq!(pending.phase(&key), MutationPhase::Succeeded);

        // A terminal phase re-arms
        assert!(pending.begin(&key));
        pending.complete(&key, false);
        assert_eq!(pending.phase(&key), MutationPhase::Failed);
        assert!(pending.begin(&key));
    }

    #[test]
    fn test_delete_keys_are_per_target() {
        let pending = PendingMutations::new();
        assert!(pending.begin(&MutationKey::delete("maps", "ts_1")));
        assert!(pending.begin(&MutationKey::delete("maps", "ts_2")));
        assert!(!pending.begin(&MutationKey::delete("maps", "ts_1")));
    }

    #[test]
    fn test_snapshot_scopes_to_domain() {
        let pending = PendingMutations::new();
        pending.begin(&MutationKey::run("maps"));
        pending.begin(&MutationKey::delete("maps", "ts_42"));
        pending.begin(&MutationKey::create("docs"));

        let maps = pending.snapshot("maps");
        assert!(maps.run);
        assert!(!maps.create);
        assert!(maps.deletes.contains("ts_42"));

        let docs = pending.snapshot("docs");
        assert!(docs.create);
        assert!(!docs.run);
        assert!(docs.deletes.is_empty());
    }
}
