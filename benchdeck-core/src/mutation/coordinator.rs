//! The mutation coordinator

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cache::{CacheKey, QueryCache};
use crate::error::{BenchdeckError, Result};
use crate::model::{EvaluationRunResult, TestSet, TestSetDraft};
use crate::notify::{Notification, Notifier};
use crate::repo::TestSetRepository;

use super::state::{MutationKey, PendingMutations, PendingSnapshot};

/// Serializes user-triggered writes and their observable effects
///
/// On success a mutation invalidates the affected domain's cache key and
/// emits a success notification; on failure the cache is left untouched and
/// an error notification carries the underlying message. No mutation is
/// retried automatically; the user re-triggers.
///
/// Cheap to clone; clones share pending state and drafts.
#[derive(Clone)]
pub struct MutationCoordinator {
    repo: Arc<dyn TestSetRepository>,
    cache: QueryCache,
    pending: PendingMutations,
    notifier: Arc<dyn Notifier>,
    drafts: Arc<Mutex<HashMap<String, TestSetDraft>>>,
}

impl MutationCoordinator {
    /// Create a coordinator over a repository, cache, and notification sink.
    pub fn new(
        repo: Arc<dyn TestSetRepository>,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            cache,
            pending: PendingMutations::new(),
            notifier,
            drafts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cache this coordinator invalidates.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The shared pending-mutation table, for view projection.
    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    /// Pending flags for one domain, for view projection.
    pub fn pending_snapshot(&self, domain_id: &str) -> PendingSnapshot {
        self.pending.snapshot(domain_id)
    }

    /// Replace the create-form draft for a domain.
    pub fn set_draft(&self, domain_id: impl Into<String>, draft: TestSetDraft) {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.insert(domain_id.into(), draft);
    }

    /// Current create-form draft for a domain, empty if none was set.
    pub fn draft(&self, domain_id: &str) -> TestSetDraft {
        let drafts = self.drafts.lock().unwrap();
        drafts.get(domain_id).cloned().unwrap_or_default()
    }

    fn clear_draft(&self, domain_id: &str) {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.remove(domain_id);
    }

    /// Create a test set from the domain's current draft.
    ///
    /// Blank fields are rejected locally without a network round trip and
    /// leave the draft intact. On success the draft is cleared and the
    /// domain's collection is invalidated.
    pub async fn create_test_set(&self, domain_id: &str) -> Result<TestSet> {
        let draft = self.draft(domain_id);

        if let Err(e) = draft.validate() {
            self.notifier
                .notify(Notification::error(format!(
                    "Failed to create test set: {}",
                    e
                )))
                .await;
            return Err(e);
        }

        let key = MutationKey::create(domain_id);
        if !self.pending.begin(&key) {
            return Err(BenchdeckError::Conflict(format!(
                "a create is already pending for domain {}",
                domain_id
            )));
        }

        let result = self.repo.create(domain_id, &draft).await;

        match &result {
            Ok(test_set) => {
                tracing::info!(domain_id, test_set_id = %test_set.id, "test set created");
                self.cache.invalidate(&CacheKey::test_sets(domain_id));
                self.clear_draft(domain_id);
                self.notifier
                    .notify(Notification::success("Test set created successfully"))
                    .await;
            }
            Err(e) => {
                tracing::warn!(domain_id, error = %e, "test set creation failed");
                self.notifier
                    .notify(Notification::error(format!(
                        "Failed to create test set: {}",
                        e
                    )))
                    .await;
            }
        }

        self.pending.complete(&key, result.is_ok());
        result
    }

    /// Delete a test set. Irreversible; callers confirm with the user before
    /// invoking.
    ///
    /// A `NotFound` outcome is surfaced, and the collection is still
    /// invalidated so a stale row corrects itself on refetch.
    pub async fn delete_test_set(&self, domain_id: &str, test_set_id: &str) -> Result<()> {
        let key = MutationKey::delete(domain_id, test_set_id);
        if !self.pending.begin(&key) {
            return Err(BenchdeckError::Conflict(format!(
                "a delete is already pending for test set {}",
                test_set_id
            )));
        }

        let result = self.repo.delete(domain_id, test_set_id).await;

        match &result {
            Ok(()) => {
                tracing::info!(domain_id, test_set_id, "test set deleted");
                self.cache.invalidate(&CacheKey::test_sets(domain_id));
                self.notifier
                    .notify(Notification::success("Test set deleted successfully"))
                    .await;
            }
            Err(e) => {
                tracing::warn!(domain_id, test_set_id, error = %e, "test set deletion failed");
                self.notifier
                    .notify(Notification::error(format!(
                        "Failed to delete test set: {}",
                        e
                    )))
                    .await;
                if e.is_not_found() {
                    // The row was stale; refetch so the view corrects itself
                    self.cache.invalidate(&CacheKey::test_sets(domain_id));
                }
            }
        }

        self.pending.complete(&key, result.is_ok());
        result
    }

    /// Run an evaluation against every test set in the domain.
    ///
    /// Refused client-side while a prior run for the domain is pending, and
    /// when the cached collection is known to be empty; the server enforces
    /// both besides.
    pub async fn run_evaluation(&self, domain_id: &str) -> Result<EvaluationRunResult> {
        let cache_key = CacheKey::test_sets(domain_id);

        if let Some(data) = &self.cache.peek(&cache_key).data {
            if data.is_empty() {
                let err = BenchdeckError::Validation(
                    "cannot run an evaluation with no test sets".to_string(),
                );
                self.notifier
                    .notify(Notification::error(format!(
                        "Failed to run evaluation: {}",
                        err
                    )))
                    .await;
                return Err(err);
            }
        }

        let key = MutationKey::run(domain_id);
        if !self.pending.begin(&key) {
            return Err(BenchdeckError::Conflict(format!(
                "an evaluation run is already in progress for domain {}",
                domain_id
            )));
        }

        let result = self.repo.run_evaluation(domain_id).await;

        match &result {
            Ok(run) => {
                tracing::info!(
                    domain_id,
                    test_sets_evaluated = run.test_sets_evaluated,
                    "evaluation run completed"
                );
                self.cache.invalidate(&cache_key);
                self.notifier
                    .notify(Notification::success(format!(
                        "Evaluation completed! Evaluated {} test sets.",
                        run.test_sets_evaluated
                    )))
                    .await;
            }
            Err(e) => {
                tracing::warn!(domain_id, error = %e, "evaluation run failed");
                self.notifier
                    .notify(Notification::error(format!(
                        "Failed to run evaluation: {}",
                        e
                    )))
                    .await;
            }
        }

        self.pending.complete(&key, result.is_ok());
        result
    }
}
