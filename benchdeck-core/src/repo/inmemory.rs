//! In-memory repository for testing and offline use
//!
//! Stores collections in a HashMap keyed by domain, assigns sequential ids
//! the way a backend would, and simulates evaluation runs deterministically
//! by cycling statuses pass, warn, fail across the collection.
//!
//! Call counters and an optional injected latency make pending-state windows
//! observable in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BenchdeckError, Result};
use crate::model::{EvaluationRunResult, RunStatus, TestSet, TestSetDraft};

use super::backend::TestSetRepository;

/// In-memory repository for tests and offline use
pub struct InMemoryTestSetRepository {
    domains: RwLock<HashMap<String, Vec<TestSet>>>,
    active_runs: Mutex<HashSet<String>>,
    next_id: AtomicU64,
    latency: Option<Duration>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    run_calls: AtomicUsize,
}

impl Default for InMemoryTestSetRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTestSetRepository {
    /// Create an empty repository with no registered domains.
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(HashMap::new()),
            active_runs: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            latency: None,
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
        }
    }

    /// Add a simulated per-operation latency, so callers can observe
    /// in-flight state.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register a domain with an empty collection. Operations against an
    /// unregistered domain fail with `NotFound`.
    pub fn register_domain(&self, domain_id: impl Into<String>) {
        let mut domains = self.domains.write().unwrap();
        domains.entry(domain_id.into()).or_default();
    }

    /// Number of `list` calls served.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `create` calls served.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls served.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `run_evaluation` calls served.
    pub fn run_calls(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }

    fn generate_id(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("ts_{}", id)
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn domain_not_found(domain_id: &str) -> BenchdeckError {
        BenchdeckError::NotFound(format!("domain {} not found", domain_id))
    }
}

#[async_trait]
impl TestSetRepository for InMemoryTestSetRepository {
    async fn list(&self, domain_id: &str) -> Result<Vec<TestSet>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let domains = self.domains.read().unwrap();
        domains
            .get(domain_id)
            .cloned()
            .ok_or_else(|| Self::domain_not_found(domain_id))
    }

    async fn create(&self, domain_id: &str, draft: &TestSetDraft) -> Result<TestSet> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        draft.validate()?;

        let mut domains = self.domains.write().unwrap();
        let sets = domains
            .get_mut(domain_id)
            .ok_or_else(|| Self::domain_not_found(domain_id))?;

        let test_set = TestSet {
            id: self.generate_id(),
            domain_id: domain_id.to_string(),
            question: draft.question.clone(),
            ground_truth: draft.ground_truth.clone(),
            difficulty: draft.difficulty,
            last_status: None,
        };

        sets.push(test_set.clone());
        Ok(test_set)
    }

    async fn delete(&self, domain_id: &str, test_set_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let mut domains = self.domains.write().unwrap();
        let sets = domains
            .get_mut(domain_id)
            .ok_or_else(|| Self::domain_not_found(domain_id))?;

        let position = sets.iter().position(|ts| ts.id == test_set_id).ok_or_else(|| {
            BenchdeckError::NotFound(format!("test set {} not found", test_set_id))
        })?;

        sets.remove(position);
        Ok(())
    }

    async fn run_evaluation(&self, domain_id: &str) -> Result<EvaluationRunResult> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);

        {
            let mut active = self.active_runs.lock().unwrap();
            if !active.insert(domain_id.to_string()) {
                return Err(BenchdeckError::Conflict(format!(
                    "an evaluation run is already in progress for domain {}",
                    domain_id
                )));
            }
        }

        self.pause().await;

        let result = {
            let mut domains = self.domains.write().unwrap();
            match domains.get_mut(domain_id) {
                None => Err(Self::domain_not_found(domain_id)),
                Some(sets) if sets.is_empty() => Err(BenchdeckError::Validation(
                    "cannot run an evaluation with no test sets".to_string(),
                )),
                Some(sets) => {
                    for (index, test_set) in sets.iter_mut().enumerate() {
                        test_set.last_status = Some(match index % 3 {
                            0 => RunStatus::Pass,
                            1 => RunStatus::Warn,
                            _ => RunStatus::Fail,
                        });
                    }
                    Ok(EvaluationRunResult {
                        test_sets_evaluated: sets.len(),
                    })
                }
            }
        };

        self.active_runs.lock().unwrap().remove(domain_id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    #[tokio::test]
    async fn test_create_and_list() {
        let repo = InMemoryTestSetRepository::new();
        repo.register_domain("maps");

        let created = repo
            .create("maps", &TestSetDraft::new("List active servers", "SQL filter"))
            .await
            .unwrap();
        assert_eq!(created.id, "ts_1");
        assert!(created.last_status.is_none());

        let listed = repo.list("maps").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn test_unknown_domain_is_not_found() {
        let repo = InMemoryTestSetRepository::new();

        let err = repo.list("nowhere").await.unwrap_err();
        assert!(err.is_not_found());

        let err = repo
            .create("nowhere", &TestSetDraft::new("q", "a"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_empty_domain_lists_empty_not_error() {
        let repo = InMemoryTestSetRepository::new();
        repo.register_domain("maps");
        assert!(repo.list("maps").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_and_second_delete_fails() {
        let repo = InMemoryTestSetRepository::new();
        repo.register_domain("maps");
        let created = repo
            .create("maps", &TestSetDraft::new("q", "a"))
            .await
            .unwrap();

        repo.delete("maps", &created.id).await.unwrap();
        assert!(repo.list("maps").await.unwrap().is_empty());

        let err = repo.delete("maps", &created.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_cycles_statuses() {
        let repo = InMemoryTestSetRepository::new();
        repo.register_domain("maps");
        for i in 0..4 {
            repo.create(
                "maps",
                &TestSetDraft::new(format!("q{}", i), "a").with_difficulty(Difficulty::Hard),
            )
            .await
            .unwrap();
        }

        let result = repo.run_evaluation("maps").await.unwrap();
        assert_eq!(result.test_sets_evaluated, 4);

        let listed = repo.list("maps").await.unwrap();
        let statuses: Vec<_> = listed.iter().map(|ts| ts.last_status.unwrap()).collect();
        assert_eq!(
            statuses,
            vec![RunStatus::Pass, RunStatus::Warn, RunStatus::Fail, RunStatus::Pass]
        );
    }

    #[tokio::test]
    async fn test_run_on_empty_domain_is_validation_error() {
        let repo = InMemoryTestSetRepository::new();
        repo.register_domain("maps");

        let err = repo.run_evaluation("maps").await.unwrap_err();
        assert!(matches!(err, BenchdeckError::Validation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_runs_conflict() {
        use std::sync::Arc;

        let repo = Arc::new(
            InMemoryTestSetRepository::new().with_latency(Duration::from_millis(20)),
        );
        repo.register_domain("maps");
        repo.create("maps", &TestSetDraft::new("q", "a")).await.unwrap();

        let (first, second) =
            tokio::join!(repo.run_evaluation("maps"), repo.run_evaluation("maps"));

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let conflict = outcomes.iter().find(|r| r.is_err()).unwrap();
        assert!(matches!(
            conflict.as_ref().unwrap_err(),
            BenchdeckError::Conflict(_)
        ));
    }
}
