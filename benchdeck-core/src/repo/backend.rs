//! Repository trait for test-set collections

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{EvaluationRunResult, TestSet, TestSetDraft};

/// Typed request layer over a domain's test sets
///
/// Failure contract:
/// - `list` fails with `NotFound` when the domain does not exist and
///   `Network` on transport failure; a domain with zero test sets returns an
///   empty collection, not an error.
/// - `create` fails with `Validation` when question or ground truth is
///   blank; the server assigns the id.
/// - `delete` fails with `NotFound` when the test set no longer exists.
/// - `run_evaluation` fails with `Conflict` when a run is already in
///   progress for the domain and `Validation` when no test sets exist.
#[async_trait]
pub trait TestSetRepository: Send + Sync {
    /// List all test sets in a domain, in insertion order.
    async fn list(&self, domain_id: &str) -> Result<Vec<TestSet>>;

    /// Create a test set from a draft. Returns the created record with its
    /// server-assigned id.
    async fn create(&self, domain_id: &str, draft: &TestSetDraft) -> Result<TestSet>;

    /// Delete a test set permanently.
    async fn delete(&self, domain_id: &str, test_set_id: &str) -> Result<()>;

    /// Score the agent against every test set in the domain. Each test set's
    /// `last_status` is updated server-side; callers observe the new
    /// statuses by refetching the collection.
    async fn run_evaluation(&self, domain_id: &str) -> Result<EvaluationRunResult>;
}
