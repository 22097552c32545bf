//! HTTP repository implementation
//!
//! Speaks the evaluation backend's REST contract:
//!
//! - `GET    /domains/{domain_id}/test-sets`
//! - `POST   /domains/{domain_id}/test-sets`
//! - `DELETE /domains/{domain_id}/test-sets/{test_set_id}`
//! - `POST   /domains/{domain_id}/evaluation/run`
//!
//! The wire format uses snake_case field names; this layer translates wire
//! records into the domain model and maps HTTP statuses onto the error
//! taxonomy. Unrecognized difficulty or status values are tolerated rather
//! than failing the whole record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{BenchdeckError, Result};
use crate::model::{Difficulty, EvaluationRunResult, RunStatus, TestSet, TestSetDraft};

use super::backend::TestSetRepository;

/// Repository backed by the evaluation backend's HTTP API
pub struct HttpTestSetRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTestSetRepository {
    /// Create a repository against a base URL with a default client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Create a repository from server configuration.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                BenchdeckError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(config.base_url.clone()),
        })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, domain_id: &str) -> String {
        format!(
            "{}/domains/{}/test-sets",
            self.base_url,
            urlencoding::encode(domain_id)
        )
    }

    fn item_url(&self, domain_id: &str, test_set_id: &str) -> String {
        format!(
            "{}/domains/{}/test-sets/{}",
            self.base_url,
            urlencoding::encode(domain_id),
            urlencoding::encode(test_set_id)
        )
    }

    fn run_url(&self, domain_id: &str) -> String {
        format!(
            "{}/domains/{}/evaluation/run",
            self.base_url,
            urlencoding::encode(domain_id)
        )
    }
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[derive(Deserialize)]
struct TestSetWire {
    id: String,
    #[serde(default)]
    domain_id: Option<String>,
    question: String,
    ground_truth: String,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    last_status: Option<String>,
}

impl TestSetWire {
    fn into_domain(self, domain_id: &str) -> TestSet {
        TestSet {
            id: self.id,
            domain_id: self.domain_id.unwrap_or_else(|| domain_id.to_string()),
            question: self.question,
            ground_truth: self.ground_truth,
            difficulty: self
                .difficulty
                .as_deref()
                .and_then(Difficulty::parse)
                .unwrap_or_default(),
            // Unrecognized statuses render as never-evaluated
            last_status: self.last_status.as_deref().and_then(RunStatus::parse),
        }
    }
}

#[derive(Serialize)]
struct CreateTestSetWire<'a> {
    question: &'a str,
    ground_truth: &'a str,
    difficulty: &'a str,
}

#[derive(Deserialize)]
struct RunResultWire {
    test_sets_evaluated: usize,
}

#[derive(Deserialize)]
struct ErrorBodyWire {
    message: Option<String>,
}

/// Map a non-success HTTP status onto the error taxonomy.
fn error_from_status(status: reqwest::StatusCode, body: &str) -> BenchdeckError {
    let message = serde_json::from_str::<ErrorBodyWire>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status.as_u16() {
        400 | 422 => BenchdeckError::Validation(message),
        404 => BenchdeckError::NotFound(message),
        409 => BenchdeckError::Conflict(message),
        _ => BenchdeckError::Network(format!("server returned {}: {}", status, message)),
    }
}

async fn read_error(response: reqwest::Response) -> BenchdeckError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error_from_status(status, &body)
}

#[async_trait]
impl TestSetRepository for HttpTestSetRepository {
    async fn list(&self, domain_id: &str) -> Result<Vec<TestSet>> {
        let url = self.collection_url(domain_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to reach evaluation server: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let wire: Vec<TestSetWire> = response.json().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to parse test-set listing: {}", e))
        })?;

        Ok(wire
            .into_iter()
            .map(|w| w.into_domain(domain_id))
            .collect())
    }

    async fn create(&self, domain_id: &str, draft: &TestSetDraft) -> Result<TestSet> {
        // Reject blank fields before spending a round trip
        draft.validate()?;

        let body = CreateTestSetWire {
            question: &draft.question,
            ground_truth: &draft.ground_truth,
            difficulty: draft.difficulty.as_str(),
        };

        let url = self.collection_url(domain_id);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                BenchdeckError::Network(format!("Failed to reach evaluation server: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let wire: TestSetWire = response.json().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to parse created test set: {}", e))
        })?;

        Ok(wire.into_domain(domain_id))
    }

    async fn delete(&self, domain_id: &str, test_set_id: &str) -> Result<()> {
        let url = self.item_url(domain_id, test_set_id);

        let response = self.client.delete(&url).send().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to reach evaluation server: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        Ok(())
    }

    async fn run_evaluation(&self, domain_id: &str) -> Result<EvaluationRunResult> {
        let url = self.run_url(domain_id);

        let response = self.client.post(&url).send().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to reach evaluation server: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(read_error(response).await);
        }

        let wire: RunResultWire = response.json().await.map_err(|e| {
            BenchdeckError::Network(format!("Failed to parse evaluation result: {}", e))
        })?;

        Ok(EvaluationRunResult {
            test_sets_evaluated: wire.test_sets_evaluated,
        })
    }
}
