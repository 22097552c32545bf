//! Cache addressing

use serde::{Deserialize, Serialize};

/// Kind of cached resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// A domain's test-set collection
    TestSets,
}

impl ResourceKind {
    /// Stable name used in keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::TestSets => "test-sets",
        }
    }
}

/// Composite cache key: resource kind plus owning domain
///
/// Two domains never share an entry; their collections are addressed by
/// distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub domain_id: String,
}

impl CacheKey {
    /// Key for a domain's test-set collection.
    pub fn test_sets(domain_id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::TestSets,
            domain_id: domain_id.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.domain_id)
    }
}
