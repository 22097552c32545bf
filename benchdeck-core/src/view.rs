//! View projection: pure derivation from cache and pending state
//!
//! Nothing here performs I/O or holds state. A renderer (terminal, browser
//! shell) takes a [`TestSetView`] and draws it; all rules about placeholders,
//! empty states, status markers, and disabled controls live in the
//! projection so every surface renders the same truth.

use serde::{Deserialize, Serialize};

use crate::cache::CacheSnapshot;
use crate::model::{Difficulty, RunStatus};
use crate::mutation::PendingSnapshot;

/// Status indicator for a table row
///
/// The mapping from `last_status` is total: anything the model cannot name
/// renders as not-evaluated rather than failing the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMarker {
    /// Affirmative marker: the last run passed
    Pass,
    /// Negative marker: the last run failed
    Fail,
    /// Partial marker: the last run partially matched
    Partial,
    /// The test set has not been evaluated
    NotEvaluated,
}

impl StatusMarker {
    /// Derive the marker from a test set's last status.
    pub fn from_status(status: Option<RunStatus>) -> Self {
        match status {
            Some(RunStatus::Pass) => StatusMarker::Pass,
            Some(RunStatus::Fail) => StatusMarker::Fail,
            Some(RunStatus::Warn) => StatusMarker::Partial,
            None => StatusMarker::NotEvaluated,
        }
    }

    /// Label shown next to the marker.
    pub fn label(&self) -> &'static str {
        match self {
            StatusMarker::Pass => "Pass",
            StatusMarker::Fail => "Fail",
            StatusMarker::Partial => "Partial",
            StatusMarker::NotEvaluated => "Not evaluated",
        }
    }

    /// Single-glyph marker for terminal rendering.
    pub fn symbol(&self) -> &'static str {
        match self {
            StatusMarker::Pass => "✓",
            StatusMarker::Fail => "✗",
            StatusMarker::Partial => "!",
            StatusMarker::NotEvaluated => "-",
        }
    }
}

/// One renderable table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetRow {
    pub id: String,
    pub question: String,
    pub ground_truth: String,
    pub difficulty: Difficulty,
    pub status: StatusMarker,

    /// False exactly while this row's delete mutation is pending
    pub delete_enabled: bool,
}

/// Body of the test-set table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableState {
    /// No data yet and a fetch is in flight: render a loading placeholder
    Loading,
    /// Loaded with zero entries: render the empty-state prompt
    Empty,
    /// Loaded rows, in server order
    Rows(Vec<TestSetRow>),
}

/// Renderable state of a domain's test-set screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetView {
    pub domain_id: String,
    pub table: TableState,

    /// Retained fetch error, if the last fetch failed
    pub error: Option<String>,

    /// Stale data is on screen while a refetch runs
    pub refreshing: bool,

    /// Run control: enabled only for a non-empty collection with no run
    /// in flight
    pub run_enabled: bool,

    /// Create control: disabled while a create is in flight
    pub create_enabled: bool,
}

/// Project a domain's cache snapshot and pending flags into a renderable
/// view.
pub fn project_test_sets(
    domain_id: &str,
    snapshot: &CacheSnapshot,
    pending: &PendingSnapshot,
) -> TestSetView {
    let table = match &snapshot.data {
        Some(sets) if sets.is_empty() => TableState::Empty,
        Some(sets) => TableState::Rows(
            sets.iter()
                .map(|ts| TestSetRow {
                    id: ts.id.clone(),
                    question: ts.question.clone(),
                    ground_truth: ts.ground_truth.clone(),
                    difficulty: ts.difficulty,
                    status: StatusMarker::from_status(ts.last_status),
                    delete_enabled: !pending.deletes.contains(&ts.id),
                })
                .collect(),
        ),
        None if snapshot.is_loading => TableState::Loading,
        None => TableState::Empty,
    };

    let has_rows = matches!(&table, TableState::Rows(rows) if !rows.is_empty());

    TestSetView {
        domain_id: domain_id.to_string(),
        table,
        error: snapshot.error.clone(),
        refreshing: snapshot.is_loading && snapshot.data.is_some(),
        run_enabled: has_rows && !pending.run,
        create_enabled: !pending.create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestSet;

    fn snapshot_with(data: Option<Vec<TestSet>>, is_loading: bool) -> CacheSnapshot {
        CacheSnapshot {
            data,
            is_loading,
            error: None,
            version: 1,
            fetched_at: None,
        }
    }

    fn test_set(id: &str, status: Option<RunStatus>) -> TestSet {
        TestSet {
            id: id.to_string(),
            domain_id: "maps".to_string(),
            question: "q".to_string(),
            ground_truth: "a".to_string(),
            difficulty: Difficulty::Medium,
            last_status: status,
        }
    }

    #[test]
    fn test_loading_without_data_renders_placeholder() {
        let view = project_test_sets(
            "maps",
            &snapshot_with(None, true),
            &PendingSnapshot::default(),
        );
        assert_eq!(view.table, TableState::Loading);
        assert!(!view.run_enabled);
        assert!(!view.refreshing);
    }

    #[test]
    fn test_empty_collection_renders_empty_state_and_disables_run() {
        let view = project_test_sets(
            "maps",
            &snapshot_with(Some(vec![]), false),
            &PendingSnapshot::default(),
        );
        assert_eq!(view.table, TableState::Empty);
        assert!(!view.run_enabled);
        assert!(view.create_enabled);
    }

    #[test]
    fn test_status_marker_mapping_is_total() {
        assert_eq!(
            StatusMarker::from_status(Some(RunStatus::Pass)),
            StatusMarker::Pass
        );
        assert_eq!(
            StatusMarker::from_status(Some(RunStatus::Fail)),
            StatusMarker::Fail
        );
        assert_eq!(
            StatusMarker::from_status(Some(RunStatus::Warn)),
            StatusMarker::Partial
        );
        assert_eq!(StatusMarker::from_status(None), StatusMarker::NotEvaluated);
        assert_eq!(StatusMarker::NotEvaluated.label(), "Not evaluated");
    }

    #[test]
    fn test_pending_delete_disables_only_that_row() {
        let mut pending = PendingSnapshot::default();
        pending.deletes.insert("ts_42".to_string());

        let view = project_test_sets(
            "maps",
            &snapshot_with(
                Some(vec![
                    test_set("ts_41", Some(RunStatus::Pass)),
                    test_set("ts_42", None),
                    test_set("ts_43", Some(RunStatus::Fail)),
                ]),
                false,
            ),
            &pending,
        );

        let TableState::Rows(rows) = view.table else {
            panic!("expected rows");
        };
        assert!(rows[0].delete_enabled);
        assert!(!rows[1].delete_enabled);
        assert!(rows[2].delete_enabled);
    }

    #[test]
    fn test_pending_run_disables_run_control() {
        let pending = PendingSnapshot {
            run: true,
            ..Default::default()
        };

        let view = project_test_sets(
            "maps",
            &snapshot_with(Some(vec![test_set("ts_1", None)]), false),
            &pending,
        );
        assert!(!view.run_enabled);
    }

    #[test]
    fn test_stale_data_with_refetch_marks_refreshing() {
        let view = project_test_sets(
            "maps",
            &snapshot_with(Some(vec![test_set("ts_1", None)]), true),
            &PendingSnapshot::default(),
        );
        assert!(view.refreshing);
        assert!(matches!(view.table, TableState::Rows(_)));
    }
}
