// unbloat-common/src/model/operation.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::package::{AppView, PackageStatus};

/// Transition a batch applies to every selected package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Remove,
    Restore,
}

impl Direction {
    pub fn target_status(self) -> PackageStatus {
        match self {
            Direction::Remove => PackageStatus::Uninstalled,
            Direction::Restore => PackageStatus::Installed,
        }
    }

    /// View the selection for this direction is made in.
    pub fn source_view(self) -> AppView {
        match self {
            Direction::Remove => AppView::Installed,
            Direction::Restore => AppView::Uninstalled,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Remove => f.write_str("uninstall"),
            Direction::Restore => f.write_str("reinstall"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// Result of one package's transition within one batch run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl OperationResult {
    pub fn succeeded() -> Self {
        Self {
            outcome: Outcome::Succeeded,
            detail: None,
        }
    }

    pub fn succeeded_with(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Succeeded,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub direction: Direction,
    pub results: BTreeMap<String, OperationResult>,
    /// Selected but never attempted because the batch was cancelled.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            results: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.values().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    BatchStarted {
        direction: Direction,
        total: usize,
    },
    PackageStarted {
        package_id: String,
    },
    PackageFinished {
        package_id: String,
        result: OperationResult,
    },
    PackageSkipped {
        package_id: String,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::new(Direction::Remove);
        report
            .results
            .insert("a".to_string(), OperationResult::succeeded());
        report
            .results
            .insert("b".to_string(), OperationResult::failed("boom"));
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_direction_targets_match_views() {
        assert_eq!(Direction::Remove.target_status(), PackageStatus::Uninstalled);
        assert_eq!(
            Direction::Remove.source_view().required_status(),
            PackageStatus::Installed
        );
        assert_eq!(
            Direction::Restore.source_view().required_status(),
            Direction::Remove.target_status()
        );
    }
}
