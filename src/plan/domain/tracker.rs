//! Value objects exchanged with the external issue tracker.

use super::{ExternalIssueId, TaskId, TaskPriority};
use serde::{Deserialize, Serialize};

/// Priority scale used by the external tracker, `Urgent` being the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPriority {
    /// Tracker priority 1.
    Urgent,
    /// Tracker priority 2.
    High,
    /// Tracker priority 3.
    Medium,
    /// Tracker priority 4.
    Low,
}

impl TrackerPriority {
    /// Returns the tracker's numeric priority.
    #[must_use]
    pub const fn as_number(self) -> u8 {
        match self {
            Self::Urgent => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }
}

impl From<TaskPriority> for TrackerPriority {
    fn from(priority: TaskPriority) -> Self {
        match priority.value() {
            0 => Self::Urgent,
            1 => Self::High,
            2 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Issue creation request sent to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePayload {
    /// Issue title.
    pub title: String,
    /// Rendered issue body.
    pub description: String,
    /// Mapped priority.
    pub priority: TrackerPriority,
    /// Label names; the tracker resolves them to its own label ids.
    pub labels: Vec<String>,
}

/// Aggregating issue that links to every issue of one publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaIssuePayload {
    /// Issue title.
    pub title: String,
    /// Rendered checklist body.
    pub description: String,
    /// Issues the meta-issue aggregates, in plan order.
    pub child_issue_ids: Vec<ExternalIssueId>,
}

/// Link between a local task and the issue created for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    /// Local task.
    pub task_id: TaskId,
    /// Issue assigned by the tracker.
    pub external_issue_id: ExternalIssueId,
}

/// One failure recorded during a publish run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishFailure {
    /// Task whose issue could not be created; `None` for the meta-issue.
    pub task_id: Option<TaskId>,
    /// Tracker-provided reason.
    pub message: String,
}

/// Structured result of a publish run, returned even on partial failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// `true` when at least one issue was created.
    pub success: bool,
    /// Issues created, in plan order.
    pub created_issues: Vec<CreatedIssue>,
    /// Meta-issue, when requested and created.
    pub meta_issue_id: Option<ExternalIssueId>,
    /// Per-task and meta-issue failures.
    pub errors: Vec<PublishFailure>,
    /// Number of tasks attempted.
    pub attempted: usize,
}

impl PublishOutcome {
    /// Builds an outcome, deriving `success` from the created issues.
    #[must_use]
    pub fn new(
        created_issues: Vec<CreatedIssue>,
        meta_issue_id: Option<ExternalIssueId>,
        errors: Vec<PublishFailure>,
        attempted: usize,
    ) -> Self {
        Self {
            success: !created_issues.is_empty(),
            created_issues,
            meta_issue_id,
            errors,
            attempted,
        }
    }

    /// Task ids whose issue creation failed.
    #[must_use]
    pub fn failed_task_ids(&self) -> Vec<TaskId> {
        self.errors.iter().filter_map(|error| error.task_id).collect()
    }

    /// Short human-readable summary, e.g. `7 of 10 tasks published, 3 failed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let published = self.created_issues.len();
        let failed = self.failed_task_ids().len();
        if failed == 0 {
            return format!("{published} of {} tasks published", self.attempted);
        }
        format!(
            "{published} of {} tasks published, {failed} failed",
            self.attempted
        )
    }
}
