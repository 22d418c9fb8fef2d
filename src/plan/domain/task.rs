//! Task aggregate and the value objects that describe a unit of work.

use super::{ExternalIssueId, PlanDomainError, PlanId, TaskId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Task urgency, where `0` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TaskPriority(u8);

impl TaskPriority {
    /// Least urgent supported priority.
    pub const LOWEST: u8 = 4;

    /// Creates a validated priority.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::InvalidPriority`] when the value exceeds
    /// [`Self::LOWEST`].
    pub const fn new(value: u8) -> Result<Self, PlanDomainError> {
        if value > Self::LOWEST {
            return Err(PlanDomainError::InvalidPriority(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying ordinal.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for TaskPriority {
    type Error = PlanDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskPriority> for u8 {
    fn from(priority: TaskPriority) -> Self {
        priority.0
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Positive effort estimate in hours.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TaskEstimate(f64);

impl TaskEstimate {
    /// Creates a validated estimate.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::InvalidEstimate`] unless the value is finite
    /// and strictly positive.
    pub fn hours(value: f64) -> Result<Self, PlanDomainError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(PlanDomainError::InvalidEstimate(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Returns the estimate in hours.
    #[must_use]
    pub const fn as_hours(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for TaskEstimate {
    type Error = PlanDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::hours(value)
    }
}

impl From<TaskEstimate> for f64 {
    fn from(estimate: TaskEstimate) -> Self {
        estimate.0
    }
}

/// Position of a task on the planning canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasPosition {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Descriptive fields of a task, independent of identity and edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    title: String,
    description: String,
    priority: TaskPriority,
    labels: BTreeSet<String>,
    acceptance_criteria: Vec<String>,
    related_files: Vec<String>,
    estimate: Option<TaskEstimate>,
    position: Option<CanvasPosition>,
}

impl TaskContent {
    /// Creates content with a required title.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::EmptyTaskTitle`] if the title is empty
    /// after trimming.
    pub fn new(title: impl Into<String>) -> Result<Self, PlanDomainError> {
        let raw_title = title.into();
        let normalized_title = raw_title.trim();
        if normalized_title.is_empty() {
            return Err(PlanDomainError::EmptyTaskTitle);
        }

        Ok(Self {
            title: normalized_title.to_owned(),
            description: String::new(),
            priority: TaskPriority::default(),
            labels: BTreeSet::new(),
            acceptance_criteria: Vec::new(),
            related_files: Vec::new(),
            estimate: None,
            position: None,
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        description.into().trim().clone_into(&mut self.description);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets labels, dropping blanks and duplicates.
    #[must_use]
    pub fn with_labels(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.labels = normalize_lines(labels).collect();
        self
    }

    /// Sets acceptance criteria, preserving order and dropping blanks.
    #[must_use]
    pub fn with_acceptance_criteria(mut self, criteria: impl IntoIterator<Item = String>) -> Self {
        self.acceptance_criteria = normalize_lines(criteria).collect();
        self
    }

    /// Sets related file paths, preserving order and dropping blanks.
    #[must_use]
    pub fn with_related_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.related_files = normalize_lines(files).collect();
        self
    }

    /// Sets the estimate.
    #[must_use]
    pub fn with_estimate(mut self, estimate: TaskEstimate) -> Self {
        self.estimate = Some(estimate);
        self
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn with_position(mut self, position: CanvasPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, which may be empty.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns labels in sorted order.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns acceptance criteria.
    #[must_use]
    pub fn acceptance_criteria(&self) -> &[String] {
        &self.acceptance_criteria
    }

    /// Returns related file paths.
    #[must_use]
    pub fn related_files(&self) -> &[String] {
        &self.related_files
    }

    /// Returns the estimate, if any.
    #[must_use]
    pub const fn estimate(&self) -> Option<TaskEstimate> {
        self.estimate
    }

    /// Returns the canvas position, if any.
    #[must_use]
    pub const fn position(&self) -> Option<CanvasPosition> {
        self.position
    }
}

fn normalize_lines(values: impl IntoIterator<Item = String>) -> impl Iterator<Item = String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Input for creating a single task with id-based blockers.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Descriptive fields.
    pub content: TaskContent,
    /// Display and execution order within the plan.
    pub sort_order: i32,
    /// Blockers, referenced by task id.
    pub blocked_by: Vec<TaskId>,
}

impl NewTask {
    /// Creates input without blockers.
    #[must_use]
    pub const fn new(content: TaskContent, sort_order: i32) -> Self {
        Self {
            content,
            sort_order,
            blocked_by: Vec::new(),
        }
    }

    /// Sets blockers.
    #[must_use]
    pub fn with_blocked_by(mut self, blocked_by: impl IntoIterator<Item = TaskId>) -> Self {
        self.blocked_by = blocked_by.into_iter().collect();
        self
    }
}

/// One entry of a batch import whose blockers reference other batch entries
/// by position.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTaskSpec {
    /// Descriptive fields.
    pub content: TaskContent,
    /// Explicit sort order; defaults to the batch position after any
    /// existing tasks.
    pub sort_order: Option<i32>,
    /// Blockers, referenced by index into the batch.
    pub blocked_by_indices: Vec<usize>,
}

impl BatchTaskSpec {
    /// Creates a batch entry without blockers.
    #[must_use]
    pub const fn new(content: TaskContent) -> Self {
        Self {
            content,
            sort_order: None,
            blocked_by_indices: Vec::new(),
        }
    }

    /// Sets blockers by batch index.
    #[must_use]
    pub fn blocked_by(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.blocked_by_indices = indices.into_iter().collect();
        self
    }

    /// Sets an explicit sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = Some(sort_order);
        self
    }
}

/// Task aggregate. Tasks are owned by exactly one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    plan_id: PlanId,
    content: TaskContent,
    sort_order: i32,
    blocked_by: Vec<TaskId>,
    external_issue_id: Option<ExternalIssueId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning plan.
    pub plan_id: PlanId,
    /// Persisted descriptive fields.
    pub content: TaskContent,
    /// Persisted sort order.
    pub sort_order: i32,
    /// Persisted blockers.
    pub blocked_by: Vec<TaskId>,
    /// Issue created for this task in the external tracker, if any.
    pub external_issue_id: Option<ExternalIssueId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task in `plan_id` with a freshly allocated identifier.
    ///
    /// Edge validation is the caller's responsibility.
    #[must_use]
    pub fn new(plan_id: PlanId, input: NewTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            plan_id,
            content: input.content,
            sort_order: input.sort_order,
            blocked_by: input.blocked_by,
            external_issue_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            plan_id: data.plan_id,
            content: data.content,
            sort_order: data.sort_order,
            blocked_by: data.blocked_by,
            external_issue_id: data.external_issue_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Copies this task's content into another plan.
    ///
    /// The copy receives a new identifier and carries neither blockers nor
    /// an external issue reference.
    #[must_use]
    pub fn duplicate_into(&self, plan_id: PlanId, clock: &impl Clock) -> Self {
        Self::new(
            plan_id,
            NewTask::new(self.content.clone(), self.sort_order),
            clock,
        )
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning plan.
    #[must_use]
    pub const fn plan_id(&self) -> PlanId {
        self.plan_id
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn content(&self) -> &TaskContent {
        &self.content
    }

    /// Returns the sort order.
    #[must_use]
    pub const fn sort_order(&self) -> i32 {
        self.sort_order
    }

    /// Returns the blockers.
    #[must_use]
    pub fn blocked_by(&self) -> &[TaskId] {
        &self.blocked_by
    }

    /// Returns the external issue reference, if published.
    #[must_use]
    pub const fn external_issue_id(&self) -> Option<&ExternalIssueId> {
        self.external_issue_id.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replaces blockers. Only called after the edges have been validated.
    pub(crate) fn replace_blocked_by(&mut self, blocked_by: Vec<TaskId>, at: DateTime<Utc>) {
        self.blocked_by = blocked_by;
        self.updated_at = at;
    }

    /// Drops `blocker` from this task's blockers, returning whether it was
    /// present.
    pub(crate) fn remove_blocker(&mut self, blocker: TaskId, at: DateTime<Utc>) -> bool {
        let before = self.blocked_by.len();
        self.blocked_by.retain(|id| *id != blocker);
        let removed = self.blocked_by.len() != before;
        if removed {
            self.updated_at = at;
        }
        removed
    }

    /// Records the external issue created for this task.
    pub(crate) fn link_external_issue(&mut self, issue_id: ExternalIssueId, at: DateTime<Utc>) {
        self.external_issue_id = Some(issue_id);
        self.updated_at = at;
    }
}
