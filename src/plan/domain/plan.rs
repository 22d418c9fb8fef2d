//! Plan aggregate and its publication lifecycle.

use super::{ExternalProjectId, ParsePlanStatusError, PlanDomainError, PlanId, ProjectId, SessionId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to the name of a cloned plan.
pub const CLONE_NAME_SUFFIX: &str = " (Copy)";

/// Plan publication status. Statuses only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    /// Plan is being drafted.
    Draft,
    /// Plan is under review.
    Reviewing,
    /// Plan has been exported to the external tracker.
    Published,
    /// Plan is retired.
    Archived,
}

impl PlanStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Reviewing => "REVIEWING",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Returns `true` when `next` lies strictly later in the lifecycle.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        (next as u8) > (self as u8)
    }
}

impl TryFrom<&str> for PlanStatus {
    type Error = ParsePlanStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "REVIEWING" => Ok(Self::Reviewing),
            "PUBLISHED" => Ok(Self::Published),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(ParsePlanStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    /// Owning project.
    pub project_id: ProjectId,
    /// Plan name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Order of the plan within its project.
    pub sort_order: i32,
    /// Other plans that must be delivered first.
    pub blocked_by_plan_ids: Vec<PlanId>,
    /// Umbrella plan this plan belongs to.
    pub master_plan_id: Option<PlanId>,
    /// Planning session the plan was extracted from.
    pub session_id: Option<SessionId>,
    /// Generated summary of the planning conversation.
    pub summary: Option<String>,
}

impl NewPlan {
    /// Creates plan input with required fields.
    #[must_use]
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            description: String::new(),
            sort_order: 0,
            blocked_by_plan_ids: Vec::new(),
            master_plan_id: None,
            session_id: None,
            summary: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the umbrella plan.
    #[must_use]
    pub fn with_master_plan(mut self, master_plan_id: PlanId) -> Self {
        self.master_plan_id = Some(master_plan_id);
        self
    }

    /// Sets plan-level blockers.
    #[must_use]
    pub fn with_blocked_by_plans(mut self, plan_ids: impl IntoIterator<Item = PlanId>) -> Self {
        self.blocked_by_plan_ids = plan_ids.into_iter().collect();
        self
    }

    /// Sets the originating session and its summary.
    #[must_use]
    pub fn with_session(mut self, session_id: SessionId, summary: impl Into<String>) -> Self {
        self.session_id = Some(session_id);
        self.summary = Some(summary.into());
        self
    }
}

/// Plan aggregate root. A plan exclusively owns its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    id: PlanId,
    project_id: ProjectId,
    name: String,
    description: String,
    version: u32,
    status: PlanStatus,
    sort_order: i32,
    blocked_by_plan_ids: Vec<PlanId>,
    master_plan_id: Option<PlanId>,
    session_id: Option<SessionId>,
    summary: Option<String>,
    external_project_id: Option<ExternalProjectId>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted plan aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPlanData {
    /// Persisted identifier.
    pub id: PlanId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Persisted name.
    pub name: String,
    /// Persisted description.
    pub description: String,
    /// Persisted version.
    pub version: u32,
    /// Persisted status.
    pub status: PlanStatus,
    /// Persisted order within the project.
    pub sort_order: i32,
    /// Persisted plan-level blockers.
    pub blocked_by_plan_ids: Vec<PlanId>,
    /// Persisted umbrella plan.
    pub master_plan_id: Option<PlanId>,
    /// Persisted originating session.
    pub session_id: Option<SessionId>,
    /// Persisted summary.
    pub summary: Option<String>,
    /// Persisted external tracker project.
    pub external_project_id: Option<ExternalProjectId>,
    /// Persisted publication timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Creates a draft plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::EmptyPlanName`] if the name is blank.
    pub fn new(input: NewPlan, clock: &impl Clock) -> Result<Self, PlanDomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(PlanDomainError::EmptyPlanName);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: PlanId::new(),
            project_id: input.project_id,
            name: name.to_owned(),
            description: input.description,
            version: 1,
            status: PlanStatus::Draft,
            sort_order: input.sort_order,
            blocked_by_plan_ids: input.blocked_by_plan_ids,
            master_plan_id: input.master_plan_id,
            session_id: input.session_id,
            summary: input.summary,
            external_project_id: None,
            published_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a plan from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedPlanData) -> Self {
        Self {
            id: data.id,
            project_id: data.project_id,
            name: data.name,
            description: data.description,
            version: data.version,
            status: data.status,
            sort_order: data.sort_order,
            blocked_by_plan_ids: data.blocked_by_plan_ids,
            master_plan_id: data.master_plan_id,
            session_id: data.session_id,
            summary: data.summary,
            external_project_id: data.external_project_id,
            published_at: data.published_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Produces a fresh draft copy of this plan.
    ///
    /// Cross-plan references are kept verbatim. Publication data, session and
    /// summary are dropped.
    #[must_use]
    pub fn duplicate(&self, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: PlanId::new(),
            project_id: self.project_id,
            name: format!("{}{CLONE_NAME_SUFFIX}", self.name),
            description: self.description.clone(),
            version: 1,
            status: PlanStatus::Draft,
            sort_order: self.sort_order,
            blocked_by_plan_ids: self.blocked_by_plan_ids.clone(),
            master_plan_id: self.master_plan_id,
            session_id: None,
            summary: None,
            external_project_id: None,
            published_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the plan identifier.
    #[must_use]
    pub const fn id(&self) -> PlanId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> PlanStatus {
        self.status
    }

    /// Returns the order within the project.
    #[must_use]
    pub const fn sort_order(&self) -> i32 {
        self.sort_order
    }

    /// Returns plan-level blockers.
    #[must_use]
    pub fn blocked_by_plan_ids(&self) -> &[PlanId] {
        &self.blocked_by_plan_ids
    }

    /// Returns the umbrella plan, if any.
    #[must_use]
    pub const fn master_plan_id(&self) -> Option<PlanId> {
        self.master_plan_id
    }

    /// Returns the originating session, if any.
    #[must_use]
    pub const fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Returns the summary, if any.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the external tracker project, if published.
    #[must_use]
    pub const fn external_project_id(&self) -> Option<&ExternalProjectId> {
        self.external_project_id.as_ref()
    }

    /// Returns the publication timestamp, if published.
    #[must_use]
    pub const fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
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

    /// Moves the plan forward to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::InvalidStatusTransition`] unless `next` is
    /// later in the lifecycle than the current status.
    pub fn advance_to(&mut self, next: PlanStatus, clock: &impl Clock) -> Result<(), PlanDomainError> {
        if !self.status.can_transition_to(next) {
            return Err(PlanDomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Marks the plan published.
    ///
    /// A forced re-publish of an already published plan refreshes the
    /// timestamp and tracker project without a status change.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::InvalidStatusTransition`] for archived
    /// plans.
    pub fn mark_published(
        &mut self,
        external_project_id: Option<ExternalProjectId>,
        clock: &impl Clock,
    ) -> Result<(), PlanDomainError> {
        if self.status != PlanStatus::Published {
            self.advance_to(PlanStatus::Published, clock)?;
        }
        let timestamp = clock.utc();
        self.published_at = Some(timestamp);
        if external_project_id.is_some() {
            self.external_project_id = external_project_id;
        }
        self.updated_at = timestamp;
        Ok(())
    }

    /// Replaces plan-level blockers. Only called after validation.
    pub(crate) fn replace_blocked_by_plans(&mut self, plan_ids: Vec<PlanId>, at: DateTime<Utc>) {
        self.blocked_by_plan_ids = plan_ids;
        self.updated_at = at;
    }
}
