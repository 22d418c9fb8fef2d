//! Diesel row models for plan and task persistence.

use super::schema::{plans, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row model for plan records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PlanRow {
    /// Plan identifier.
    pub id: uuid::Uuid,
    /// Owning project identifier.
    pub project_id: uuid::Uuid,
    /// Plan name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Version.
    pub version: i32,
    /// Status in canonical storage form.
    pub status: String,
    /// Order within the project.
    pub sort_order: i32,
    /// Plan-level blockers JSON array.
    pub blocked_by_plan_ids: Value,
    /// Umbrella plan identifier.
    pub master_plan_id: Option<uuid::Uuid>,
    /// Originating session.
    pub session_id: Option<uuid::Uuid>,
    /// Summary.
    pub summary: Option<String>,
    /// External tracker project.
    pub external_project_id: Option<String>,
    /// Publication timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Status change applied on publish; `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = plans)]
pub struct PlanStatusChange {
    /// New status.
    pub status: String,
    /// New publication timestamp.
    pub published_at: Option<DateTime<Utc>>,
    /// New external tracker project.
    pub external_project_id: Option<String>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row model for task records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Owning plan identifier.
    pub plan_id: uuid::Uuid,
    /// Descriptive fields JSON.
    pub content: Value,
    /// Order within the plan.
    pub sort_order: i32,
    /// Blockers JSON array.
    pub blocked_by: Value,
    /// External tracker issue.
    pub external_issue_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
