//! `PostgreSQL` repository implementation for plan and task storage.

use super::{
    models::{PlanRow, PlanStatusChange, TaskRow},
    schema::{plans, tasks},
};
use crate::plan::{
    domain::{
        ExternalIssueId, ExternalProjectId, PersistedPlanData, PersistedTaskData, Plan, PlanId,
        PlanStatus, ProjectId, SessionId, Task, TaskContent, TaskId,
    },
    ports::{PlanRepository, PlanRepositoryError, PlanRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by plan adapters.
pub type PlanPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed plan repository.
#[derive(Debug, Clone)]
pub struct PostgresPlanRepository {
    pool: PlanPgPool,
}

impl PostgresPlanRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: PlanPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> PlanRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> PlanRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(PlanRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(PlanRepositoryError::persistence)?
    }
}

impl From<DieselError> for PlanRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn create_plan(&self, plan: &Plan) -> PlanRepositoryResult<()> {
        let plan_id = plan.id();
        let row = plan_to_row(plan)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(plans::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        PlanRepositoryError::DuplicatePlan(plan_id)
                    }
                    _ => PlanRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_plan(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>> {
        self.run_blocking(move |connection| {
            let row = plans::table
                .find(id.into_inner())
                .select(PlanRow::as_select())
                .first::<PlanRow>(connection)
                .optional()?;
            row.map(row_to_plan).transpose()
        })
        .await
    }

    async fn find_plans_by_project(&self, project_id: ProjectId) -> PlanRepositoryResult<Vec<Plan>> {
        self.run_blocking(move |connection| {
            plans::table
                .filter(plans::project_id.eq(project_id.into_inner()))
                .order((plans::sort_order.asc(), plans::created_at.asc()))
                .select(PlanRow::as_select())
                .load::<PlanRow>(connection)?
                .into_iter()
                .map(row_to_plan)
                .collect()
        })
        .await
    }

    async fn update_plan_status(
        &self,
        id: PlanId,
        status: PlanStatus,
        published_at: Option<DateTime<Utc>>,
        external_project_id: Option<ExternalProjectId>,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let change = PlanStatusChange {
            status: status.as_str().to_owned(),
            published_at,
            external_project_id: external_project_id.map(|project| project.as_str().to_owned()),
            updated_at,
        };
        self.run_blocking(move |connection| {
            let updated = diesel::update(plans::table.find(id.into_inner()))
                .set(&change)
                .execute(connection)?;
            if updated == 0 {
                return Err(PlanRepositoryError::PlanNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn update_plan_blocked_by(
        &self,
        id: PlanId,
        blocked_by: &[PlanId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let edges = serde_json::to_value(blocked_by).map_err(PlanRepositoryError::persistence)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(plans::table.find(id.into_inner()))
                .set((
                    plans::blocked_by_plan_ids.eq(edges),
                    plans::updated_at.eq(updated_at),
                ))
                .execute(connection)?;
            if updated == 0 {
                return Err(PlanRepositoryError::PlanNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_plan(&self, id: PlanId) -> PlanRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, PlanRepositoryError, _>(|tx| {
                diesel::delete(tasks::table.filter(tasks::plan_id.eq(id.into_inner())))
                    .execute(tx)?;
                let deleted = diesel::delete(plans::table.find(id.into_inner())).execute(tx)?;
                if deleted == 0 {
                    return Err(PlanRepositoryError::PlanNotFound(id));
                }
                Ok(())
            })
        })
        .await
    }

    async fn find_tasks_by_plan(&self, plan_id: PlanId) -> PlanRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            tasks::table
                .filter(tasks::plan_id.eq(plan_id.into_inner()))
                .order((tasks::sort_order.asc(), tasks::created_at.asc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> PlanRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .find(id.into_inner())
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn create_task(&self, task: &Task) -> PlanRepositoryResult<()> {
        self.create_tasks(std::slice::from_ref(task)).await
    }

    async fn create_tasks(&self, batch: &[Task]) -> PlanRepositoryResult<()> {
        let rows = batch
            .iter()
            .map(task_to_row)
            .collect::<PlanRepositoryResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, PlanRepositoryError, _>(|tx| {
                for row in &rows {
                    insert_task_row(tx, row)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn update_task_blocked_by(
        &self,
        id: TaskId,
        blocked_by: &[TaskId],
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let edges = serde_json::to_value(blocked_by).map_err(PlanRepositoryError::persistence)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.find(id.into_inner()))
                .set((tasks::blocked_by.eq(edges), tasks::updated_at.eq(updated_at)))
                .execute(connection)?;
            if updated == 0 {
                return Err(PlanRepositoryError::TaskNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn set_task_external_issue(
        &self,
        id: TaskId,
        issue_id: &ExternalIssueId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        let issue = issue_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.find(id.into_inner()))
                .set((
                    tasks::external_issue_id.eq(Some(issue)),
                    tasks::updated_at.eq(updated_at),
                ))
                .execute(connection)?;
            if updated == 0 {
                return Err(PlanRepositoryError::TaskNotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn delete_task_cascading(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> PlanRepositoryResult<()> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, PlanRepositoryError, _>(|tx| {
                delete_cascading(tx, id, updated_at)
            })
        })
        .await
    }
}

fn insert_task_row(connection: &mut PgConnection, row: &TaskRow) -> PlanRepositoryResult<()> {
    let plan_exists: i64 = plans::table
        .filter(plans::id.eq(row.plan_id))
        .count()
        .get_result(connection)?;
    if plan_exists == 0 {
        return Err(PlanRepositoryError::PlanNotFound(PlanId::from_uuid(
            row.plan_id,
        )));
    }

    diesel::insert_into(tasks::table)
        .values(row)
        .execute(connection)
        .map_err(|err| match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                PlanRepositoryError::DuplicateTask(TaskId::from_uuid(row.id))
            }
            _ => PlanRepositoryError::persistence(err),
        })?;
    Ok(())
}

/// Removes `id` from every sibling's blockers, then deletes the task. Runs
/// inside the caller's transaction.
fn delete_cascading(
    connection: &mut PgConnection,
    id: TaskId,
    updated_at: DateTime<Utc>,
) -> PlanRepositoryResult<()> {
    let target = tasks::table
        .find(id.into_inner())
        .select(TaskRow::as_select())
        .for_update()
        .first::<TaskRow>(connection)
        .optional()?
        .ok_or(PlanRepositoryError::TaskNotFound(id))?;

    let siblings = tasks::table
        .filter(tasks::plan_id.eq(target.plan_id))
        .filter(tasks::id.ne(target.id))
        .select(TaskRow::as_select())
        .for_update()
        .load::<TaskRow>(connection)?;

    for sibling in siblings {
        let blocked_by = decode_edges::<TaskId>(sibling.blocked_by)?;
        if !blocked_by.contains(&id) {
            continue;
        }
        let remaining: Vec<TaskId> = blocked_by.into_iter().filter(|blocker| *blocker != id).collect();
        let edges = serde_json::to_value(&remaining).map_err(PlanRepositoryError::persistence)?;
        diesel::update(tasks::table.find(sibling.id))
            .set((tasks::blocked_by.eq(edges), tasks::updated_at.eq(updated_at)))
            .execute(connection)?;
    }

    diesel::delete(tasks::table.find(target.id)).execute(connection)?;
    Ok(())
}

fn decode_edges<N: serde::de::DeserializeOwned>(value: serde_json::Value) -> PlanRepositoryResult<Vec<N>> {
    serde_json::from_value(value).map_err(PlanRepositoryError::persistence)
}

pub(super) fn plan_to_row(plan: &Plan) -> PlanRepositoryResult<PlanRow> {
    Ok(PlanRow {
        id: plan.id().into_inner(),
        project_id: plan.project_id().into_inner(),
        name: plan.name().to_owned(),
        description: plan.description().to_owned(),
        version: i32::try_from(plan.version()).map_err(PlanRepositoryError::persistence)?,
        status: plan.status().as_str().to_owned(),
        sort_order: plan.sort_order(),
        blocked_by_plan_ids: serde_json::to_value(plan.blocked_by_plan_ids())
            .map_err(PlanRepositoryError::persistence)?,
        master_plan_id: plan.master_plan_id().map(PlanId::into_inner),
        session_id: plan.session_id().map(SessionId::into_inner),
        summary: plan.summary().map(str::to_owned),
        external_project_id: plan
            .external_project_id()
            .map(|project| project.as_str().to_owned()),
        published_at: plan.published_at(),
        created_at: plan.created_at(),
        updated_at: plan.updated_at(),
    })
}

pub(super) fn row_to_plan(row: PlanRow) -> PlanRepositoryResult<Plan> {
    let status = PlanStatus::try_from(row.status.as_str()).map_err(PlanRepositoryError::persistence)?;
    let external_project_id = row
        .external_project_id
        .map(ExternalProjectId::new)
        .transpose()
        .map_err(PlanRepositoryError::persistence)?;

    Ok(Plan::from_persisted(PersistedPlanData {
        id: PlanId::from_uuid(row.id),
        project_id: ProjectId::from_uuid(row.project_id),
        name: row.name,
        description: row.description,
        version: u32::try_from(row.version).map_err(PlanRepositoryError::persistence)?,
        status,
        sort_order: row.sort_order,
        blocked_by_plan_ids: decode_edges(row.blocked_by_plan_ids)?,
        master_plan_id: row.master_plan_id.map(PlanId::from_uuid),
        session_id: row.session_id.map(SessionId::from_uuid),
        summary: row.summary,
        external_project_id,
        published_at: row.published_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(super) fn task_to_row(task: &Task) -> PlanRepositoryResult<TaskRow> {
    Ok(TaskRow {
        id: task.id().into_inner(),
        plan_id: task.plan_id().into_inner(),
        content: serde_json::to_value(task.content()).map_err(PlanRepositoryError::persistence)?,
        sort_order: task.sort_order(),
        blocked_by: serde_json::to_value(task.blocked_by())
            .map_err(PlanRepositoryError::persistence)?,
        external_issue_id: task
            .external_issue_id()
            .map(|issue| issue.as_str().to_owned()),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

pub(super) fn row_to_task(row: TaskRow) -> PlanRepositoryResult<Task> {
    let content = serde_json::from_value::<TaskContent>(row.content)
        .map_err(PlanRepositoryError::persistence)?;
    let external_issue_id = row
        .external_issue_id
        .map(ExternalIssueId::new)
        .transpose()
        .map_err(PlanRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        plan_id: PlanId::from_uuid(row.plan_id),
        content,
        sort_order: row.sort_order,
        blocked_by: decode_edges(row.blocked_by)?,
        external_issue_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}
