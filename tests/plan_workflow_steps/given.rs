//! Given steps for plan workflow BDD scenarios.

use super::world::{PlanWorld, run_async};
use eyre::WrapErr;
use planweave::plan::domain::{NewPlan, NewTask, ProjectId, TaskContent, TaskId};
use rstest_bdd_macros::given;

fn create_task(
    world: &mut PlanWorld,
    title: &str,
    blocked_by: Vec<TaskId>,
) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    let sort_order = i32::try_from(world.tasks_by_title.len()).wrap_err("sort order overflow")?;
    let content = TaskContent::new(title).wrap_err("build task content")?;
    let task = run_async(
        world
            .dependencies
            .create_task(plan_id, NewTask::new(content, sort_order).with_blocked_by(blocked_by)),
    )
    .wrap_err("create scenario task")?;
    world.tasks_by_title.insert(title.to_owned(), task.id());
    Ok(())
}

#[given(r#"a draft plan named "{name}""#)]
fn draft_plan_named(world: &mut PlanWorld, name: String) -> Result<(), eyre::Report> {
    let plan = run_async(world.plans.create_plan(NewPlan::new(ProjectId::new(), name)))
        .wrap_err("create scenario plan")?;
    world.plan = Some(plan);
    Ok(())
}

#[given(r#"a standalone task "{title}""#)]
fn standalone_task(world: &mut PlanWorld, title: String) -> Result<(), eyre::Report> {
    create_task(world, &title, Vec::new())
}

#[given(r#"a task "{title}" blocked by "{blocker}""#)]
fn task_blocked_by(
    world: &mut PlanWorld,
    title: String,
    blocker: String,
) -> Result<(), eyre::Report> {
    let blocker_id = world.task_id(&blocker)?;
    create_task(world, &title, vec![blocker_id])
}

#[given(r#"the tracker rejects issues titled "{title}""#)]
fn tracker_rejects_title(world: &mut PlanWorld, title: String) -> Result<(), eyre::Report> {
    world
        .tracker
        .fail_title(title, "duplicate title")
        .map_err(|err| eyre::eyre!("configure tracker: {err}"))
}
