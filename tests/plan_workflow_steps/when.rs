//! When steps for plan workflow BDD scenarios.

use super::world::{PlanWorld, run_async};
use eyre::WrapErr;
use planweave::plan::{
    domain::{BatchTaskSpec, TaskContent},
    ports::TrackerCredential,
    services::PublishRequest,
};
use rstest_bdd_macros::when;

#[when(r#"task "{title}" is set to be blocked by "{blocker}""#)]
fn set_blocked_by(world: &mut PlanWorld, title: String, blocker: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    let blocker_id = world.task_id(&blocker)?;
    world.last_edge_result = Some(run_async(
        world.dependencies.set_blocked_by(task_id, vec![blocker_id]),
    ));
    Ok(())
}

#[when(r#"task "{title}" is deleted"#)]
fn delete_task(world: &mut PlanWorld, title: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id(&title)?;
    run_async(world.dependencies.delete_task(task_id)).wrap_err("delete scenario task")?;
    world.tasks_by_title.remove(&title);
    Ok(())
}

#[when("a batch of {count:usize} tasks is created where entry {entry:usize} is blocked by entry {blocker:usize}")]
fn create_batch(
    world: &mut PlanWorld,
    count: usize,
    entry: usize,
    blocker: usize,
) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    let specs = (0..count)
        .map(|position| {
            let content = TaskContent::new(format!("Batch task {position}"))?;
            let spec = BatchTaskSpec::new(content);
            Ok(if position == entry {
                spec.blocked_by([blocker])
            } else {
                spec
            })
        })
        .collect::<Result<Vec<_>, planweave::plan::domain::PlanDomainError>>()
        .wrap_err("build batch specs")?;
    world.batch = run_async(world.dependencies.create_batch(plan_id, specs))
        .wrap_err("create scenario batch")?;
    Ok(())
}

#[when("the plan is cloned")]
fn clone_plan(world: &mut PlanWorld) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    world.clone = Some(run_async(world.cloner.clone_plan(plan_id)).wrap_err("clone scenario plan")?);
    Ok(())
}

#[when("the plan is published with a tracker credential")]
fn publish_with_credential(world: &mut PlanWorld) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    let credential = TrackerCredential::new("lin_api_scenario");
    world.publish_result = Some(run_async(
        world.publisher.publish(PublishRequest::new(plan_id, credential)),
    ));
    Ok(())
}

#[when("the plan is published without a tracker credential")]
fn publish_without_credential(world: &mut PlanWorld) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    world.publish_result = Some(run_async(
        world.publisher.publish(PublishRequest::new(plan_id, None)),
    ));
    Ok(())
}
