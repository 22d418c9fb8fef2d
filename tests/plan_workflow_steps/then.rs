//! Then steps for plan workflow BDD scenarios.

use super::world::{PlanWorld, run_async};
use planweave::plan::{
    domain::{PlanDomainError, PlanStatus},
    ports::PlanRepository,
    services::{PlanServiceError, PublishError},
};
use rstest_bdd_macros::then;

#[then(r#"the change is rejected as the cycle "{path}""#)]
fn rejected_as_cycle(world: &PlanWorld, path: String) -> Result<(), eyre::Report> {
    let result = world
        .last_edge_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing edge result in scenario world"))?;
    let Err(PlanServiceError::Domain(PlanDomainError::TaskCycle(cycle))) = result else {
        return Err(eyre::eyre!("expected a cycle rejection, got {result:?}"));
    };
    let expected = path
        .split(" -> ")
        .map(|title| world.task_id(title))
        .collect::<Result<Vec<_>, _>>()?;
    eyre::ensure!(
        cycle.nodes() == expected.as_slice(),
        "cycle path mismatch: {cycle}"
    );
    Ok(())
}

#[then("the change is rejected as a self-block")]
fn rejected_as_self_block(world: &PlanWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_edge_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing edge result in scenario world"))?;
    eyre::ensure!(
        matches!(
            result,
            Err(PlanServiceError::Domain(PlanDomainError::SelfBlockedTask(_)))
        ),
        "expected a self-block rejection, got {result:?}"
    );
    Ok(())
}

#[then(r#"task "{title}" has no blockers"#)]
fn task_has_no_blockers(world: &PlanWorld, title: String) -> Result<(), eyre::Report> {
    let task = world.stored_task(&title)?;
    eyre::ensure!(
        task.blocked_by().is_empty(),
        "expected {title} to have no blockers, found {:?}",
        task.blocked_by()
    );
    Ok(())
}

#[then(r#"task "{title}" is blocked by "{blocker}""#)]
fn task_is_blocked_by(world: &PlanWorld, title: String, blocker: String) -> Result<(), eyre::Report> {
    let task = world.stored_task(&title)?;
    let blocker_id = world.task_id(&blocker)?;
    eyre::ensure!(
        task.blocked_by() == [blocker_id],
        "expected {title} to be blocked by {blocker} only"
    );
    Ok(())
}

#[then("the plan task count is {count:usize}")]
fn plan_task_count(world: &PlanWorld, count: usize) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    let tasks = run_async(world.repository.find_tasks_by_plan(plan_id))
        .map_err(|err| eyre::eyre!("task lookup failed: {err}"))?;
    eyre::ensure!(
        tasks.len() == count,
        "expected {count} tasks, found {}",
        tasks.len()
    );
    Ok(())
}

#[then("batch entry {entry:usize} is blocked by batch entry {blocker:usize}")]
fn batch_entry_blocked_by(
    world: &PlanWorld,
    entry: usize,
    blocker: usize,
) -> Result<(), eyre::Report> {
    let dependent = world
        .batch
        .get(entry)
        .ok_or_else(|| eyre::eyre!("batch has no entry {entry}"))?;
    let blocking = world
        .batch
        .get(blocker)
        .ok_or_else(|| eyre::eyre!("batch has no entry {blocker}"))?;
    eyre::ensure!(
        dependent.blocked_by() == [blocking.id()],
        "entry {entry} is not blocked by entry {blocker}"
    );
    Ok(())
}

#[then(r#"the clone is a draft named "{name}""#)]
fn clone_is_named(world: &PlanWorld, name: String) -> Result<(), eyre::Report> {
    let clone = world
        .clone
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing clone in scenario world"))?;
    eyre::ensure!(clone.plan.name() == name, "clone is named {}", clone.plan.name());
    eyre::ensure!(
        clone.plan.status() == PlanStatus::Draft,
        "clone status is {}",
        clone.plan.status()
    );
    Ok(())
}

#[then("the clone has {count:usize} tasks without blockers")]
fn clone_tasks_without_blockers(world: &PlanWorld, count: usize) -> Result<(), eyre::Report> {
    let clone = world
        .clone
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing clone in scenario world"))?;
    eyre::ensure!(
        clone.tasks.len() == count,
        "expected {count} cloned tasks, found {}",
        clone.tasks.len()
    );
    eyre::ensure!(
        clone.tasks.iter().all(|task| task.blocked_by().is_empty()),
        "cloned tasks must not carry blockers"
    );
    Ok(())
}

#[then(r#"the publish summary is "{summary}""#)]
fn publish_summary(world: &PlanWorld, summary: String) -> Result<(), eyre::Report> {
    let result = world
        .publish_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing publish result in scenario world"))?;
    let outcome = result
        .as_ref()
        .map_err(|err| eyre::eyre!("unexpected publish failure: {err}"))?;
    eyre::ensure!(
        outcome.summary() == summary,
        "unexpected summary: {}",
        outcome.summary()
    );
    Ok(())
}

#[then(r#"the plan status is "{status}""#)]
fn plan_status_is(world: &PlanWorld, status: String) -> Result<(), eyre::Report> {
    let plan_id = world.plan_id()?;
    let plan = run_async(world.repository.find_plan(plan_id))
        .map_err(|err| eyre::eyre!("plan lookup failed: {err}"))?
        .ok_or_else(|| eyre::eyre!("plan is not stored"))?;
    eyre::ensure!(
        plan.status().as_str() == status,
        "expected status {status}, found {}",
        plan.status()
    );
    Ok(())
}

#[then(r#"task "{title}" is linked to an external issue"#)]
fn task_is_linked(world: &PlanWorld, title: String) -> Result<(), eyre::Report> {
    let task = world.stored_task(&title)?;
    eyre::ensure!(
        task.external_issue_id().is_some(),
        "expected {title} to be linked to an issue"
    );
    Ok(())
}

#[then(r#"task "{title}" has no external issue"#)]
fn task_has_no_issue(world: &PlanWorld, title: String) -> Result<(), eyre::Report> {
    let task = world.stored_task(&title)?;
    eyre::ensure!(
        task.external_issue_id().is_none(),
        "expected {title} to have no issue"
    );
    Ok(())
}

#[then("publishing fails because the credential is missing")]
fn publishing_fails_without_credential(world: &PlanWorld) -> Result<(), eyre::Report> {
    let result = world
        .publish_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing publish result in scenario world"))?;
    eyre::ensure!(
        matches!(result, Err(PublishError::MissingCredential)),
        "expected a missing credential error, got {result:?}"
    );
    Ok(())
}
