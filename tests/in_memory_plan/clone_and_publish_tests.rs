//! In-memory integration tests for cloning and publishing plans.

use std::sync::Arc;

use super::helpers::{content, create_plan, dependency_service, repository};
use mockable::DefaultClock;
use planweave::plan::{
    adapters::memory::{InMemoryIssueTracker, InMemoryPlanRepository},
    domain::{BatchTaskSpec, PlanStatus},
    ports::{PlanRepository, TrackerCredential},
    services::{PlanCloneService, PublishConfig, PublishRequest, PublishService},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn publishing_a_clone_leaves_the_source_draft_untouched(
    repository: Arc<InMemoryPlanRepository>,
) -> Result<(), eyre::Report> {
    let source = create_plan(&repository, "Sprint 12").await?;
    dependency_service(&repository)
        .create_batch(
            source.id(),
            vec![
                BatchTaskSpec::new(content("Plan")?),
                BatchTaskSpec::new(content("Do")?).blocked_by([0]),
                BatchTaskSpec::new(content("Check")?).blocked_by([1]),
            ],
        )
        .await?;
    let cloner = PlanCloneService::new(Arc::clone(&repository), Arc::new(DefaultClock));
    let tracker = InMemoryIssueTracker::new("SPR");
    let publisher = PublishService::new(
        Arc::clone(&repository),
        Arc::new(tracker.clone()),
        Arc::new(DefaultClock),
        PublishConfig::default(),
    );

    let cloned = cloner.clone_plan(source.id()).await?;
    let outcome = publisher
        .publish(PublishRequest::new(
            cloned.plan.id(),
            TrackerCredential::new("spr-token"),
        ))
        .await?;

    eyre::ensure!(outcome.summary() == "3 of 3 tasks published", "{}", outcome.summary());
    eyre::ensure!(
        outcome.meta_issue_id.as_ref().map(|id| id.as_str()) == Some("SPR-4"),
        "meta-issue should follow the three task issues"
    );

    let published = repository
        .find_plan(cloned.plan.id())
        .await?
        .ok_or_else(|| eyre::eyre!("clone missing"))?;
    let original = repository
        .find_plan(source.id())
        .await?
        .ok_or_else(|| eyre::eyre!("source missing"))?;
    eyre::ensure!(published.status() == PlanStatus::Published, "clone should be published");
    eyre::ensure!(original.status() == PlanStatus::Draft, "source should stay a draft");

    let source_tasks = repository.find_tasks_by_plan(source.id()).await?;
    eyre::ensure!(
        source_tasks
            .iter()
            .all(|task| task.external_issue_id().is_none()),
        "source tasks must not be linked to issues"
    );
    let blocked: usize = source_tasks
        .iter()
        .filter(|task| !task.blocked_by().is_empty())
        .count();
    eyre::ensure!(blocked == 2, "source edges must survive cloning");
    Ok(())
}
