//! Shared world state for plan workflow BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use planweave::plan::{
    adapters::memory::{InMemoryIssueTracker, InMemoryPlanRepository},
    domain::{Plan, PlanId, PublishOutcome, Task, TaskId},
    services::{
        ClonedPlan, PlanCloneService, PlanService, PlanServiceResult, PublishConfig,
        PublishResult, PublishService, TaskDependencyService,
    },
};
use mockable::DefaultClock;
use rstest::fixture;

/// Scenario world for plan workflow behaviour tests.
pub struct PlanWorld {
    pub repository: Arc<InMemoryPlanRepository>,
    pub tracker: InMemoryIssueTracker,
    pub plans: PlanService<InMemoryPlanRepository, DefaultClock>,
    pub dependencies: TaskDependencyService<InMemoryPlanRepository, DefaultClock>,
    pub cloner: PlanCloneService<InMemoryPlanRepository, DefaultClock>,
    pub publisher: PublishService<InMemoryPlanRepository, InMemoryIssueTracker, DefaultClock>,
    pub plan: Option<Plan>,
    pub tasks_by_title: HashMap<String, TaskId>,
    pub last_edge_result: Option<PlanServiceResult<Task>>,
    pub batch: Vec<Task>,
    pub clone: Option<ClonedPlan>,
    pub publish_result: Option<PublishResult<PublishOutcome>>,
}

impl PlanWorld {
    /// Creates a world backed by fresh in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryPlanRepository::new());
        let tracker = InMemoryIssueTracker::default();
        let clock = Arc::new(DefaultClock);
        Self {
            plans: PlanService::new(Arc::clone(&repository), Arc::clone(&clock)),
            dependencies: TaskDependencyService::new(Arc::clone(&repository), Arc::clone(&clock)),
            cloner: PlanCloneService::new(Arc::clone(&repository), Arc::clone(&clock)),
            publisher: PublishService::new(
                Arc::clone(&repository),
                Arc::new(tracker.clone()),
                clock,
                PublishConfig::default(),
            ),
            repository,
            tracker,
            plan: None,
            tasks_by_title: HashMap::new(),
            last_edge_result: None,
            batch: Vec::new(),
            clone: None,
            publish_result: None,
        }
    }

    /// Returns the scenario plan identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when no plan was created by a previous step.
    pub fn plan_id(&self) -> Result<PlanId, eyre::Report> {
        self.plan
            .as_ref()
            .map(Plan::id)
            .ok_or_else(|| eyre::eyre!("missing plan in scenario world"))
    }

    /// Resolves a task title used in the scenario to its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when no task with that title was created.
    pub fn task_id(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.tasks_by_title
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("no task titled {title} in scenario world"))
    }

    /// Loads the stored version of a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the task is unknown or the lookup fails.
    pub fn stored_task(&self, title: &str) -> Result<Task, eyre::Report> {
        use planweave::plan::ports::PlanRepository;

        let task_id = self.task_id(title)?;
        run_async(self.repository.find_task(task_id))
            .map_err(|err| eyre::eyre!("task lookup failed: {err}"))?
            .ok_or_else(|| eyre::eyre!("task {title} is not stored"))
    }
}

impl Default for PlanWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PlanWorld {
    PlanWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
