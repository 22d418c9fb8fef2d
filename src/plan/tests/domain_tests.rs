//! Tests for plan and task value objects and aggregates.

use crate::plan::{
    domain::{
        CLONE_NAME_SUFFIX, CreatedIssue, ExternalIssueId, ExternalProjectId, NewPlan, NewTask,
        Plan, PlanDomainError, PlanId, PlanStatus, ProjectId, PublishFailure, PublishOutcome,
        SessionId, Task, TaskContent, TaskEstimate, TaskId, TaskPriority, TrackerPriority,
    },
    ports::TrackerCredential,
};
use mockable::DefaultClock;
use rstest::rstest;

fn draft_plan() -> Plan {
    Plan::new(
        NewPlan::new(ProjectId::new(), "Launch")
            .with_description("Ship the first release")
            .with_session(SessionId::new(), "Planned in session"),
        &DefaultClock,
    )
    .expect("valid plan")
}

#[rstest]
#[case(0, TrackerPriority::Urgent)]
#[case(1, TrackerPriority::High)]
#[case(2, TrackerPriority::Medium)]
#[case(3, TrackerPriority::Low)]
#[case(4, TrackerPriority::Low)]
fn task_priority_maps_onto_tracker_scale(#[case] value: u8, #[case] expected: TrackerPriority) {
    let priority = TaskPriority::new(value).expect("priority in range");

    assert_eq!(TrackerPriority::from(priority), expected);
}

#[rstest]
fn task_priority_rejects_values_past_lowest() {
    assert_eq!(
        TaskPriority::new(5),
        Err(PlanDomainError::InvalidPriority(5))
    );
}

#[rstest]
fn task_priority_defaults_to_medium() {
    assert_eq!(TaskPriority::default().value(), 2);
    assert_eq!(TaskPriority::default().to_string(), "P2");
}

#[rstest]
#[case(0.0)]
#[case(-1.5)]
#[case(f64::NAN)]
#[case(f64::INFINITY)]
fn task_estimate_rejects_non_positive_or_non_finite(#[case] hours: f64) {
    assert!(matches!(
        TaskEstimate::hours(hours),
        Err(PlanDomainError::InvalidEstimate(_))
    ));
}

#[rstest]
fn task_content_rejects_blank_title() {
    assert_eq!(
        TaskContent::new("   ").map(|_| ()),
        Err(PlanDomainError::EmptyTaskTitle)
    );
}

#[rstest]
fn task_content_serializes_priority_as_number() {
    let content = TaskContent::new("Write docs")
        .expect("valid title")
        .with_priority(TaskPriority::new(1).expect("priority in range"));

    let json = serde_json::to_value(&content).expect("serializable content");

    assert_eq!(json.get("priority"), Some(&serde_json::json!(1)));
}

#[rstest]
fn external_identifiers_reject_blank_values() {
    assert_eq!(
        ExternalIssueId::new(" "),
        Err(PlanDomainError::EmptyExternalId("issue"))
    );
    assert_eq!(
        ExternalIssueId::new(" ENG-7 ").map(|id| id.to_string()),
        Ok("ENG-7".to_owned())
    );
}

#[rstest]
#[case(PlanStatus::Draft, PlanStatus::Reviewing, true)]
#[case(PlanStatus::Draft, PlanStatus::Published, true)]
#[case(PlanStatus::Reviewing, PlanStatus::Archived, true)]
#[case(PlanStatus::Published, PlanStatus::Published, false)]
#[case(PlanStatus::Published, PlanStatus::Draft, false)]
#[case(PlanStatus::Archived, PlanStatus::Reviewing, false)]
fn plan_status_only_moves_forward(
    #[case] from: PlanStatus,
    #[case] to: PlanStatus,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
#[case("draft", PlanStatus::Draft)]
#[case(" PUBLISHED ", PlanStatus::Published)]
fn plan_status_parses_storage_values(#[case] raw: &str, #[case] expected: PlanStatus) {
    assert_eq!(PlanStatus::try_from(raw), Ok(expected));
}

#[rstest]
fn plan_status_serializes_in_screaming_snake_case() {
    let json = serde_json::to_string(&PlanStatus::Reviewing).expect("serializable status");

    assert_eq!(json, "\"REVIEWING\"");
}

#[rstest]
fn plan_rejects_blank_name() {
    let result = Plan::new(NewPlan::new(ProjectId::new(), "  "), &DefaultClock);

    assert_eq!(result.map(|_| ()), Err(PlanDomainError::EmptyPlanName));
}

#[rstest]
fn new_plan_starts_as_first_draft() {
    let plan = draft_plan();

    assert_eq!(plan.status(), PlanStatus::Draft);
    assert_eq!(plan.version(), 1);
    assert_eq!(plan.created_at(), plan.updated_at());
    assert!(plan.published_at().is_none());
}

#[rstest]
fn duplicate_plan_is_a_fresh_draft() {
    let master = PlanId::new();
    let blocker = PlanId::new();
    let mut source = Plan::new(
        NewPlan::new(ProjectId::new(), "Launch")
            .with_master_plan(master)
            .with_blocked_by_plans([blocker])
            .with_session(SessionId::new(), "summary"),
        &DefaultClock,
    )
    .expect("valid plan");
    source
        .mark_published(
            Some(ExternalProjectId::new("proj-1").expect("valid id")),
            &DefaultClock,
        )
        .expect("draft can be published");

    let copy = source.duplicate(&DefaultClock);

    assert_ne!(copy.id(), source.id());
    assert_eq!(copy.name(), format!("Launch{CLONE_NAME_SUFFIX}"));
    assert_eq!(copy.status(), PlanStatus::Draft);
    assert_eq!(copy.version(), 1);
    assert_eq!(copy.master_plan_id(), Some(master));
    assert_eq!(copy.blocked_by_plan_ids(), &[blocker]);
    assert!(copy.session_id().is_none());
    assert!(copy.summary().is_none());
    assert!(copy.external_project_id().is_none());
    assert!(copy.published_at().is_none());
}

#[rstest]
fn advance_rejects_backward_moves() {
    let mut plan = draft_plan();
    plan.advance_to(PlanStatus::Reviewing, &DefaultClock)
        .expect("draft can move to reviewing");

    let result = plan.advance_to(PlanStatus::Draft, &DefaultClock);

    assert_eq!(
        result,
        Err(PlanDomainError::InvalidStatusTransition {
            from: PlanStatus::Reviewing,
            to: PlanStatus::Draft,
        })
    );
    assert_eq!(plan.status(), PlanStatus::Reviewing);
}

#[rstest]
fn republishing_refreshes_timestamp_without_status_change() {
    let mut plan = draft_plan();
    plan.mark_published(None, &DefaultClock)
        .expect("draft can be published");
    let first = plan.published_at();

    plan.mark_published(
        Some(ExternalProjectId::new("proj-2").expect("valid id")),
        &DefaultClock,
    )
    .expect("published plan can be refreshed");

    assert_eq!(plan.status(), PlanStatus::Published);
    assert!(plan.published_at() >= first);
    assert_eq!(
        plan.external_project_id().map(ExternalProjectId::as_str),
        Some("proj-2")
    );
}

#[rstest]
fn archived_plans_cannot_be_published() {
    let mut plan = draft_plan();
    plan.advance_to(PlanStatus::Archived, &DefaultClock)
        .expect("draft can be archived");

    assert!(plan.mark_published(None, &DefaultClock).is_err());
}

#[rstest]
fn duplicated_task_drops_edges_and_issue_link() {
    let plan_id = PlanId::new();
    let mut task = Task::new(
        plan_id,
        NewTask::new(TaskContent::new("Build").expect("valid title"), 3)
            .with_blocked_by([TaskId::new()]),
        &DefaultClock,
    );
    task.link_external_issue(
        ExternalIssueId::new("ENG-1").expect("valid id"),
        chrono::Utc::now(),
    );
    let target = PlanId::new();

    let copy = task.duplicate_into(target, &DefaultClock);

    assert_ne!(copy.id(), task.id());
    assert_eq!(copy.plan_id(), target);
    assert_eq!(copy.content(), task.content());
    assert_eq!(copy.sort_order(), 3);
    assert!(copy.blocked_by().is_empty());
    assert!(copy.external_issue_id().is_none());
}

#[rstest]
fn removing_absent_blocker_leaves_task_untouched() {
    let mut task = Task::new(
        PlanId::new(),
        NewTask::new(TaskContent::new("Build").expect("valid title"), 0),
        &DefaultClock,
    );
    let before = task.clone();

    assert!(!task.remove_blocker(TaskId::new(), chrono::Utc::now()));
    assert_eq!(task, before);
}

#[rstest]
fn credential_rejects_blank_values_and_redacts_debug_output() {
    assert!(TrackerCredential::new("   ").is_none());

    let credential = TrackerCredential::new(" secret-key ").expect("non-blank credential");

    assert_eq!(credential.expose(), "secret-key");
    assert!(!format!("{credential:?}").contains("secret"));
}

#[rstest]
fn publish_outcome_summary_counts_only_task_failures() {
    let task_id = TaskId::new();
    let outcome = PublishOutcome::new(
        vec![CreatedIssue {
            task_id: TaskId::new(),
            external_issue_id: ExternalIssueId::new("ENG-1").expect("valid id"),
        }],
        None,
        vec![
            PublishFailure {
                task_id: Some(task_id),
                message: "rejected".to_owned(),
            },
            PublishFailure {
                task_id: None,
                message: "meta-issue: rejected".to_owned(),
            },
        ],
        2,
    );

    assert!(outcome.success);
    assert_eq!(outcome.failed_task_ids(), vec![task_id]);
    assert_eq!(outcome.summary(), "1 of 2 tasks published, 1 failed");
}

#[rstest]
fn publish_outcome_without_created_issues_is_a_failure() {
    let outcome = PublishOutcome::new(Vec::new(), None, Vec::new(), 0);

    assert!(!outcome.success);
    assert_eq!(outcome.summary(), "0 of 0 tasks published");
}
