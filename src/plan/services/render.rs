//! Tracker payload rendering.

use crate::plan::domain::{
    CreatedIssue, ExternalIssueId, IssuePayload, MetaIssuePayload, Plan, Task, TrackerPriority,
};
use minijinja::{Environment, context};
use serde::Serialize;
use thiserror::Error;

const ISSUE_TEMPLATE: &str = "{{ description }}
{%- if acceptance_criteria %}

## Acceptance criteria
{%- for item in acceptance_criteria %}
- [ ] {{ item }}
{%- endfor %}
{%- endif %}
{%- if related_files %}

## Related files
{%- for file in related_files %}
- `{{ file }}`
{%- endfor %}
{%- endif %}
{%- if estimate %}

Estimate: {{ estimate }}h
{%- endif %}";

const META_ISSUE_TEMPLATE: &str = "Issues created from plan \"{{ plan_name }}\".

## Tasks
{%- for issue in issues %}
- [ ] {{ issue.key }}: {{ issue.title }}
{%- endfor %}
{%- if failed %}

{{ failed }} task(s) could not be published.
{%- endif %}";

/// Failure to render a tracker payload locally.
#[derive(Debug, Error)]
pub(crate) enum RenderError {
    /// The template engine rejected the template or its context.
    #[error("failed to render {template} template: {source}")]
    Template {
        template: &'static str,
        #[source]
        source: minijinja::Error,
    },
}

#[derive(Serialize)]
struct ChecklistEntry<'a> {
    key: &'a str,
    title: &'a str,
}

/// Builds the issue payload for one task.
///
/// # Errors
///
/// Returns [`RenderError`] when the description template fails to render.
pub(crate) fn issue_payload(task: &Task) -> Result<IssuePayload, RenderError> {
    let content = task.content();
    let description = render(
        "issue",
        ISSUE_TEMPLATE,
        context! {
            description => content.description(),
            acceptance_criteria => content.acceptance_criteria(),
            related_files => content.related_files(),
            estimate => content.estimate().map(f64::from),
        },
    )?;

    Ok(IssuePayload {
        title: content.title().to_owned(),
        description,
        priority: TrackerPriority::from(content.priority()),
        labels: content.labels().iter().cloned().collect(),
    })
}

/// Builds the meta-issue payload listing `created` issues in plan order.
///
/// # Errors
///
/// Returns [`RenderError`] when the checklist template fails to render.
pub(crate) fn meta_issue_payload(
    plan: &Plan,
    tasks: &[Task],
    created: &[CreatedIssue],
    failed: usize,
    title_prefix: &str,
) -> Result<MetaIssuePayload, RenderError> {
    let entries: Vec<ChecklistEntry<'_>> = created
        .iter()
        .filter_map(|issue| {
            tasks
                .iter()
                .find(|task| task.id() == issue.task_id)
                .map(|task| ChecklistEntry {
                    key: issue.external_issue_id.as_str(),
                    title: task.content().title(),
                })
        })
        .collect();

    let description = render(
        "meta-issue",
        META_ISSUE_TEMPLATE,
        context! {
            plan_name => plan.name(),
            issues => entries,
            failed => failed,
        },
    )?;

    Ok(MetaIssuePayload {
        title: format!("{title_prefix}{}", plan.name()),
        description,
        child_issue_ids: created
            .iter()
            .map(|issue| issue.external_issue_id.clone())
            .collect::<Vec<ExternalIssueId>>(),
    })
}

/// Renders `source` with `context`, trimming surrounding whitespace.
pub(crate) fn render(
    name: &'static str,
    source: &str,
    context: minijinja::Value,
) -> Result<String, RenderError> {
    let environment = Environment::new();
    environment
        .render_str(source, context)
        .map(|rendered| rendered.trim().to_owned())
        .map_err(|error| RenderError::Template {
            template: name,
            source: error,
        })
}
