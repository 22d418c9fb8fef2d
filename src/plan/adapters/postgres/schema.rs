//! Diesel schema for plan and task persistence.

diesel::table! {
    /// Plans owned by projects.
    plans (id) {
        /// Plan identifier.
        id -> Uuid,
        /// Owning project identifier.
        project_id -> Uuid,
        /// Plan name.
        #[max_length = 255]
        name -> Varchar,
        /// Free-form description.
        description -> Text,
        /// Plan version.
        version -> Int4,
        /// Publication status.
        #[max_length = 20]
        status -> Varchar,
        /// Order within the project.
        sort_order -> Int4,
        /// Plan-level blockers as a JSON array of identifiers.
        blocked_by_plan_ids -> Jsonb,
        /// Umbrella plan identifier.
        master_plan_id -> Nullable<Uuid>,
        /// Originating planning session.
        session_id -> Nullable<Uuid>,
        /// Generated conversation summary.
        summary -> Nullable<Text>,
        /// External tracker project identifier.
        #[max_length = 255]
        external_project_id -> Nullable<Varchar>,
        /// Publication timestamp.
        published_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tasks owned by plans. Rows are deleted with their plan.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning plan identifier.
        plan_id -> Uuid,
        /// Descriptive fields as JSON.
        content -> Jsonb,
        /// Display and execution order within the plan.
        sort_order -> Int4,
        /// Blockers as a JSON array of task identifiers.
        blocked_by -> Jsonb,
        /// External tracker issue identifier.
        #[max_length = 255]
        external_issue_id -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tasks -> plans (plan_id));
diesel::allow_tables_to_appear_in_same_query!(plans, tasks);
