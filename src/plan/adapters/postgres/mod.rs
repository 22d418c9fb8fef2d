//! `PostgreSQL` adapters for plan and task persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PlanPgPool, PostgresPlanRepository};
