//! Application services for plan dependency management, cloning and
//! publishing.

mod clone;
mod config;
mod dependency;
mod error;
mod plans;
mod publish;
pub(crate) mod render;

pub use clone::{ClonedPlan, PlanCloneService};
pub use config::PublishConfig;
pub use dependency::TaskDependencyService;
pub use error::{PlanServiceError, PlanServiceResult, PublishError, PublishResult};
pub use plans::PlanService;
pub use publish::{PublishRequest, PublishService};
