//! In-memory adapters for plan persistence and tracker export.

mod repository;
mod tracker;

pub use repository::InMemoryPlanRepository;
pub use tracker::InMemoryIssueTracker;
