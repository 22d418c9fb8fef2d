//! Port contracts for plan persistence and tracker export.
//!
//! Ports define infrastructure-agnostic interfaces used by plan services.

pub mod repository;
pub mod tracker;

pub use repository::{PlanRepository, PlanRepositoryError, PlanRepositoryResult};
pub use tracker::{IssueTracker, IssueTrackerError, IssueTrackerResult, TrackerCredential};
