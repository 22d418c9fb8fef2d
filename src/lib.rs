//! Planweave: task dependency graphs and plan publishing.
//!
//! This crate models plans as sets of tasks linked by `blocked_by` edges,
//! keeps those edges acyclic under every mutation, clones plans into fresh
//! drafts, and exports plans to an external issue tracker.
//!
//! # Architecture
//!
//! Planweave follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for storage and the issue tracker
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`plan`]: Task dependency guard, plan cloning and the publish pipeline

pub mod plan;
