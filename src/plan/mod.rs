//! Task dependency graphs and plan publishing.
//!
//! A plan owns a set of tasks whose `blocked_by` edges must stay acyclic.
//! This module guards every edge mutation with cycle detection, clones plans
//! into dependency-free drafts, and exports plans to an external issue
//! tracker. It follows the hexagonal layout:
//!
//! - Domain types and graph algorithms in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
