//! Step definitions for plan workflow BDD scenarios.

mod given;
mod then;
mod when;
pub mod world;
