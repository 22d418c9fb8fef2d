//! Adapter implementations for plan persistence and tracker ports.

pub mod memory;
pub mod postgres;
