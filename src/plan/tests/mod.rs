//! Unit tests for the plan module.

mod domain_tests;
