//! Shared test utilities for grader integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp media files and fake capabilities
//! - Builder patterns for creating configurations and evaluations

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
