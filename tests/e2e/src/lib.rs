//! End-to-end test support for easeward
//!
//! - `harness`: throwaway collections
//! - `mocks`: deck options and card fixtures

pub mod harness;

pub use harness::TestDatabaseManager;
pub use mocks::{TestDataFactory, TestScenario};
