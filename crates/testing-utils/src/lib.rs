//! # Schedule Testing Utils
//!
//! Shared testing utilities for the reminder scheduling workspace.
//!
//! ## Features
//!
//! - **Test Data Builders**: snapshot builders for objectives, work items and reminders
//! - **Mock Repositories**: in-memory `ScheduleTaskRepository`
//! - **Mock Engine**: in-memory `ScheduleExecutionEngine` recording every call
//! - **Helpers**: fixed clock, logging setup, assertion helpers
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! schedule-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
