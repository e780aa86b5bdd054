//! Deterministic, pure logic shared by stages and the caller workflow.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod lifecycle;
pub mod policy;
pub mod profile;
pub mod prompt;
pub mod structured;
pub mod types;
