//! Reproducible content-writing pipeline.
//!
//! A run turns a brief into a platform-neutral content core, renders platform
//! drafts from it, and applies directive-driven patches, persisting every
//! artifact, prompt, and prior version under a run directory. The crate keeps
//! a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (data model, lifecycle, policy
//!   checks, prompt text, structured-output parsing). No I/O.
//! - **[`io`]**: Side effects (run store, resources, config, provider
//!   subprocesses). Isolated so tests can substitute scripted providers.
//!
//! [`stages`] implements the four generation pipelines as plain functions, and
//! [`workflow`] composes them with the store to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
