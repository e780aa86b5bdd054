//! Caller workflow: compose stages with the run store and lifecycle.
//!
//! One function per command. Each loads what it needs from the run, validates
//! inputs before any provider call, invokes a stage, and applies exactly one
//! lifecycle transition. Stage failures are persisted as the `error` status and
//! returned as [`StageError`] inside the `anyhow` chain; previously written
//! artifacts are left untouched.

mod drafts;
mod synthesis;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::types::{Brief, RunMeta};
use crate::io::provider::Provider;
use crate::io::resources::ResourceChain;
use crate::io::run_store::{RunHandle, RunStore};
use crate::stages::StageError;

pub use drafts::{PatchOutcome, RenderOutcome, patch_draft, render_draft};
pub use synthesis::{CoreOutcome, answer_clarification, generate_core};

/// Collaborators every stage-running command needs.
pub struct StageContext<'a, P: Provider + ?Sized> {
    pub provider: &'a P,
    pub resources: &'a ResourceChain,
}

impl<'a, P: Provider + ?Sized> StageContext<'a, P> {
    pub fn new(provider: &'a P, resources: &'a ResourceChain) -> Self {
        Self {
            provider,
            resources,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model_id()
    }
}

/// Validate `brief` and create a new run for it.
pub fn create_run(store: &RunStore, brief: &Brief) -> Result<RunHandle> {
    brief.validate().context("invalid brief")?;
    store.create_run(brief)
}

/// Persist a stage failure on the run and convert it into the returned error.
fn fail_stage(
    run: &RunHandle,
    meta: &mut RunMeta,
    model: &str,
    err: StageError,
) -> anyhow::Error {
    warn!(run_id = %run.id(), stage = %err.stage, error = %err.message, "stage failed");
    meta.record_failure(model, err.message.clone());
    if let Err(save_err) = run.save_meta(meta) {
        return save_err.context(err.to_string());
    }
    info!(run_id = %run.id(), "failure recorded");
    anyhow::Error::new(err)
}
