//! Stage pipelines: clarify, synthesize core, render, patch.
//!
//! Each stage is a plain function from typed inputs and a [`Provider`] to a
//! typed output or a [`StageError`]. Stages never touch the run store; the
//! caller persists results and lifecycle transitions.

pub mod clarify;
pub mod patch;
pub mod render;
pub mod synthesize;

use std::fmt;

use tracing::{info, warn};

use crate::core::policy::Check;
use crate::io::provider::Provider;

pub use clarify::clarify;
pub use patch::{PatchOutput, PatchRequest, patch};
pub use render::{RenderOutput, RenderRequest, render};
pub use synthesize::synthesize_core;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clarify,
    Core,
    Render,
    Patch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Clarify => "clarify",
            Stage::Core => "core",
            Stage::Render => "render",
            Stage::Patch => "patch",
        })
    }
}

/// Failure of one stage invocation.
///
/// Carries the system prompt that had been constructed when the failure
/// happened, if any, so callers can persist it for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
    pub system_prompt: Option<String>,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            system_prompt: None,
        }
    }

    /// Build from an error chain, keeping every context layer in the message.
    pub fn from_anyhow(stage: Stage, err: &anyhow::Error) -> Self {
        Self::new(stage, format!("{err:#}"))
    }

    pub fn with_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Apply `checks` in order to `output`, regenerating once per failed check.
///
/// `subject` selects the part of the raw output a check inspects. A corrective
/// call appends the check's instruction to `system` and fully replaces the
/// output; it is not re-checked against the same axis. A failed corrective
/// call aborts with `"{label} failed: {error}"`.
pub(crate) fn run_corrective_passes<P: Provider + ?Sized>(
    provider: &P,
    system: &str,
    user: &str,
    mut output: String,
    checks: &[Check<'_>],
    subject: fn(&str) -> &str,
) -> Result<String, String> {
    for check in checks {
        let Some(correction) = check.correction(subject(&output)) else {
            continue;
        };
        warn!(check = check.label(), "output failed check, regenerating once");
        output = provider
            .generate_text(&format!("{system}{correction}"), user)
            .map_err(|err| format!("{} failed: {err:#}", check.label()))?;
        info!(check = check.label(), "corrective regeneration done");
    }
    Ok(output)
}

/// Identity subject for checks that inspect the whole output.
pub(crate) fn whole_text(text: &str) -> &str {
    text
}
