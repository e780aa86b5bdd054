//! Run lifecycle state machine.
//!
//! A run moves through
//! `initialized -> clarified -> core_generated | core_generated_low_context
//! -> {platform}_rendered -> {platform}_patched`, with `error` reachable from
//! any state. Transitions are caller-driven: one stage invocation applies
//! exactly one transition to [`RunMeta`]. `needs_clarification` is an
//! orthogonal flag tracked alongside the status.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::{Platform, RunMeta};

/// Status tag persisted in `meta.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RunStatus {
    Initialized,
    Clarified,
    CoreGenerated,
    CoreGeneratedLowContext,
    Rendered(Platform),
    Patched(Platform),
    Error,
}

impl RunStatus {
    /// Guidance surfaced to the caller after a transition into this status.
    pub fn next_step(self, run_id: &str) -> String {
        match self {
            RunStatus::Initialized | RunStatus::Clarified => {
                format!("run `cf core {run_id}` to generate the content core")
            }
            RunStatus::CoreGeneratedLowContext => format!(
                "add context with `cf clarify {run_id} -m \"...\"`, then re-run `cf core {run_id}`"
            ),
            RunStatus::CoreGenerated => {
                format!("run `cf render {run_id} -p linkedin` to render a draft")
            }
            RunStatus::Rendered(platform) | RunStatus::Patched(platform) => format!(
                "refine with `cf patch {run_id} -p {platform} -m \"...\"` or render another platform"
            ),
            RunStatus::Error => {
                format!("inspect `cf status {run_id}` and re-run the failed stage")
            }
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Initialized => f.write_str("initialized"),
            RunStatus::Clarified => f.write_str("clarified"),
            RunStatus::CoreGenerated => f.write_str("core_generated"),
            RunStatus::CoreGeneratedLowContext => f.write_str("core_generated_low_context"),
            RunStatus::Rendered(platform) => write!(f, "{platform}_rendered"),
            RunStatus::Patched(platform) => write!(f, "{platform}_patched"),
            RunStatus::Error => f.write_str("error"),
        }
    }
}

impl FromStr for RunStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let status = match s {
            "initialized" => RunStatus::Initialized,
            "clarified" => RunStatus::Clarified,
            "core_generated" => RunStatus::CoreGenerated,
            "core_generated_low_context" => RunStatus::CoreGeneratedLowContext,
            "error" => RunStatus::Error,
            other => {
                if let Some(platform) = other.strip_suffix("_rendered") {
                    RunStatus::Rendered(platform.parse()?)
                } else if let Some(platform) = other.strip_suffix("_patched") {
                    RunStatus::Patched(platform.parse()?)
                } else {
                    return Err(anyhow!("unknown run status '{other}'"));
                }
            }
        };
        Ok(status)
    }
}

impl TryFrom<String> for RunStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.to_string()
    }
}

impl RunMeta {
    /// Clarify reported low context. Only ever raises the flag.
    pub fn mark_low_context(&mut self) {
        self.needs_clarification = true;
    }

    /// The requester answered clarification questions.
    pub fn record_clarified(&mut self) {
        self.status = RunStatus::Clarified;
        self.needs_clarification = false;
        self.error_message = None;
    }

    pub fn record_core_generated(&mut self, model: &str, low_context: bool) {
        self.status = if low_context {
            RunStatus::CoreGeneratedLowContext
        } else {
            RunStatus::CoreGenerated
        };
        self.needs_clarification = low_context;
        self.model = Some(model.to_string());
        self.error_message = None;
    }

    pub fn record_rendered(&mut self, platform: Platform, model: &str) {
        self.status = RunStatus::Rendered(platform);
        self.model = Some(model.to_string());
        self.error_message = None;
    }

    pub fn record_patched(&mut self, platform: Platform, model: &str) {
        self.status = RunStatus::Patched(platform);
        self.model = Some(model.to_string());
        self.error_message = None;
    }

    /// A stage failed; keeps the model in use at failure time.
    pub fn record_failure(&mut self, model: &str, message: impl Into<String>) {
        self.status = RunStatus::Error;
        self.model = Some(model.to_string());
        self.error_message = Some(message.into());
    }
}
