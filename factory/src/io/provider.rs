//! Language-model provider abstraction.
//!
//! The [`Provider`] trait decouples stages from the model backend (currently a
//! configurable subprocess such as the `llm` CLI). Tests use scripted providers
//! that replay predetermined responses without spawning processes.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::core::structured::{OutputSchema, STRICT_JSON_NUDGE, parse_structured};
use crate::io::config::ProviderConfig;
use crate::io::process::{ProcessLimits, run_with_input};

/// Text-generation capability consumed by every stage.
pub trait Provider {
    /// Send a system + user prompt pair and return the assistant text.
    fn generate_text(&self, system: &str, user: &str) -> Result<String>;

    /// Identifier of the model configuration, recorded in run meta.
    fn model_id(&self) -> &str;
}

/// Generate text, parse it as `T`, and retry with a strict-JSON nudge on failure.
///
/// Makes up to `max_retries + 1` attempts. Transport errors and parse or
/// validation errors both consume an attempt; the final error names the
/// attempt count and the last underlying failure.
#[instrument(skip_all, fields(schema = T::NAME, max_retries))]
pub fn generate_structured<T: OutputSchema, P: Provider + ?Sized>(
    provider: &P,
    system: &str,
    user: &str,
    max_retries: usize,
) -> Result<T> {
    let attempts = max_retries + 1;
    let mut last_error = None;
    for attempt in 1..=attempts {
        let prompt = if attempt == 1 {
            system.to_string()
        } else {
            format!("{system}{STRICT_JSON_NUDGE}")
        };
        let parsed = provider
            .generate_text(&prompt, user)
            .and_then(|raw| parse_structured::<T>(&raw));
        match parsed {
            Ok(value) => {
                debug!(attempt, "structured output accepted");
                return Ok(value);
            }
            Err(err) => {
                warn!(attempt, attempts, err = %format!("{err:#}"), "structured output rejected");
                last_error = Some(err);
            }
        }
    }
    let last = last_error.map_or_else(|| "no attempts made".to_string(), |e| format!("{e:#}"));
    Err(anyhow!(
        "failed to parse model output as {} after {attempts} attempts: {last}",
        T::NAME
    ))
}

/// Provider that spawns a configured command per call.
///
/// `{model}` and `{system}` in the argv are substituted; the user prompt is
/// written to stdin and stdout is the response.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    command: Vec<String>,
    model: String,
    limits: ProcessLimits,
}

impl CommandProvider {
    pub fn new(config: &ProviderConfig, model: impl Into<String>) -> Result<Self> {
        if config.command.is_empty() {
            return Err(anyhow!("provider command must be non-empty"));
        }
        Ok(Self {
            command: config.command.clone(),
            model: model.into(),
            limits: ProcessLimits {
                timeout: Duration::from_secs(config.timeout_secs),
                output_limit_bytes: config.output_limit_bytes,
            },
        })
    }

    fn argv(&self, system: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace("{model}", &self.model).replace("{system}", system))
            .collect()
    }
}

impl Provider for CommandProvider {
    #[instrument(skip_all, fields(model = %self.model, system_len = system.len(), user_len = user.len()))]
    fn generate_text(&self, system: &str, user: &str) -> Result<String> {
        let argv = self.argv(system);
        info!(program = %argv[0], "calling provider");
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);

        let output = run_with_input(cmd, Some(user.as_bytes()), self.limits).map_err(|err| {
            anyhow!("provider command `{}` failed to run: {err:#}", argv[0])
        })?;

        if output.timed_out {
            return Err(anyhow!("provider timed out after {:?}", self.limits.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "provider exited with status {:?}: {}",
                output.status.code(),
                output.stderr_tail(500)
            ));
        }
        let text = output.stdout_text();
        if text.trim().is_empty() {
            return Err(anyhow!("provider returned empty output"));
        }
        debug!(response_len = text.len(), "provider responded");
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
