use anyhow::{Result, bail};
use tracing::{info, instrument, warn};

use super::{StageContext, fail_stage};
use crate::core::lifecycle::RunStatus;
use crate::core::types::{ClarificationResult, ContentCore};
use crate::io::provider::Provider;
use crate::io::run_store::RunHandle;
use crate::stages::{clarify, synthesize_core};

/// Result of [`generate_core`].
#[derive(Debug, Clone)]
pub struct CoreOutcome {
    pub core: ContentCore,
    pub status: RunStatus,
    /// Present when clarify ran and succeeded.
    pub clarification: Option<ClarificationResult>,
    /// Clarify failure, downgraded to a warning.
    pub clarify_warning: Option<String>,
}

impl CoreOutcome {
    /// Questions worth surfacing to the requester.
    pub fn questions(&self) -> &[String] {
        match &self.clarification {
            Some(result) if result.needs_clarification => &result.questions,
            _ => &[],
        }
    }
}

/// Run clarify (advisory) and then always synthesize the core.
#[instrument(skip_all, fields(run_id = %run.id(), skip_clarify))]
pub fn generate_core<P: Provider + ?Sized>(
    run: &RunHandle,
    ctx: &StageContext<'_, P>,
    skip_clarify: bool,
) -> Result<CoreOutcome> {
    let brief = run.load_brief()?;
    brief.validate()?;
    let style = ctx.resources.style_profile()?;
    let mut meta = run.load_meta()?;

    let mut clarification = None;
    let mut clarify_warning = None;
    if !skip_clarify {
        match clarify(&brief, ctx.provider, ctx.resources) {
            Ok(result) => {
                if result.needs_clarification {
                    run.save_clarification(&result)?;
                    meta.mark_low_context();
                    info!(questions = result.questions.len(), "brief has limited context");
                }
                clarification = Some(result);
            }
            Err(err) => {
                warn!(error = %err, "clarify failed, continuing with core synthesis");
                clarify_warning = Some(err.message);
            }
        }
    }
    let low_context = clarification
        .as_ref()
        .is_some_and(|result| result.needs_clarification);

    let core = match synthesize_core(&brief, &style, ctx.provider, ctx.resources) {
        Ok(core) => core,
        Err(err) => return Err(fail_stage(run, &mut meta, ctx.model(), err)),
    };

    run.save_core(&core)?;
    meta.record_core_generated(ctx.model(), low_context);
    run.save_meta(&mut meta)?;
    info!(status = %meta.status, "core written");

    Ok(CoreOutcome {
        core,
        status: meta.status,
        clarification,
        clarify_warning,
    })
}

/// Append clarification answers to the brief and reset the run to `clarified`.
#[instrument(skip_all, fields(run_id = %run.id()))]
pub fn answer_clarification(run: &RunHandle, message: &str) -> Result<RunStatus> {
    if message.trim().is_empty() {
        bail!("clarification message must be non-empty");
    }
    let mut brief = run.load_brief()?;
    brief.append_context(message);
    run.save_brief(&brief)?;

    let mut meta = run.load_meta()?;
    meta.record_clarified();
    run.save_meta(&mut meta)?;
    info!("clarification recorded");
    Ok(meta.status)
}
