use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use tracing::{info, instrument};

use super::{StageContext, fail_stage};
use crate::core::types::{PatchRecord, Platform};
use crate::io::provider::Provider;
use crate::io::resources::prompt_path;
use crate::io::run_store::{Artifact, RunHandle};
use crate::stages::{PatchRequest, RenderRequest, patch, render};

#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub draft_path: PathBuf,
    /// Backup of the draft this render replaced, if there was one.
    pub backup: Option<PathBuf>,
    pub chars: usize,
}

#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub patch_number: u32,
    pub draft_path: PathBuf,
    pub backup: PathBuf,
    pub changelog: String,
}

/// Render the stored core for `platform`.
#[instrument(skip_all, fields(run_id = %run.id(), %platform))]
pub fn render_draft<P: Provider + ?Sized>(
    run: &RunHandle,
    ctx: &StageContext<'_, P>,
    platform: Platform,
) -> Result<RenderOutcome> {
    let Some(core) = run.load_core()? else {
        bail!("core.json not found; run `cf core {}` first", run.id());
    };
    core.validate()?;
    let template = prompt_path(&format!("render_{platform}"));
    if ctx.resources.locate(&template).is_none() {
        bail!("resource not found: {template}; add it to a resource directory to render {platform}");
    }
    let brief = run.load_brief()?;
    let style = ctx.resources.style_profile()?;
    let spec = ctx.resources.platform_spec(platform)?;
    let mut meta = run.load_meta()?;

    let request = RenderRequest {
        brief: &brief,
        core: &core,
        style: &style,
        platform,
        spec: &spec,
    };
    let output = match render(&request, ctx.provider, ctx.resources) {
        Ok(output) => output,
        Err(err) => return Err(fail_stage(run, &mut meta, ctx.model(), err)),
    };

    let backup = run.version_draft(platform)?;
    run.save_draft(platform, &output.text)?;
    run.save_prompt(&format!("{platform}_render"), &output.system_prompt)?;
    meta.record_rendered(platform, ctx.model());
    run.save_meta(&mut meta)?;
    info!(chars = output.text.chars().count(), "draft written");

    Ok(RenderOutcome {
        draft_path: run.artifact_path(Artifact::Draft(platform)),
        backup,
        chars: output.text.chars().count(),
    })
}

/// Apply `directive` to the current `platform` draft.
#[instrument(skip_all, fields(run_id = %run.id(), %platform))]
pub fn patch_draft<P: Provider + ?Sized>(
    run: &RunHandle,
    ctx: &StageContext<'_, P>,
    platform: Platform,
    directive: &str,
) -> Result<PatchOutcome> {
    if directive.trim().is_empty() {
        bail!("patch directive must be non-empty");
    }
    let draft = match run.load_draft(platform)? {
        Some(text) if !text.trim().is_empty() => text,
        _ => bail!(
            "{platform} draft not found; run `cf render {} -p {platform}` first",
            run.id()
        ),
    };
    let style = ctx.resources.style_profile()?;
    let mut meta = run.load_meta()?;

    let request = PatchRequest {
        draft: &draft,
        directive,
        style: &style,
    };
    let output = match patch(&request, ctx.provider, ctx.resources) {
        Ok(output) => output,
        Err(err) => return Err(fail_stage(run, &mut meta, ctx.model(), err)),
    };

    let backup = run
        .version_draft(platform)?
        .ok_or_else(|| anyhow!("{platform} draft disappeared before backup"))?;
    run.save_draft(platform, &output.patched)?;
    let patch_number = run.next_patch_number(platform)?;
    run.save_prompt(
        &format!("patch_{patch_number:03}_{platform}"),
        &output.system_prompt,
    )?;
    run.save_patch_record(&PatchRecord {
        patch_number,
        platform,
        directive: directive.to_string(),
        model: ctx.model().to_string(),
        changelog: output.changelog.clone(),
    })?;
    meta.record_patched(platform, ctx.model());
    run.save_meta(&mut meta)?;
    info!(patch_number, "patch applied");

    Ok(PatchOutcome {
        patch_number,
        draft_path: run.artifact_path(Artifact::Draft(platform)),
        backup,
        changelog: output.changelog,
    })
}
