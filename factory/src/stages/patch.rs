//! Patch: rewrite an existing draft according to a directive.

use tracing::{info, instrument};

use super::{Stage, StageError, run_corrective_passes};
use crate::core::policy::{Check, CorrectionStyle, split_changelog};
use crate::core::profile::StyleProfile;
use crate::core::prompt::{fill_placeholders, forbidden_block};
use crate::io::provider::Provider;
use crate::io::resources::ResourceChain;

#[derive(Debug, Clone, Copy)]
pub struct PatchRequest<'a> {
    pub draft: &'a str,
    pub directive: &'a str,
    pub style: &'a StyleProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutput {
    pub patched: String,
    pub changelog: String,
    pub system_prompt: String,
}

#[instrument(skip_all, fields(directive_len = request.directive.len()))]
pub fn patch<P: Provider + ?Sized>(
    request: &PatchRequest<'_>,
    provider: &P,
    resources: &ResourceChain,
) -> Result<PatchOutput, StageError> {
    let template = resources
        .template("patch")
        .map_err(|err| StageError::from_anyhow(Stage::Patch, &err))?;
    let forbidden = forbidden_block(request.style.forbidden_phrases());
    let voice_rules = request.style.voice_rules();
    let system = fill_placeholders(
        &template,
        &[
            ("forbidden_phrases", forbidden.as_str()),
            ("draft", request.draft),
            ("directive", request.directive),
            ("voice_rules", voice_rules.as_str()),
        ],
    );
    let user = "Apply the patch now.";

    let first = provider
        .generate_text(&system, user)
        .map_err(|err| StageError::from_anyhow(Stage::Patch, &err).with_prompt(&system))?;

    let checks = [Check::ForbiddenPhrases {
        phrases: request.style.forbidden_phrases(),
        style: CorrectionStyle::PatchWithChangelog,
    }];
    let raw = run_corrective_passes(provider, &system, user, first, &checks, patched_part)
        .map_err(|message| StageError::new(Stage::Patch, message).with_prompt(&system))?;

    let (patched, changelog) = split_changelog(&raw);
    info!(
        chars = patched.chars().count(),
        has_changelog = !changelog.is_empty(),
        "draft patched"
    );
    Ok(PatchOutput {
        patched: patched.to_string(),
        changelog: changelog.to_string(),
        system_prompt: system,
    })
}

fn patched_part(raw: &str) -> &str {
    split_changelog(raw).0
}
