//! Synthesize-core: distill a brief into the platform-neutral [`ContentCore`].

use tracing::{info, instrument};

use super::{Stage, StageError};
use crate::core::policy::STRUCTURED_RETRIES;
use crate::core::profile::StyleProfile;
use crate::core::prompt::{brief_summary, fill_placeholders, forbidden_block};
use crate::core::types::{Brief, ContentCore};
use crate::io::provider::{Provider, generate_structured};
use crate::io::resources::ResourceChain;

#[instrument(skip_all, fields(topic = %brief.topic))]
pub fn synthesize_core<P: Provider + ?Sized>(
    brief: &Brief,
    style: &StyleProfile,
    provider: &P,
    resources: &ResourceChain,
) -> Result<ContentCore, StageError> {
    let template = resources
        .template("core_synth")
        .map_err(|err| StageError::from_anyhow(Stage::Core, &err))?;
    let forbidden = forbidden_block(style.forbidden_phrases());
    let system = fill_placeholders(&template, &[("forbidden_phrases", forbidden.as_str())]);
    let user = brief_summary(brief).map_err(|err| StageError::from_anyhow(Stage::Core, &err))?;

    let core: ContentCore = generate_structured(provider, &system, &user, STRUCTURED_RETRIES)
        .map_err(|err| StageError::from_anyhow(Stage::Core, &err).with_prompt(&system))?;
    info!(points = core.points.len(), "core synthesized");
    Ok(core)
}
