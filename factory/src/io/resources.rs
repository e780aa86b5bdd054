//! Ordered resolution of prompt templates, style profiles, and platform specs.
//!
//! Override directories are checked first, in order; the bundled resources
//! compiled into the binary are the final fallback.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, warn};

use crate::core::profile::{PlatformSpec, StyleProfile};
use crate::core::types::Platform;

pub const STYLE_PROFILE: &str = "profiles/style_profile.toml";

const BUNDLED: &[(&str, &str)] = &[
    (
        "prompts/clarify.txt",
        include_str!("../../resources/prompts/clarify.txt"),
    ),
    (
        "prompts/core_synth.txt",
        include_str!("../../resources/prompts/core_synth.txt"),
    ),
    (
        "prompts/render_linkedin.txt",
        include_str!("../../resources/prompts/render_linkedin.txt"),
    ),
    (
        "prompts/patch.txt",
        include_str!("../../resources/prompts/patch.txt"),
    ),
    (
        STYLE_PROFILE,
        include_str!("../../resources/profiles/style_profile.toml"),
    ),
    (
        "specs/platform_linkedin.toml",
        include_str!("../../resources/specs/platform_linkedin.toml"),
    ),
];

/// Relative path of a prompt template, e.g. `prompts/render_linkedin.txt`.
pub fn prompt_path(name: &str) -> String {
    format!("prompts/{name}.txt")
}

pub fn platform_spec_path(platform: Platform) -> String {
    format!("specs/platform_{platform}.toml")
}

/// Where a resource was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Override(PathBuf),
    Bundled,
}

#[derive(Debug, Clone, Default)]
pub struct ResourceChain {
    overrides: Vec<PathBuf>,
}

impl ResourceChain {
    /// Chain that checks `overrides` in order before bundled resources.
    ///
    /// Directories that do not exist are skipped at lookup time.
    pub fn new(overrides: Vec<PathBuf>) -> Self {
        Self { overrides }
    }

    /// Chain with bundled resources only.
    pub fn bundled() -> Self {
        Self::default()
    }

    /// Locate `rel` without reading it.
    pub fn locate(&self, rel: &str) -> Option<Origin> {
        for dir in &self.overrides {
            let candidate = dir.join(rel);
            if candidate.is_file() {
                return Some(Origin::Override(candidate));
            }
        }
        bundled(rel).map(|_| Origin::Bundled)
    }

    /// Read a text resource.
    pub fn read_text(&self, rel: &str) -> Result<String> {
        match self.locate(rel) {
            Some(Origin::Override(path)) => {
                debug!(resource = rel, path = %path.display(), "resource from override");
                read_file(&path)
            }
            Some(Origin::Bundled) => {
                debug!(resource = rel, "resource from bundle");
                bundled(rel)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("resource not found: {rel}"))
            }
            None => Err(anyhow!("resource not found: {rel}")),
        }
    }

    /// Prompt template by name (`clarify`, `core_synth`, `render_linkedin`, `patch`).
    pub fn template(&self, name: &str) -> Result<String> {
        self.read_text(&prompt_path(name))
    }

    pub fn style_profile(&self) -> Result<StyleProfile> {
        let text = self.read_text(STYLE_PROFILE)?;
        toml::from_str(&text).with_context(|| format!("parse {STYLE_PROFILE}"))
    }

    /// Platform spec, or the default spec when none is available for `platform`.
    pub fn platform_spec(&self, platform: Platform) -> Result<PlatformSpec> {
        let rel = platform_spec_path(platform);
        if self.locate(&rel).is_none() {
            warn!(%platform, "no platform spec found, using defaults");
            return Ok(PlatformSpec::default());
        }
        let text = self.read_text(&rel)?;
        toml::from_str(&text).with_context(|| format!("parse {rel}"))
    }
}

fn bundled(rel: &str) -> Option<&'static str> {
    BUNDLED
        .iter()
        .find(|(name, _)| *name == rel)
        .map(|(_, text)| *text)
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read resource {}", path.display()))
}
