//! Style profile and platform specification mappings.
//!
//! Both are loaded from TOML resources; every key is optional and falls back
//! to a named default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MIN_CHARS: u32 = 500;
pub const DEFAULT_MAX_CHARS: u32 = 3000;
pub const DEFAULT_EMOJI_POLICY: &str = "sparingly, max 2-3";

/// Voice and anti-pattern rules applied to every generated text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleProfile {
    pub forbidden_ai_smell: ForbiddenAiSmell,
    pub voice: Voice,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForbiddenAiSmell {
    pub description: Option<String>,
    pub avoid_phrases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Voice {
    pub tone: String,
    pub perspective: String,
    pub avoid: Vec<String>,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            tone: "direct".to_string(),
            perspective: "practitioner".to_string(),
            avoid: Vec::new(),
        }
    }
}

impl StyleProfile {
    pub fn forbidden_phrases(&self) -> &[String] {
        &self.forbidden_ai_smell.avoid_phrases
    }

    /// Voice rules block substituted into render and patch prompts.
    pub fn voice_rules(&self) -> String {
        format!(
            "Tone: {}\nPerspective: {}\nAvoid: {}",
            self.voice.tone,
            self.voice.perspective,
            self.voice.avoid.join(", ")
        )
    }
}

/// Per-platform length bounds and formatting hints.
///
/// Unknown keys are kept so the whole mapping can be shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSpec {
    pub min_length_chars: u32,
    pub max_length_chars: u32,
    pub formatting: Formatting,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatting {
    pub emojis: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for PlatformSpec {
    fn default() -> Self {
        Self {
            min_length_chars: DEFAULT_MIN_CHARS,
            max_length_chars: DEFAULT_MAX_CHARS,
            formatting: Formatting::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl PlatformSpec {
    pub fn emoji_policy(&self) -> &str {
        self.formatting
            .emojis
            .as_deref()
            .unwrap_or(DEFAULT_EMOJI_POLICY)
    }
}
