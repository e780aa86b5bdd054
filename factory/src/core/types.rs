//! Data model shared by stages, the run store, and the CLI.
//!
//! These types define the persisted contracts of a run. They are validated once
//! at the external boundary (brief files, stored artifacts, model output) and
//! passed strongly typed everywhere else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::core::lifecycle::RunStatus;

/// Target platform for a rendered draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Blog,
    Linkedin,
    X,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Blog, Platform::Linkedin, Platform::X];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Blog => "blog",
            Platform::Linkedin => "linkedin",
            Platform::X => "x",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow!("invalid platform '{s}' (choose from: blog, linkedin, x)"))
    }
}

/// Output language of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Ru,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ru => "ru",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input specification for a content run.
///
/// Immutable after creation except `context_notes`, which only grows through
/// [`Brief::append_context`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brief {
    pub topic: String,
    #[serde(default = "default_goal")]
    pub goal: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_platforms")]
    pub platform_targets: Vec<Platform>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub context_notes: Option<String>,
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

fn default_goal() -> String {
    "inform".to_string()
}

fn default_audience() -> String {
    "builders, founders, product people".to_string()
}

fn default_platforms() -> Vec<Platform> {
    Platform::ALL.to_vec()
}

impl Brief {
    /// Create a brief with defaults for everything but the topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            goal: default_goal(),
            audience: default_audience(),
            platform_targets: default_platforms(),
            language: Language::default(),
            context_notes: None,
            constraints: BTreeMap::new(),
        }
    }

    /// Boundary validation for briefs read from user files.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            bail!("brief topic must be non-empty");
        }
        if self.platform_targets.is_empty() {
            bail!("brief platform_targets must list at least one platform");
        }
        Ok(())
    }

    /// Append clarification answers to `context_notes`.
    pub fn append_context(&mut self, answers: &str) {
        self.context_notes = Some(match self.context_notes.take() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}\n\n{}", existing.trim_end(), answers)
            }
            _ => answers.to_string(),
        });
    }
}

/// Output of the Clarify stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClarificationResult {
    pub needs_clarification: bool,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// One supporting point of a [`ContentCore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorePoint {
    pub claim: String,
    pub support: Vec<String>,
    #[serde(default)]
    pub example: Option<String>,
}

/// Synthesized semantic payload every platform draft is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCore {
    pub thesis: String,
    pub angle: String,
    pub points: Vec<CorePoint>,
    #[serde(default)]
    pub optional_counterpoint: Option<String>,
    #[serde(default)]
    pub product_update: bool,
    #[serde(default)]
    pub do_not_say: Vec<String>,
    #[serde(default)]
    pub source_notes: Option<String>,
}

impl ContentCore {
    /// Well-formedness required before a core may be rendered.
    pub fn validate(&self) -> Result<()> {
        if self.thesis.trim().is_empty() {
            bail!("content core thesis must be non-empty");
        }
        if self.points.is_empty() {
            bail!("content core must contain at least one point");
        }
        Ok(())
    }
}

/// Lifecycle record for a run (`meta.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub topic: String,
    pub language: Language,
    pub status: RunStatus,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub needs_clarification: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RunMeta {
    pub fn new(run_id: impl Into<String>, brief: &Brief, now: &str) -> Self {
        Self {
            run_id: run_id.into(),
            topic: brief.topic.clone(),
            language: brief.language,
            status: RunStatus::Initialized,
            model: None,
            error_message: None,
            needs_clarification: false,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Audit entry for one applied patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub patch_number: u32,
    pub platform: Platform,
    pub directive: String,
    pub model: String,
    #[serde(default)]
    pub changelog: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_defaults_fill_missing_fields() {
        let brief: Brief = serde_json::from_str(r#"{"topic": "Remote work"}"#).expect("parse");
        assert_eq!(brief.goal, "inform");
        assert_eq!(brief.platform_targets, Platform::ALL.to_vec());
        assert_eq!(brief.language, Language::Ru);
        assert!(brief.context_notes.is_none());
        assert!(brief.constraints.is_empty());
    }

    #[test]
    fn brief_rejects_unknown_language_and_platform() {
        assert!(serde_json::from_str::<Brief>(r#"{"topic": "t", "language": "de"}"#).is_err());
        assert!(
            serde_json::from_str::<Brief>(r#"{"topic": "t", "platform_targets": ["tiktok"]}"#)
                .is_err()
        );
    }

    #[test]
    fn validate_rejects_blank_topic() {
        let err = Brief::new("   ").validate().unwrap_err();
        assert!(err.to_string().contains("topic"));
    }

    #[test]
    fn append_context_separates_with_blank_line() {
        let mut brief = Brief::new("t");
        brief.append_context("first answer");
        assert_eq!(brief.context_notes.as_deref(), Some("first answer"));

        brief.context_notes = Some("notes  \n".to_string());
        brief.append_context("more");
        assert_eq!(brief.context_notes.as_deref(), Some("notes\n\nmore"));
    }

    #[test]
    fn platform_parses_known_tags_only() {
        assert_eq!("x".parse::<Platform>().expect("x"), Platform::X);
        let err = "tiktok".parse::<Platform>().unwrap_err();
        assert!(err.to_string().contains("invalid platform"));
    }

    #[test]
    fn core_validate_requires_thesis_and_points() {
        let mut core = ContentCore {
            thesis: "Thesis".to_string(),
            angle: "Angle".to_string(),
            points: Vec::new(),
            optional_counterpoint: None,
            product_update: false,
            do_not_say: Vec::new(),
            source_notes: None,
        };
        assert!(core.validate().is_err());
        core.points.push(CorePoint {
            claim: "c".to_string(),
            support: vec!["s".to_string()],
            example: None,
        });
        assert!(core.validate().is_ok());
        core.thesis = " ".to_string();
        assert!(core.validate().is_err());
    }
}
