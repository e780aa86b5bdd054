//! Test-only helpers: a scripted provider and deterministic fixtures.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::profile::StyleProfile;
use crate::core::types::{Brief, ContentCore, CorePoint, Language, Platform};
use crate::io::provider::Provider;
use crate::io::run_store::RunStore;

/// One recorded `generate_text` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub system: String,
    pub user: String,
}

/// Provider that replays queued responses in order and records every call.
///
/// `Err` entries simulate transport failures. Running out of responses is an error.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: RefCell<VecDeque<Result<String, String>>>,
    calls: RefCell<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Provider whose every response succeeds.
    pub fn texts<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(responses.into_iter().map(|s| Ok(s.into())).collect())
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.borrow().clone()
    }
}

impl Provider for ScriptedProvider {
    fn generate_text(&self, system: &str, user: &str) -> Result<String> {
        self.calls.borrow_mut().push(ProviderCall {
            system: system.to_string(),
            user: user.to_string(),
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted provider has no responses left")),
        }
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }
}

/// Run store rooted in a fresh temp directory. Keep the guard alive.
pub fn temp_store() -> Result<(tempfile::TempDir, RunStore)> {
    let temp = tempfile::tempdir()?;
    let store = RunStore::new(temp.path().join("runs"));
    Ok((temp, store))
}

/// English LinkedIn brief with context notes.
pub fn sample_brief() -> Brief {
    let mut brief = Brief::new("Remote work");
    brief.language = Language::En;
    brief.platform_targets = vec![Platform::Linkedin];
    brief.context_notes = Some("Our team of 8 moved planning to written proposals.".to_string());
    brief
}

pub fn sample_core() -> ContentCore {
    ContentCore {
        thesis: "Written culture scales small teams".to_string(),
        angle: "Lessons from a team that replaced meetings with docs".to_string(),
        points: vec![
            CorePoint {
                claim: "Proposals beat status meetings".to_string(),
                support: vec!["Async review fits time zones".to_string()],
                example: Some("Weekly planning moved to a shared doc".to_string()),
            },
            CorePoint {
                claim: "Writing exposes fuzzy thinking".to_string(),
                support: vec!["Gaps show up before work starts".to_string()],
                example: None,
            },
        ],
        optional_counterpoint: Some("Docs can become a bottleneck".to_string()),
        product_update: false,
        do_not_say: vec!["10x".to_string()],
        source_notes: None,
    }
}

/// `sample_core()` serialized the way a model would return it.
pub fn core_json() -> String {
    serde_json::to_string(&sample_core()).unwrap_or_default()
}

/// Default voice with two forbidden phrases.
pub fn sample_style() -> StyleProfile {
    let mut style = StyleProfile::default();
    style.forbidden_ai_smell.avoid_phrases =
        vec!["game-changer".to_string(), "let's dive in".to_string()];
    style
}
