//! Render: turn a content core into a platform draft.

use tracing::{info, instrument};

use super::{Stage, StageError, run_corrective_passes, whole_text};
use crate::core::policy::{Check, CorrectionStyle, RENDER_LENGTH_CEILING};
use crate::core::profile::{PlatformSpec, StyleProfile};
use crate::core::prompt::{fill_placeholders, forbidden_block};
use crate::core::types::{Brief, ContentCore, Platform};
use crate::io::provider::Provider;
use crate::io::resources::ResourceChain;

#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub brief: &'a Brief,
    pub core: &'a ContentCore,
    pub style: &'a StyleProfile,
    pub platform: Platform,
    pub spec: &'a PlatformSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub text: String,
    /// System prompt of the first generation call.
    pub system_prompt: String,
}

/// Render one draft, then apply the length and forbidden-phrase corrections.
#[instrument(skip_all, fields(platform = %request.platform))]
pub fn render<P: Provider + ?Sized>(
    request: &RenderRequest<'_>,
    provider: &P,
    resources: &ResourceChain,
) -> Result<RenderOutput, StageError> {
    let system = build_system_prompt(request, resources)?;
    let user = format!("Write the {} post now.", request.platform);

    let first = provider
        .generate_text(&system, &user)
        .map_err(|err| StageError::from_anyhow(Stage::Render, &err).with_prompt(&system))?;

    let checks = [
        Check::Length {
            ceiling: RENDER_LENGTH_CEILING,
            max_chars: request.spec.max_length_chars,
        },
        Check::ForbiddenPhrases {
            phrases: request.style.forbidden_phrases(),
            style: CorrectionStyle::Post,
        },
    ];
    let text = run_corrective_passes(provider, &system, &user, first, &checks, whole_text)
        .map_err(|message| StageError::new(Stage::Render, message).with_prompt(&system))?;

    let text = text.trim().to_string();
    info!(chars = text.chars().count(), "draft rendered");
    Ok(RenderOutput {
        text,
        system_prompt: system,
    })
}

fn build_system_prompt(
    request: &RenderRequest<'_>,
    resources: &ResourceChain,
) -> Result<String, StageError> {
    let template = resources
        .template(&format!("render_{}", request.platform))
        .map_err(|err| StageError::from_anyhow(Stage::Render, &err))?;
    let core_json = serde_json::to_string_pretty(request.core)
        .map_err(|err| StageError::new(Stage::Render, format!("serialize core: {err}")))?;
    let spec_json = serde_json::to_string_pretty(request.spec)
        .map_err(|err| StageError::new(Stage::Render, format!("serialize platform spec: {err}")))?;
    let min_chars = request.spec.min_length_chars.to_string();
    let max_chars = request.spec.max_length_chars.to_string();
    let forbidden = forbidden_block(request.style.forbidden_phrases());
    let voice_rules = request.style.voice_rules();

    Ok(fill_placeholders(
        &template,
        &[
            ("language", request.brief.language.as_str()),
            ("min_chars", min_chars.as_str()),
            ("max_chars", max_chars.as_str()),
            ("forbidden_phrases", forbidden.as_str()),
            ("core_json", core_json.as_str()),
            ("platform_spec", spec_json.as_str()),
            ("voice_rules", voice_rules.as_str()),
            ("emoji_policy", request.spec.emoji_policy()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedProvider, sample_brief, sample_core, sample_style};

    fn run(provider: &ScriptedProvider, platform: Platform) -> Result<RenderOutput, StageError> {
        let brief = sample_brief();
        let core = sample_core();
        let style = sample_style();
        let spec = PlatformSpec::default();
        let request = RenderRequest {
            brief: &brief,
            core: &core,
            style: &style,
            platform,
            spec: &spec,
        };
        render(&request, provider, &ResourceChain::bundled())
    }

    #[test]
    fn short_output_needs_no_regeneration() {
        let provider = ScriptedProvider::new(vec![Ok(format!("  {}\n", "a".repeat(2000)))]);
        let output = run(&provider, Platform::Linkedin).expect("render");
        assert_eq!(output.text, "a".repeat(2000));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user, "Write the linkedin post now.");
        assert_eq!(calls[0].system, output.system_prompt);
    }

    #[test]
    fn long_output_is_shortened_once() {
        let provider = ScriptedProvider::new(vec![
            Ok("a".repeat(4000)),
            Ok("b".repeat(3500)),
        ]);
        let output = run(&provider, Platform::Linkedin).expect("render");
        assert_eq!(output.text, "b".repeat(3500));

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].system.starts_with(&output.system_prompt));
        assert!(calls[1].system.contains("Shorten it by 15%"));
        assert!(calls[1].system.contains("Stay under 3000 characters"));
    }

    #[test]
    fn forbidden_phrase_triggers_single_rewrite() {
        let provider = ScriptedProvider::texts([
            "This is a game-changer.",
            "Still a Game-Changer, honestly.",
        ]);
        let output = run(&provider, Platform::Linkedin).expect("render");
        assert_eq!(output.text, "Still a Game-Changer, honestly.");

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].system.contains("\"game-changer\""));
        assert!(!calls[1].system.contains("Shorten"));
    }

    #[test]
    fn length_then_phrase_corrections_in_order() {
        let provider = ScriptedProvider::new(vec![
            Ok("a".repeat(4000)),
            Ok("short but a game-changer".to_string()),
            Ok("short and clean".to_string()),
        ]);
        let output = run(&provider, Platform::Linkedin).expect("render");
        assert_eq!(output.text, "short and clean");

        let calls = provider.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].system.contains("Shorten it by 15%"));
        assert!(calls[2].system.contains("forbidden phrases"));
        assert!(!calls[2].system.contains("Shorten"));
    }

    #[test]
    fn prompt_embeds_core_spec_and_voice() {
        let provider = ScriptedProvider::texts(["ok"]);
        let output = run(&provider, Platform::Linkedin).expect("render");
        let system = output.system_prompt;
        assert!(system.contains("Write in en."));
        assert!(system.contains("between 500 and 3000"));
        assert!(system.contains("\"thesis\": \"Written culture scales small teams\""));
        assert!(system.contains("\"min_length_chars\": 500"));
        assert!(system.contains("Tone: direct\nPerspective: practitioner"));
        assert!(system.contains("Emoji policy: sparingly, max 2-3"));
    }

    #[test]
    fn failing_correction_reports_check_and_prompt() {
        let provider = ScriptedProvider::new(vec![
            Ok("game-changer".to_string()),
            Err("connection reset".to_string()),
        ]);
        let err = run(&provider, Platform::Linkedin).unwrap_err();
        assert_eq!(err.message, "forbidden phrase retry failed: connection reset");
        assert!(err.system_prompt.is_some());
    }

    #[test]
    fn platform_without_template_fails_before_calling() {
        let provider = ScriptedProvider::texts(["unused"]);
        let err = run(&provider, Platform::Blog).unwrap_err();
        assert!(err.message.contains("resource not found: prompts/render_blog.txt"));
        assert!(err.system_prompt.is_none());
        assert!(provider.calls().is_empty());
    }
}
