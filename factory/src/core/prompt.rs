//! Deterministic prompt text shared by all stages.

use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::Result;
use minijinja::{Environment, context};
use regex::{Captures, Regex};

use crate::core::types::Brief;

const BRIEF_SUMMARY_TEMPLATE: &str = "\
Topic: {{ topic }}
Goal: {{ goal }}
Audience: {{ audience }}
Language: {{ language }}
Platforms: {{ platforms | join(\", \") }}
{% if context_notes %}
Context / sources: {{ context_notes }}
{% else %}
Context / sources: NONE PROVIDED. Do NOT invent specific facts or statistics.
{% endif %}
{% if constraints %}
Constraints:
{% for key, value in constraints %}
  {{ key }}: {{ value }}
{% endfor %}
{% endif %}
";

/// Human-readable summary of a brief, used as the user prompt for clarify and core synthesis.
pub fn brief_summary(brief: &Brief) -> Result<String> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("brief_summary", BRIEF_SUMMARY_TEMPLATE)?;

    let platforms: Vec<&str> = brief.platform_targets.iter().map(|p| p.as_str()).collect();
    let constraints: Vec<(&str, &str)> = brief
        .constraints
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let rendered = env.get_template("brief_summary")?.render(context! {
        topic => brief.topic,
        goal => brief.goal,
        audience => brief.audience,
        language => brief.language.as_str(),
        platforms => platforms,
        context_notes => brief.context_notes.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        constraints => constraints,
    })?;
    Ok(rendered.trim_end().to_string())
}

/// Bulleted forbidden-phrase block, or `(none)`.
pub fn forbidden_block(phrases: &[String]) -> String {
    if phrases.is_empty() {
        return "(none)".to_string();
    }
    phrases
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitute `{name}` placeholders by literal replacement.
///
/// Only names present in `values` are replaced; any other brace text (JSON
/// examples, unknown placeholders) is left untouched. Substituted values are
/// never scanned again, so a draft containing `{directive}` stays verbatim.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

    let lookup: HashMap<&str, &str> = values.iter().copied().collect();
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match lookup.get(&caps[1]) {
            Some(value) => (*value).to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
