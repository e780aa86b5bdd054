//! Parsing of structured model output against explicit schemas.
//!
//! Each structured type declares a JSON Schema and an optional semantic check.
//! Raw text is unwrapped from markdown fences, parsed, validated against the
//! schema, deserialized, and checked, in that order.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::types::{ClarificationResult, ContentCore};

const CLARIFICATION_SCHEMA: &str = include_str!("../../schemas/clarification_result.schema.json");
const CONTENT_CORE_SCHEMA: &str = include_str!("../../schemas/content_core.schema.json");

/// Appended to the system prompt on every structured retry after the first attempt.
pub const STRICT_JSON_NUDGE: &str = "\n\nIMPORTANT: Return ONLY valid JSON matching the schema. \
No markdown, no code fences, no commentary.";

/// A type the model can be asked to produce as JSON.
pub trait OutputSchema: DeserializeOwned {
    /// Name used in error messages.
    const NAME: &'static str;
    /// JSON Schema (Draft 2020-12) the raw JSON must satisfy.
    const JSON_SCHEMA: &'static str;

    /// Semantic checks the schema cannot express.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

impl OutputSchema for ClarificationResult {
    const NAME: &'static str = "ClarificationResult";
    const JSON_SCHEMA: &'static str = CLARIFICATION_SCHEMA;
}

impl OutputSchema for ContentCore {
    const NAME: &'static str = "ContentCore";
    const JSON_SCHEMA: &'static str = CONTENT_CORE_SCHEMA;

    fn check(&self) -> Result<()> {
        self.validate()
    }
}

/// Remove a markdown code fence wrapping JSON, if present.
pub fn strip_code_fences(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```").expect("valid regex"));

    match FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parse one raw model response into `T`.
pub fn parse_structured<T: OutputSchema>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    let instance: Value = serde_json::from_str(cleaned).context("parse model output as json")?;
    validate_schema::<T>(&instance)?;
    let value: T = serde_json::from_value(instance)
        .with_context(|| format!("deserialize {}", T::NAME))?;
    value.check()?;
    Ok(value)
}

fn validate_schema<T: OutputSchema>(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(T::JSON_SCHEMA)
        .with_context(|| format!("parse {} schema", T::NAME))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .with_context(|| format!("compile {} schema", T::NAME))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}
