//! Reading brief files supplied by the requester.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::Brief;

/// Parse and validate a brief from a `.json` file or, for any other
/// extension, TOML.
pub fn load_brief_file(path: &Path) -> Result<Brief> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read brief {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let brief: Brief = if is_json {
        serde_json::from_str(&contents).with_context(|| format!("parse brief {}", path.display()))?
    } else {
        toml::from_str(&contents).with_context(|| format!("parse brief {}", path.display()))?
    };
    brief
        .validate()
        .with_context(|| format!("invalid brief {}", path.display()))?;
    debug!(topic = %brief.topic, platforms = brief.platform_targets.len(), "brief loaded");
    Ok(brief)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Language, Platform};

    #[test]
    fn loads_toml_with_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("brief.toml");
        fs::write(
            &path,
            "topic = \"Pricing\"\nlanguage = \"en\"\nplatform_targets = [\"linkedin\", \"x\"]\n",
        )
        .expect("write");

        let brief = load_brief_file(&path).expect("load");
        assert_eq!(brief.topic, "Pricing");
        assert_eq!(brief.language, Language::En);
        assert_eq!(brief.platform_targets, vec![Platform::Linkedin, Platform::X]);
        assert_eq!(brief.goal, "inform");
    }

    #[test]
    fn loads_json_by_extension() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("brief.JSON");
        fs::write(&path, r#"{"topic": "Hiring", "constraints": {"tone": "warm"}}"#).expect("write");
        let brief = load_brief_file(&path).expect("load");
        assert_eq!(brief.constraints.get("tone").map(String::as_str), Some("warm"));
    }

    #[test]
    fn rejects_blank_topic_and_unknown_platform() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blank = temp.path().join("blank.toml");
        fs::write(&blank, "topic = \" \"\n").expect("write");
        assert!(format!("{:#}", load_brief_file(&blank).unwrap_err()).contains("topic"));

        let bad = temp.path().join("bad.toml");
        fs::write(&bad, "topic = \"t\"\nplatform_targets = [\"tiktok\"]\n").expect("write");
        assert!(load_brief_file(&bad).is_err());
    }
}
