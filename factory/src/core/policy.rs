//! Post-generation validation and correction policy.
//!
//! Each [`Check`] inspects generated text and, when violated, yields the
//! instruction appended to the system prompt for a single corrective
//! regeneration. Stages apply checks in a fixed order and never re-verify the
//! corrected output.

/// Retries beyond the first attempt for structured generation.
pub const STRUCTURED_RETRIES: usize = 2;

/// Hard ceiling for rendered drafts. Wider than the prompt's requested
/// maximum so minor overshoot does not trigger a rewrite.
pub const RENDER_LENGTH_CEILING: usize = 3200;

/// Separator between a patched draft and its changelog.
pub const CHANGELOG_SEPARATOR: &str = "---CHANGELOG---";

/// Return every configured phrase present in `text`, compared case-insensitively.
pub fn find_forbidden<'a>(text: &str, phrases: &'a [String]) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    phrases
        .iter()
        .map(String::as_str)
        .filter(|phrase| !phrase.trim().is_empty() && lower.contains(&phrase.to_lowercase()))
        .collect()
}

/// Length in characters, not bytes.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// One post-generation check with its corrective instruction.
#[derive(Debug, Clone, Copy)]
pub enum Check<'a> {
    /// Output longer than `ceiling` is regenerated with a request to stay
    /// under `max_chars` (the platform maximum, not the ceiling).
    Length { ceiling: usize, max_chars: u32 },
    /// Output containing any phrase is regenerated with the offending phrases listed.
    ForbiddenPhrases {
        phrases: &'a [String],
        style: CorrectionStyle,
    },
}

/// Wording of the forbidden-phrase correction, which depends on the output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStyle {
    /// Plain post text.
    Post,
    /// Draft followed by a changelog section that must survive the rewrite.
    PatchWithChangelog,
}

impl Check<'_> {
    /// Short label used in error messages when the corrective call fails.
    pub fn label(&self) -> &'static str {
        match self {
            Check::Length { .. } => "length retry",
            Check::ForbiddenPhrases { .. } => "forbidden phrase retry",
        }
    }

    /// Instruction to append to the system prompt, or `None` when `text` passes.
    pub fn correction(&self, text: &str) -> Option<String> {
        match *self {
            Check::Length {
                ceiling,
                max_chars,
            } => (char_len(text) > ceiling).then(|| {
                format!(
                    "\n\nThe previous output was too long. Shorten it by 15%. \
                     Stay under {max_chars} characters."
                )
            }),
            Check::ForbiddenPhrases { phrases, style } => {
                let found = find_forbidden(text, phrases);
                if found.is_empty() {
                    return None;
                }
                let listed = found
                    .iter()
                    .map(|p| format!("\"{p}\""))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(match style {
                    CorrectionStyle::Post => format!(
                        "\n\nCRITICAL: The previous output contained forbidden phrases: {listed}. \
                         Rewrite without them. Return ONLY the post text."
                    ),
                    CorrectionStyle::PatchWithChangelog => format!(
                        "\n\nCRITICAL: The output contained forbidden phrases: {listed}. \
                         Rewrite without them. Keep the {CHANGELOG_SEPARATOR} section."
                    ),
                })
            }
        }
    }
}

/// Split raw patch output into `(patched draft, changelog)` at the first separator.
///
/// Without a separator the whole trimmed output is the draft and the changelog is empty.
pub fn split_changelog(raw: &str) -> (&str, &str) {
    match raw.split_once(CHANGELOG_SEPARATOR) {
        Some((draft, changelog)) => (draft.trim(), changelog.trim()),
        None => (raw.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases() -> Vec<String> {
        vec!["game-changer".to_string(), "Let's dive in".to_string()]
    }

    #[test]
    fn forbidden_scan_is_case_insensitive() {
        let phrases = phrases();
        let found = find_forbidden("This is a GAME-CHANGER. let's DIVE in!", &phrases);
        assert_eq!(found, vec!["game-changer", "Let's dive in"]);
        assert!(find_forbidden("plain text", &phrases).is_empty());
    }

    #[test]
    fn blank_phrases_never_match() {
        let phrases = vec![String::new(), "  ".to_string()];
        assert!(find_forbidden("anything", &phrases).is_empty());
    }

    #[test]
    fn length_check_uses_ceiling_but_asks_for_platform_max() {
        let check = Check::Length {
            ceiling: RENDER_LENGTH_CEILING,
            max_chars: 3000,
        };
        assert!(check.correction(&"a".repeat(3200)).is_none());
        let correction = check.correction(&"a".repeat(3201)).expect("too long");
        assert!(correction.contains("Shorten it by 15%"));
        assert!(correction.contains("Stay under 3000 characters"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let check = Check::Length {
            ceiling: 10,
            max_chars: 10,
        };
        assert!(check.correction(&"я".repeat(10)).is_none());
    }

    #[test]
    fn forbidden_correction_lists_offending_phrases() {
        let phrases = phrases();
        let check = Check::ForbiddenPhrases {
            phrases: &phrases,
            style: CorrectionStyle::Post,
        };
        let correction = check.correction("a real game-changer").expect("hit");
        assert!(correction.contains("\"game-changer\""));
        assert!(!correction.contains("dive"));
        assert!(correction.contains("Return ONLY the post text"));

        let patch = Check::ForbiddenPhrases {
            phrases: &phrases,
            style: CorrectionStyle::PatchWithChangelog,
        };
        let correction = patch.correction("a real game-changer").expect("hit");
        assert!(correction.contains("Keep the ---CHANGELOG--- section"));
    }

    #[test]
    fn split_changelog_at_first_separator() {
        let (draft, changelog) =
            split_changelog("Rewritten draft text\n---CHANGELOG---\nChanged X to Y");
        assert_eq!(draft, "Rewritten draft text");
        assert_eq!(changelog, "Changed X to Y");

        let (draft, changelog) = split_changelog("a\n---CHANGELOG---\nb\n---CHANGELOG---\nc");
        assert_eq!(draft, "a");
        assert_eq!(changelog, "b\n---CHANGELOG---\nc");
    }

    #[test]
    fn split_changelog_without_separator() {
        let (draft, changelog) = split_changelog("  Just the draft\n\n");
        assert_eq!(draft, "Just the draft");
        assert_eq!(changelog, "");
    }
}
