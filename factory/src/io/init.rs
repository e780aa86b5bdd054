//! Starter files for `cf init`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::io::resources::STYLE_PROFILE;

pub const BRIEF_FILE_NAME: &str = "brief.toml";

/// Options for [`init_workspace`].
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing starter files.
    pub force: bool,
}

/// What happened to one starter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitAction {
    Created(PathBuf),
    Skipped(PathBuf),
}

/// Write a starter brief and a style profile into `root`.
///
/// The profile lands at `profiles/style_profile.toml`, so `root` can be used
/// directly as a resource override directory. Existing files are skipped
/// unless `options.force` is set.
pub fn init_workspace(root: &Path, options: &InitOptions) -> Result<Vec<InitAction>> {
    fs::create_dir_all(root).with_context(|| format!("create directory {}", root.display()))?;
    let files = [
        (root.join(BRIEF_FILE_NAME), EXAMPLE_BRIEF),
        (root.join(STYLE_PROFILE), EXAMPLE_STYLE_PROFILE),
    ];

    let mut actions = Vec::with_capacity(files.len());
    for (path, contents) in files {
        if path.exists() && !options.force {
            debug!(path = %path.display(), "starter file exists, skipping");
            actions.push(InitAction::Skipped(path));
            continue;
        }
        write_file(&path, contents)?;
        actions.push(InitAction::Created(path));
    }
    Ok(actions)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

const EXAMPLE_BRIEF: &str = r#"# Content brief. Only `topic` is required.
topic = "Why small teams should write things down"
goal = "inform"
audience = "founders and engineering leads"
platform_targets = ["linkedin"]
language = "en"

# Facts, links, and anecdotes the post may use. Without them the model is
# told not to invent specifics.
context_notes = """
We moved planning from meetings to written proposals in 2024.
"""

[constraints]
tone = "direct"
"#;

const EXAMPLE_STYLE_PROFILE: &str = r#"# Style profile. Place this directory in `resource_dirs` (or point
# CONTENT_FACTORY_PRIVATE_DIR at it) to override the bundled profile.

[forbidden_ai_smell]
description = "Phrases that make a post read as machine-written."
avoid_phrases = ["let's dive in", "game-changer", "unlock the power"]

[voice]
tone = "direct"
perspective = "practitioner"
avoid = ["hype", "filler"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::StyleProfile;
    use crate::core::types::Brief;

    #[test]
    fn init_writes_parseable_starters() {
        let temp = tempfile::tempdir().expect("tempdir");
        let actions = init_workspace(temp.path(), &InitOptions { force: false }).expect("init");
        assert_eq!(
            actions,
            vec![
                InitAction::Created(temp.path().join(BRIEF_FILE_NAME)),
                InitAction::Created(temp.path().join(STYLE_PROFILE)),
            ]
        );

        let brief: Brief =
            toml::from_str(&fs::read_to_string(temp.path().join(BRIEF_FILE_NAME)).expect("read"))
                .expect("brief parses");
        brief.validate().expect("valid brief");
        let profile: StyleProfile =
            toml::from_str(&fs::read_to_string(temp.path().join(STYLE_PROFILE)).expect("read"))
                .expect("profile parses");
        assert_eq!(profile.forbidden_phrases().len(), 3);
    }

    #[test]
    fn init_skips_existing_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let brief_path = temp.path().join(BRIEF_FILE_NAME);
        fs::write(&brief_path, "topic = \"mine\"\n").expect("write");

        let actions = init_workspace(temp.path(), &InitOptions { force: false }).expect("init");
        assert_eq!(actions[0], InitAction::Skipped(brief_path.clone()));
        assert_eq!(fs::read_to_string(&brief_path).expect("read"), "topic = \"mine\"\n");

        init_workspace(temp.path(), &InitOptions { force: true }).expect("force");
        assert!(fs::read_to_string(&brief_path).expect("read").contains("small teams"));
    }
}
