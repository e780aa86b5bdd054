//! Filesystem-backed run state store.
//!
//! Layout under `runs_dir`:
//!
//! ```text
//! {YYYYmmdd_HHMMSS}_{slug}/
//!   meta.json  brief.json  core.json  blog.md  linkedin.md  x.md
//!   clarification.json            (only when clarification was needed)
//!   prompts/{name}.txt            (system prompts sent for render/patch)
//!   patches/patch_{nnn}_{platform}.json
//!   versions/{platform}_v{n}.md   (immutable backups)
//! ```
//!
//! Every JSON/text write goes through a temp file + rename. Backups are created
//! exclusively and never overwritten.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::core::types::{Brief, ClarificationResult, ContentCore, PatchRecord, Platform, RunMeta};

const SLUG_MAX_CHARS: usize = 60;

/// Current UTC time as RFC 3339, the format stored in `meta.json`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Filesystem-safe slug of a topic. Unicode letters are kept.
pub fn slugify(topic: &str) -> String {
    static SEPARATORS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\s_/\\:;.,!?]+").expect("valid regex"));
    static NON_WORD: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w-]").expect("valid regex"));
    static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

    let lower = topic.to_lowercase();
    let dashed = SEPARATORS.replace_all(&lower, "-");
    let cleaned = NON_WORD.replace_all(&dashed, "");
    let collapsed = DASHES.replace_all(&cleaned, "-");
    let capped: String = collapsed
        .trim_matches('-')
        .chars()
        .take(SLUG_MAX_CHARS)
        .collect();
    capped.trim_end_matches('-').to_string()
}

/// Addressable run artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Meta,
    Brief,
    Core,
    Draft(Platform),
}

impl Artifact {
    pub const NAMES: [&'static str; 6] = ["meta", "brief", "core", "blog", "linkedin", "x"];

    pub fn file_name(self) -> String {
        match self {
            Artifact::Meta => "meta.json".to_string(),
            Artifact::Brief => "brief.json".to_string(),
            Artifact::Core => "core.json".to_string(),
            Artifact::Draft(platform) => format!("{platform}.md"),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Meta => f.write_str("meta"),
            Artifact::Brief => f.write_str("brief"),
            Artifact::Core => f.write_str("core"),
            Artifact::Draft(platform) => write!(f, "{platform}"),
        }
    }
}

impl FromStr for Artifact {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "meta" => Ok(Artifact::Meta),
            "brief" => Ok(Artifact::Brief),
            "core" => Ok(Artifact::Core),
            other => other.parse::<Platform>().map(Artifact::Draft).map_err(|_| {
                anyhow!(
                    "unknown artifact '{other}' (choose from: {})",
                    Artifact::NAMES.join(", ")
                )
            }),
        }
    }
}

/// Base directory holding all runs.
#[derive(Debug, Clone)]
pub struct RunStore {
    base_dir: PathBuf,
}

impl RunStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create a new run directory and persist its brief and initial meta.
    pub fn create_run(&self, brief: &Brief) -> Result<RunHandle> {
        fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("create runs directory {}", self.base_dir.display()))?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let slug = slugify(&brief.topic);
        let base_name = if slug.is_empty() {
            stamp
        } else {
            format!("{stamp}_{slug}")
        };

        let mut suffix = 1u32;
        let (run_id, dir) = loop {
            let name = if suffix == 1 {
                base_name.clone()
            } else {
                format!("{base_name}-{suffix}")
            };
            let dir = self.base_dir.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => break (name, dir),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(err) => {
                    return Err(err).with_context(|| format!("create run {}", dir.display()));
                }
            }
        };

        let run = RunHandle { run_id, dir };
        run.save_brief(brief)?;
        let mut meta = RunMeta::new(run.id(), brief, &now_rfc3339());
        run.save_meta(&mut meta)?;
        info!(run_id = %run.id(), "run created");
        Ok(run)
    }

    /// Run directory names, newest first.
    pub fn list_runs(&self, limit: usize) -> Result<Vec<String>> {
        let mut names = self.run_names()?;
        names.truncate(limit);
        Ok(names)
    }

    /// Open a run by exact id or by prefix; the newest prefix match wins.
    pub fn open(&self, run_id: &str) -> Result<RunHandle> {
        if run_id.is_empty() || run_id.contains(['/', '\\']) || run_id.starts_with('.') {
            bail!("invalid run id '{run_id}'");
        }
        let exact = self.base_dir.join(run_id);
        if exact.is_dir() {
            return Ok(RunHandle {
                run_id: run_id.to_string(),
                dir: exact,
            });
        }
        self.run_names()?
            .into_iter()
            .find(|name| name.starts_with(run_id))
            .map(|name| RunHandle {
                dir: self.base_dir.join(&name),
                run_id: name,
            })
            .ok_or_else(|| anyhow!("run not found: {run_id}"))
    }

    fn run_names(&self) -> Result<Vec<String>> {
        if !self.base_dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.base_dir)
            .with_context(|| format!("read runs directory {}", self.base_dir.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.context("read runs directory entry")?;
            if entry.file_type().context("stat run entry")?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }
}

/// One run directory.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: String,
    dir: PathBuf,
}

impl RunHandle {
    pub fn id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    pub fn load_meta(&self) -> Result<RunMeta> {
        read_json(&self.artifact_path(Artifact::Meta))
    }

    /// Persist meta, refreshing `updated_at`.
    pub fn save_meta(&self, meta: &mut RunMeta) -> Result<()> {
        meta.updated_at = now_rfc3339();
        debug!(run_id = %self.run_id, status = %meta.status, "writing meta");
        write_json(&self.artifact_path(Artifact::Meta), meta)
    }

    pub fn load_brief(&self) -> Result<Brief> {
        read_json(&self.artifact_path(Artifact::Brief))
    }

    pub fn save_brief(&self, brief: &Brief) -> Result<()> {
        write_json(&self.artifact_path(Artifact::Brief), brief)
    }

    /// Stored core, or `None` if none has been generated.
    pub fn load_core(&self) -> Result<Option<ContentCore>> {
        let path = self.artifact_path(Artifact::Core);
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn save_core(&self, core: &ContentCore) -> Result<()> {
        write_json(&self.artifact_path(Artifact::Core), core)
    }

    pub fn load_draft(&self, platform: Platform) -> Result<Option<String>> {
        read_optional(&self.artifact_path(Artifact::Draft(platform)))
    }

    /// Overwrite the current draft. A trailing newline is ensured.
    pub fn save_draft(&self, platform: Platform, text: &str) -> Result<()> {
        let mut contents = text.to_string();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        write_atomic(&self.artifact_path(Artifact::Draft(platform)), &contents)
    }

    /// Raw text of an artifact, or `None` if it was never written.
    pub fn read_artifact_text(&self, artifact: Artifact) -> Result<Option<String>> {
        read_optional(&self.artifact_path(artifact))
    }

    pub fn save_clarification(&self, result: &ClarificationResult) -> Result<()> {
        write_json(&self.dir.join("clarification.json"), result)
    }

    /// Save a system prompt under `prompts/{name}.txt`.
    pub fn save_prompt(&self, name: &str, prompt: &str) -> Result<PathBuf> {
        let path = self.dir.join("prompts").join(format!("{name}.txt"));
        write_atomic(&path, prompt)?;
        Ok(path)
    }

    /// Existing backups for `platform` as `(version, path)`, ascending.
    pub fn versions(&self, platform: Platform) -> Result<Vec<(u32, PathBuf)>> {
        let dir = self.dir.join("versions");
        let prefix = format!("{platform}_v");
        numbered_files(&dir, |name| {
            name.strip_prefix(prefix.as_str())?
                .strip_suffix(".md")?
                .parse()
                .ok()
        })
    }

    /// Copy the current draft to the next `versions/{platform}_v{n}.md`.
    ///
    /// Returns `None` when there is no draft to preserve.
    pub fn version_draft(&self, platform: Platform) -> Result<Option<PathBuf>> {
        let Some(current) = self.load_draft(platform)? else {
            return Ok(None);
        };
        let next = self
            .versions(platform)?
            .last()
            .map_or(1, |(version, _)| version + 1);
        let dir = self.dir.join("versions");
        fs::create_dir_all(&dir).with_context(|| format!("create directory {}", dir.display()))?;
        let path = dir.join(format!("{platform}_v{next}.md"));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("create backup {}", path.display()))?;
        file.write_all(current.as_bytes())
            .with_context(|| format!("write backup {}", path.display()))?;
        info!(run_id = %self.run_id, %platform, version = next, "draft backed up");
        Ok(Some(path))
    }

    /// Next per-platform patch number, starting at 1.
    pub fn next_patch_number(&self, platform: Platform) -> Result<u32> {
        Ok(self
            .patch_files(platform)?
            .last()
            .map_or(1, |(number, _)| number + 1))
    }

    pub fn save_patch_record(&self, record: &PatchRecord) -> Result<PathBuf> {
        let path = self.dir.join("patches").join(format!(
            "patch_{:03}_{}.json",
            record.patch_number, record.platform
        ));
        write_json(&path, record)?;
        Ok(path)
    }

    /// Applied patches for `platform`, oldest first.
    pub fn patch_records(&self, platform: Platform) -> Result<Vec<PatchRecord>> {
        self.patch_files(platform)?
            .iter()
            .map(|(_, path)| read_json(path))
            .collect()
    }

    fn patch_files(&self, platform: Platform) -> Result<Vec<(u32, PathBuf)>> {
        let dir = self.dir.join("patches");
        let suffix = format!("_{platform}.json");
        numbered_files(&dir, |name| {
            name.strip_prefix("patch_")?
                .strip_suffix(suffix.as_str())?
                .parse()
                .ok()
        })
    }
}

/// Files in `dir` whose names `number_of` maps to a number, sorted ascending.
fn numbered_files(dir: &Path, number_of: impl Fn(&str) -> Option<u32>) -> Result<Vec<(u32, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let name = entry.file_name();
        if let Some(number) = number_of(&name.to_string_lossy()) {
            found.push((number, entry.path()));
        }
    }
    found.sort_unstable_by_key(|(number, _)| *number);
    Ok(found)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write via a sibling temp file and rename.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents).with_context(|| format!("write temp {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::RunStatus;
    use crate::test_support::sample_core;

    fn store() -> (tempfile::TempDir, RunStore) {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = RunStore::new(temp.path().join("runs"));
        (temp, store)
    }

    #[test]
    fn slugify_keeps_unicode_words() {
        assert_eq!(slugify("Remote work: lessons learned!"), "remote-work-lessons-learned");
        assert_eq!(slugify("Удалёнка / 2025"), "удалёнка-2025");
        assert_eq!(slugify("  --Hello__World--  "), "hello-world");
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify(&"a".repeat(80)).len(), 60);
    }

    #[test]
    fn create_run_persists_brief_and_initial_meta() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Remote work")).expect("create");
        assert!(run.id().ends_with("_remote-work"));

        let meta = run.load_meta().expect("meta");
        assert_eq!(meta.run_id, run.id());
        assert_eq!(meta.status, RunStatus::Initialized);
        assert_eq!(run.load_brief().expect("brief"), Brief::new("Remote work"));
        assert!(run.load_core().expect("core").is_none());
    }

    #[test]
    fn colliding_run_names_get_suffixes() {
        let (_temp, store) = store();
        let first = store.create_run(&Brief::new("Same")).expect("first");
        let second = store.create_run(&Brief::new("Same")).expect("second");
        assert_ne!(first.id(), second.id());
        assert_eq!(store.list_runs(10).expect("list").len(), 2);
    }

    #[test]
    fn open_accepts_exact_and_prefix_ids() {
        let (_temp, store) = store();
        fs::create_dir_all(store.base_dir().join("20250101_000000_old")).expect("mkdir");
        fs::create_dir_all(store.base_dir().join("20250102_000000_new")).expect("mkdir");

        assert_eq!(
            store.list_runs(10).expect("list"),
            vec!["20250102_000000_new", "20250101_000000_old"]
        );
        assert_eq!(store.list_runs(1).expect("list").len(), 1);
        assert_eq!(store.open("2025").expect("prefix").id(), "20250102_000000_new");
        assert_eq!(
            store.open("20250101_000000_old").expect("exact").id(),
            "20250101_000000_old"
        );
        let err = store.open("1999").unwrap_err();
        assert_eq!(err.to_string(), "run not found: 1999");
        assert!(store.open("../etc").is_err());
    }

    #[test]
    fn list_runs_on_missing_base_is_empty() {
        let (_temp, store) = store();
        assert!(store.list_runs(20).expect("list").is_empty());
    }

    #[test]
    fn core_round_trips() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Core")).expect("create");
        let core = sample_core();
        run.save_core(&core).expect("save");
        assert_eq!(run.load_core().expect("load"), Some(core));
    }

    #[test]
    fn meta_write_refreshes_updated_at() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Meta")).expect("create");
        let mut meta = run.load_meta().expect("meta");
        meta.updated_at = "1970-01-01T00:00:00Z".to_string();
        run.save_meta(&mut meta).expect("save");
        assert_ne!(run.load_meta().expect("reload").updated_at, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn versions_preserve_each_prior_draft() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Drafts")).expect("create");
        assert!(run.version_draft(Platform::Linkedin).expect("none").is_none());

        run.save_draft(Platform::Linkedin, "first").expect("save");
        let v1 = run.version_draft(Platform::Linkedin).expect("v1").expect("path");
        run.save_draft(Platform::Linkedin, "second\n").expect("save");
        let v2 = run.version_draft(Platform::Linkedin).expect("v2").expect("path");

        assert!(v1.ends_with("versions/linkedin_v1.md"));
        assert!(v2.ends_with("versions/linkedin_v2.md"));
        assert_eq!(fs::read_to_string(&v1).expect("read"), "first\n");
        assert_eq!(fs::read_to_string(&v2).expect("read"), "second\n");
        assert!(run.versions(Platform::Blog).expect("blog").is_empty());
    }

    #[test]
    fn patch_numbers_are_per_platform() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Patches")).expect("create");
        assert_eq!(run.next_patch_number(Platform::Linkedin).expect("n"), 1);

        for (number, platform) in [(1, Platform::Linkedin), (2, Platform::Linkedin), (1, Platform::X)] {
            let record = PatchRecord {
                patch_number: number,
                platform,
                directive: format!("directive {number}"),
                model: "m".to_string(),
                changelog: String::new(),
            };
            let path = run.save_patch_record(&record).expect("save");
            assert!(path.ends_with(format!("patches/patch_{number:03}_{platform}.json")));
        }

        assert_eq!(run.next_patch_number(Platform::Linkedin).expect("n"), 3);
        assert_eq!(run.next_patch_number(Platform::X).expect("n"), 2);
        assert_eq!(run.next_patch_number(Platform::Blog).expect("n"), 1);
        let records = run.patch_records(Platform::Linkedin).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].directive, "directive 2");
    }

    #[test]
    fn artifacts_resolve_by_short_name() {
        assert_eq!("core".parse::<Artifact>().expect("core"), Artifact::Core);
        assert_eq!(
            "linkedin".parse::<Artifact>().expect("draft"),
            Artifact::Draft(Platform::Linkedin)
        );
        let err = "draft".parse::<Artifact>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown artifact 'draft' (choose from: meta, brief, core, blog, linkedin, x)"
        );
    }

    #[test]
    fn missing_artifact_reads_as_none() {
        let (_temp, store) = store();
        let run = store.create_run(&Brief::new("Missing")).expect("create");
        assert!(run.read_artifact_text(Artifact::Draft(Platform::X)).expect("read").is_none());
        assert!(run.read_artifact_text(Artifact::Meta).expect("read").is_some());
    }
}
