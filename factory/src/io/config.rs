//! Factory configuration stored in `content-factory.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved against the working directory.
pub const CONFIG_FILE_NAME: &str = "content-factory.toml";

/// Factory configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to values that work
/// with the `llm` command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FactoryConfig {
    /// Base directory holding one sub-directory per run.
    pub runs_dir: PathBuf,

    /// Model identifier passed to the provider and recorded in run meta.
    pub model: String,

    /// Resource override directories, checked in order before bundled defaults.
    pub resource_dirs: Vec<PathBuf>,

    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider argv. `{model}` and `{system}` are substituted per call; the
    /// user prompt is written to stdin.
    pub command: Vec<String>,

    /// Wall-clock limit for one provider call.
    pub timeout_secs: u64,

    /// Discard provider stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            command: ["llm", "--model", "{model}", "--system", "{system}"]
                .map(String::from)
                .to_vec(),
            timeout_secs: 300,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("runs"),
            model: "gpt-4o-mini".to_string(),
            resource_dirs: Vec::new(),
            provider: ProviderConfig::default(),
        }
    }
}

impl FactoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.provider.command.is_empty() || self.provider.command[0].trim().is_empty() {
            return Err(anyhow!("provider.command must be a non-empty array"));
        }
        if self.provider.timeout_secs == 0 {
            return Err(anyhow!("provider.timeout_secs must be > 0"));
        }
        if self.provider.output_limit_bytes == 0 {
            return Err(anyhow!("provider.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FactoryConfig::default()`.
pub fn load_config(path: &Path) -> Result<FactoryConfig> {
    if !path.exists() {
        let cfg = FactoryConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FactoryConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FactoryConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "model = \"gpt-4o\"\nresource_dirs = [\"private\"]\n\n[provider]\ntimeout_secs = 30\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.resource_dirs, vec![PathBuf::from("private")]);
        assert_eq!(cfg.provider.timeout_secs, 30);
        assert_eq!(cfg.provider.command, ProviderConfig::default().command);
        assert_eq!(cfg.runs_dir, PathBuf::from("runs"));
    }

    #[test]
    fn rejects_empty_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[provider]\ncommand = []\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("provider.command"));
    }
}
