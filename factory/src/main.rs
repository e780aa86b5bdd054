//! `cf`: reproducible content-writing pipeline.
//!
//! A run lives in `{runs_dir}/{timestamp}_{slug}/`. `cf generate` creates it
//! from a brief, `cf core` synthesizes the content core, `cf render` produces
//! platform drafts, and `cf patch` applies directive-driven edits with
//! versioned backups.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factory::core::lifecycle::RunStatus;
use factory::core::types::Platform;
use factory::exit_codes;
use factory::io::brief::load_brief_file;
use factory::io::config::{CONFIG_FILE_NAME, FactoryConfig, load_config};
use factory::io::init::{InitAction, InitOptions, init_workspace};
use factory::io::provider::CommandProvider;
use factory::io::resources::ResourceChain;
use factory::io::run_store::{Artifact, RunHandle, RunStore};
use factory::stages::StageError;
use factory::workflow::{self, StageContext};

/// Environment variable naming a private resource directory checked before
/// configured and bundled resources.
const PRIVATE_DIR_ENV: &str = "CONTENT_FACTORY_PRIVATE_DIR";

#[derive(Parser)]
#[command(
    name = "cf",
    version,
    about = "Reproducible content-writing pipeline: brief -> core -> drafts -> patches"
)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Base directory for runs (overrides `runs_dir` from config).
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a starter brief and style profile.
    Init {
        /// Directory to write into.
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Create a run from a brief file (TOML, or JSON by extension).
    Generate { brief: PathBuf },
    /// List recent runs, newest first.
    List {
        #[arg(short, default_value_t = 20)]
        n: usize,
    },
    /// Print one artifact of a run.
    Show {
        run: String,
        /// meta, brief, core, blog, linkedin, or x.
        #[arg(short, long, default_value = "meta")]
        artifact: String,
    },
    /// Summarize a run's lifecycle state and artifacts.
    Status { run: String },
    /// Check the brief, then synthesize the content core.
    Core {
        run: String,
        #[arg(long)]
        skip_clarify: bool,
        #[arg(long)]
        model: Option<String>,
    },
    /// Append answers to the brief's context notes.
    Clarify {
        run: String,
        #[arg(short, long)]
        message: String,
    },
    /// Render a platform draft from the content core.
    Render {
        run: String,
        #[arg(short, long, default_value = "linkedin")]
        platform: Platform,
        #[arg(long)]
        model: Option<String>,
    },
    /// Rewrite a draft according to a directive.
    Patch {
        run: String,
        #[arg(short, long)]
        platform: Platform,
        /// The edit to apply.
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        model: Option<String>,
    },
}

fn main() {
    factory::logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("error: {err:#}");
            if err.downcast_ref::<StageError>().is_some() {
                exit_codes::STAGE_FAILED
            } else {
                exit_codes::INVALID
            }
        }
    };
    process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let store = RunStore::new(cli.output.clone().unwrap_or_else(|| config.runs_dir.clone()));

    match cli.command {
        Command::Init { dir, force } => cmd_init(&dir, force),
        Command::Generate { brief } => cmd_generate(&store, &brief),
        Command::List { n } => cmd_list(&store, n),
        Command::Show { run, artifact } => cmd_show(&store, &run, &artifact),
        Command::Status { run } => cmd_status(&store, &run),
        Command::Core {
            run,
            skip_clarify,
            model,
        } => {
            let run = store.open(&run)?;
            let (provider, resources) = stage_deps(&config, model)?;
            let ctx = StageContext::new(&provider, &resources);
            let outcome = workflow::generate_core(&run, &ctx, skip_clarify)?;
            if let Some(warning) = &outcome.clarify_warning {
                eprintln!("warning: clarification analysis failed: {warning}");
            }
            println!("core written: {}", run.artifact_path(Artifact::Core).display());
            let questions = outcome.questions();
            if !questions.is_empty() {
                println!("clarification recommended:");
                for (i, question) in questions.iter().enumerate() {
                    println!("  {}. {question}", i + 1);
                }
            }
            print_next(&run, outcome.status);
            Ok(())
        }
        Command::Clarify { run, message } => {
            let run = store.open(&run)?;
            let status = workflow::answer_clarification(&run, &message)?;
            println!("context updated for {}", run.id());
            print_next(&run, status);
            Ok(())
        }
        Command::Render {
            run,
            platform,
            model,
        } => {
            let run = store.open(&run)?;
            let (provider, resources) = stage_deps(&config, model)?;
            let ctx = StageContext::new(&provider, &resources);
            let outcome = workflow::render_draft(&run, &ctx, platform)?;
            if let Some(backup) = &outcome.backup {
                println!("previous draft saved: {}", backup.display());
            }
            println!(
                "draft written: {} ({} chars)",
                outcome.draft_path.display(),
                outcome.chars
            );
            print_next(&run, run.load_meta()?.status);
            Ok(())
        }
        Command::Patch {
            run,
            platform,
            message,
            model,
        } => {
            let run = store.open(&run)?;
            let (provider, resources) = stage_deps(&config, model)?;
            let ctx = StageContext::new(&provider, &resources);
            let outcome = workflow::patch_draft(&run, &ctx, platform, &message)?;
            println!(
                "patch {:03} applied: {} (previous version: {})",
                outcome.patch_number,
                outcome.draft_path.display(),
                outcome.backup.display()
            );
            if !outcome.changelog.is_empty() {
                println!("changelog:\n{}", outcome.changelog);
            }
            print_next(&run, run.load_meta()?.status);
            Ok(())
        }
    }
}

/// Provider and resource chain for stage-running commands.
fn stage_deps(
    config: &FactoryConfig,
    model: Option<String>,
) -> Result<(CommandProvider, ResourceChain)> {
    let model = model.unwrap_or_else(|| config.model.clone());
    let provider = CommandProvider::new(&config.provider, model)?;

    let mut dirs = Vec::with_capacity(config.resource_dirs.len() + 1);
    if let Some(private) = env::var_os(PRIVATE_DIR_ENV).filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(private));
    }
    dirs.extend(config.resource_dirs.iter().cloned());
    Ok((provider, ResourceChain::new(dirs)))
}

fn cmd_init(dir: &Path, force: bool) -> Result<()> {
    for action in init_workspace(dir, &InitOptions { force })? {
        match action {
            InitAction::Created(path) => println!("created: {}", path.display()),
            InitAction::Skipped(path) => println!(
                "skipped: {} already exists (use --force to overwrite)",
                path.display()
            ),
        }
    }
    println!("next: edit brief.toml, then run `cf generate brief.toml`");
    Ok(())
}

fn cmd_generate(store: &RunStore, brief_path: &Path) -> Result<()> {
    let brief = load_brief_file(brief_path)?;
    let run = workflow::create_run(store, &brief)?;
    println!("{}", run.id());
    print_next(&run, run.load_meta()?.status);
    Ok(())
}

fn cmd_list(store: &RunStore, n: usize) -> Result<()> {
    let runs = store.list_runs(n)?;
    if runs.is_empty() {
        eprintln!("no runs found in {}", store.base_dir().display());
    }
    for run in runs {
        println!("{run}");
    }
    Ok(())
}

fn cmd_show(store: &RunStore, run_id: &str, artifact: &str) -> Result<()> {
    let artifact: Artifact = artifact.parse()?;
    let run = store.open(run_id)?;
    let text = run
        .read_artifact_text(artifact)?
        .with_context(|| format!("artifact not found: {}", run.artifact_path(artifact).display()))?;
    println!("{}", text.trim_end());
    Ok(())
}

fn cmd_status(store: &RunStore, run_id: &str) -> Result<()> {
    let run = store.open(run_id)?;
    let meta = run.load_meta()?;
    println!("run: {}", meta.run_id);
    println!("topic: {}", meta.topic);
    println!("status: {}", meta.status);
    if let Some(model) = &meta.model {
        println!("model: {model}");
    }
    if meta.needs_clarification {
        println!("needs clarification: yes");
    }
    if let Some(message) = &meta.error_message {
        println!("error: {message}");
    }
    println!("updated: {}", meta.updated_at);
    for platform in Platform::ALL {
        if run.load_draft(platform)?.is_none() {
            continue;
        }
        println!(
            "{platform}: draft, {} backups, {} patches",
            run.versions(platform)?.len(),
            run.patch_records(platform)?.len()
        );
    }
    print_next(&run, meta.status);
    Ok(())
}

fn print_next(run: &RunHandle, status: RunStatus) {
    println!("next: {}", status.next_step(run.id()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_patch_requires_platform_and_message() {
        let cli = Cli::parse_from(["cf", "patch", "run-1", "-p", "linkedin", "-m", "shorter"]);
        match cli.command {
            Command::Patch {
                run,
                platform,
                message,
                model,
            } => {
                assert_eq!(run, "run-1");
                assert_eq!(platform, Platform::Linkedin);
                assert_eq!(message, "shorter");
                assert!(model.is_none());
            }
            _ => panic!("expected patch"),
        }
        assert!(Cli::try_parse_from(["cf", "patch", "run-1", "-m", "shorter"]).is_err());
    }

    #[test]
    fn parse_render_defaults_to_linkedin() {
        let cli = Cli::parse_from(["cf", "render", "run-1", "--model", "gpt-4o", "-o", "out"]);
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(matches!(
            cli.command,
            Command::Render {
                platform: Platform::Linkedin,
                model: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn parse_rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["cf", "render", "run-1", "-p", "tiktok"]).is_err());
    }

    #[test]
    fn parse_core_flags() {
        let cli = Cli::parse_from(["cf", "core", "run-1", "--skip-clarify"]);
        assert!(matches!(
            cli.command,
            Command::Core {
                skip_clarify: true,
                ..
            }
        ));
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
    }
}
