//! CLI argument parsing for the context workflow.
//!
//! Every command operates on one project root (`--project`, default the
//! current directory) and its `.context/` directory.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "context",
    version,
    about = "Assemble a bounded, secret-free context bundle for AI coding tools",
    after_help = "Examples:\n  context init\n  context baseline add docs/architecture.md config/settings.toml\n  context save \"switched auth to oauth\"\n  context bundle --no-ai\n  context expand src/auth.py\n  context status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Project root containing `.context/`
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Emit debug logging on stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    /// Manage tracked baseline files
    #[command(subcommand)]
    Baseline(BaselineCommand),
    Bundle(BundleArgs),
    Expand(ExpandArgs),
    Save(SaveArgs),
    SessionEnd(SessionEndArgs),
    StartSession(TaskArgs),
    UpdateTask(TaskArgs),
    /// Show the task bound to the current session
    ShowTask,
    /// Clear the current task
    StopSession,
    /// Pull cross_repo.md notes from linked repositories
    PullCross,
    Compress(CompressArgs),
    Status(StatusArgs),
    /// Inspect or edit .context/config.json
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
#[command(about = "Create .context/ with default config, session files and a sample ADR")]
pub struct InitArgs {
    /// Overwrite an existing config.json with defaults
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum BaselineCommand {
    /// Copy files into the baseline and record their hashes
    Add {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// List baseline files with their sizes
    List,
    /// Flag baseline files whose live source has changed
    Review,
}

#[derive(Parser, Debug)]
#[command(about = "Regenerate context_for_ai.md from baseline, session and cross-repo notes")]
pub struct BundleArgs {
    /// Always use the manual template, even with an API key configured
    #[arg(long)]
    pub no_ai: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Append compressed summaries of files under Expanded Files")]
pub struct ExpandArgs {
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Save a timestamped note to the session")]
pub struct SaveArgs {
    pub note: String,
}

#[derive(Parser, Debug)]
#[command(about = "Mark the end of the session")]
pub struct SessionEndArgs {
    /// Regenerate the bundle afterwards
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Bind a task to the session; compresses the baseline when a compressor is configured")]
pub struct TaskArgs {
    /// Description of the task being worked on
    #[arg(long)]
    pub task: String,
}

#[derive(Parser, Debug)]
#[command(about = "Compress baseline files with the configured external compressor")]
pub struct CompressArgs {
    /// Fraction of tokens to keep (0.0 to 1.0)
    #[arg(long, default_value_t = 0.5)]
    pub rate: f64,

    /// Focus query; defaults to the current task
    #[arg(long)]
    pub query: Option<String>,

    /// Extra instruction passed to the compressor
    #[arg(long)]
    pub instruction: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize bundle, baseline, session and configuration state")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Print one key
    Get { key: String },
    /// Set a key; the value is parsed as JSON when possible
    Set { key: String, value: String },
    /// Remove a key, restoring its default
    Unset { key: String },
}
