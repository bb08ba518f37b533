//! `context`: assemble a bounded, secret-free context bundle for AI coding
//! tools from a project's `.context/` directory.
mod bundle;
mod cli;
mod collect;
mod compress;
mod config;
mod cross_repo;
mod guard;
mod hashes;
mod normalize;
mod redact;
mod session;
mod tokens;
mod util;
mod workflow;

use anyhow::Result;
use clap::Parser;
use cli::{Command, RootArgs};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let project = args.project.as_deref();
    match &args.command {
        Command::Init(init) => workflow::run_init(project, init),
        Command::Baseline(command) => workflow::run_baseline(project, command),
        Command::Bundle(bundle) => workflow::run_bundle(project, bundle),
        Command::Expand(expand) => workflow::run_expand(project, expand),
        Command::Save(save) => workflow::run_save(project, save),
        Command::SessionEnd(end) => workflow::run_session_end(project, end),
        Command::StartSession(task) => workflow::run_start_session(project, task),
        Command::UpdateTask(task) => workflow::run_update_task(project, task),
        Command::ShowTask => workflow::run_show_task(project),
        Command::StopSession => workflow::run_stop_session(project),
        Command::PullCross => workflow::run_pull_cross(project),
        Command::Compress(compress) => workflow::run_compress(project, compress),
        Command::Status(status) => workflow::run_status(project, status),
        Command::Config(command) => workflow::run_config(project, command),
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
