//! Session commands: notes, session end and the current task.
use super::{build_bundle, compress_baseline, ProjectContext};
use crate::cli::{SaveArgs, SessionEndArgs, TaskArgs};
use crate::compress::CompressRequest;
use crate::session::{append_note, end_session, SessionContext};
use anyhow::Result;
use std::path::Path;

const TASK_COMPRESSION_RATE: f64 = 0.5;

pub fn run_save(project: Option<&Path>, args: &SaveArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let stored = append_note(&ctx.paths, &args.note, ctx.config.note_max_length)?;
    println!("saved note to {}", ctx.paths.session_file().display());
    println!("note: {stored}");
    Ok(())
}

pub fn run_session_end(project: Option<&Path>, args: &SessionEndArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let stamp = end_session(&ctx.paths)?;
    println!("session ended at {stamp}");

    if args.refresh || ctx.config.auto_refresh {
        println!("refreshing context bundle...");
        let report = build_bundle(&ctx, true)?;
        if let Some(reason) = &report.fallback_reason {
            eprintln!("warning: delegated bundle failed ({reason}); used manual template");
        }
        println!(
            "wrote {} ({} tokens, {} renderer)",
            ctx.paths.context_file().display(),
            report.token_count,
            report.renderer
        );
    } else {
        println!("tip: run `context bundle` to refresh context for the next session");
    }
    Ok(())
}

pub fn run_start_session(project: Option<&Path>, args: &TaskArgs) -> Result<()> {
    bind_task(project, args, "started session")
}

pub fn run_update_task(project: Option<&Path>, args: &TaskArgs) -> Result<()> {
    bind_task(project, args, "updated task")
}

fn bind_task(project: Option<&Path>, args: &TaskArgs, verb: &str) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let mut session = SessionContext::load(&ctx.paths);
    if let Some(previous) = session.set_task(&args.task)? {
        println!("previous task: {previous}");
    }
    let task = session.task().unwrap_or_default().to_string();
    println!("{verb}: {task}");

    if ctx.config.compressor_command.is_none() {
        println!("tip: set compressor_command to compress the baseline around the task");
        return Ok(());
    }
    let request = CompressRequest::new(TASK_COMPRESSION_RATE, Some(task), None)?;
    let summary = compress_baseline(&ctx, &request)?;
    tracing::info!(
        compressed = summary.compressed,
        failed = summary.failed,
        "task-focused baseline compression finished"
    );
    Ok(())
}

pub fn run_show_task(project: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    match SessionContext::load(&ctx.paths).task() {
        Some(task) => println!("current task: {task}"),
        None => println!("no task set (use `context start-session --task <description>`)"),
    }
    Ok(())
}

pub fn run_stop_session(project: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let mut session = SessionContext::load(&ctx.paths);
    if let Some(task) = session.clear()? {
        println!("stopping session for task: {task}");
    }
    println!("session stopped and task cleared");
    Ok(())
}
