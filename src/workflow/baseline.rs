//! Baseline commands: add, list and review tracked reference copies.
use super::ProjectContext;
use crate::cli::BaselineCommand;
use crate::guard::{file_name, FilePolicy};
use crate::hashes::HashStore;
use crate::util::{list_files, write_atomic};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn run_baseline(project: Option<&Path>, command: &BaselineCommand) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    match command {
        BaselineCommand::Add { files } => add(&ctx, files),
        BaselineCommand::List => list(&ctx),
        BaselineCommand::Review => review(&ctx),
    }
}

fn add(ctx: &ProjectContext, files: &[PathBuf]) -> Result<()> {
    let policy = ctx.file_policy();
    let hashes_file = ctx.paths.hashes_file();
    let mut store = HashStore::load(&hashes_file);
    let mut added = 0usize;

    for file in files {
        match add_one(ctx, &policy, &mut store, file) {
            Ok(dest) => {
                added += 1;
                println!("added {}", file_name(&dest));
            }
            Err(err) => eprintln!("skipped {}: {err:#}", file.display()),
        }
    }

    if added > 0 {
        store.save(&hashes_file)?;
    }
    println!("{added} of {} file(s) added to baseline", files.len());
    if added == 0 {
        return Err(anyhow!("no files added to baseline"));
    }
    Ok(())
}

fn add_one(
    ctx: &ProjectContext,
    policy: &FilePolicy,
    store: &mut HashStore,
    file: &Path,
) -> Result<PathBuf> {
    let source = policy.validate(file, ctx.root())?;
    let dest = ctx.paths.baseline_dir().join(file_name(&source));
    let bytes = fs::read(&source).with_context(|| format!("read {}", source.display()))?;
    write_atomic(&dest, &bytes)?;
    store.record_with_source(&dest, &source)?;
    tracing::debug!(source = %source.display(), dest = %dest.display(), "baseline file recorded");
    Ok(dest)
}

fn list(ctx: &ProjectContext) -> Result<()> {
    let files = list_files(&ctx.paths.baseline_dir())?;
    if files.is_empty() {
        println!("No baseline files (add some with `context baseline add <files>`)");
        return Ok(());
    }
    println!("Baseline files:");
    for path in files {
        let size = fs::metadata(&path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        println!("  {}  {:.1} KB", file_name(&path), size as f64 / 1024.0);
    }
    Ok(())
}

fn review(ctx: &ProjectContext) -> Result<()> {
    let files = list_files(&ctx.paths.baseline_dir())?;
    if files.is_empty() {
        println!("No baseline files to review");
        return Ok(());
    }
    let store = HashStore::load(&ctx.paths.hashes_file());
    if store.is_empty() {
        println!("No recorded hashes; every file reports as current");
    }
    let mut stale = 0usize;
    for path in &files {
        let name = file_name(path);
        let modified = modified_stamp(path).unwrap_or_else(|| "unknown".to_string());
        match store.is_stale(path) {
            Ok(true) => {
                stale += 1;
                println!("  [stale] {name} (modified {modified})");
            }
            Ok(false) => println!("  [ok]    {name} (modified {modified})"),
            Err(err) => eprintln!("  [error] {name}: {err:#}"),
        }
    }
    if stale > 0 {
        println!("{stale} stale file(s); re-add them with `context baseline add <files>`");
    } else {
        println!("All baseline files are current");
    }
    Ok(())
}

pub(crate) fn modified_stamp(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let local: chrono::DateTime<chrono::Local> = modified.into();
    Some(local.format("%Y-%m-%d %H:%M:%S").to_string())
}
