//! Workflow init step.
//!
//! Init is idempotent: directories and empty session files are created when
//! missing, existing notes and ADRs are never touched.
use super::ProjectContext;
use crate::cli::InitArgs;
use crate::config::{write_config, ContextConfig, ContextPaths};
use crate::util::write_atomic;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

const SAMPLE_ADR_NAME: &str = "001-context-engine.md";

const SAMPLE_ADR: &str = "# ADR-001: Context Engine Adoption

## Status
Accepted

## Context
AI coding sessions start cold and spend tokens rediscovering the project.

## Decision
Keep a curated baseline, session notes and cross-repo notes under `.context/`
and hand assistants the generated `context_for_ai.md` bundle.

## Consequences
- Smaller, repeatable session warm-up
- Notes carry over between sessions
- The bundle is only as good as the baseline it is built from
";

/// Create the `.context/` layout, default config and sample ADR.
pub fn run_init(project: Option<&Path>, args: &InitArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    let paths = &ctx.paths;
    scaffold(paths)?;

    let config_path = paths.config_file();
    if !config_path.is_file() || args.force {
        write_config(paths, &ContextConfig::default())?;
        println!("wrote {}", config_path.display());
    } else {
        // Re-save so newly added keys show up with their defaults.
        write_config(paths, &ctx.config)?;
    }

    println!("Initialized Context Engine in {}", paths.context_dir().display());
    println!();
    println!("Next steps:");
    println!("  1. Add baseline files: context baseline add <files>");
    println!("  2. Bundle context:     context bundle");
    println!();
    println!("AI tool prompt:");
    println!("  Load .context/context_for_ai.md and continue working on current session");
    Ok(())
}

pub(crate) fn scaffold(paths: &ContextPaths) -> Result<()> {
    for dir in [paths.context_dir(), paths.baseline_dir(), paths.adrs_dir()] {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    for file in [paths.session_file(), paths.cross_repo_file()] {
        if !file.exists() {
            write_atomic(&file, b"")?;
        }
    }
    let adr = paths.adrs_dir().join(SAMPLE_ADR_NAME);
    if !adr.exists() {
        write_atomic(&adr, SAMPLE_ADR.as_bytes())?;
    }
    tracing::debug!(root = %paths.project_root().display(), "scaffolded .context");
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
