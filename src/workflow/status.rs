//! Workflow status step.
//!
//! Status is read-only: it reports bundle, baseline, session and config state
//! and never rewrites anything under `.context/`.
use super::{modified_stamp, ProjectContext};
use crate::cli::StatusArgs;
use crate::hashes::HashStore;
use crate::session::session_stats;
use crate::tokens::{Cl100kCounter, TokenCounter};
use crate::util::{list_files, read_text, read_text_optional};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StatusSummary {
    pub(crate) initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) bundle: Option<BundleStatus>,
    pub(crate) baseline: BaselineStatus,
    pub(crate) session: SessionStatus,
    pub(crate) adr_count: usize,
    pub(crate) cross_repo_notes: bool,
    pub(crate) config: ConfigStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct BundleStatus {
    pub(crate) path: String,
    pub(crate) tokens: usize,
    pub(crate) max_tokens: usize,
    pub(crate) over_budget: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct BaselineStatus {
    pub(crate) files: usize,
    pub(crate) stale: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct SessionStatus {
    pub(crate) notes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_save: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) task: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ConfigStatus {
    pub(crate) api_key_configured: bool,
    pub(crate) model: String,
    pub(crate) auto_refresh: bool,
    pub(crate) linked_repos: usize,
    pub(crate) compressor_configured: bool,
}

pub fn run_status(project: Option<&Path>, args: &StatusArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    let summary = status_summary(&ctx, &Cl100kCounter::load()?)?;
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }
    print_summary(&ctx, &summary);
    Ok(())
}

pub(crate) fn status_summary(
    ctx: &ProjectContext,
    counter: &dyn TokenCounter,
) -> Result<StatusSummary> {
    let config = ConfigStatus {
        api_key_configured: ctx.config.api_key().is_some(),
        model: ctx.config.model.clone(),
        auto_refresh: ctx.config.auto_refresh,
        linked_repos: ctx.config.linked_repos.len(),
        compressor_configured: ctx.config.compressor_command.is_some(),
    };
    if !ctx.is_initialized() {
        return Ok(StatusSummary {
            initialized: false,
            bundle: None,
            baseline: BaselineStatus::default(),
            session: SessionStatus::default(),
            adr_count: 0,
            cross_repo_notes: false,
            config,
        });
    }

    let paths = &ctx.paths;
    let bundle_path = paths.context_file();
    let bundle = if bundle_path.is_file() {
        let tokens = counter.count(&read_text(&bundle_path)?);
        Some(BundleStatus {
            path: bundle_path.display().to_string(),
            tokens,
            max_tokens: ctx.config.max_tokens,
            over_budget: tokens > ctx.config.max_tokens,
            updated: modified_stamp(&bundle_path),
        })
    } else {
        None
    };

    let baseline_files = list_files(&paths.baseline_dir())?;
    let store = HashStore::load(&paths.hashes_file());
    let stale = baseline_files
        .iter()
        .filter(|path| store.is_stale(path).unwrap_or(true))
        .count();

    let stats = session_stats(&read_text_optional(&paths.session_file())?);
    let task = read_text_optional(&paths.task_file())?.trim().to_string();

    let adr_count = list_files(&paths.adrs_dir())?
        .iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .count();
    let cross_repo_notes = fs::metadata(paths.cross_repo_file())
        .map(|meta| meta.len() > 0)
        .unwrap_or(false);

    Ok(StatusSummary {
        initialized: true,
        bundle,
        baseline: BaselineStatus {
            files: baseline_files.len(),
            stale,
        },
        session: SessionStatus {
            notes: stats.note_count,
            last_save: stats.last_saved,
            task: Some(task).filter(|task| !task.is_empty()),
        },
        adr_count,
        cross_repo_notes,
        config,
    })
}

fn print_summary(ctx: &ProjectContext, summary: &StatusSummary) {
    println!("Context Engine status ({})", ctx.root().display());
    if !summary.initialized {
        eprintln!("warning: not initialized; run `context init` to start");
        return;
    }

    match &summary.bundle {
        Some(bundle) => {
            println!("bundle: {}", bundle.path);
            println!("  tokens: {} / {}", bundle.tokens, bundle.max_tokens);
            if let Some(updated) = &bundle.updated {
                println!("  updated: {updated}");
            }
            if bundle.over_budget {
                eprintln!("warning: bundle exceeds max_tokens ({})", bundle.max_tokens);
            }
        }
        None => println!("bundle: not generated yet (run `context bundle`)"),
    }

    if summary.baseline.files == 0 {
        println!("baseline: no files added");
    } else {
        println!("baseline: {} file(s)", summary.baseline.files);
        if summary.baseline.stale > 0 {
            eprintln!(
                "warning: {} stale baseline file(s); see `context baseline review`",
                summary.baseline.stale
            );
        }
    }

    if summary.session.notes == 0 {
        println!("session: no notes saved");
    } else {
        println!("session: {} note(s)", summary.session.notes);
        if let Some(last) = &summary.session.last_save {
            println!("  last save: {last}");
        }
    }
    if let Some(task) = &summary.session.task {
        println!("  task: {task}");
    }

    if summary.adr_count > 0 {
        println!("adrs: {} document(s)", summary.adr_count);
    }
    if summary.cross_repo_notes {
        println!("cross-repo notes: present");
    }

    let config = &summary.config;
    println!("config:");
    println!(
        "  api key: {}",
        if config.api_key_configured {
            "configured"
        } else {
            "not set"
        }
    );
    println!("  model: {}", config.model);
    println!("  auto_refresh: {}", config.auto_refresh);
    if config.linked_repos > 0 {
        println!("  linked repos: {}", config.linked_repos);
    }
    if config.compressor_configured {
        println!("  compressor: configured");
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
