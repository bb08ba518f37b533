//! Config and pull-cross commands.
use super::ProjectContext;
use crate::cli::ConfigCommand;
use crate::config::{parse_value, write_config};
use crate::cross_repo::{pull_cross, SkipReason};
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::path::Path;

pub fn run_config(project: Option<&Path>, command: &ConfigCommand) -> Result<()> {
    let mut ctx = ProjectContext::load(project)?;
    match command {
        ConfigCommand::Show => {
            let text =
                serde_json::to_string_pretty(&redacted_view(&ctx)?).context("serialize config")?;
            println!("{text}");
        }
        ConfigCommand::Path => println!("{}", ctx.paths.config_file().display()),
        ConfigCommand::Get { key } => match ctx.config.get(key, Value::Null) {
            Value::Null => return Err(anyhow!("config key {key:?} is not set")),
            Value::String(text) => println!("{text}"),
            other => println!("{other}"),
        },
        ConfigCommand::Set { key, value } => {
            ctx.require_initialized()?;
            ctx.config.set(key, parse_value(value))?;
            write_config(&ctx.paths, &ctx.config)?;
            println!("set {key}");
        }
        ConfigCommand::Unset { key } => {
            ctx.require_initialized()?;
            if ctx.config.unset(key)? {
                write_config(&ctx.paths, &ctx.config)?;
                println!("unset {key}");
            } else {
                println!("{key} was not set");
            }
        }
    }
    Ok(())
}

/// The effective config with the API key masked.
fn redacted_view(ctx: &ProjectContext) -> Result<Value> {
    let mut value = serde_json::to_value(&ctx.config).context("serialize config")?;
    if let Some(key) = value.get_mut("openrouter_api_key") {
        if key.as_str().is_some_and(|text| !text.is_empty()) {
            *key = Value::String("[configured]".to_string());
        }
    }
    Ok(value)
}

pub fn run_pull_cross(project: Option<&Path>) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    if ctx.config.linked_repos.is_empty() {
        println!("No linked repositories configured");
        println!("add them with `context config set linked_repos '[\"../other-repo\"]'`");
        return Ok(());
    }

    let report = pull_cross(&ctx.paths, &ctx.config.linked_repos)?;
    for (repo, reason) in &report.skipped {
        let why = match reason {
            SkipReason::RepoMissing => "repo not found".to_string(),
            SkipReason::NoNotes => "no .context/cross_repo.md".to_string(),
            SkipReason::EmptyNotes => "cross_repo.md is empty".to_string(),
            SkipReason::Unreadable(err) => format!("unreadable: {err}"),
        };
        eprintln!("skipped {}: {why}", repo.display());
    }
    for name in &report.pulled {
        println!("pulled from {name}");
    }
    match &report.written {
        Some(path) => println!(
            "pulled notes from {} repo(s) into {}",
            report.pulled.len(),
            path.display()
        ),
        None => println!("No cross-repo notes found in linked repositories"),
    }
    Ok(())
}
