//! Compress command: run the external compressor over baseline files.
use super::ProjectContext;
use crate::cli::CompressArgs;
use crate::compress::{compress_with_timeout, CodeCompressor, CommandCompressor, CompressRequest};
use crate::guard::file_name;
use crate::session::SessionContext;
use crate::tokens::{Cl100kCounter, TokenCounter};
use crate::util::{list_files, read_text, write_atomic};
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const COMPRESSED_PREFIX: &str = "compressed_";
const DEFAULT_QUERY: &str = "Summarize for AI context";
const DEFAULT_INSTRUCTION: &str = "Focus on essential information for AI understanding.";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CompressSummary {
    pub(crate) compressed: usize,
    pub(crate) failed: usize,
    pub(crate) original_tokens: usize,
    pub(crate) compressed_tokens: usize,
}

pub fn run_compress(project: Option<&Path>, args: &CompressArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let session = SessionContext::load(&ctx.paths);
    let query = args
        .query
        .clone()
        .or_else(|| session.task().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_QUERY.to_string());
    let instruction = args
        .instruction
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string());
    let request = CompressRequest::new(args.rate, Some(query), Some(instruction))?;

    let summary = compress_baseline(&ctx, &request)?;
    if summary.compressed == 0 && summary.failed > 0 {
        return Err(anyhow!("no files were compressed"));
    }
    Ok(())
}

/// Compress every baseline file that is not itself a compressed output.
/// Per-file failures are reported and counted; the batch always finishes.
pub(crate) fn compress_baseline(
    ctx: &ProjectContext,
    request: &CompressRequest,
) -> Result<CompressSummary> {
    let command = ctx.config.compressor_command.as_deref().ok_or_else(|| {
        anyhow!(
            "no compressor configured (e.g. `context config set compressor_command \"longcodezip --rate {{rate}}\"`)"
        )
    })?;
    let timeout = Duration::from_secs(ctx.config.compressor_timeout_secs);
    let compressor: Arc<dyn CodeCompressor> =
        Arc::new(CommandCompressor::from_command(command, timeout)?);

    let files: Vec<_> = list_files(&ctx.paths.baseline_dir())?
        .into_iter()
        .filter(|path| !file_name(path).starts_with(COMPRESSED_PREFIX))
        .collect();
    let mut summary = CompressSummary::default();
    if files.is_empty() {
        println!("No baseline files to compress (add some with `context baseline add <files>`)");
        return Ok(summary);
    }

    let counter = Cl100kCounter::load()?;
    println!(
        "compressing {} file(s) with {} (rate {})",
        files.len(),
        compressor.name(),
        request.rate
    );
    for path in files {
        let name = file_name(&path);
        let code = match read_text(&path) {
            Ok(code) => code,
            Err(err) => {
                summary.failed += 1;
                eprintln!("failed {name}: {err:#}");
                continue;
            }
        };
        let before = counter.count(&code);
        match compress_with_timeout(compressor.clone(), code, request.clone(), timeout) {
            Ok(output) => {
                let target = ctx
                    .paths
                    .baseline_dir()
                    .join(format!("{COMPRESSED_PREFIX}{name}"));
                if let Err(err) = write_atomic(&target, output.as_bytes()) {
                    summary.failed += 1;
                    eprintln!("failed {name}: {err:#}");
                    continue;
                }
                let after = counter.count(&output);
                summary.compressed += 1;
                summary.original_tokens += before;
                summary.compressed_tokens += after;
                println!("compressed {name}: {before} -> {after} tokens");
            }
            Err(err) => {
                summary.failed += 1;
                tracing::warn!(file = %name, error = %err, "compression failed");
                eprintln!("failed {name}: {err}");
            }
        }
    }

    if summary.compressed > 0 {
        let ratio = summary.compressed_tokens as f64 / summary.original_tokens.max(1) as f64;
        println!(
            "{} file(s) compressed: {} -> {} tokens ({:.1}% of original)",
            summary.compressed,
            summary.original_tokens,
            summary.compressed_tokens,
            ratio * 100.0
        );
    }
    if summary.failed > 0 {
        println!("{} file(s) failed", summary.failed);
    }
    Ok(summary)
}
