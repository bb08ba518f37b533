//! Bundle and expand commands.
use super::ProjectContext;
use crate::bundle::{append_expanded, renderer_for, skeleton, Assembler, BundleReport};
use crate::cli::{BundleArgs, ExpandArgs};
use crate::collect::SectionCollector;
use crate::config::CompressionRules;
use crate::guard::file_name;
use crate::normalize::{
    compress_code, compress_whitespace, is_config_file, strip_comments, summarize_config, Language,
};
use crate::redact::Redactor;
use crate::tokens::{Cl100kCounter, TokenCounter};
use crate::util::{read_text, read_text_optional, write_atomic};
use anyhow::{anyhow, Result};
use std::path::Path;

const PLAIN_PREVIEW_LINES: usize = 50;
const NO_SUMMARY: &str = "(no summary)";
/// Entries sit under `### <name>`; deeper headings keep them from reading as
/// bundle sections.
const ENTRY_HEADING_FLOOR: usize = 4;

pub fn run_bundle(project: Option<&Path>, args: &BundleArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let report = build_bundle(&ctx, !args.no_ai)?;
    print_report(&ctx, &report);
    Ok(())
}

/// Collect, assemble and write the bundle.
pub(crate) fn build_bundle(ctx: &ProjectContext, use_ai: bool) -> Result<BundleReport> {
    let redactor = ctx.redactor();
    let rules = &ctx.config.compression_rules;
    let sections = SectionCollector::new(&ctx.paths, rules, &redactor).collect()?;
    let counter = Cl100kCounter::load()?;
    let renderer = renderer_for(&ctx.config, use_ai);
    let report = Assembler::new(&redactor, rules, &counter, ctx.config.max_tokens)
        .assemble(&sections, renderer.as_ref())?;
    write_atomic(&ctx.paths.context_file(), report.document.as_bytes())?;
    Ok(report)
}

fn print_report(ctx: &ProjectContext, report: &BundleReport) {
    if let Some(reason) = &report.fallback_reason {
        eprintln!("warning: delegated bundle failed ({reason}); used manual template");
    }
    println!(
        "wrote {} ({} renderer)",
        ctx.paths.context_file().display(),
        report.renderer
    );
    println!("tokens: {} / {}", report.token_count, report.budget);
    if report.over_budget() {
        eprintln!(
            "warning: bundle is {} tokens over budget; trim baseline files or session notes",
            report.overage()
        );
    }
}

pub fn run_expand(project: Option<&Path>, args: &ExpandArgs) -> Result<()> {
    let ctx = ProjectContext::load(project)?;
    ctx.require_initialized()?;
    let policy = ctx.file_policy();
    let redactor = ctx.redactor();

    let mut entries = Vec::new();
    for file in &args.files {
        let summarized = policy
            .validate(file, ctx.root())
            .map_err(anyhow::Error::from)
            .and_then(|path| {
                let text = read_text(&path)?;
                Ok((
                    file_name(&path),
                    summarize_for_expand(&path, &text, &redactor, &ctx.config.compression_rules),
                ))
            });
        match summarized {
            Ok((name, summary)) => {
                println!("expanded {name}");
                entries.push(format!("### {name}\n{summary}"));
            }
            Err(err) => eprintln!("skipped {}: {err:#}", file.display()),
        }
    }
    if entries.is_empty() {
        return Err(anyhow!("no files expanded"));
    }

    let bundle_path = ctx.paths.context_file();
    let existing = read_text_optional(&bundle_path)?;
    let mut document = if existing.trim().is_empty() {
        skeleton()
    } else {
        existing
    };
    for entry in &entries {
        document = append_expanded(&document, entry);
    }
    write_atomic(&bundle_path, document.as_bytes())?;

    let tokens = Cl100kCounter::load()?.count(&document);
    println!(
        "appended {} file(s) to {} ({tokens} tokens)",
        entries.len(),
        bundle_path.display()
    );
    if tokens > ctx.config.max_tokens {
        eprintln!(
            "warning: bundle is {} tokens over budget",
            tokens - ctx.config.max_tokens
        );
    }
    Ok(())
}

/// Summary text for one expanded file, already redacted.
pub(crate) fn summarize_for_expand(
    path: &Path,
    text: &str,
    redactor: &Redactor,
    rules: &CompressionRules,
) -> String {
    let redacted = redactor.redact(text);
    let language = Language::from_path(path);
    let summary = if language.is_code() {
        if rules.keep_docstrings {
            compress_code(&redacted, language)
        } else {
            compress_whitespace(&strip_comments(&redacted, language))
        }
    } else if is_config_file(path) {
        summarize_config(&redacted, redactor)
    } else {
        redacted
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(PLAIN_PREVIEW_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    };
    let summary = demote_headings(summary.trim());
    if summary.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        summary
    }
}

/// Rewrite markdown headings shallower than the entry floor as floor-level
/// headings.
fn demote_headings(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let level = trimmed.chars().take_while(|&ch| ch == '#').count();
            let rest = &trimmed[level..];
            if level > 0
                && level < ENTRY_HEADING_FLOOR
                && (rest.is_empty() || rest.starts_with(' '))
            {
                format!("{}{rest}", "#".repeat(ENTRY_HEADING_FLOOR))
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
