//! Bundle assembly: prepared sections rendered into one fixed-order document.
//!
//! Every section goes through redact, then whitespace compression, then
//! deduplication before any renderer sees it. Rendering is pluggable: the
//! manual renderer fills a fixed template, the delegated renderer asks a
//! hosted model to condense the same prepared sections. The token budget is
//! advisory; documents over budget are still written in full.
mod delegated;

pub use delegated::DelegatedRenderer;

use crate::collect::{split_expanded, Section, Sections};
use crate::config::{CompressionRules, ContextConfig};
use crate::normalize::{compress_whitespace, deduplicate_content};
use crate::redact::Redactor;
use crate::tokens::TokenCounter;
use anyhow::Result;
use std::time::Instant;

pub const TITLE: &str = "# Project Context for AI Tools";
pub const GENERATOR_MARKER: &str = "*Generated by Context Engine V1*";
/// Body written for a section with no content.
pub const EMPTY_SECTION: &str = "None";

pub trait BundleRenderer {
    fn name(&self) -> &'static str;
    fn render(&self, sections: &Sections) -> Result<String>;
}

/// Fixed template: title, marker, then every heading in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualRenderer;

impl BundleRenderer for ManualRenderer {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn render(&self, sections: &Sections) -> Result<String> {
        Ok(render_manual(sections))
    }
}

pub fn render_manual(sections: &Sections) -> String {
    let mut lines: Vec<String> = vec![format!("{TITLE}\n"), format!("{GENERATOR_MARKER}\n")];
    for (index, (section, body)) in sections.iter().enumerate() {
        let lead = if index == 0 { "" } else { "\n" };
        lines.push(format!("{lead}## {}\n", section.heading()));
        lines.push(section_body(body).to_string());
    }
    lines.join("\n")
}

fn section_body(body: &str) -> &str {
    if body.trim().is_empty() {
        EMPTY_SECTION
    } else {
        body
    }
}

/// Pick the renderer for a bundle run. The delegated renderer needs both the
/// caller's consent and an API key.
pub fn renderer_for(config: &ContextConfig, use_ai: bool) -> Box<dyn BundleRenderer> {
    match config.api_key() {
        Some(api_key) if use_ai => Box::new(DelegatedRenderer::new(api_key, config.model.clone())),
        _ => Box::new(ManualRenderer),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub document: String,
    pub token_count: usize,
    pub budget: usize,
    pub renderer: &'static str,
    /// Why the requested renderer was abandoned for the manual one.
    pub fallback_reason: Option<String>,
}

impl BundleReport {
    pub fn over_budget(&self) -> bool {
        self.token_count > self.budget
    }

    pub fn overage(&self) -> usize {
        self.token_count.saturating_sub(self.budget)
    }
}

pub struct Assembler<'a> {
    redactor: &'a Redactor,
    rules: &'a CompressionRules,
    counter: &'a dyn TokenCounter,
    budget: usize,
}

impl<'a> Assembler<'a> {
    pub fn new(
        redactor: &'a Redactor,
        rules: &'a CompressionRules,
        counter: &'a dyn TokenCounter,
        budget: usize,
    ) -> Self {
        Self {
            redactor,
            rules,
            counter,
            budget,
        }
    }

    /// Redact, whitespace-compress and deduplicate one section body; empty
    /// results become the placeholder.
    pub fn prepare_body(&self, raw: &str) -> String {
        let redacted = self.redactor.redact_with_report(raw);
        if redacted.total() > 0 {
            tracing::debug!(masked = redacted.total(), "redacted secrets in section");
        }
        let mut text = redacted.text;
        if self.rules.remove_blank_lines {
            text = compress_whitespace(&text);
        }
        if self.rules.deduplicate {
            text = deduplicate_content(&text);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            EMPTY_SECTION.to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn prepare(&self, sections: &Sections) -> Sections {
        let mut prepared = Sections::default();
        for (section, raw) in sections.iter() {
            prepared.set(section, self.prepare_body(raw));
        }
        prepared
    }

    /// Render the prepared sections and count tokens. A failing renderer
    /// falls back to the manual template.
    pub fn assemble(
        &self,
        sections: &Sections,
        renderer: &dyn BundleRenderer,
    ) -> Result<BundleReport> {
        let started = Instant::now();
        let prepared = self.prepare(sections);
        let (document, used, fallback_reason) = match renderer.render(&prepared) {
            Ok(document) => (document, renderer.name(), None),
            Err(err) => {
                tracing::warn!(
                    renderer = renderer.name(),
                    error = %err,
                    "renderer failed; using manual bundle"
                );
                let document = ManualRenderer.render(&prepared)?;
                (document, ManualRenderer.name(), Some(format!("{err:#}")))
            }
        };
        let token_count = self.counter.count(&document);
        tracing::info!(
            renderer = used,
            tokens = token_count,
            budget = self.budget,
            elapsed_ms = started.elapsed().as_millis(),
            "bundle assembled"
        );
        Ok(BundleReport {
            document,
            token_count,
            budget: self.budget,
            renderer: used,
            fallback_reason,
        })
    }
}

/// Bundle with every section empty, used when `expand` finds no bundle yet.
pub fn skeleton() -> String {
    render_manual(&Sections::default())
}

/// Append an expanded-file entry under the `## Expanded Files` anchor,
/// adding the anchor when the document lacks it. A placeholder body is
/// replaced by the first entry.
pub fn append_expanded(document: &str, entry: &str) -> String {
    let heading = format!("## {}", Section::Expanded.heading());
    match split_expanded(document) {
        Some((head, tail)) => {
            let tail = tail.trim();
            if tail.is_empty() || tail == EMPTY_SECTION {
                format!("{head}\n{heading}\n\n{entry}\n")
            } else {
                format!("{head}\n{heading}\n\n{tail}\n\n{entry}\n")
            }
        }
        None => format!("{}\n\n{heading}\n\n{entry}\n", document.trim_end()),
    }
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
