use super::*;
use crate::collect::expanded_suffix;
use crate::redact::REDACTED_KEY;
use crate::tokens::Cl100kCounter;
use anyhow::anyhow;

struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

struct FailingRenderer;

impl BundleRenderer for FailingRenderer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn render(&self, _sections: &Sections) -> Result<String> {
        Err(anyhow!("service unavailable"))
    }
}

fn assemble_with(sections: &Sections, budget: usize) -> BundleReport {
    let redactor = Redactor::default();
    let rules = CompressionRules::default();
    Assembler::new(&redactor, &rules, &WordCounter, budget)
        .assemble(sections, &ManualRenderer)
        .expect("assemble")
}

#[test]
fn empty_sections_render_placeholder_skeleton() {
    let redactor = Redactor::default();
    let rules = CompressionRules::default();
    let counter = Cl100kCounter::load().expect("load encoding");
    let report = Assembler::new(&redactor, &rules, &counter, 100_000)
        .assemble(&Sections::default(), &ManualRenderer)
        .expect("assemble");

    let expected = "# Project Context for AI Tools\n\n\
                    *Generated by Context Engine V1*\n\n\
                    ## Architecture\n\nNone\n\n\
                    ## APIs\n\nNone\n\n\
                    ## Configuration\n\nNone\n\n\
                    ## Database Schema\n\nNone\n\n\
                    ## Session Notes\n\nNone\n\n\
                    ## Cross-Repo Notes\n\nNone\n\n\
                    ## Expanded Files\n\nNone";
    assert_eq!(report.document, expected);
    assert_eq!(report.document, skeleton());
    assert_eq!(report.token_count, counter.count(expected));
    assert!(!report.over_budget());
}

#[test]
fn headings_appear_in_fixed_order() {
    let mut sections = Sections::default();
    sections.set(Section::Expanded, "tail");
    sections.set(Section::Architecture, "head");
    let report = assemble_with(&sections, 1000);
    let positions: Vec<usize> = Section::ALL
        .iter()
        .map(|section| {
            report
                .document
                .find(&format!("## {}\n", section.heading()))
                .expect("heading present")
        })
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(expanded_suffix(&report.document), Some("tail"));
}

#[test]
fn bodies_are_redacted_compressed_and_deduplicated() {
    let mut sections = Sections::default();
    sections.set(
        Section::Session,
        "API_KEY=sk-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa   \n\n\n\nsame\nsame\n   \n",
    );
    let report = assemble_with(&sections, 1000);
    assert!(report
        .document
        .contains(&format!("## Session Notes\n\nAPI_KEY={REDACTED_KEY}\n\nsame\n\n")));
    assert!(!report.document.contains("sk-aaaa"));
}

#[test]
fn whitespace_only_section_becomes_placeholder() {
    let redactor = Redactor::default();
    let rules = CompressionRules::default();
    let assembler = Assembler::new(&redactor, &rules, &WordCounter, 10);
    assert_eq!(assembler.prepare_body(" \n\t\n"), EMPTY_SECTION);
}

#[test]
fn disabled_rules_skip_compression_steps() {
    let redactor = Redactor::default();
    let rules = CompressionRules {
        deduplicate: false,
        remove_blank_lines: false,
        ..CompressionRules::default()
    };
    let assembler = Assembler::new(&redactor, &rules, &WordCounter, 10);
    assert_eq!(assembler.prepare_body("a\na\n\n\n\nb"), "a\na\n\n\n\nb");
}

#[test]
fn over_budget_is_reported_but_document_kept_whole() {
    let mut sections = Sections::default();
    sections.set(Section::Architecture, "word ".repeat(50));
    let report = assemble_with(&sections, 10);
    assert!(report.over_budget());
    assert_eq!(report.overage(), report.token_count - 10);
    assert!(report.document.ends_with("## Expanded Files\n\nNone"));
}

#[test]
fn failing_renderer_falls_back_to_manual() {
    let redactor = Redactor::default();
    let rules = CompressionRules::default();
    let report = Assembler::new(&redactor, &rules, &WordCounter, 1000)
        .assemble(&Sections::default(), &FailingRenderer)
        .expect("assemble");
    assert_eq!(report.renderer, "manual");
    assert_eq!(report.document, skeleton());
    assert!(report
        .fallback_reason
        .as_deref()
        .is_some_and(|reason| reason.contains("service unavailable")));
}

#[test]
fn renderer_selection_requires_consent_and_key() {
    let config = ContextConfig {
        openrouter_api_key: "test-key".to_string(),
        ..ContextConfig::default()
    };
    assert_eq!(renderer_for(&config, true).name(), "delegated");
    assert_eq!(renderer_for(&config, false).name(), "manual");
}

#[test]
fn append_expanded_replaces_placeholder_then_accumulates() {
    let first = append_expanded(&skeleton(), "### a.py\n(no docstrings)");
    assert!(first.ends_with("## Expanded Files\n\n### a.py\n(no docstrings)\n"));
    assert!(!first.ends_with("None\n"));

    let second = append_expanded(&first, "### b.md\nhello");
    assert_eq!(
        expanded_suffix(&second),
        Some("### a.py\n(no docstrings)\n\n### b.md\nhello")
    );
    assert_eq!(second.matches("## Expanded Files").count(), 1);
}

#[test]
fn append_expanded_adds_missing_anchor() {
    let out = append_expanded("# Some other doc\n", "### c.md\nbody");
    assert_eq!(out, "# Some other doc\n\n## Expanded Files\n\n### c.md\nbody\n");
}

#[test]
fn heading_inside_an_entry_does_not_move_the_anchor() {
    let first = append_expanded(&skeleton(), "### a.py\n\"\"\"Alpha.\"\"\"");
    let second = append_expanded(&first, "### notes.md\n# Notes\n## Expanded Files\nlater text");
    let third = append_expanded(&second, "### b.md\nbeta");
    assert_eq!(
        expanded_suffix(&third),
        Some(
            "### a.py\n\"\"\"Alpha.\"\"\"\n\n\
             ### notes.md\n# Notes\n## Expanded Files\nlater text\n\n\
             ### b.md\nbeta"
        )
    );
}
