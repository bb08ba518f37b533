//! Section collection: raw inputs for each fixed bundle slot.
//!
//! Baseline files are matched to sections by file-name glob; the first match
//! in sorted order wins. Comment stripping and config summarization happen
//! here, per file type, so the assembler only has to redact and compress.
use crate::config::{CompressionRules, ContextPaths};
use crate::normalize::{is_config_file, strip_comments, summarize_config, Language};
use crate::redact::Redactor;
use crate::util::{list_files, read_text, read_text_optional};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Marker preceding the additive expanded-files tail of a bundle.
pub const EXPANDED_MARKER: &str = "\n## Expanded Files\n";
const CROSS_REPO_MARKER: &str = "\n## Cross-Repo Notes\n";

/// One named slot in the bundle, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Architecture,
    Apis,
    Configuration,
    Schema,
    Session,
    CrossRepo,
    Expanded,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Architecture,
        Section::Apis,
        Section::Configuration,
        Section::Schema,
        Section::Session,
        Section::CrossRepo,
        Section::Expanded,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::Architecture => "architecture",
            Section::Apis => "apis",
            Section::Configuration => "configuration",
            Section::Schema => "schema",
            Section::Session => "session",
            Section::CrossRepo => "cross_repo",
            Section::Expanded => "expanded",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Section::Architecture => "Architecture",
            Section::Apis => "APIs",
            Section::Configuration => "Configuration",
            Section::Schema => "Database Schema",
            Section::Session => "Session Notes",
            Section::CrossRepo => "Cross-Repo Notes",
            Section::Expanded => "Expanded Files",
        }
    }

    /// File-name globs that route a baseline file into this section.
    pub fn baseline_patterns(self) -> &'static [&'static str] {
        match self {
            Section::Architecture => &["architecture.*", "arch.*", "system.*"],
            Section::Apis => &["api*.*"],
            Section::Configuration => &["config*.*", "settings.*"],
            Section::Schema => &["schema.*", "db*.*", "database.*"],
            Section::Session | Section::CrossRepo | Section::Expanded => &[],
        }
    }

    fn baseline_matcher(self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in self.baseline_patterns() {
            builder.add(
                Glob::new(pattern).with_context(|| format!("compile glob {pattern:?}"))?,
            );
        }
        builder
            .build()
            .with_context(|| format!("build {} globs", self.key()))
    }
}

/// Section bodies keyed by slot; absent slots read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    bodies: BTreeMap<Section, String>,
}

impl Sections {
    pub fn get(&self, section: Section) -> &str {
        self.bodies.get(&section).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, section: Section, body: impl Into<String>) {
        self.bodies.insert(section, body.into());
    }

    /// Every slot in output order, empty ones included.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &str)> + '_ {
        Section::ALL
            .into_iter()
            .map(move |section| (section, self.get(section)))
    }
}

pub struct SectionCollector<'a> {
    paths: &'a ContextPaths,
    rules: &'a CompressionRules,
    redactor: &'a Redactor,
}

impl<'a> SectionCollector<'a> {
    pub fn new(paths: &'a ContextPaths, rules: &'a CompressionRules, redactor: &'a Redactor) -> Self {
        Self {
            paths,
            rules,
            redactor,
        }
    }

    pub fn collect(&self) -> Result<Sections> {
        let mut sections = Sections::default();
        let baseline = list_files(&self.paths.baseline_dir())?;
        for section in Section::ALL {
            let body = match section {
                Section::Session => read_text_optional(&self.paths.session_file())?,
                Section::CrossRepo => read_text_optional(&self.paths.cross_repo_file())?,
                Section::Expanded => read_expanded_section(&self.paths.context_file()),
                _ => match first_match(section, &baseline)? {
                    Some(path) => self.read_baseline(section, &path)?,
                    None => String::new(),
                },
            };
            tracing::debug!(section = section.key(), bytes = body.len(), "collected section");
            sections.set(section, body);
        }
        Ok(sections)
    }

    fn read_baseline(&self, section: Section, path: &Path) -> Result<String> {
        let mut text = read_text(path)?;
        let language = Language::from_path(path);
        if self.rules.strip_comments && language.is_code() {
            text = strip_comments(&text, language);
        }
        if section == Section::Configuration && self.rules.summarize_configs && is_config_file(path)
        {
            text = summarize_config(&text, self.redactor);
        }
        Ok(text)
    }
}

/// First baseline file (in the given order) whose name matches `section`.
pub fn first_match(section: Section, files: &[PathBuf]) -> Result<Option<PathBuf>> {
    let matcher = section.baseline_matcher()?;
    Ok(files
        .iter()
        .find(|path| path.file_name().is_some_and(|name| matcher.is_match(name)))
        .cloned())
}

/// Split a bundle at its own expanded-files anchor: the first marker after
/// the cross-repo heading, or the first marker at all when that heading is
/// missing. Marker text inside the tail stays part of the tail.
pub fn split_expanded(document: &str) -> Option<(&str, &str)> {
    let from = document
        .find(CROSS_REPO_MARKER)
        .map(|at| at + CROSS_REPO_MARKER.len() - 1)
        .unwrap_or(0);
    let at = from + document[from..].find(EXPANDED_MARKER)?;
    Some((&document[..at], &document[at + EXPANDED_MARKER.len()..]))
}

/// Expanded-files tail of a bundle document, if it has the marker.
pub fn expanded_suffix(document: &str) -> Option<&str> {
    split_expanded(document).map(|(_, tail)| tail.trim())
}

/// Expanded tail of the previous bundle at `bundle_path`. A missing or
/// unreadable bundle, or a placeholder tail, reads as empty.
pub fn read_expanded_section(bundle_path: &Path) -> String {
    if !bundle_path.is_file() {
        return String::new();
    }
    let document = match read_text(bundle_path) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(path = %bundle_path.display(), error = %err, "ignoring unreadable bundle");
            return String::new();
        }
    };
    match expanded_suffix(&document) {
        Some(tail) if tail != crate::bundle::EMPTY_SECTION => tail.to_string(),
        _ => String::new(),
    }
}
