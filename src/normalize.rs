//! Pure text transforms that shrink source files before bundling.
//!
//! All transforms are syntactic heuristics: they never parse the language,
//! so exotic string or comment forms can slip through.
use crate::redact::Redactor;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

pub const NO_DOCSTRINGS: &str = "(no docstrings)";

static PY_DOCSTRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("""[\s\S]*?"""|'''[\s\S]*?''')"#).expect("regex for python docstrings")
});

static DOC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("regex for doc comment blocks")
});

/// Comment syntax family of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// `#` line comments, triple-quoted docstrings.
    Python,
    /// `//` and `/* */` comments, `/** */` doc blocks.
    CLike,
    Other,
}

impl Language {
    pub fn from_name(name: &str) -> Self {
        match name.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "python" | "py" => Language::Python,
            "javascript" | "js" | "jsx" | "typescript" | "ts" | "tsx" | "java" | "c" | "h"
            | "cpp" | "cc" | "hpp" => Language::CLike,
            _ => Language::Other,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Language::from_name)
            .unwrap_or(Language::Other)
    }

    pub fn is_code(self) -> bool {
        !matches!(self, Language::Other)
    }
}

const CONFIG_EXTENSIONS: &[&str] = &["json", "yml", "yaml", "toml", "ini", "env"];

/// Whether `path` names a configuration file (`.env` dotfiles included).
pub fn is_config_file(path: &Path) -> bool {
    if path.file_name().and_then(|name| name.to_str()) == Some(".env") {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Remove comments while keeping documentation.
///
/// Python keeps every line that opens, continues or closes a triple-quoted
/// span verbatim. C-like sources lose all comments; `/** */` blocks are
/// hoisted, de-duplicated, to the top of the result.
pub fn strip_comments(code: &str, language: Language) -> String {
    match language {
        Language::Python => strip_python_comments(code),
        Language::CLike => strip_c_like_comments(code),
        Language::Other => code.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteStyle {
    Double,
    Single,
}

impl QuoteStyle {
    fn delimiter(self) -> &'static str {
        match self {
            QuoteStyle::Double => "\"\"\"",
            QuoteStyle::Single => "'''",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyState {
    Code,
    InDocstring(QuoteStyle),
}

fn strip_python_comments(code: &str) -> String {
    let mut state = PyState::Code;
    let mut out: Vec<&str> = Vec::new();
    for line in code.split('\n') {
        match state {
            PyState::InDocstring(style) => {
                out.push(line);
                if line.matches(style.delimiter()).count() % 2 == 1 {
                    state = PyState::Code;
                }
            }
            PyState::Code => {
                if let Some(style) = first_docstring_delimiter(line) {
                    out.push(line);
                    if line.matches(style.delimiter()).count() % 2 == 1 {
                        state = PyState::InDocstring(style);
                    }
                    continue;
                }
                match python_comment_start(line) {
                    None => out.push(line),
                    Some(idx) => {
                        let code_part = line[..idx].trim_end();
                        if !code_part.is_empty() {
                            out.push(code_part);
                        }
                    }
                }
            }
        }
    }
    out.join("\n")
}

fn first_docstring_delimiter(line: &str) -> Option<QuoteStyle> {
    let double = line.find(QuoteStyle::Double.delimiter());
    let single = line.find(QuoteStyle::Single.delimiter());
    match (double, single) {
        (Some(d), Some(s)) if s < d => Some(QuoteStyle::Single),
        (Some(_), _) => Some(QuoteStyle::Double),
        (None, Some(_)) => Some(QuoteStyle::Single),
        (None, None) => None,
    }
}

/// Byte offset of the first `#` outside a single-line string literal.
fn python_comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '#' => return Some(idx),
            '"' | '\'' => quote = Some(ch),
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CState {
    Code,
    Str(char),
    LineComment,
    BlockComment,
    DocComment,
}

fn strip_c_like_comments(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    let mut state = CState::Code;
    let mut body = String::with_capacity(code.len());
    let mut doc = String::new();
    let mut docs: Vec<String> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            CState::Code => match (ch, next) {
                ('/', Some('*')) => {
                    let is_doc = chars.get(i + 2) == Some(&'*') && chars.get(i + 3) != Some(&'/');
                    if is_doc {
                        doc.push_str("/**");
                        state = CState::DocComment;
                        i += 3;
                    } else {
                        state = CState::BlockComment;
                        i += 2;
                    }
                    continue;
                }
                ('/', Some('/')) => {
                    state = CState::LineComment;
                    i += 2;
                    continue;
                }
                ('"' | '\'' | '`', _) => {
                    body.push(ch);
                    state = CState::Str(ch);
                }
                _ => body.push(ch),
            },
            CState::Str(quote) => {
                body.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = next {
                        body.push(escaped);
                        i += 2;
                        continue;
                    }
                } else if ch == quote || (ch == '\n' && quote != '`') {
                    state = CState::Code;
                }
            }
            CState::LineComment => {
                if ch == '\n' {
                    body.push('\n');
                    state = CState::Code;
                }
            }
            CState::BlockComment => {
                if ch == '*' && next == Some('/') {
                    state = CState::Code;
                    i += 2;
                    continue;
                }
            }
            CState::DocComment => {
                if ch == '*' && next == Some('/') {
                    doc.push_str("*/");
                    let block = std::mem::take(&mut doc);
                    if !block.trim().is_empty() && !docs.contains(&block) {
                        docs.push(block);
                    }
                    state = CState::Code;
                    i += 2;
                    continue;
                }
                doc.push(ch);
            }
        }
        i += 1;
    }

    let body = body
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    if docs.is_empty() {
        return body;
    }
    format!("{}\n{}", docs.join("\n"), body)
}

/// Reduce a configuration file to its keys and structural lines.
///
/// Secrets are masked first; values of `key = value` / `key: value` lines
/// are discarded entirely.
pub fn summarize_config(config_text: &str, redactor: &Redactor) -> String {
    let redacted = redactor.redact(config_text);
    let mut summary = Vec::new();
    for line in redacted.split('\n') {
        let stripped = line.trim();
        if stripped.is_empty() || is_config_comment(stripped) {
            continue;
        }
        if stripped.contains(['{', '}', '[', ']']) {
            summary.push(line.to_string());
        } else if stripped.contains('=') || stripped.contains(':') {
            let separator = if stripped.contains('=') { '=' } else { ':' };
            let key = stripped.split(separator).next().unwrap_or_default().trim();
            summary.push(format!("{key}: [configured]"));
        }
    }
    summary.join("\n")
}

fn is_config_comment(stripped: &str) -> bool {
    stripped.starts_with('#') || stripped.starts_with("//") || stripped.starts_with(';')
}

/// Drop repeated non-blank lines (first occurrence wins, compared trimmed) and
/// collapse blank runs to one blank line.
pub fn deduplicate_content(content: &str) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result: Vec<&str> = Vec::new();
    for line in content.split('\n') {
        let stripped = line.trim();
        if stripped.is_empty() {
            if result.last().is_some_and(|last| last.trim().is_empty()) {
                continue;
            }
            result.push("");
        } else if seen.insert(stripped) {
            result.push(line);
        }
    }
    result.join("\n")
}

/// Right-trim every line and collapse blank runs to one blank line.
pub fn compress_whitespace(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.split('\n').map(str::trim_end) {
        if line.is_empty() && out.last().is_some_and(|last| last.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Documentation spans only: triple-quoted strings for Python, `/** */`
/// blocks for C-like sources.
pub fn extract_docstrings(code: &str, language: Language) -> Vec<String> {
    let pattern = match language {
        Language::Python => &*PY_DOCSTRING,
        Language::CLike => &*DOC_BLOCK,
        Language::Other => return Vec::new(),
    };
    pattern
        .find_iter(code)
        .map(|m| m.as_str().trim().to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Strict compression: keep documentation spans, drop all executable code.
pub fn compress_code(code: &str, language: Language) -> String {
    let blocks = extract_docstrings(code, language);
    if blocks.is_empty() {
        return NO_DOCSTRINGS.to_string();
    }
    compress_whitespace(&blocks.join("\n\n"))
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
