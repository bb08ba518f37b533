//! Per-file input checks shared by `baseline add` and `expand`.
//!
//! A failed check aborts that file only; batch commands report the error and
//! move on to the next file.
use crate::config::ContextConfig;
use crate::util::truncate_chars;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("path '{}' is outside the project root {}", .path.display(), .root.display())]
    OutsideProject { path: PathBuf, root: PathBuf },
    #[error("disallowed file type: {extension:?} ({})", .path.display())]
    DisallowedExtension { path: PathBuf, extension: String },
    #[error("file too large (> {limit_kb} KB): {name}")]
    TooLarge { name: String, limit_kb: u64 },
    #[error("not a readable file: {}", .path.display())]
    NotAFile { path: PathBuf },
}

/// Extension allow-list and size ceiling from the project config.
#[derive(Debug, Clone)]
pub struct FilePolicy {
    allowed_extensions: BTreeSet<String>,
    max_bytes: u64,
}

impl FilePolicy {
    pub fn new<I, S>(allowed_extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(&config.allowed_extensions, config.max_file_bytes())
    }

    /// Resolve `path` (relative paths against the project root) and check it
    /// against the project root, the extension allow-list and the size
    /// ceiling. Returns the canonical path.
    pub fn validate(&self, path: &Path, project_root: &Path) -> Result<PathBuf, InputError> {
        let joined = project_root.join(path);
        let resolved = joined
            .canonicalize()
            .map_err(|_| InputError::NotAFile { path: joined })?;
        if !is_subpath(&resolved, project_root) {
            return Err(InputError::OutsideProject {
                path: resolved,
                root: project_root.to_path_buf(),
            });
        }
        let meta = fs::metadata(&resolved).map_err(|_| InputError::NotAFile {
            path: resolved.clone(),
        })?;
        if !meta.is_file() {
            return Err(InputError::NotAFile { path: resolved });
        }
        let extension = resolved
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        if !self.allowed_extensions.contains(&extension) {
            return Err(InputError::DisallowedExtension {
                path: resolved,
                extension,
            });
        }
        if meta.len() > self.max_bytes {
            return Err(InputError::TooLarge {
                name: file_name(&resolved),
                limit_kb: self.max_bytes / 1024,
            });
        }
        Ok(resolved)
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Whether `child` is `parent` or lies beneath it, after resolving both.
pub fn is_subpath(child: &Path, parent: &Path) -> bool {
    let resolve = |path: &Path| path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    resolve(child).starts_with(resolve(parent))
}

/// Strip control characters (keeping tab, newline, carriage return) and cap
/// the note at `max_len` characters.
pub fn sanitize_note(note: &str, max_len: usize) -> String {
    let cleaned: String = note
        .chars()
        .filter(|&ch| !ch.is_control() || matches!(ch, '\t' | '\n' | '\r'))
        .collect();
    let (mut truncated, cut) = truncate_chars(&cleaned, max_len);
    if cut {
        truncated.push('…');
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().canonicalize().expect("canonical root");
        (dir, root)
    }

    fn policy() -> FilePolicy {
        FilePolicy::new(["md", ".PY"], 16)
    }

    #[test]
    fn accepts_allowed_file_inside_root() {
        let (_dir, root) = project();
        let file = root.join("notes.md");
        fs::write(&file, "short").expect("write");
        assert_eq!(policy().validate(&file, &root).expect("valid"), file);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let (_dir, root) = project();
        let file = root.join("tool.py");
        fs::write(&file, "x = 1").expect("write");
        assert!(policy().validate(&file, &root).is_ok());
    }

    #[test]
    fn rejects_disallowed_extension() {
        let (_dir, root) = project();
        let file = root.join("run.sh");
        fs::write(&file, "echo").expect("write");
        let err = policy().validate(&file, &root).unwrap_err();
        assert!(matches!(err, InputError::DisallowedExtension { ref extension, .. } if extension == ".sh"));
    }

    #[test]
    fn rejects_oversized_file() {
        let (_dir, root) = project();
        let file = root.join("big.md");
        fs::write(&file, "x".repeat(64)).expect("write");
        assert!(matches!(
            policy().validate(&file, &root),
            Err(InputError::TooLarge { .. })
        ));
    }

    #[test]
    fn rejects_path_escaping_root() {
        let (_dir, root) = project();
        let inner = root.join("inner");
        fs::create_dir(&inner).expect("mkdir");
        let outside = root.join("outside.md");
        fs::write(&outside, "x").expect("write");
        let err = policy().validate(&inner.join("../outside.md"), &inner).unwrap_err();
        assert!(matches!(err, InputError::OutsideProject { .. }));
    }

    #[test]
    fn relative_paths_resolve_against_project_root() {
        let (_dir, root) = project();
        fs::create_dir(root.join("docs")).expect("mkdir");
        let file = root.join("docs").join("a.md");
        fs::write(&file, "short").expect("write");
        assert_eq!(
            policy()
                .validate(Path::new("docs/a.md"), &root)
                .expect("valid"),
            file
        );
        assert!(matches!(
            policy().validate(Path::new("../a.md"), &root.join("docs")),
            Err(InputError::NotAFile { .. })
        ));
    }

    #[test]
    fn rejects_missing_file() {
        let (_dir, root) = project();
        assert!(matches!(
            policy().validate(&root.join("nope.md"), &root),
            Err(InputError::NotAFile { .. })
        ));
    }

    #[test]
    fn sanitize_note_strips_controls_and_truncates() {
        assert_eq!(sanitize_note("a\u{0}b\tc\nd", 100), "ab\tc\nd");
        assert_eq!(sanitize_note("abcdef", 3), "abc…");
    }
}
