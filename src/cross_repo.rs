//! Pulling `cross_repo.md` notes from linked repositories.
use crate::config::{ContextPaths, CONTEXT_DIR};
use crate::util::{read_text, write_atomic};
use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    RepoMissing,
    NoNotes,
    EmptyNotes,
    Unreadable(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub pulled: Vec<String>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    /// Set when something was pulled and the local file rewritten.
    pub written: Option<PathBuf>,
}

/// Expand a leading `~` and resolve relative entries against the project root.
pub fn resolve_repo(entry: &str, project_root: &Path) -> PathBuf {
    let expanded = match entry.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => dirs::home_dir()
            .map(|home| home.join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(entry)),
        _ => PathBuf::from(entry),
    };
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        project_root.join(expanded)
    };
    joined.canonicalize().unwrap_or(joined)
}

fn repo_name(repo: &Path) -> String {
    repo.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| repo.display().to_string())
}

/// Combine the cross-repo notes of every linked repo into the local
/// cross-repo file. The local file is left untouched when nothing is pulled.
pub fn pull_cross(paths: &ContextPaths, linked_repos: &[String]) -> Result<PullReport> {
    let mut report = PullReport::default();
    let mut combined: Vec<String> = Vec::new();

    for entry in linked_repos {
        let repo = resolve_repo(entry, paths.project_root());
        if !repo.is_dir() {
            report.skipped.push((repo, SkipReason::RepoMissing));
            continue;
        }
        let notes = repo.join(CONTEXT_DIR).join("cross_repo.md");
        if !notes.is_file() {
            report.skipped.push((repo, SkipReason::NoNotes));
            continue;
        }
        let content = match read_text(&notes) {
            Ok(content) => content,
            Err(err) => {
                report
                    .skipped
                    .push((repo, SkipReason::Unreadable(format!("{err:#}"))));
                continue;
            }
        };
        if content.trim().is_empty() {
            report.skipped.push((repo, SkipReason::EmptyNotes));
            continue;
        }
        let name = repo_name(&repo);
        tracing::debug!(repo = %repo.display(), bytes = content.len(), "pulled cross-repo notes");
        combined.push(format!("## From: {name}\n"));
        combined.push(content);
        combined.push("\n---\n".to_string());
        report.pulled.push(name);
    }

    if !combined.is_empty() {
        let target = paths.cross_repo_file();
        write_atomic(&target, combined.join("\n").as_bytes())?;
        report.written = Some(target);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn repo_with_notes(root: &Path, name: &str, notes: Option<&str>) -> PathBuf {
        let repo = root.join(name);
        fs::create_dir_all(repo.join(CONTEXT_DIR)).expect("mkdir");
        if let Some(notes) = notes {
            fs::write(repo.join(CONTEXT_DIR).join("cross_repo.md"), notes).expect("write");
        }
        repo
    }

    #[test]
    fn combines_notes_and_reports_skips() {
        let dir = TempDir::new().expect("tempdir");
        let project = repo_with_notes(dir.path(), "app", None);
        repo_with_notes(dir.path(), "shared", Some("use v2 auth"));
        repo_with_notes(dir.path(), "quiet", Some("  \n"));
        repo_with_notes(dir.path(), "bare", None);
        let paths = ContextPaths::new(project);

        let linked = ["../shared", "../quiet", "../bare", "../absent"].map(String::from);
        let report = pull_cross(&paths, &linked).expect("pull");

        assert_eq!(report.pulled, vec!["shared".to_string()]);
        let reasons: Vec<&SkipReason> = report.skipped.iter().map(|(_, reason)| reason).collect();
        assert_eq!(
            reasons,
            vec![
                &SkipReason::EmptyNotes,
                &SkipReason::NoNotes,
                &SkipReason::RepoMissing
            ]
        );
        assert_eq!(
            fs::read_to_string(paths.cross_repo_file()).expect("read"),
            "## From: shared\n\nuse v2 auth\n\n---\n"
        );
    }

    #[test]
    fn nothing_pulled_leaves_local_file_alone() {
        let dir = TempDir::new().expect("tempdir");
        let project = repo_with_notes(dir.path(), "app", Some("local notes"));
        let paths = ContextPaths::new(project);
        let report = pull_cross(&paths, &["../missing".to_string()]).expect("pull");
        assert!(report.written.is_none());
        assert_eq!(
            fs::read_to_string(paths.cross_repo_file()).expect("read"),
            "local notes"
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let resolved = resolve_repo("~/no-such-linked-repo", Path::new("/proj"));
        assert_eq!(resolved, home.join("no-such-linked-repo"));
        assert_eq!(
            resolve_repo("/abs/repo", Path::new("/proj")),
            PathBuf::from("/abs/repo")
        );
        assert_eq!(
            resolve_repo("rel", Path::new("/proj")),
            PathBuf::from("/proj/rel")
        );
    }
}
