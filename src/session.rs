//! Session notes and the current task.
//!
//! The task lives in `.context/session_task.txt` and is only ever read or
//! written through a [`SessionContext`] value handed to the commands that
//! need it.
use crate::config::ContextPaths;
use crate::guard::sanitize_note;
use crate::util::{read_text, read_text_optional, write_atomic};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

const NOTE_PREFIX: &str = "### [";

pub fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The task bound to the current session, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    task_file: PathBuf,
    task: Option<String>,
}

impl SessionContext {
    /// Load the task; an unreadable task file counts as no task.
    pub fn load(paths: &ContextPaths) -> Self {
        let task_file = paths.task_file();
        let task = match read_text_optional(&task_file) {
            Ok(text) => Some(text.trim().to_string()).filter(|task| !task.is_empty()),
            Err(err) => {
                tracing::warn!(path = %task_file.display(), error = %err, "ignoring unreadable task file");
                None
            }
        };
        Self { task_file, task }
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    /// Bind `task`, returning the task it replaced.
    pub fn set_task(&mut self, task: &str) -> Result<Option<String>> {
        let task = task.trim();
        if task.is_empty() {
            return Err(anyhow!("task description must not be empty"));
        }
        write_atomic(&self.task_file, task.as_bytes())
            .with_context(|| format!("write {}", self.task_file.display()))?;
        Ok(self.task.replace(task.to_string()))
    }

    /// Clear the task, returning the one that was active.
    pub fn clear(&mut self) -> Result<Option<String>> {
        if self.task_file.exists() {
            fs::remove_file(&self.task_file)
                .with_context(|| format!("remove {}", self.task_file.display()))?;
        }
        Ok(self.task.take())
    }
}

/// Append a timestamped note to the session file, creating it if needed.
/// Returns the sanitized note as stored.
pub fn append_note(paths: &ContextPaths, note: &str, max_len: usize) -> Result<String> {
    let note = sanitize_note(note, max_len);
    if note.trim().is_empty() {
        return Err(anyhow!("note is empty after sanitizing"));
    }
    let path = paths.session_file();
    let mut text = read_text_optional(&path)?;
    text.push_str(&format!("\n{NOTE_PREFIX}{}]\n{note}\n", now_stamp()));
    write_atomic(&path, text.as_bytes())?;
    Ok(note)
}

/// Append the end-of-session marker. Fails when there is no session file.
pub fn end_session(paths: &ContextPaths) -> Result<String> {
    let path = paths.session_file();
    if !path.is_file() {
        return Err(anyhow!("no active session found ({})", path.display()));
    }
    let stamp = now_stamp();
    let mut text = read_text(&path)?;
    text.push_str(&format!("\n---\n### Session ended at {stamp}\n---\n"));
    write_atomic(&path, text.as_bytes())?;
    Ok(stamp)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub note_count: usize,
    pub last_saved: Option<String>,
}

pub fn session_stats(text: &str) -> SessionStats {
    let stamps: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix(NOTE_PREFIX))
        .filter_map(|rest| rest.strip_suffix(']'))
        .collect();
    SessionStats {
        note_count: stamps.len(),
        last_saved: stamps.last().map(|stamp| stamp.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ContextPaths) {
        let dir = TempDir::new().expect("tempdir");
        let paths = ContextPaths::new(dir.path().to_path_buf());
        fs::create_dir_all(paths.context_dir()).expect("mkdir");
        (dir, paths)
    }

    #[test]
    fn task_round_trips_through_file() {
        let (_dir, paths) = setup();
        let mut session = SessionContext::load(&paths);
        assert_eq!(session.task(), None);

        assert_eq!(session.set_task("  fix login  ").expect("set"), None);
        assert_eq!(
            fs::read_to_string(paths.task_file()).expect("read"),
            "fix login"
        );
        assert_eq!(SessionContext::load(&paths).task(), Some("fix login"));

        assert_eq!(
            session.set_task("add oauth").expect("update"),
            Some("fix login".to_string())
        );
        assert_eq!(session.clear().expect("clear"), Some("add oauth".to_string()));
        assert!(!paths.task_file().exists());
        assert_eq!(SessionContext::load(&paths).task(), None);
    }

    #[test]
    fn empty_task_is_rejected() {
        let (_dir, paths) = setup();
        let mut session = SessionContext::load(&paths);
        assert!(session.set_task("   ").is_err());
        assert!(!paths.task_file().exists());
    }

    #[test]
    fn notes_append_with_timestamp_headers() {
        let (_dir, paths) = setup();
        append_note(&paths, "first", 100).expect("save");
        append_note(&paths, "second\u{7}", 100).expect("save");
        let text = fs::read_to_string(paths.session_file()).expect("read");
        assert!(text.starts_with("\n### ["));
        assert!(text.ends_with("]\nsecond\n"));

        let stats = session_stats(&text);
        assert_eq!(stats.note_count, 2);
        assert_eq!(stats.last_saved.as_deref().map(str::len), Some(19));
    }

    #[test]
    fn end_session_requires_session_file() {
        let (_dir, paths) = setup();
        assert!(end_session(&paths).is_err());
        fs::write(paths.session_file(), "notes").expect("write");
        let stamp = end_session(&paths).expect("end");
        let text = fs::read_to_string(paths.session_file()).expect("read");
        assert_eq!(
            text,
            format!("notes\n---\n### Session ended at {stamp}\n---\n")
        );
        assert_eq!(session_stats(&text).note_count, 0);
    }
}
