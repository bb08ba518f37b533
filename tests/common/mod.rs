//! Shared harness for driving the `context` binary against a temp project.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway project root the binary is pointed at with `--project`.
pub struct TestProject {
    dir: TempDir,
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp project"),
        }
    }

    /// Fresh project with `context init` already run.
    pub fn initialized() -> Self {
        let project = Self::new();
        project.run_ok(&["init"]);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn context_dir(&self) -> PathBuf {
        self.root().join(".context")
    }

    pub fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, text).expect("write project file");
        path
    }

    pub fn read_context(&self, name: &str) -> String {
        fs::read_to_string(self.context_dir().join(name)).expect("read .context file")
    }

    pub fn run(&self, args: &[&str]) -> RunResult {
        self.run_in(self.root(), args)
    }

    /// Run with `cwd` as the working directory; `--project` still points here.
    pub fn run_in(&self, cwd: &Path, args: &[&str]) -> RunResult {
        Command::new(env!("CARGO_BIN_EXE_context"))
            .arg("--project")
            .arg(self.root())
            .args(args)
            .current_dir(cwd)
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("spawn context binary")
            .into()
    }

    pub fn run_ok(&self, args: &[&str]) -> RunResult {
        let result = self.run(args);
        assert!(
            result.success,
            "context {args:?} failed\nstdout:\n{}\nstderr:\n{}",
            result.stdout, result.stderr
        );
        result
    }
}
