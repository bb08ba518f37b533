use crate::config::{load_config, ContextConfig, ContextPaths};
use crate::guard::FilePolicy;
use crate::redact::Redactor;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Resolved project root, its `.context/` paths and the loaded config.
pub(crate) struct ProjectContext {
    pub(crate) paths: ContextPaths,
    pub(crate) config: ContextConfig,
}

impl ProjectContext {
    pub(crate) fn load(project: Option<&Path>) -> Result<Self> {
        let root = project_root(project)?;
        let paths = ContextPaths::new(root);
        let config = load_config(&paths);
        Ok(Self { paths, config })
    }

    pub(crate) fn root(&self) -> &Path {
        self.paths.project_root()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.paths.context_dir().is_dir()
    }

    pub(crate) fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        Err(anyhow!(
            "not initialized: {} is missing (run `context init` first)",
            self.paths.context_dir().display()
        ))
    }

    pub(crate) fn redactor(&self) -> Redactor {
        Redactor::new(self.config.redaction)
    }

    pub(crate) fn file_policy(&self) -> FilePolicy {
        FilePolicy::from_config(&self.config)
    }
}

fn project_root(project: Option<&Path>) -> Result<PathBuf> {
    let root = match project {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("resolve current directory")?,
    };
    if !root.is_dir() {
        return Err(anyhow!("project root {} is not a directory", root.display()));
    }
    root.canonicalize()
        .with_context(|| format!("resolve project root {}", root.display()))
}
