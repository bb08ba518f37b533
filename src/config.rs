//! Project configuration and typed paths into the `.context/` layout.
//!
//! The config is pack-owned JSON (`.context/config.json`). Unknown keys are
//! carried through untouched so `config set` can store anything; known keys
//! are validated by re-deserializing after every change.
use crate::redact::RedactionSettings;
use crate::util::write_json_atomic;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONTEXT_DIR: &str = ".context";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Convenience wrapper for locating `.context/` artifacts.
#[derive(Debug, Clone)]
pub struct ContextPaths {
    root: PathBuf,
}

impl ContextPaths {
    /// Create a new path helper rooted at the project root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn project_root(&self) -> &Path {
        &self.root
    }

    pub fn context_dir(&self) -> PathBuf {
        self.root.join(CONTEXT_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.context_dir().join("config.json")
    }

    pub fn baseline_dir(&self) -> PathBuf {
        self.context_dir().join("baseline")
    }

    pub fn adrs_dir(&self) -> PathBuf {
        self.context_dir().join("adrs")
    }

    pub fn session_file(&self) -> PathBuf {
        self.context_dir().join("session.md")
    }

    pub fn cross_repo_file(&self) -> PathBuf {
        self.context_dir().join("cross_repo.md")
    }

    /// The generated bundle, `context_for_ai.md`.
    pub fn context_file(&self) -> PathBuf {
        self.context_dir().join("context_for_ai.md")
    }

    pub fn hashes_file(&self) -> PathBuf {
        self.context_dir().join("hashes.json")
    }

    pub fn task_file(&self) -> PathBuf {
        self.context_dir().join("session_task.txt")
    }
}

/// Which upstream transforms the collector applies per file type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionRules {
    pub strip_comments: bool,
    /// `expand` keeps only docstrings of code files when set; otherwise it
    /// keeps comment-stripped code.
    pub keep_docstrings: bool,
    pub summarize_configs: bool,
    pub deduplicate: bool,
    pub remove_blank_lines: bool,
}

impl Default for CompressionRules {
    fn default() -> Self {
        Self {
            strip_comments: true,
            keep_docstrings: true,
            summarize_configs: true,
            deduplicate: true,
            remove_blank_lines: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub openrouter_api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub auto_refresh: bool,
    pub compression_rules: CompressionRules,
    pub linked_repos: Vec<String>,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_kb: u64,
    pub note_max_length: usize,
    /// Optional external code compressor, e.g. `longcodezip --rate {rate}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressor_command: Option<String>,
    pub compressor_timeout_secs: u64,
    pub redaction: RedactionSettings,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: String::new(),
            model: "qwen/qwen3-coder:free".to_string(),
            max_tokens: 100_000,
            auto_refresh: false,
            compression_rules: CompressionRules::default(),
            linked_repos: Vec::new(),
            allowed_extensions: [
                ".md", ".json", ".yml", ".yaml", ".toml", ".ini", ".py", ".js", ".ts", ".java",
                ".c", ".cpp",
            ]
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
            max_file_size_kb: 1024,
            note_max_length: 2000,
            compressor_command: None,
            compressor_timeout_secs: 120,
            redaction: RedactionSettings::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl ContextConfig {
    /// API key from config, falling back to `OPENROUTER_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        let configured = self.openrouter_api_key.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        env::var(API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_kb.saturating_mul(1024)
    }

    fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self).context("serialize config")? {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("config did not serialize to an object")),
        }
    }

    /// Value for `key`, or `default` when the key is absent.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.to_map()
            .ok()
            .and_then(|mut map| map.remove(key))
            .unwrap_or(default)
    }

    /// Set `key`, rejecting values of the wrong shape for known keys.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut map = self.to_map()?;
        map.insert(key.to_string(), value);
        *self = serde_json::from_value(Value::Object(map))
            .with_context(|| format!("invalid value for config key {key:?}"))?;
        Ok(())
    }

    /// Remove `key`; known keys fall back to their defaults. Returns whether
    /// the key was present.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        if self.extra.remove(key).is_some() {
            return Ok(true);
        }
        let defaults = ContextConfig::default().to_map()?;
        match defaults.get(key) {
            Some(default) => {
                self.set(key, default.clone())?;
                Ok(true)
            }
            None if key == "compressor_command" => {
                let present = self.compressor_command.take().is_some();
                Ok(present)
            }
            None => Ok(false),
        }
    }
}

/// Parse a CLI value as JSON when possible, otherwise as a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Load the project config; missing or corrupt files fall back to defaults.
pub fn load_config(paths: &ContextPaths) -> ContextConfig {
    let path = paths.config_file();
    if !path.is_file() {
        return ContextConfig::default();
    }
    let parsed = fs::read(&path)
        .with_context(|| format!("read config {}", path.display()))
        .and_then(|bytes| {
            serde_json::from_slice::<ContextConfig>(&bytes).context("parse config JSON")
        });
    match parsed {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "using default config");
            ContextConfig::default()
        }
    }
}

/// Persist a config to disk in a stable JSON format.
pub fn write_config(paths: &ContextPaths, config: &ContextConfig) -> Result<()> {
    let path = paths.config_file();
    write_json_atomic(&path, config).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
