//! Best-effort secret masking for text that leaves the project.
//!
//! Rules run in a fixed priority order: precise, prefixed formats first, then
//! generic `key = value` patterns, then an entropy test over long hex runs.
//! A generic rule never rewrites a value that an earlier rule already turned
//! into a sentinel. This is a heuristic filter, not a security boundary: it
//! will miss secrets that do not look like secrets.
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REDACTED: &str = "[REDACTED]";
pub const REDACTED_KEY: &str = "[REDACTED_KEY]";
pub const REDACTED_AWS: &str = "[REDACTED_AWS]";

/// Every sentinel starts with this, so generic rules can skip masked values.
const SENTINEL_PREFIX: &str = "[REDACTED";

/// Upper bound on re-running the rule set until the text stops changing.
const MAX_PASSES: usize = 4;

/// Tunable thresholds for the heuristic rules.
///
/// The defaults carry no derivation beyond "works on typical keys"; they are
/// exposed through `config.json` under `redaction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionSettings {
    /// Minimum Shannon entropy, in bits per character, for a hex run to be masked.
    pub entropy_threshold: f64,
    /// Minimum length of a prefixed key body and of any entropy-tested token.
    pub min_secret_len: usize,
    /// Minimum length of a hexadecimal run considered by the entropy rule.
    pub hex_run_min_len: usize,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            entropy_threshold: 3.5,
            min_secret_len: 20,
            hex_run_min_len: 32,
        }
    }
}

/// Rule identity, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    PrefixedKey,
    CloudAccessKey,
    SecretAssignment,
    EnvAssignment,
    HighEntropyHex,
}

#[derive(Debug, Clone)]
struct RedactionRule {
    kind: RuleKind,
    pattern: Regex,
}

/// Result of a single redaction run, with per-rule match counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedactionOutcome {
    pub text: String,
    pub counts: BTreeMap<RuleKind, usize>,
}

impl RedactionOutcome {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactionRule>,
    settings: RedactionSettings,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(RedactionSettings::default())
    }
}

impl Redactor {
    pub fn new(settings: RedactionSettings) -> Self {
        let min_secret = settings.min_secret_len.max(1);
        let min_hex = settings.hex_run_min_len.max(1);
        let rules = vec![
            RedactionRule {
                kind: RuleKind::PrefixedKey,
                pattern: Regex::new(&format!(r"\bsk-[A-Za-z0-9_-]{{{min_secret},}}"))
                    .expect("regex for prefixed keys"),
            },
            RedactionRule {
                kind: RuleKind::CloudAccessKey,
                pattern: Regex::new(r"\bAKIA[0-9A-Z]{16}\b").expect("regex for cloud access keys"),
            },
            RedactionRule {
                kind: RuleKind::SecretAssignment,
                pattern: Regex::new(
                    r#"(?i)(password|passwd|pwd|pass|secret|token|jwt|bearer)(["']?[ \t]*[=:][ \t]*)["']?([^"'\s,;}\]]+)["']?"#,
                )
                .expect("regex for secret assignments"),
            },
            RedactionRule {
                kind: RuleKind::EnvAssignment,
                pattern: Regex::new(
                    r#"(API_KEY|SECRET|TOKEN|PASSWORD|PASSWD)[ \t]*=[ \t]*["']?([^"'\s]+)["']?"#,
                )
                .expect("regex for env assignments"),
            },
            RedactionRule {
                kind: RuleKind::HighEntropyHex,
                pattern: Regex::new(&format!(r"\b[a-fA-F0-9]{{{min_hex},}}\b"))
                    .expect("regex for hex runs"),
            },
        ];
        Self { rules, settings }
    }

    /// Mask secret-shaped substrings. Idempotent: re-running on the output is a no-op.
    pub fn redact(&self, text: &str) -> String {
        self.redact_with_report(text).text
    }

    /// Like [`Redactor::redact`], also reporting how often each rule fired on
    /// the first pass.
    pub fn redact_with_report(&self, text: &str) -> RedactionOutcome {
        let mut counts = BTreeMap::new();
        let mut current = self.apply_rules(text, Some(&mut counts));
        for _ in 1..MAX_PASSES {
            let next = self.apply_rules(&current, None);
            if next == current {
                break;
            }
            current = next;
        }
        RedactionOutcome {
            text: current,
            counts,
        }
    }

    fn apply_rules(
        &self,
        text: &str,
        mut counts: Option<&mut BTreeMap<RuleKind, usize>>,
    ) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            let mut hits = 0usize;
            let next = match rule.kind {
                RuleKind::PrefixedKey => replace_counted(&rule.pattern, &current, &mut hits, |_| {
                    Some(REDACTED_KEY.to_string())
                }),
                RuleKind::CloudAccessKey => {
                    replace_counted(&rule.pattern, &current, &mut hits, |_| {
                        Some(REDACTED_AWS.to_string())
                    })
                }
                RuleKind::SecretAssignment => {
                    replace_counted(&rule.pattern, &current, &mut hits, |caps| {
                        if caps[3].starts_with(SENTINEL_PREFIX) {
                            return None;
                        }
                        Some(format!("{}{}{}", &caps[1], &caps[2], REDACTED))
                    })
                }
                RuleKind::EnvAssignment => self.mask_env_assignments(rule, &current, &mut hits),
                RuleKind::HighEntropyHex => {
                    replace_counted(&rule.pattern, &current, &mut hits, |caps| {
                        let token = &caps[0];
                        if looks_like_identifier(token) || !self.is_high_entropy_token(token) {
                            return None;
                        }
                        Some(REDACTED.to_string())
                    })
                }
            };
            if hits > 0 {
                if let Some(counts) = counts.as_deref_mut() {
                    *counts.entry(rule.kind).or_insert(0) += hits;
                }
            }
            current = next;
        }
        current
    }

    /// Env-style assignments are skipped on lines the prefixed-key rule
    /// already handled.
    fn mask_env_assignments(&self, rule: &RedactionRule, text: &str, hits: &mut usize) -> String {
        text.split('\n')
            .map(|line| {
                if line.contains(REDACTED_KEY) {
                    return line.to_string();
                }
                replace_counted(&rule.pattern, line, hits, |caps| {
                    if caps[2].starts_with(SENTINEL_PREFIX) {
                        return None;
                    }
                    Some(format!("{}={}", &caps[1], REDACTED))
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Length and entropy gate for a candidate token, ignoring surrounding quotes.
    pub fn is_high_entropy_token(&self, token: &str) -> bool {
        let token = token.trim().trim_matches(|c| c == '"' || c == '\'');
        if token.chars().count() < self.settings.min_secret_len {
            return false;
        }
        shannon_entropy(token) >= self.settings.entropy_threshold
    }
}

/// Replace matches, where the closure returning `None` leaves the match as is.
fn replace_counted<F>(pattern: &Regex, text: &str, hits: &mut usize, mut replace: F) -> String
where
    F: FnMut(&Captures) -> Option<String>,
{
    pattern
        .replace_all(text, |caps: &Captures| match replace(caps) {
            Some(replacement) => {
                if replacement != caps[0] {
                    *hits += 1;
                }
                replacement
            }
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Tokens with an interior underscore read as identifiers, not secrets.
fn looks_like_identifier(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    chars.len() > 2 && chars[1..chars.len() - 1].contains(&'_')
}

/// Shannon entropy in bits per character.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut freq: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *freq.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    freq.values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
