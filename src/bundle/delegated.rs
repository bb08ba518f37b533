//! Hosted-model renderer: asks an OpenRouter chat model to condense the
//! prepared sections into the bundle.
//!
//! Sections reach the model already redacted. The reply must keep the
//! `## Expanded Files` anchor; when the model drops it, the expanded body is
//! re-attached under a fresh anchor so later `expand` runs still find it.
use super::{BundleRenderer, GENERATOR_MARKER, TITLE};
use crate::collect::{Section, Sections, EXPANDED_MARKER};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = "You condense project documentation into a compact context \
document for an AI coding assistant. Keep every section heading exactly as given, in the \
same order. Preserve names, interfaces and decisions; drop repetition and filler. Never \
invent content. Reply with the markdown document only.";

pub struct DelegatedRenderer {
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl DelegatedRenderer {
    pub fn new(api_key: String, model: String) -> Self {
        Self { api_key, model }
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let start = Instant::now();
        let mut response = agent
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send_json(&request)
            .with_context(|| format!("call OpenRouter model {}", self.model))?;
        let parsed: ChatResponse = response
            .body_mut()
            .read_json()
            .context("decode OpenRouter response")?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            model = %self.model,
            prompt_bytes = prompt.len(),
            "delegated render complete"
        );

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("OpenRouter returned no content"))
    }
}

/// Prompt body: the same headings the manual renderer writes, with their
/// prepared bodies.
fn build_prompt(sections: &Sections) -> String {
    let mut prompt = format!(
        "Condense the following into a document that starts with `{TITLE}` and \
         `{GENERATOR_MARKER}`.\n\n"
    );
    for (section, body) in sections.iter() {
        prompt.push_str(&format!("## {}\n{}\n\n", section.heading(), body));
    }
    prompt
}

/// Guarantee the expanded-files anchor survives the model's rewrite.
fn ensure_expanded_anchor(document: String, sections: &Sections) -> String {
    if document.contains(EXPANDED_MARKER) {
        return document;
    }
    format!(
        "{}\n\n## {}\n\n{}",
        document.trim_end(),
        Section::Expanded.heading(),
        sections.get(Section::Expanded)
    )
}

impl BundleRenderer for DelegatedRenderer {
    fn name(&self) -> &'static str {
        "delegated"
    }

    fn render(&self, sections: &Sections) -> Result<String> {
        let document = self.complete(&build_prompt(sections))?;
        Ok(ensure_expanded_anchor(document, sections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Sections {
        let mut sections = Sections::default();
        for section in Section::ALL {
            sections.set(section, "None");
        }
        sections.set(Section::Expanded, "### main.py\n(no docstrings)");
        sections
    }

    #[test]
    fn prompt_lists_every_heading_in_order() {
        let prompt = build_prompt(&sections());
        let positions: Vec<usize> = Section::ALL
            .iter()
            .map(|section| {
                prompt
                    .find(&format!("## {}\n", section.heading()))
                    .expect("heading present")
            })
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn missing_anchor_is_restored_with_expanded_body() {
        let document = ensure_expanded_anchor("# Summary\nshort".to_string(), &sections());
        assert!(document.ends_with("## Expanded Files\n\n### main.py\n(no docstrings)"));
        assert!(document.contains(EXPANDED_MARKER));
    }

    #[test]
    fn present_anchor_is_left_alone() {
        let reply = "# T\n\n## Expanded Files\n\nkept".to_string();
        assert_eq!(ensure_expanded_anchor(reply.clone(), &sections()), reply);
    }
}
