//! Language-model connector
//!
//! The planner asks for structured (JSON) completions, the synthesizer for
//! plain text. Both go through `LlmClient`.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

pub mod gemini;
pub use gemini::GeminiClient;

/// Appended to prompts that must come back as bare JSON
pub const JSON_ONLY_INSTRUCTION: &str = "\n\nIMPORTANT: Return ONLY valid JSON. \
No markdown, no code blocks, no explanation outside JSON.";

/// What a structured completion decoded to.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredOutput {
    Value(Value),
    /// The model answered, but not with parseable JSON.
    Undecodable { raw: String },
}

impl StructuredOutput {
    pub fn into_value(self) -> Option<Value> {
        match self {
            StructuredOutput::Value(value) => Some(value),
            StructuredOutput::Undecodable { .. } => None,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn generate_text(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// Transport failures are errors; an undecodable answer is not.
    async fn generate_structured(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<StructuredOutput> {
        let full_prompt = format!("{}{}", prompt, JSON_ONLY_INSTRUCTION);
        let raw = self.generate_text(&full_prompt, system_prompt).await?;
        Ok(decode_structured(&raw))
    }
}

/// Fill `{name}` placeholders in one pass. Inserted values are never
/// rescanned, and unknown braces are kept as written.
pub fn render_prompt(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let matched = values.iter().find_map(|(name, value)| {
            after
                .strip_prefix(name)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });

        match matched {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse a completion as JSON, tolerating markdown code fences.
pub fn decode_structured(raw: &str) -> StructuredOutput {
    let cleaned = strip_code_fences(raw);

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => StructuredOutput::Value(value),
        Err(e) => {
            let preview: String = cleaned.chars().take(200).collect();
            warn!(error = %e, raw = %preview, "Failed to parse JSON from LLM");
            StructuredOutput::Undecodable { raw: cleaned }
        }
    }
}

fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text.to_string();
    }

    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_prompt_does_not_rescan_values() {
        let rendered = render_prompt(
            "Q: {query}\nD: {date}\nJSON: {\"steps\": []}",
            &[("query", "{date} là gì?"), ("date", "2026-10-14")],
        );
        assert_eq!(rendered, "Q: {date} là gì?\nD: 2026-10-14\nJSON: {\"steps\": []}");
    }

    #[test]
    fn test_decode_plain_json() {
        let decoded = decode_structured(r#"{"steps": []}"#);
        assert_eq!(decoded, StructuredOutput::Value(json!({ "steps": [] })));
    }

    #[test]
    fn test_decode_fenced_json() {
        let raw = "```json\n{\"intent\": \"x\"}\n```";
        assert_eq!(
            decode_structured(raw).into_value(),
            Some(json!({ "intent": "x" }))
        );
    }

    #[test]
    fn test_decode_failure_is_marked() {
        let decoded = decode_structured("Sure! Here is your plan: step one...");
        assert!(matches!(decoded, StructuredOutput::Undecodable { .. }));
        assert!(decoded.into_value().is_none());
    }
}
