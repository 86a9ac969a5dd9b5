//! Answer synthesis
//!
//! Step results are rendered into labeled sections and handed to the LLM
//! together with the question and today's date. The completion is returned
//! as-is.

use crate::config::DEFAULT_PAYLOAD_LIMIT;
use crate::llm::{render_prompt, LlmClient};
use crate::models::StepResult;
use crate::Result;
use chrono::Local;
use std::sync::Arc;
use tracing::debug;

/// Appended to a payload cut at the size ceiling
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

const SYNTHESIZER_PROMPT: &str = r#"Bạn là AI phân tích chứng khoán Việt Nam.

Dựa trên dữ liệu từ tools, hãy tổng hợp câu trả lời tiếng Việt chuyên nghiệp.

## Câu hỏi:
{query}

## Dữ liệu từ tools:
{results}

## Yêu cầu:
- Trả lời bằng tiếng Việt, chuyên nghiệp, dễ hiểu
- Luôn nêu rõ khoảng thời gian của dữ liệu thực tế (`actual_start`, `actual_end` nếu có)
- Nếu dữ liệu chỉ có đến ngày cũ hơn hôm nay, nói rõ: "Dữ liệu mới nhất đến ngày X"
- Dùng số liệu cụ thể từ dữ liệu, đưa ra phân tích và nhận định
- Format markdown: headings, bullets, tables
- Nếu thiếu dữ liệu hoặc tool lỗi, nói rõ và phân tích phần có dữ liệu
- Kết luận ngắn gọn

Ngày hôm nay: {current_date}"#;

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    payload_char_limit: usize,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::with_payload_limit(llm, DEFAULT_PAYLOAD_LIMIT)
    }

    pub fn with_payload_limit(llm: Arc<dyn LlmClient>, payload_char_limit: usize) -> Self {
        Self {
            llm,
            payload_char_limit,
        }
    }

    /// Render the results and ask the LLM for the final answer.
    ///
    /// LLM failures propagate; the orchestrator turns them into an apology.
    pub async fn synthesize(&self, query: &str, results: &[StepResult]) -> Result<String> {
        let prompt = self.build_prompt(query, results);
        debug!(sections = results.len(), prompt_chars = prompt.len(), "Synthesizing answer");
        self.llm.generate_text(&prompt, None).await
    }

    fn build_prompt(&self, query: &str, results: &[StepResult]) -> String {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let results = self.format_results(results);
        render_prompt(
            SYNTHESIZER_PROMPT,
            &[("query", query), ("current_date", today.as_str()), ("results", results.as_str())],
        )
    }

    /// One section per result, separated by blank lines.
    pub fn format_results(&self, results: &[StepResult]) -> String {
        results
            .iter()
            .map(|result| self.format_section(result))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn format_section(&self, result: &StepResult) -> String {
        let header = format!("## Tool: {} → {}", result.tool, result.action);

        match result.data() {
            Some(data) => {
                let rendered = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
                format!(
                    "{}\n✅ Success\n```json\n{}\n```",
                    header,
                    truncate_payload(&rendered, self.payload_char_limit)
                )
            }
            None => format!(
                "{}\n❌ Error: {}",
                header,
                result.error().unwrap_or("Unknown error")
            ),
        }
    }
}

/// Cut to `limit` characters, marking the cut.
pub fn truncate_payload(payload: &str, limit: usize) -> String {
    match payload.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &payload[..cut], TRUNCATION_MARKER),
        None => payload.to_string(),
    }
}
