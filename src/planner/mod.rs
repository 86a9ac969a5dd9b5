//! Planner trait and implementations
//!
//! The LLM planner turns a question into a structured plan of tool calls.
//! Whatever goes wrong on that path, the deterministic fallback planner
//! answers instead, so planning never fails the request.

use crate::llm::{render_prompt, LlmClient, StructuredOutput};
use crate::models::Plan;
use crate::tools::ToolRegistry;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod fallback;
pub use fallback::{extract_symbols, FallbackPlanner, IntentRule, QueryFeatures, RULES};

/// Trait for plan generation
#[async_trait]
pub trait Planner: Send + Sync {
    /// Create a plan for a query. `context` is the recent conversation
    /// transcript and may be empty.
    async fn create_plan(&self, query: &str, context: &str) -> Result<Plan>;
}

const PLANNER_PROMPT: &str = r#"Bạn là AI planner cho hệ thống phân tích chứng khoán Việt Nam.

NHIỆM VỤ: Phân tích câu hỏi và tạo plan để gọi các tools cần thiết.

## Tools có sẵn:
{tools}

## Format output (JSON):
{
    "intent": "mô tả ngắn gọn ý định",
    "symbols": ["VNM", "FPT"],
    "steps": [
        {
            "step": 1,
            "tool": "tool_name",
            "action": "action_name",
            "params": {"symbol": "VNM"},
            "reason": "tại sao cần tool này",
            "parallel_group": 1
        }
    ]
}

## Lưu ý quan trọng:
- Chỉ dùng các `tool` và `action` được liệt kê trong mục "Tools có sẵn" ở trên
- Các step cùng `parallel_group` chạy song song; group nhỏ hơn chạy trước
- Mỗi step chỉ nhận đúng 1 symbol (string). Khi so sánh 2+ cổ phiếu, tạo các steps RIÊNG BIỆT cho từng symbol, KHÔNG truyền list symbols vào 1 step.
- Nếu câu hỏi dùng đại từ "nó", "cổ phiếu đó", "của nó"... hãy dựa vào dòng [Active symbols: ...] trong Context hội thoại để xác định symbol. KHÔNG để symbol trống.

## Ví dụ:
- "Phân tích FPT" → vnstock_connector(stock_overview, symbol=FPT) + financial_ratios(all, symbol=FPT) + technical_indicators(summary, symbol=FPT)
- "Thị trường hôm nay" → market_overview(summary)
- "Khối ngoại mua gì" → money_flow(top_foreign_buy)
- "So sánh FPT và VNM" → vnstock_connector(stock_overview, symbol=FPT) + financial_ratios(all, symbol=FPT) + vnstock_connector(stock_overview, symbol=VNM) + financial_ratios(all, symbol=VNM)

Câu hỏi: {query}"#;

/// LLM-driven planner with a deterministic safety net
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    fallback: FallbackPlanner,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            fallback: FallbackPlanner::new(),
        }
    }

    fn build_prompt(&self, query: &str, context: &str) -> String {
        let tools = self.tools.describe();
        let prompt = render_prompt(PLANNER_PROMPT, &[("tools", tools.as_str()), ("query", query)]);

        if context.trim().is_empty() {
            prompt
        } else {
            format!("{}\n\n## Conversation context:\n{}", prompt, context)
        }
    }

    /// Accept a structured answer only if it decodes into a plan with steps.
    fn accept(&self, output: StructuredOutput, query: &str) -> std::result::Result<Plan, String> {
        let value = match output {
            StructuredOutput::Value(value) => value,
            StructuredOutput::Undecodable { .. } => {
                return Err("response is not valid JSON".to_string())
            }
        };

        let mut plan = Plan::from_value(value).map_err(|e| e.to_string())?;
        if !plan.has_steps() {
            return Err("plan has no steps".to_string());
        }

        if plan.symbols.is_empty() {
            plan.symbols = plan.step_symbols();
        }
        if plan.symbols.is_empty() {
            plan.symbols = extract_symbols(query);
        }

        Ok(plan)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn create_plan(&self, query: &str, context: &str) -> Result<Plan> {
        let prompt = self.build_prompt(query, context);

        let rejected = match self.llm.generate_structured(&prompt, None).await {
            Ok(output) => match self.accept(output, query) {
                Ok(plan) => {
                    info!(
                        steps = plan.steps.len(),
                        symbols = ?plan.symbols,
                        intent = %plan.intent,
                        "LLM plan created"
                    );
                    return Ok(plan);
                }
                Err(reason) => reason,
            },
            Err(e) => e.to_string(),
        };

        warn!(reason = %rejected, "LLM planner failed, using fallback");
        Ok(self.fallback.plan(query, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedLlm, StaticTool};
    use serde_json::json;

    fn build(llm: ScriptedLlm) -> (Arc<ScriptedLlm>, LlmPlanner) {
        let llm = Arc::new(llm);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool::new("market_overview", json!({}))));
        let planner = LlmPlanner::new(llm.clone(), Arc::new(registry));
        (llm, planner)
    }

    #[tokio::test]
    async fn test_valid_llm_plan_is_used() {
        let (llm, planner) = build(ScriptedLlm::new().reply(
            r#"{"intent": "company", "symbols": ["FPT"], "steps": [
                {"step": 1, "tool": "vnstock_connector", "action": "stock_overview", "params": {"symbol": "FPT"}}
            ]}"#,
        ));

        let plan = planner.create_plan("Thông tin FPT", "").await.unwrap();

        assert_eq!(plan.intent, "company");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(llm.calls(), 1);
        assert!(llm.prompt(0).contains("**market_overview**"));
        assert!(llm.prompt(0).contains("Câu hỏi: Thông tin FPT"));
    }

    #[tokio::test]
    async fn test_empty_steps_use_fallback() {
        let (_, planner) = build(ScriptedLlm::new().reply(r#"{"intent": "x", "steps": []}"#));

        let plan = planner.create_plan("So sánh FPT và VNM", "").await.unwrap();

        assert!(plan.intent.starts_with("Fallback plan"));
        assert!(plan.steps.len() >= 2);
    }

    #[tokio::test]
    async fn test_undecodable_and_transport_failures_use_fallback() {
        let (_, planner) = build(
            ScriptedLlm::new()
                .reply("Tôi nghĩ bạn nên xem thị trường")
                .fail("quota exceeded"),
        );

        let first = planner.create_plan("Thị trường hôm nay", "").await.unwrap();
        let second = planner.create_plan("Thị trường hôm nay", "").await.unwrap();

        for plan in [first, second] {
            assert!(plan.has_steps());
            assert_eq!(plan.steps[0].tool, "market_overview");
        }
    }

    #[tokio::test]
    async fn test_bad_steps_are_left_to_the_executor() {
        let (_, planner) = build(ScriptedLlm::new().reply(
            r#"{"intent": "x", "steps": [{"action": "summary"}, {"tool": "a", "action": "b", "params": 7}]}"#,
        ));

        let plan = planner.create_plan("xyz", "").await.unwrap();

        assert_eq!(plan.intent, "x");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool, "");
        assert!(plan.steps[1].malformed.is_some());
    }

    #[tokio::test]
    async fn test_placeholder_in_query_is_not_expanded() {
        let (llm, planner) = build(ScriptedLlm::new().fail("offline"));

        planner.create_plan("{tools} là gì?", "").await.unwrap();

        let prompt = llm.prompt(0);
        assert!(prompt.contains("Câu hỏi: {tools} là gì?"));
        assert_eq!(prompt.matches("**market_overview**").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_symbols_are_derived() {
        let (_, planner) = build(ScriptedLlm::new().reply(
            r#"{"steps": [{"tool": "financial_ratios", "action": "all", "params": {"symbol": "VNM"}}]}"#,
        ));
        let plan = planner.create_plan("Chỉ số VNM", "").await.unwrap();
        assert_eq!(plan.symbols, vec!["VNM".to_string()]);

        let (_, planner) = build(ScriptedLlm::new().reply(
            r#"{"steps": [{"tool": "market_overview", "action": "summary"}]}"#,
        ));
        let plan = planner.create_plan("HPG có nên mua", "").await.unwrap();
        assert_eq!(plan.symbols, vec!["HPG".to_string()]);
    }

    #[tokio::test]
    async fn test_context_is_appended_to_prompt() {
        let (llm, planner) = build(ScriptedLlm::new().fail("offline"));

        let context = "User: Phân tích FPT\n[Active symbols: FPT]";
        let plan = planner.create_plan("Giá của nó?", context).await.unwrap();

        assert!(llm.prompt(0).contains("## Conversation context:\nUser: Phân tích FPT"));
        assert_eq!(plan.symbols, vec!["FPT".to_string()]);
    }
}
