//! Main orchestrator - implements the request lifecycle
//!
//! INPUT → (GREETING?) → PLAN → EXECUTE → SYNTHESIZE → MEMORY → COMPLETE
//!
//! Any failure in plan, execute or synthesize is answered with an apology
//! and still recorded in memory.

use crate::classifier::{InteractionClassifier, InteractionType, GREETING_RESPONSE};
use crate::config::AgentConfig;
use crate::error::OrchestrationError;
use crate::execution::Executor;
use crate::llm::{GeminiClient, LlmClient};
use crate::memory::{ConversationMemory, TurnRole};
use crate::models::{Plan, StepResult, ToolOutput, ToolParams};
use crate::planner::{LlmPlanner, Planner};
use crate::synthesis::Synthesizer;
use crate::tools::{create_default_registry, ToolRegistry};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Build the apology returned when the pipeline fails.
fn apology(error: &OrchestrationError) -> String {
    format!(
        "Xin lỗi, có lỗi xảy ra: {}\n\nVui lòng thử lại hoặc đặt câu hỏi khác.",
        error
    )
}

/// Execution trace shown above the answer. Never stored in memory.
fn build_summary(plan: &Plan, results: &[StepResult], elapsed: Duration) -> String {
    let mut lines = vec!["---".to_string(), "📦 **Tools:**".to_string()];

    for result in results {
        let icon = if result.success { "✅" } else { "❌" };
        if result.tool.is_empty() {
            lines.push(format!("  {} _(no steps)_", icon));
        } else {
            lines.push(format!("  {} `{}.{}`", icon, result.tool, result.action));
        }
    }

    if !plan.intent.is_empty() {
        lines.push(format!("🎯 **Intent:** {}", plan.intent));
    }
    lines.push(format!("\n⏱️ **Thời gian:** {:.1}s", elapsed.as_secs_f64()));
    lines.push("---".to_string());

    lines.join("\n")
}

/// Coordinates planner, executor and synthesizer for one conversation
pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    executor: Arc<Executor>,
    synthesizer: Arc<Synthesizer>,
    memory: ConversationMemory,
    context_exchanges: usize,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        executor: Arc<Executor>,
        synthesizer: Arc<Synthesizer>,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
            memory,
            context_exchanges: crate::config::DEFAULT_CONTEXT_EXCHANGES,
        }
    }

    /// Wire the standard pipeline: LLM planner, executor over `tools`,
    /// synthesizer on the same LLM.
    pub fn from_config(
        config: &AgentConfig,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let planner = Arc::new(LlmPlanner::new(llm.clone(), tools.clone()));
        let executor = Arc::new(Executor::new(tools.clone(), config.step_timeout));
        let synthesizer = Arc::new(Synthesizer::with_payload_limit(llm.clone(), config.payload_char_limit));

        info!(
            provider = llm.provider(),
            model = llm.model(),
            tools = tools.len(),
            "Orchestrator initialized"
        );

        Self::new(
            planner,
            executor,
            synthesizer,
            ConversationMemory::new(config.memory_max_exchanges),
        )
        .with_context_exchanges(config.context_exchanges)
    }

    /// Gemini client and the remote tool catalog, both taken from `config`.
    pub fn bootstrap(config: &AgentConfig) -> Result<Self> {
        let llm = Arc::new(GeminiClient::new(&config.llm)?);
        let tools = Arc::new(create_default_registry(config.tools_base_url.as_deref())?);
        Ok(Self::from_config(config, llm, tools))
    }

    /// Exchanges of history handed to the planner.
    pub fn with_context_exchanges(mut self, exchanges: usize) -> Self {
        self.context_exchanges = exchanges;
        self
    }

    /// A new conversation sharing this one's collaborators.
    pub fn fork(&self) -> Self {
        Self {
            planner: self.planner.clone(),
            executor: self.executor.clone(),
            synthesizer: self.synthesizer.clone(),
            memory: ConversationMemory::new(self.memory.max_exchanges()),
            context_exchanges: self.context_exchanges,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        self.executor.tools()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools().names().into_iter().map(str::to_string).collect()
    }

    /// Answer one query. Always returns text.
    pub async fn chat(&mut self, query: &str) -> String {
        let start = Instant::now();

        if InteractionClassifier::classify(query) == InteractionType::Greeting {
            self.memory.append(TurnRole::User, query, Vec::new());
            self.memory.append(TurnRole::Assistant, GREETING_RESPONSE, Vec::new());
            return GREETING_RESPONSE.to_string();
        }

        match self.run_pipeline(query).await {
            Ok((plan, results, answer)) => {
                let elapsed = start.elapsed();
                let summary = build_summary(&plan, &results, elapsed);

                self.memory.append(TurnRole::User, query, plan.symbols.clone());
                self.memory.append(TurnRole::Assistant, answer.as_str(), plan.symbols.clone());

                info!(
                    steps = results.len(),
                    failed = results.iter().filter(|r| !r.success).count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query completed"
                );

                format!("{}\n\n{}", summary, answer)
            }
            Err(e) => {
                error!(error = %e, "Pipeline failed");
                let message = apology(&e);
                self.memory.append(TurnRole::User, query, Vec::new());
                self.memory.append(TurnRole::Assistant, message.as_str(), Vec::new());
                message
            }
        }
    }

    async fn run_pipeline(&self, query: &str) -> Result<(Plan, Vec<StepResult>, String)> {
        info!(query, "Planning");
        let context = self.memory.recent_context(self.context_exchanges);
        let plan = self.planner.create_plan(query, &context).await?;

        info!(steps = plan.steps.len(), "Executing");
        let results = self.executor.execute_plan(&plan).await;

        info!("Synthesizing response");
        let answer = self.synthesizer.synthesize(query, &results).await?;

        Ok((plan, results, answer))
    }

    /// Run one tool action, bypassing planning and synthesis.
    pub async fn direct_tool_call(&self, tool_name: &str, action: &str, params: ToolParams) -> ToolOutput {
        let Some(tool) = self.tools().resolve(tool_name) else {
            return ToolOutput::failure(OrchestrationError::ToolNotFound(tool_name.to_string()).to_string());
        };

        if !tool.supports(action) {
            let err = OrchestrationError::UnknownAction {
                tool: tool_name.to_string(),
                action: action.to_string(),
            };
            return ToolOutput::failure(err.to_string());
        }

        match tool.run(action, &params).await {
            Ok(data) => ToolOutput::ok(data),
            Err(e) => {
                warn!(tool = tool_name, action, error = %e, "Direct tool call failed");
                ToolOutput::failure(e.to_string())
            }
        }
    }
}
