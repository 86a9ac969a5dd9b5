//! Execution engine for plan steps
//!
//! Steps are grouped by `parallel_group`. Groups run in ascending order and
//! each one is a barrier: every step in it settles before the next group
//! starts. A failing step only ever produces a failed `StepResult`.

use crate::error::OrchestrationError;
use crate::models::{Plan, PlanStep, StepResult, ToolParams};
use crate::tools::ToolRegistry;
use crate::Result;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Runs plans against the tool registry
pub struct Executor {
    tools: Arc<ToolRegistry>,
    step_timeout: Option<Duration>,
}

impl Executor {
    /// `step_timeout` of `None` lets a step run until it settles.
    pub fn new(tools: Arc<ToolRegistry>, step_timeout: Option<Duration>) -> Self {
        Self {
            tools,
            step_timeout,
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Decode a loosely-typed plan and run it.
    ///
    /// Only a structurally invalid plan is an error.
    pub async fn execute_value(&self, plan: Value) -> Result<Vec<StepResult>> {
        let plan = Plan::from_value(plan)?;
        Ok(self.execute_plan(&plan).await)
    }

    /// Results are ordered by group key, then by declaration order within
    /// the group.
    pub async fn execute_plan(&self, plan: &Plan) -> Vec<StepResult> {
        if plan.steps.is_empty() {
            warn!("Plan contains no steps");
            return vec![StepResult::no_steps()];
        }

        let mut groups: BTreeMap<i32, Vec<&PlanStep>> = BTreeMap::new();
        for step in &plan.steps {
            groups.entry(step.parallel_group).or_default().push(step);
        }

        let started = Instant::now();
        let mut results = Vec::with_capacity(plan.steps.len());

        for (group, steps) in groups {
            debug!(group, steps = steps.len(), "Running parallel group");
            let settled = join_all(steps.into_iter().map(|step| self.execute_step(step))).await;
            results.extend(settled);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            steps = results.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Plan executed"
        );

        results
    }

    async fn execute_step(&self, step: &PlanStep) -> StepResult {
        if let Some(reason) = &step.malformed {
            warn!(step = step.sequence, %reason, "Skipping malformed step");
            return StepResult::failed(step, reason.clone());
        }

        let Some(tool) = self.tools.resolve(&step.tool) else {
            let err = OrchestrationError::ToolNotFound(step.tool.clone());
            warn!(step = step.sequence, tool = %step.tool, "Tool not registered");
            return StepResult::failed(step, err.to_string());
        };

        if !tool.supports(&step.action) {
            let err = OrchestrationError::UnknownAction {
                tool: step.tool.clone(),
                action: step.action.clone(),
            };
            warn!(step = step.sequence, tool = %step.tool, action = %step.action, "Unknown action");
            return StepResult::failed(step, err.to_string());
        }

        let params = normalize_params(step);
        let start = Instant::now();

        debug!(
            step = step.sequence,
            tool = %step.tool,
            action = %step.action,
            group = step.parallel_group,
            "Executing step"
        );

        let call = AssertUnwindSafe(tool.run(&step.action, &params)).catch_unwind();
        let settled = match self.step_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(settled) => settled,
                Err(_) => {
                    warn!(step = step.sequence, tool = %step.tool, "Step timed out");
                    return StepResult::failed(step, format!("Step timed out after {:?}", limit));
                }
            },
            None => call.await,
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;

        match settled {
            Ok(Ok(data)) => {
                debug!(step = step.sequence, tool = %step.tool, elapsed_ms, "Step succeeded");
                StepResult::succeeded(step, data)
            }
            Ok(Err(e)) => {
                warn!(
                    step = step.sequence,
                    tool = %step.tool,
                    action = %step.action,
                    elapsed_ms,
                    error = %e,
                    "Step failed"
                );
                StepResult::failed(step, e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(step = step.sequence, tool = %step.tool, elapsed_ms, %message, "Step panicked");
                StepResult::failed(step, format!("Tool panicked: {}", message))
            }
        }
    }
}

/// A list-valued `symbol` is narrowed to its first element.
fn normalize_params(step: &PlanStep) -> ToolParams {
    let mut params = step.params.clone();

    if let Some(Value::Array(symbols)) = params.get("symbol") {
        let first = symbols
            .first()
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        warn!(
            step = step.sequence,
            symbols = ?symbols,
            "Symbol is a list, taking first element"
        );
        params.insert("symbol".to_string(), first);
    }

    params
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticTool;
    use crate::tools::ToolAction;
    use serde_json::json;

    fn executor(tools: Vec<Arc<StaticTool>>, timeout: Option<Duration>) -> Executor {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        Executor::new(Arc::new(registry), timeout)
    }

    fn order(results: &[StepResult]) -> Vec<u32> {
        results.iter().map(|r| r.sequence).collect()
    }

    #[tokio::test]
    async fn test_results_follow_group_order() {
        let tool = Arc::new(StaticTool::new("market_overview", json!({ "ok": true })));
        let executor = executor(vec![tool], None);

        let plan = Plan::new(
            "ordering",
            vec![],
            vec![
                PlanStep::new(1, "market_overview", "summary").in_group(2),
                PlanStep::new(2, "market_overview", "status").in_group(1),
            ],
        );

        let results = executor.execute_plan(&plan).await;
        assert_eq!(order(&results), vec![2, 1]);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn test_declaration_order_kept_within_group() {
        let tool = Arc::new(StaticTool::new("t", json!(1)));
        let executor = executor(vec![tool], None);

        let plan = Plan::new(
            "mixed",
            vec![],
            vec![
                PlanStep::new(1, "t", "a").in_group(3),
                PlanStep::new(2, "t", "a").in_group(1),
                PlanStep::new(3, "t", "a").in_group(3),
                PlanStep::new(4, "t", "a").in_group(-1),
                PlanStep::new(5, "t", "a").in_group(1),
            ],
        );

        let results = executor.execute_plan(&plan).await;
        assert_eq!(order(&results), vec![4, 2, 5, 1, 3]);
    }

    #[tokio::test]
    async fn test_empty_plan_yields_single_failure() {
        let executor = executor(vec![], None);
        let results = executor.execute_plan(&Plan::new("empty", vec![], vec![])).await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error(), Some("Plan contains no steps"));
    }

    #[tokio::test]
    async fn test_list_symbol_takes_first_element() {
        let tool = Arc::new(StaticTool::new("financial_ratios", json!({ "pe": 12 })));
        let executor = executor(vec![tool.clone()], None);

        let plan = Plan::new(
            "coerce",
            vec![],
            vec![
                PlanStep::new(1, "financial_ratios", "all").with_param("symbol", json!(["FPT", "VNM"])),
                PlanStep::new(2, "financial_ratios", "all").with_param("symbol", json!([])),
            ],
        );

        let results = executor.execute_plan(&plan).await;
        assert!(results.iter().all(|r| r.success));

        let received = tool.received();
        assert_eq!(received[0]["symbol"], "FPT");
        assert_eq!(received[1]["symbol"], "");
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let broken = Arc::new(StaticTool::failing("news_aggregator"));
        let crashing = Arc::new(StaticTool::panicking("company_risk"));
        let healthy = Arc::new(StaticTool::new("market_overview", json!({ "index": 1250 })));
        let executor = executor(vec![broken, crashing, healthy.clone()], None);

        let plan = Plan::new(
            "isolation",
            vec![],
            vec![
                PlanStep::new(1, "news_aggregator", "latest"),
                PlanStep::new(2, "company_risk", "assessment"),
                PlanStep::new(3, "market_overview", "summary"),
                PlanStep::new(4, "missing_tool", "x"),
                PlanStep::new(5, "market_overview", "summary").in_group(2),
            ],
        );

        let results = executor.execute_plan(&plan).await;
        let success: Vec<bool> = results.iter().map(|r| r.success).collect();
        assert_eq!(success, vec![false, false, true, false, true]);
        assert_eq!(healthy.calls(), 2);

        assert!(results[0].error().unwrap().contains("news_aggregator is unavailable"));
        assert!(results[1].error().unwrap().contains("company_risk crashed"));
        assert_eq!(results[3].error(), Some("Tool 'missing_tool' not found"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_not_invoked() {
        let tool = Arc::new(
            StaticTool::new("market_overview", json!({}))
                .with_actions(&[ToolAction::new("summary", "")]),
        );
        let executor = executor(vec![tool.clone()], None);

        let plan = Plan::new("x", vec![], vec![PlanStep::new(1, "market_overview", "teleport")]);
        let results = executor.execute_plan(&plan).await;

        assert!(!results[0].success);
        assert!(results[0].error().unwrap().contains("does not support action 'teleport'"));
        assert_eq!(tool.calls(), 0);
    }

    #[tokio::test]
    async fn test_step_timeout_fails_only_the_slow_step() {
        let slow = Arc::new(StaticTool::sleeping("slow", Duration::from_secs(30)));
        let fast = Arc::new(StaticTool::new("fast", json!("done")));
        let executor = executor(vec![slow, fast], Some(Duration::from_millis(50)));

        let plan = Plan::new(
            "timeout",
            vec![],
            vec![PlanStep::new(1, "slow", "wait"), PlanStep::new(2, "fast", "go")],
        );

        let results = executor.execute_plan(&plan).await;
        assert!(!results[0].success);
        assert!(results[0].error().unwrap().contains("timed out after 50ms"));
        assert!(results[1].success);
    }

    #[tokio::test]
    async fn test_group_steps_run_concurrently() {
        let a = Arc::new(StaticTool::sleeping("a", Duration::from_millis(200)));
        let b = Arc::new(StaticTool::sleeping("b", Duration::from_millis(200)));
        let executor = executor(vec![a, b], None);

        let plan = Plan::new(
            "parallel",
            vec![],
            vec![PlanStep::new(1, "a", "x"), PlanStep::new(2, "b", "x")],
        );

        let started = Instant::now();
        let results = executor.execute_plan(&plan).await;
        assert!(results.iter().all(|r| r.success));
        assert!(started.elapsed() < Duration::from_millis(390));
    }

    #[tokio::test]
    async fn test_execute_value_rejects_non_object() {
        let executor = executor(vec![], None);
        let err = executor.execute_value(json!("plan")).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::InvalidPlan(_)));

        let results = executor
            .execute_value(json!({ "steps": [{ "tool": "nope", "action": "x" }] }))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
    }

    #[tokio::test]
    async fn test_malformed_step_fails_alone() {
        let tool = Arc::new(StaticTool::new("market_overview", json!({ "vnindex": 1250 })));
        let executor = executor(vec![tool.clone()], None);

        let results = executor
            .execute_value(json!({ "steps": [
                { "tool": "market_overview", "action": "summary", "parallel_group": 2.0 },
                { "tool": "market_overview", "action": "summary", "params": "FPT" },
                { "action": "summary" }
            ] }))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(order(&results), vec![2, 3, 1]);

        assert!(!results[0].success);
        assert!(results[0].error().unwrap().starts_with("Invalid step: "));
        assert_eq!(results[1].error(), Some("Tool '' not found"));
        assert!(results[2].success);
        assert_eq!(tool.calls(), 1);
    }
}
