//! Tool trait and registry
//!
//! Tools compute the domain results (prices, ratios, news...). The agent
//! only resolves them by name and runs one action at a time.

use crate::models::ToolParams;
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod catalog;
pub mod remote;

pub use catalog::{ToolSpec, CATALOG};
pub use remote::{create_default_registry, RemoteTool, ToolServiceClient};

/// Longest per-action hint placed in the planner's tool listing
const ACTION_HINT_CHARS: usize = 80;

/// One action a tool exposes, with a short hint for the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAction {
    pub name: &'static str,
    pub description: &'static str,
}

impl ToolAction {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Actions this tool accepts. An empty list accepts any action.
    fn actions(&self) -> &[ToolAction];

    async fn run(&self, action: &str, params: &ToolParams) -> Result<Value>;

    fn supports(&self, action: &str) -> bool {
        let actions = self.actions();
        actions.is_empty() || actions.iter().any(|a| a.name == action)
    }
}

/// Tool registry for looking up tools by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool listing embedded into the planner prompt.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();

        for name in self.names() {
            let Some(tool) = self.tools.get(name) else {
                continue;
            };

            lines.push(format!("- **{}**: {}", name, tool.description().trim()));

            let actions = tool.actions();
            if actions.is_empty() {
                continue;
            }

            let action_list: Vec<&str> = actions.iter().map(|a| a.name).collect();
            lines.push(format!("  Actions: {}", action_list.join(", ")));

            for action in actions.iter().filter(|a| !a.description.is_empty()) {
                let hint: String = action.description.chars().take(ACTION_HINT_CHARS).collect();
                lines.push(format!("    - `{}`: {}", action.name, hint));
            }
        }

        lines.join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticTool;
    use serde_json::json;

    #[test]
    fn test_registry_resolves_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StaticTool::new("market_overview", json!({"ok": true}))));

        assert!(registry.resolve("market_overview").is_some());
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_describe_lists_actions_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(
            StaticTool::new("vnstock_connector", json!({}))
                .with_actions(&[
                    ToolAction::new("stock_overview", "Company overview"),
                    ToolAction::new("stock_price", ""),
                ]),
        ));
        registry.register(Arc::new(StaticTool::new("alerts", json!({}))));

        let description = registry.describe();
        let alerts_at = description.find("**alerts**").unwrap();
        let vnstock_at = description.find("**vnstock_connector**").unwrap();
        assert!(alerts_at < vnstock_at);
        assert!(description.contains("  Actions: stock_overview, stock_price"));
        assert!(description.contains("    - `stock_overview`: Company overview"));
        assert!(!description.contains("`stock_price`:"));
    }

    #[test]
    fn test_supports_checks_declared_actions() {
        let open = StaticTool::new("open", json!({}));
        assert!(open.supports("anything"));

        let strict = StaticTool::new("strict", json!({}))
            .with_actions(&[ToolAction::new("summary", "")]);
        assert!(strict.supports("summary"));
        assert!(!strict.supports("status"));
    }
}
