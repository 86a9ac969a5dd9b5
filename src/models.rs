//! Core data models for the market agent

use crate::error::OrchestrationError;
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Open key/value parameters handed to a tool action.
pub type ToolParams = serde_json::Map<String, Value>;

/// Group assigned to steps that do not declare one.
pub const DEFAULT_PARALLEL_GROUP: i32 = 1;

//
// ================= Plan =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbols: Vec<String>,
    #[serde(default, deserialize_with = "steps_one_by_one")]
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(intent: impl Into<String>, symbols: Vec<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            intent: intent.into(),
            symbols,
            steps,
        }
    }

    /// Decode a plan from a loosely-typed JSON value.
    ///
    /// Fails with `InvalidPlan` when the value is not an object or its
    /// `steps` is not a list. A malformed step is kept and marked, so it
    /// still yields exactly one result. An empty `steps` list still decodes.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(OrchestrationError::InvalidPlan(format!(
                "plan must be a JSON object, got {}",
                json_kind(&value)
            )));
        }

        let mut plan: Plan = serde_json::from_value(value)
            .map_err(|e| OrchestrationError::InvalidPlan(e.to_string()))?;
        plan.number_steps();
        Ok(plan)
    }

    pub fn has_steps(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Scalar `symbol` params in step order, de-duplicated.
    pub fn step_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for step in &self.steps {
            if let Some(symbol) = step.symbol() {
                if !symbol.is_empty() && !symbols.iter().any(|s| s == symbol) {
                    symbols.push(symbol.to_string());
                }
            }
        }
        symbols
    }

    /// Fill missing (zero) sequence numbers with the 1-based position.
    fn number_steps(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            if step.sequence == 0 {
                step.sequence = index as u32 + 1;
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    /// 1-based position, for tracing only.
    #[serde(rename = "step", default)]
    pub sequence: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tool: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: ToolParams,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default = "default_parallel_group", deserialize_with = "group_or_default")]
    pub parallel_group: i32,
    /// Why the step could not be decoded. Such a step is never run.
    #[serde(skip)]
    pub malformed: Option<String>,
}

impl PlanStep {
    pub fn new(sequence: u32, tool: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            sequence,
            tool: tool.into(),
            action: action.into(),
            params: ToolParams::new(),
            reason: String::new(),
            parallel_group: DEFAULT_PARALLEL_GROUP,
            malformed: None,
        }
    }

    /// Decode one step; on failure keep whatever tool, action and group
    /// can be read and record the reason.
    fn decode(value: Value) -> Self {
        match PlanStep::deserialize(&value) {
            Ok(step) => step,
            Err(e) => {
                let text = |key: &str| value.get(key).and_then(Value::as_str).unwrap_or_default();
                let mut step = PlanStep::new(0, text("tool"), text("action"));
                step.parallel_group = value
                    .get("parallel_group")
                    .and_then(group_from_value)
                    .unwrap_or(DEFAULT_PARALLEL_GROUP);
                step.malformed = Some(format!("Invalid step: {}", e));
                step
            }
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn in_group(mut self, group: i32) -> Self {
        self.parallel_group = group;
        self
    }

    /// The `symbol` param when it is a plain string.
    pub fn symbol(&self) -> Option<&str> {
        self.params.get("symbol").and_then(Value::as_str)
    }
}

fn default_parallel_group() -> i32 {
    DEFAULT_PARALLEL_GROUP
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn steps_one_by_one<'de, D>(deserializer: D) -> std::result::Result<Vec<PlanStep>, D::Error>
where
    D: Deserializer<'de>,
{
    let steps = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(steps.into_iter().map(PlanStep::decode).collect())
}

/// Integral numbers and numeric strings (`2`, `2.0`, `"2"`); anything else
/// falls back to the default group.
fn group_or_default<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(group_from_value(&value).unwrap_or(DEFAULT_PARALLEL_GROUP))
}

fn group_from_value(value: &Value) -> Option<i32> {
    let number = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }?;
    i32::try_from(number).ok()
}

fn integral(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//
// ================= Execution =================
//

/// Outcome of one executed step. Serialized as `data` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
    Data(Value),
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    #[serde(rename = "step")]
    pub sequence: u32,
    pub tool: String,
    pub action: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn succeeded(step: &PlanStep, data: Value) -> Self {
        Self {
            sequence: step.sequence,
            tool: step.tool.clone(),
            action: step.action.clone(),
            success: true,
            outcome: StepOutcome::Data(data),
        }
    }

    pub fn failed(step: &PlanStep, error: impl Into<String>) -> Self {
        Self {
            sequence: step.sequence,
            tool: step.tool.clone(),
            action: step.action.clone(),
            success: false,
            outcome: StepOutcome::Error(error.into()),
        }
    }

    /// Placeholder result for a plan that has nothing to run.
    pub fn no_steps() -> Self {
        Self {
            sequence: 0,
            tool: String::new(),
            action: String::new(),
            success: false,
            outcome: StepOutcome::Error("Plan contains no steps".to_string()),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            StepOutcome::Data(data) => Some(data),
            StepOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Data(_) => None,
            StepOutcome::Error(error) => Some(error),
        }
    }
}

//
// ================= Tool I/O =================
//

/// Result of a tool call made outside the planning pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
