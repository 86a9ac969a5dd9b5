//! Vietnamese Market Agent
//!
//! A conversational agent that answers questions about the Vietnamese
//! stock market:
//! - Plans tool calls with an LLM, with a deterministic keyword fallback
//! - Executes plan steps in parallel groups, isolating failures per step
//! - Synthesizes a Vietnamese answer from the tool results
//! - Remembers recent turns and the symbols under discussion
//!
//! PIPELINE:
//! INPUT → PLAN → EXECUTE → SYNTHESIZE → MEMORY

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod memory;
pub mod models;
pub mod planner;
pub mod synthesis;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use agent::Orchestrator;
pub use classifier::{InteractionClassifier, InteractionType};
pub use config::AgentConfig;
pub use error::OrchestrationError;
