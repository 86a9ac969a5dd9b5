//! Conversation turn records
//!
//! A turn is one message in the exchange log, user or assistant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        };
        write!(f, "{}", s)
    }
}

/// A single message in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: TurnRole,
    /// Plain answer text, without the execution summary.
    pub content: String,
    /// Symbols this turn is about, possibly empty.
    pub entities: Vec<String>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content: content.into(),
            entities: dedup_in_order(entities),
        }
    }

    /// Content cut to at most `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((byte_index, _)) => &self.content[..byte_index],
            None => &self.content,
        }
    }
}

fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ConversationTurn::new(
            TurnRole::User,
            "Phân tích FPT",
            vec!["FPT".to_string(), "FPT".to_string(), String::new()],
        );
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.entities, vec!["FPT".to_string()]);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let turn = ConversationTurn::new(TurnRole::Assistant, "Cổ phiếu tốt", vec![]);
        assert_eq!(turn.excerpt(2), "Cổ");
        assert_eq!(turn.excerpt(100), "Cổ phiếu tốt");
    }
}
