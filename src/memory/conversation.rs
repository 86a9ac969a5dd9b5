//! Session-scoped conversation memory
//!
//! Keeps a sliding window of recent turns and the set of symbols currently
//! under discussion, so follow-up questions ("nó", "cổ phiếu đó", "it") can
//! be resolved by the planner.

use crate::memory::store::{ConversationTurn, TurnRole};
use std::collections::VecDeque;
use tracing::debug;

/// Exchanges (user + assistant pairs) kept by default
pub const DEFAULT_MAX_EXCHANGES: usize = 20;

/// Characters of each turn embedded into the planning context
pub const CONTEXT_CHAR_LIMIT: usize = 600;

/// Opening of the hint line naming the active symbols
pub const ACTIVE_ENTITY_HINT_PREFIX: &str = "[Active symbols: ";

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    max_exchanges: usize,
    turns: VecDeque<ConversationTurn>,
    /// Entities of the latest turn that carried any. Never cleared by an
    /// entity-less turn, and survives trimming of that turn.
    active_entities: Vec<String>,
}

impl ConversationMemory {
    pub fn new(max_exchanges: usize) -> Self {
        let max_exchanges = max_exchanges.max(1);
        Self {
            max_exchanges,
            turns: VecDeque::new(),
            active_entities: Vec::new(),
        }
    }

    /// Record a turn and slide the window.
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>, entities: Vec<String>) {
        let turn = ConversationTurn::new(role, content, entities);

        if !turn.entities.is_empty() {
            self.active_entities = turn.entities.clone();
        }

        self.turns.push_back(turn);

        let budget = self.max_exchanges.saturating_mul(2);
        while self.turns.len() > budget {
            self.turns.pop_front();
        }

        debug!(
            turns = self.turns.len(),
            active = ?self.active_entities,
            "Conversation memory updated"
        );
    }

    /// Transcript of the last `last_n` exchanges plus the active-symbol hint.
    ///
    /// Empty when `last_n` is zero or nothing has been said yet.
    pub fn recent_context(&self, last_n: usize) -> String {
        let take = last_n.saturating_mul(2).min(self.turns.len());
        if take == 0 {
            return String::new();
        }

        let mut lines: Vec<String> = self
            .turns
            .iter()
            .skip(self.turns.len() - take)
            .map(|turn| format!("{}: {}", turn.role, turn.excerpt(CONTEXT_CHAR_LIMIT)))
            .collect();

        if !self.active_entities.is_empty() {
            lines.push(format!(
                "{}{}]",
                ACTIVE_ENTITY_HINT_PREFIX,
                self.active_entities.join(", ")
            ));
        }

        lines.join("\n")
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.active_entities.clear();
    }

    pub fn active_entities(&self) -> &[String] {
        &self.active_entities
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXCHANGES)
    }
}

/// Read the active symbols back out of a context produced by `recent_context`.
pub fn active_entities_from_context(context: &str) -> Vec<String> {
    context
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(ACTIVE_ENTITY_HINT_PREFIX))
        .map(|rest| {
            rest.trim_end_matches(']')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
