//! Agent Memory System
//!
//! Conversation turn log and active-symbol tracking used to give the
//! planner multi-turn context

pub mod conversation;
pub mod store;

pub use conversation::{
    active_entities_from_context, ConversationMemory, ACTIVE_ENTITY_HINT_PREFIX,
    CONTEXT_CHAR_LIMIT, DEFAULT_MAX_EXCHANGES,
};
pub use store::{ConversationTurn, TurnRole};
