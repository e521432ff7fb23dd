//! Shared data model for the chat pipeline

mod chat;
mod memory;
mod state;

pub use chat::{ChatRequest, ChatResponse, Variable};
pub use memory::{LinkCandidate, MemoryQueryResult, SortType};
pub use state::{keys, ConversationState};
