//! PicForge Context Engine
//!
//! Builds the bounded prompt for one chat turn and post-processes the answer:
//! - Token budgeting per pipeline stage
//! - Intent extraction from the recent conversation
//! - Sort classification and multi-collection retrieval
//! - Greedy snippet and history assembly
//! - File-name link rewriting in the model output
//!
//! Collaborators (language model, retriever, classifier) sit behind traits and
//! are composed once at startup.

pub mod assembler;
pub mod budget;
pub mod classifier;
pub mod completion;
pub mod guard;
pub mod intent;
pub mod links;
pub mod pipeline;
pub mod retrieval;
pub mod template;

pub use assembler::{AssembledContext, ContextAssembler};
pub use budget::BudgetAllocator;
pub use classifier::{create_sort_classifier, SortClassifier};
pub use completion::{create_completion_provider, CompletionSettings, TextCompletionProvider};
pub use intent::IntentExtractor;
pub use links::LinkProcessor;
pub use pipeline::{ChatOutcome, ChatPipeline, PipelineFailure, Stage};
pub use retrieval::{create_retriever, Retriever};
pub use template::PromptRenderer;

#[cfg(test)]
pub(crate) mod testing;
