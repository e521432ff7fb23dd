//! Token budget arithmetic for each pipeline stage
//!
//! All budgets are signed: a configuration whose fixed overhead already
//! exceeds the model limit yields zero or negative values, which callers
//! treat as "include nothing further".

use picforge_common::config::PromptConfig;
use picforge_common::TokenCounter;
use std::sync::Arc;

/// Computes remaining token budgets from fixed prompt overhead
pub struct BudgetAllocator {
    counter: Arc<dyn TokenCounter>,
    completion_token_limit: i64,
    response_token_limit: i64,
    intent_overhead: i64,
    context_overhead: i64,
    document_context_weight: f64,
}

impl BudgetAllocator {
    /// Create an allocator; fixed overhead is counted once here
    pub fn new(config: &PromptConfig, counter: Arc<dyn TokenCounter>) -> Self {
        let intent_overhead = counter.count(&config.intent_overhead_text()) as i64;
        let context_overhead = counter.count(&config.context_overhead_text()) as i64;

        Self {
            counter,
            completion_token_limit: i64::from(config.completion_token_limit),
            response_token_limit: i64::from(config.response_token_limit),
            intent_overhead,
            context_overhead,
            document_context_weight: config.document_context_weight,
        }
    }

    /// Tokens the intent extraction call may spend on history
    pub fn remaining_for_intent(&self) -> i64 {
        self.completion_token_limit - self.response_token_limit - self.intent_overhead
    }

    /// Tokens left for snippets and history once the intent is known
    pub fn remaining_for_context(&self, user_intent: &str) -> i64 {
        self.completion_token_limit
            - self.counter.count(user_intent) as i64
            - self.response_token_limit
            - self.context_overhead
    }

    /// Share of `remaining` allotted to retrieved snippets, rounded down
    pub fn snippet_budget(&self, remaining: i64) -> i64 {
        (remaining as f64 * self.document_context_weight).floor() as i64
    }

    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }
}
