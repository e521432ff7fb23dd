//! Chat pipeline orchestration
//!
//! One run moves strictly forward through
//! `Received → IntentExtracted → Classified → Retrieved → Assembled →
//! Rendered → Completed → LinkProcessed → Done`. Any stage may instead end
//! the run as [`ChatOutcome::Failed`]; nothing is retried.

use crate::assembler::ContextAssembler;
use crate::budget::BudgetAllocator;
use crate::classifier::SortClassifier;
use crate::completion::{CompletionSettings, TextCompletionProvider};
use crate::guard::{bounded, CallKind};
use crate::intent::IntentExtractor;
use crate::links::LinkProcessor;
use crate::retrieval::Retriever;
use crate::template::PromptRenderer;
use picforge_common::metrics::{
    record_chat, record_completion, record_links_rewritten, record_pipeline_failure, record_stage,
};
use picforge_common::models::keys;
use picforge_common::{
    AppConfig, AppError, ChatRequest, ChatResponse, ConversationState, Result, TokenCounter,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, Instrument};
use uuid::Uuid;

/// Pipeline stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    IntentExtracted,
    Classified,
    Retrieved,
    Assembled,
    Rendered,
    Completed,
    LinkProcessed,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::IntentExtracted => "intent_extracted",
            Stage::Classified => "classified",
            Stage::Retrieved => "retrieved",
            Stage::Assembled => "assembled",
            Stage::Rendered => "rendered",
            Stage::Completed => "completed",
            Stage::LinkProcessed => "link_processed",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run that stopped early.
///
/// `stage` is the stage that could not be reached. `response` has an empty
/// value and the variables of the last state reached.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: AppError,
    pub response: ChatResponse,
}

/// Terminal state of a run
#[derive(Debug)]
pub enum ChatOutcome {
    Done(ChatResponse),
    Failed(PipelineFailure),
}

impl ChatOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, ChatOutcome::Done(_))
    }
}

/// Records per-stage latency as the run advances
struct StageClock {
    last: Instant,
}

impl StageClock {
    fn start() -> Self {
        Self { last: Instant::now() }
    }

    fn reached(&mut self, stage: Stage) {
        let now = Instant::now();
        record_stage(stage.as_str(), now.duration_since(self.last).as_secs_f64());
        debug!(stage = stage.as_str(), "Stage reached");
        self.last = now;
    }
}

fn failure(stage: Stage, error: AppError, state: &ConversationState) -> PipelineFailure {
    PipelineFailure {
        stage,
        error,
        response: ChatResponse {
            value: String::new(),
            variables: state.to_variables(),
        },
    }
}

/// Seed the state and append the current message to the history
fn received_state(request: &ChatRequest) -> ConversationState {
    let state = ConversationState::from_request(request);
    let input = state.get_or_empty(keys::INPUT).to_string();
    let history = match state.get(keys::HISTORY) {
        Some(history) if !history.is_empty() => format!("{}\n{}", history, input),
        _ => input,
    };
    state.with(keys::HISTORY, history)
}

/// Top-level chat orchestration over statically composed collaborators
pub struct ChatPipeline {
    budget: BudgetAllocator,
    intent: IntentExtractor,
    assembler: ContextAssembler,
    links: LinkProcessor,
    renderer: Arc<PromptRenderer>,
    completion: Arc<dyn TextCompletionProvider>,
    chat_template: String,
    response_settings: CompletionSettings,
    completion_timeout: Duration,
    expose_prompt: bool,
}

impl ChatPipeline {
    pub fn new(
        config: &AppConfig,
        completion: Arc<dyn TextCompletionProvider>,
        retriever: Arc<dyn Retriever>,
        classifier: Arc<dyn SortClassifier>,
        counter: Arc<dyn TokenCounter>,
    ) -> Result<Self> {
        let prompts = &config.prompts;
        let renderer = Arc::new(PromptRenderer::new(prompts)?);

        let budget = BudgetAllocator::new(prompts, counter.clone());
        let intent = IntentExtractor::new(
            prompts,
            completion.clone(),
            renderer.clone(),
            config.completion_timeout(),
        );
        let assembler = ContextAssembler::new(
            prompts,
            retriever,
            classifier,
            counter,
            config.retrieval.collections.clone(),
            config.retrieval_timeout(),
            config.classifier_timeout(),
        );

        info!(
            intent_budget = budget.remaining_for_intent(),
            collections = config.retrieval.collections.len(),
            "Chat pipeline composed"
        );

        Ok(Self {
            budget,
            intent,
            assembler,
            links: LinkProcessor::new(config.links.image_route.clone()),
            renderer,
            completion,
            chat_template: prompts.chat_prompt_template.clone(),
            response_settings: CompletionSettings::from_generation(
                &prompts.response,
                prompts.response_token_limit,
            ),
            completion_timeout: config.completion_timeout(),
            expose_prompt: config.diagnostics.expose_prompt,
        })
    }

    /// Run one chat turn. `cancel` aborts outstanding collaborator calls.
    pub async fn run(&self, request: &ChatRequest, cancel: &CancellationToken) -> ChatOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("chat", %request_id);

        async move {
            let started = Instant::now();
            let outcome = match self.drive(request, cancel).await {
                Ok(response) => ChatOutcome::Done(response),
                Err(failed) => {
                    let code = failed.error.code().as_code();
                    match failed.error {
                        AppError::Cancelled => {
                            info!(stage = failed.stage.as_str(), "Chat cancelled")
                        }
                        _ => error!(stage = failed.stage.as_str(), code, "Chat failed"),
                    }
                    record_pipeline_failure(failed.stage.as_str(), code);
                    ChatOutcome::Failed(failed)
                }
            };

            let label = if outcome.is_done() { "done" } else { "failed" };
            record_chat(started.elapsed().as_secs_f64(), label);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<ChatResponse, PipelineFailure> {
        let mut clock = StageClock::start();

        let state = received_state(request);
        clock.reached(Stage::Received);

        let intent = self
            .intent
            .extract(&state, &self.budget, cancel)
            .await
            .map_err(|e| failure(Stage::IntentExtracted, e, &state))?;
        let state = state.with(keys::USER_INTENT, intent.as_str());
        clock.reached(Stage::IntentExtracted);

        let remaining = self.budget.remaining_for_context(&intent);
        let snippet_budget = self.budget.snippet_budget(remaining);
        debug!(remaining, snippet_budget, "Context budget computed");

        let sort = self
            .assembler
            .classify(&intent, cancel)
            .await
            .map_err(|e| failure(Stage::Classified, e, &state))?;
        clock.reached(Stage::Classified);

        let ranked = self
            .assembler
            .retrieve(&intent, sort, snippet_budget, cancel)
            .await
            .map_err(|e| failure(Stage::Retrieved, e, &state))?;
        clock.reached(Stage::Retrieved);

        let context = self
            .assembler
            .assemble(&ranked, state.get_or_empty(keys::HISTORY), remaining, snippet_budget);
        debug!(
            sort = sort.as_str(),
            retrieved = ranked.len(),
            included = context.snippets_included,
            history_budget = context.history_budget,
            "Context assembled"
        );
        let state = state.with(keys::CHAT_CONTEXT, context.text.as_str());
        clock.reached(Stage::Assembled);

        let prompt = self.renderer.render_now(&self.chat_template, &state);
        trace!(prompt = %prompt, "Rendered chat prompt");
        let state = state.with(keys::PROMPT, if self.expose_prompt { prompt.as_str() } else { "" });
        clock.reached(Stage::Rendered);

        let answer = self
            .complete(&prompt, cancel)
            .await
            .map_err(|e| failure(Stage::Completed, e, &state))?;
        clock.reached(Stage::Completed);

        let (value, candidates, rewritten) = self.links.process(&context.text, &answer);
        record_links_rewritten(rewritten);
        let link = candidates
            .iter()
            .map(|c| c.target_path.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let state = state.with(keys::LINK, link);
        clock.reached(Stage::LinkProcessed);

        clock.reached(Stage::Done);
        Ok(ChatResponse {
            value,
            variables: state.to_variables(),
        })
    }

    async fn complete(&self, prompt: &str, cancel: &CancellationToken) -> Result<String> {
        let start = Instant::now();
        let outcome = bounded(
            "response generation",
            CallKind::Completion,
            self.completion_timeout,
            cancel,
            self.completion.complete(prompt, &self.response_settings),
        )
        .await;
        record_completion(start.elapsed().as_secs_f64(), "response", outcome.is_ok());

        outcome.map(|answer| answer.trim().to_string())
    }
}
