//! Answer generation
//!
//! Provides:
//! - `Generator`: prompt assembly plus the language model call
//! - `ChatReply`: the tagged result handed to callers
//!
//! Language model failures never reach callers as errors; they become a
//! `ChatReply` with `ReplyStatus::Unavailable` carrying the failure kind.

use crate::prompt::PromptBuilder;
use chrono::{DateTime, Utc};
use pdfchat_common::errors::{AppError, GenerationFailureKind, Result};
use pdfchat_common::llm::LanguageModel;
use pdfchat_common::metrics::{self, StageTimer};
use pdfchat_common::models::{ConversationTurn, ScoredPassage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Whether a reply carries a real answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReplyStatus {
    Answered,
    /// The language model failed; the answer text is a fixed notice
    Unavailable { kind: GenerationFailureKind },
}

/// Reply to one question
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    pub status: ReplyStatus,
    /// Passages the answer was generated from
    #[serde(skip)]
    pub sources: Vec<ScoredPassage>,
}

impl ChatReply {
    pub fn answered(answer: String, timestamp: DateTime<Utc>, sources: Vec<ScoredPassage>) -> Self {
        Self {
            answer,
            timestamp,
            status: ReplyStatus::Answered,
            sources,
        }
    }

    /// Degraded reply for a failed language model call
    pub fn unavailable(kind: GenerationFailureKind, sources: Vec<ScoredPassage>) -> Self {
        Self {
            answer: format!(
                "I'm unable to answer right now: the language model failed ({}). Please try again.",
                kind
            ),
            timestamp: Utc::now(),
            status: ReplyStatus::Unavailable { kind },
            sources,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.status == ReplyStatus::Answered
    }
}

/// Prompt assembly plus language model invocation
pub struct Generator {
    model: Arc<dyn LanguageModel>,
    prompts: PromptBuilder,
}

impl Generator {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: PromptBuilder) -> Self {
        Self { model, prompts }
    }

    /// Generate an answer; failures are `AppError::Generation`
    #[instrument(skip_all, fields(model = self.model.model_name(), passages = passages.len(), history = history.len()))]
    pub async fn generate(
        &self,
        passages: &[ScoredPassage],
        history: &[ConversationTurn],
        question: &str,
    ) -> Result<String> {
        let messages = self.prompts.build(passages, history, question);

        let timer = StageTimer::start();
        let result = self.model.complete(&messages).await;
        metrics::record_generation(timer.elapsed_secs(), self.model.model_name());

        let answer = result.map_err(normalise_failure)?;
        if answer.trim().is_empty() {
            return Err(AppError::generation(
                GenerationFailureKind::EmptyResponse,
                "model returned only whitespace",
            ));
        }

        debug!(answer_len = answer.len(), "Answer generated");
        Ok(answer)
    }

    /// Rewrite a follow-up into a standalone question, or return it unchanged
    /// when there is no history or the model call fails
    pub async fn condense(&self, history: &[ConversationTurn], question: &str) -> String {
        if history.is_empty() {
            return question.to_string();
        }

        let messages = self.prompts.condense(history, question);
        match self.model.complete(&messages).await {
            Ok(rewritten) if !rewritten.trim().is_empty() => {
                debug!(original = question, rewritten = rewritten.trim(), "Question condensed");
                rewritten.trim().to_string()
            }
            Ok(_) => question.to_string(),
            Err(e) => {
                warn!(error = %e, "Question condensing failed, using the original question");
                question.to_string()
            }
        }
    }
}

/// Any non-generation error out of a model is reported as a provider failure
fn normalise_failure(err: AppError) -> AppError {
    match err {
        AppError::Generation { .. } => err,
        other => AppError::generation(GenerationFailureKind::Provider, other.to_string()),
    }
}
