//! Prompt assembly
//!
//! Deterministic: the same passages, history and question always produce
//! the same messages.

use pdfchat_common::llm::ChatMessage;
use pdfchat_common::models::{ConversationTurn, ScoredPassage};
use std::fmt::Write;

/// Default answering instructions
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about a PDF document. \
Answer the question based ONLY on the provided context passages. \
If the context doesn't contain the answer, say that you don't know. Do not make up information.";

/// Heading that precedes the numbered passages in the system message
pub const CONTEXT_HEADING: &str = "Context:";

/// Label preceding the follow-up question in a condense prompt
pub const FOLLOW_UP_LABEL: &str = "Follow-up question:";

/// Final line of a condense prompt
pub const STANDALONE_LABEL: &str = "Standalone question:";

/// Builds chat messages for answering and for condensing follow-ups
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PromptBuilder {
    pub fn new(system_prompt: Option<String>) -> Self {
        Self {
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    /// Answering prompt: system message with numbered passages, prior turns
    /// oldest first, then the question
    pub fn build(
        &self,
        passages: &[ScoredPassage],
        history: &[ConversationTurn],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut system = format!("{}\n\n{}\n", self.system_prompt, CONTEXT_HEADING);
        for (i, scored) in passages.iter().enumerate() {
            let _ = writeln!(
                system,
                "[{}] (page {}) {}",
                i + 1,
                scored.passage.page_number,
                scored.passage.text
            );
        }

        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(system));
        for turn in history {
            let (question, answer) = turn.as_pair();
            messages.push(ChatMessage::user(question));
            messages.push(ChatMessage::assistant(answer));
        }
        messages.push(ChatMessage::user(question));
        messages
    }

    /// Prompt asking the model to rewrite a follow-up as a standalone question
    pub fn condense(&self, history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
        let mut prompt = String::from(
            "Given the following conversation and a follow-up question, rephrase the follow-up \
             question to be a standalone question. Reply with the question only.\n\nChat history:\n",
        );
        for turn in history {
            let _ = writeln!(prompt, "Human: {}\nAssistant: {}", turn.question, turn.answer);
        }
        let _ = write!(prompt, "\n{} {}\n{}", FOLLOW_UP_LABEL, question, STANDALONE_LABEL);

        vec![ChatMessage::user(prompt)]
    }
}
