//! Offline extractive language model
//!
//! Answers by quoting the context sentence that shares the most words with
//! the question. Needs no network or API key, so it backs local development
//! and tests. Understands the prompt layout produced by [`crate::prompt`].

use crate::prompt::{CONTEXT_HEADING, FOLLOW_UP_LABEL, STANDALONE_LABEL};
use async_trait::async_trait;
use pdfchat_common::errors::{AppError, GenerationFailureKind, Result};
use pdfchat_common::llm::{ChatMessage, LanguageModel, Role};
use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "what", "which", "who", "whom", "how", "why",
    "when", "where", "does", "did", "this", "that", "these", "those", "with", "from", "into",
    "about", "is", "of", "in", "on", "to", "a", "an", "it", "its", "be", "by", "as", "at", "or",
];

/// A context passage parsed back out of the system message
#[derive(Debug, PartialEq)]
struct ContextPassage<'a> {
    page: &'a str,
    text: &'a str,
}

/// Deterministic model that extracts its answer from the prompt's context
#[derive(Debug, Clone, Default)]
pub struct ExtractiveModel;

impl ExtractiveModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModel for ExtractiveModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| AppError::generation(GenerationFailureKind::MalformedResponse, "no user message"))?;

        // Condense request: the follow-up is already standalone enough
        if last.content.trim_end().ends_with(STANDALONE_LABEL) {
            return extract_follow_up(&last.content).map(str::to_string).ok_or_else(|| {
                AppError::generation(GenerationFailureKind::EmptyResponse, "no follow-up question")
            });
        }

        let passages: Vec<ContextPassage<'_>> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .flat_map(|m| parse_context(&m.content))
            .collect();

        best_sentence(&last.content, &passages)
            .map(|(page, sentence)| format!("According to page {}: {}", page, sentence))
            .ok_or_else(|| {
                AppError::generation(GenerationFailureKind::EmptyResponse, "no context to answer from")
            })
    }

    fn model_name(&self) -> &str {
        "extractive"
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

fn extract_follow_up(prompt: &str) -> Option<&str> {
    let start = prompt.rfind(FOLLOW_UP_LABEL)? + FOLLOW_UP_LABEL.len();
    let rest = &prompt[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    let question = rest[..end].trim();
    (!question.is_empty()).then_some(question)
}

/// Parse `[n] (page p) text` lines following the context heading
fn parse_context(system: &str) -> Vec<ContextPassage<'_>> {
    let Some(start) = system.find(CONTEXT_HEADING) else {
        return Vec::new();
    };

    system[start + CONTEXT_HEADING.len()..]
        .lines()
        .filter_map(|line| {
            let rest = line.strip_prefix('[')?;
            let rest = &rest[rest.find("] (page ")? + "] (page ".len()..];
            let close = rest.find(')')?;
            Some(ContextPassage {
                page: &rest[..close],
                text: rest[close + 1..].trim(),
            })
        })
        .collect()
}

/// Sentence with the largest word overlap; earlier passages win ties
fn best_sentence<'a>(question: &str, passages: &[ContextPassage<'a>]) -> Option<(&'a str, &'a str)> {
    let wanted = tokens(question);
    let mut best: Option<(usize, &'a str, &'a str)> = None;

    for passage in passages {
        for sentence in passage.text.split_inclusive(['.', '!', '?']) {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            let overlap = tokens(sentence).intersection(&wanted).count();
            if best.map_or(true, |(score, _, _)| overlap > score) {
                best = Some((overlap, passage.page, sentence));
            }
        }
    }

    best.map(|(_, page, sentence)| (page, sentence))
}
