//! Upload, ask and history flows against real PDFs

mod common;

use common::{
    hash_embedder, offline_config, offline_service, service_from, service_with, write_pdf,
    FailingModel, RecordingModel, SwitchableEmbedder, HARBOUR_PAGES,
};
use pdfchat_context::extractive::ExtractiveModel;
use pdfchat_common::db::MemoryRepository;
use pdfchat_common::errors::{AppError, GenerationFailureKind};
use pdfchat_context::{build_service, ReplyStatus};
use std::sync::Arc;
use tempfile::TempDir;

const LIGHTHOUSE_QUESTION: &str = "What colour did the keeper paint the lighthouse?";

#[tokio::test]
async fn test_upload_then_ask_answers_from_the_right_page() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let service = offline_service();

    let document = service.upload("Harbour report", &path).await.unwrap();
    assert!(document.processed);
    assert_eq!(document.title, "Harbour report");
    assert!(service.turns(document.id).await.unwrap().is_empty());

    let reply = service.ask(document.id, LIGHTHOUSE_QUESTION).await.unwrap();
    assert_eq!(reply.status, ReplyStatus::Answered);
    assert!(!reply.answer.trim().is_empty());
    assert!(reply.answer.contains("crimson"));
    assert_eq!(reply.sources[0].passage.page_number, 2);
    assert!(reply.sources[0].passage.text.contains("lighthouse"));

    let turns = service.turns(document.id).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].question, LIGHTHOUSE_QUESTION);
    assert_eq!(turns[0].answer, reply.answer);
    assert_eq!(turns[0].timestamp, reply.timestamp);
}

#[tokio::test]
async fn test_history_keeps_append_order() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let service = offline_service();
    let document = service.upload("Harbour report", &path).await.unwrap();

    let questions = [
        "How much did revenue grow?",
        LIGHTHOUSE_QUESTION,
        "Why are the vineyards productive?",
    ];
    for question in questions {
        service.ask(document.id, question).await.unwrap();
    }

    let turns = service.turns(document.id).await.unwrap();
    let asked: Vec<&str> = turns.iter().map(|t| t.question.as_str()).collect();
    assert_eq!(asked, questions);
    assert!(turns.windows(2).all(|w| w[0].id < w[1].id));
    assert!(turns.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let newest_first = service.turns_for_display(document.id).await.unwrap();
    assert_eq!(newest_first[0].question, questions[2]);
    assert_eq!(newest_first[2].question, questions[0]);

    // Session history mirrors the persisted log
    let session = service.sessions().get(document.id).await.unwrap();
    assert_eq!(*session.lock_history().await, turns);
}

#[tokio::test]
async fn test_reindex_keeps_ranking() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let service = offline_service();
    let document = service.upload("Harbour report", &path).await.unwrap();

    let before = service.ask(document.id, LIGHTHOUSE_QUESTION).await.unwrap();
    let passages = service.process(document.id).await.unwrap();
    assert_eq!(passages, HARBOUR_PAGES.len());
    let after = service.ask(document.id, LIGHTHOUSE_QUESTION).await.unwrap();

    assert_eq!(before.sources, after.sources);
    assert_eq!(before.answer, after.answer);
    assert_eq!(service.turns(document.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_model_failure_returns_degraded_reply_without_turn() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let service = service_with(
        Arc::new(MemoryRepository::new()),
        Arc::new(FailingModel(GenerationFailureKind::RateLimited)),
    );
    let document = service.upload("Harbour report", &path).await.unwrap();

    let reply = service.ask(document.id, LIGHTHOUSE_QUESTION).await.unwrap();
    assert_eq!(
        reply.status,
        ReplyStatus::Unavailable { kind: GenerationFailureKind::RateLimited }
    );
    assert!(!reply.is_answered());
    assert!(!reply.answer.is_empty());
    assert!(service.turns(document.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_questions_and_documents() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let service = offline_service();
    let document = service.upload("Harbour report", &path).await.unwrap();

    let err = service.ask(document.id, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = service.ask(uuid::Uuid::new_v4(), LIGHTHOUSE_QUESTION).await.unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { .. }));

    assert!(service.turns(document.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pdf_without_text_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "blank.pdf", &["   "]);
    let service = offline_service();

    let err = service.upload("Blank", &path).await.unwrap_err();
    assert!(matches!(err, AppError::Ingestion { .. }));

    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(!documents[0].processed);
}

#[tokio::test]
async fn test_restart_rebuilds_index_and_keeps_log() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);

    let mut config = offline_config();
    config.database.backend = "sqlite".into();
    config.database.url = format!("sqlite://{}?mode=rwc", dir.path().join("chat.db").display());

    let document_id = {
        let service = build_service(&config).await.unwrap();
        let document = service.upload("Harbour report", &path).await.unwrap();
        service.ask(document.id, "How much did revenue grow?").await.unwrap();
        document.id
    };

    let service = build_service(&config).await.unwrap();
    assert!(service.sessions().get(document_id).await.is_none());

    let document = service.document(document_id).await.unwrap();
    assert!(document.processed);

    let reply = service.ask(document_id, LIGHTHOUSE_QUESTION).await.unwrap();
    assert!(reply.is_answered());
    assert_eq!(reply.sources[0].passage.page_number, 2);

    let session = service.sessions().get(document_id).await.unwrap();
    assert!(session.index().await.is_some());

    let turns = service.turns(document_id).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].question, "How much did revenue grow?");
    assert_eq!(turns[1].question, LIGHTHOUSE_QUESTION);
}

#[tokio::test]
async fn test_embedding_outage_keeps_errors_on_the_error_channel() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let config = offline_config();
    let embedder = Arc::new(SwitchableEmbedder::new(hash_embedder(&config)));
    let service = service_from(&config, embedder.clone(), Arc::new(ExtractiveModel::new()));

    // Indexing fails: the document is recorded but stays unprocessed
    embedder.set_down(true);
    let err = service.upload("Harbour report", &path).await.unwrap_err();
    assert!(matches!(err, AppError::Indexing { .. }));

    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert!(!documents[0].processed);
    let document_id = documents[0].id;

    let err = service.ask(document_id, LIGHTHOUSE_QUESTION).await.unwrap_err();
    assert!(matches!(err, AppError::NotProcessed { .. }));

    // Recovery, then the question embedding fails
    embedder.set_down(false);
    assert_eq!(service.process(document_id).await.unwrap(), HARBOUR_PAGES.len());
    assert!(service.document(document_id).await.unwrap().processed);

    embedder.set_down(true);
    let err = service.ask(document_id, LIGHTHOUSE_QUESTION).await.unwrap_err();
    assert!(matches!(err, AppError::Embedding { .. }));
    assert!(service.turns(document_id).await.unwrap().is_empty());

    embedder.set_down(false);
    assert!(service.ask(document_id, LIGHTHOUSE_QUESTION).await.unwrap().is_answered());
    assert_eq!(service.turns(document_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_condensed_question_drives_the_answer() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "harbour.pdf", &HARBOUR_PAGES);
    let mut config = offline_config();
    config.rag.condense_question = true;

    let model = Arc::new(RecordingModel::new(LIGHTHOUSE_QUESTION));
    let service = service_from(&config, Arc::new(hash_embedder(&config)), model.clone());
    let document = service.upload("Harbour report", &path).await.unwrap();

    service.ask(document.id, "How much did revenue grow?").await.unwrap();
    let reply = service.ask(document.id, "And what colour is it?").await.unwrap();
    assert!(reply.is_answered());
    assert_eq!(reply.sources[0].passage.page_number, 2);

    // No history on the first question, so nothing to condense
    assert_eq!(
        model.answered_questions(),
        vec!["How much did revenue grow?".to_string(), LIGHTHOUSE_QUESTION.to_string()]
    );

    let turns = service.turns(document.id).await.unwrap();
    assert_eq!(turns[1].question, "And what colour is it?");
}
