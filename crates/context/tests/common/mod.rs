//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pdfchat_common::config::AppConfig;
use pdfchat_common::db::MemoryRepository;
use pdfchat_common::embeddings::{Embedder, HashEmbedder};
use pdfchat_common::errors::{AppError, GenerationFailureKind, Result};
use pdfchat_common::index::InMemoryIndexProvider;
use pdfchat_common::llm::{ChatMessage, LanguageModel, Role};
use pdfchat_common::Repository;
use pdfchat_context::extractive::ExtractiveModel;
use pdfchat_context::prompt::STANDALONE_LABEL;
use pdfchat_context::{ChatService, ServiceComponents};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One fact per page, no vocabulary shared between pages
pub const HARBOUR_PAGES: [&str; 3] = [
    "Quarterly revenue grew twelve percent across Norway.",
    "The lighthouse keeper painted the lighthouse crimson.",
    "Volcanic soil makes vineyards unusually productive.",
];

/// Build a PDF with one Helvetica text line per page
pub fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Write a PDF into `dir` and return its path
pub fn write_pdf(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).unwrap();
    path
}

/// Configuration for fully offline services
pub fn offline_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.llm.provider = "extractive".into();
    config.embedding.provider = "hash".into();
    config.embedding.dimension = 256;
    config
}

pub fn service_from(
    config: &AppConfig,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
) -> ChatService {
    ChatService::new(
        config,
        ServiceComponents {
            repository: Arc::new(MemoryRepository::new()),
            embedder,
            index_provider: Arc::new(InMemoryIndexProvider::new(config.rag.distance)),
            language_model: model,
        },
    )
}

pub fn service_with(repository: Arc<dyn Repository>, model: Arc<dyn LanguageModel>) -> ChatService {
    let config = offline_config();
    ChatService::new(
        &config,
        ServiceComponents {
            repository,
            embedder: Arc::new(hash_embedder(&config)),
            index_provider: Arc::new(InMemoryIndexProvider::new(config.rag.distance)),
            language_model: model,
        },
    )
}

pub fn hash_embedder(config: &AppConfig) -> HashEmbedder {
    HashEmbedder::new("feature-hash-v1", config.embedding.dimension)
}

/// In-memory repository, hash embeddings, extractive answers
pub fn offline_service() -> ChatService {
    service_with(Arc::new(MemoryRepository::new()), Arc::new(ExtractiveModel::new()))
}

/// Language model that always fails with the given kind
pub struct FailingModel(pub GenerationFailureKind);

#[async_trait]
impl LanguageModel for FailingModel {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(AppError::generation(self.0, "simulated outage"))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Hash embedder that can be switched off to simulate an outage
pub struct SwitchableEmbedder {
    inner: HashEmbedder,
    down: AtomicBool,
}

impl SwitchableEmbedder {
    pub fn new(inner: HashEmbedder) -> Self {
        Self { inner, down: AtomicBool::new(false) }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::Embedding { message: "embedding service unavailable".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for SwitchableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.check()?;
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.check()?;
        self.inner.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

/// Rewrites every follow-up to a fixed question and records the question
/// each answering prompt ends with
pub struct RecordingModel {
    standalone: String,
    answered: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(standalone: &str) -> Self {
        Self { standalone: standalone.to_string(), answered: Mutex::new(Vec::new()) }
    }

    pub fn answered_questions(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for RecordingModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if last.trim_end().ends_with(STANDALONE_LABEL) {
            return Ok(self.standalone.clone());
        }
        self.answered.lock().unwrap().push(last);
        Ok("Crimson.".to_string())
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}
