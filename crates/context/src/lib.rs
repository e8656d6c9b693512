//! PDFChat conversation engine
//!
//! Provides:
//! - Session store (per-document index snapshot and history)
//! - Top-K passage retrieval
//! - Deterministic prompt assembly
//! - Answer generation with degraded replies on model failure
//! - The `ChatService` facade and its assembly from configuration

pub mod bootstrap;
pub mod extractive;
pub mod generator;
pub mod prompt;
pub mod retrieval;
pub mod service;
pub mod session;

pub use bootstrap::build_service;
pub use generator::{ChatReply, ReplyStatus};
pub use service::{ChatService, ServiceComponents};
pub use session::SessionStore;
