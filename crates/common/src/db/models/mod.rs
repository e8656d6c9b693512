//! SeaORM entity models
//!
//! Database entities for documents and their chat log

mod chat_message;
mod document;

pub use document::{
    Entity as DocumentEntity,
    Model as DocumentRow,
    ActiveModel as DocumentActiveModel,
    Column as DocumentColumn,
};

pub use chat_message::{
    Entity as ChatMessageEntity,
    Model as ChatMessageRow,
    ActiveModel as ChatMessageActiveModel,
    Column as ChatMessageColumn,
};
