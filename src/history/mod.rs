mod conversations;
mod file;
mod memory;
mod redis;

pub use conversations::{ ConversationStore, LoadedConversations, CONVERSATIONS_KEY };
pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
pub use self::redis::RedisBlobStore;

use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use thiserror::Error;
use crate::config::{ AppConfig, HistoryType };
use crate::models::chat::{ Chat, Message };

pub const DEFAULT_MAX_CHATS: usize = 25;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("failed to serialize stored data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),
}

/// Get/set/delete of opaque string blobs keyed by name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

pub fn create_blob_store(config: &AppConfig) -> Result<Arc<dyn BlobStore>, StoreError> {
    match config.history_type {
        HistoryType::File => {
            info!("Chat history will be stored in: {}", config.data_dir.display());
            Ok(Arc::new(FileBlobStore::new(config.data_dir.clone())))
        }
        HistoryType::Redis => {
            info!("Chat history will be stored in redis at {}", config.history_host);
            let store = RedisBlobStore::new(&config.history_host, &config.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        HistoryType::Memory => {
            info!("Chat history is kept in memory for this session only");
            Ok(Arc::new(MemoryBlobStore::default()))
        }
    }
}

/// Each chat becomes a user turn followed by an assistant turn.
pub fn chats_to_messages(chats: &[Chat]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(chats.len() * 2);
    for chat in chats {
        messages.push(Message::user(chat.question.as_str()));
        messages.push(Message::assistant(chat.answer.as_str()));
    }
    messages
}

/// Keeps only the most recent `max_chats` exchanges.
pub fn limit_conversation_length(chats: &[Chat], max_chats: usize) -> &[Chat] {
    if chats.len() <= max_chats {
        return chats;
    }
    &chats[chats.len() - max_chats..]
}

/// History for a follow-up: truncate, frame, then append the new question.
pub fn frame_follow_up(chats: &[Chat], question: &str, max_chats: usize) -> Vec<Message> {
    let mut messages = chats_to_messages(limit_conversation_length(chats, max_chats));
    messages.push(Message::user(question));
    messages
}
