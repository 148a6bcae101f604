use log::{ debug, warn };
use std::sync::Arc;

use crate::history::{ BlobStore, StoreError };
use crate::models::chat::Conversation;

pub const CONVERSATIONS_KEY: &str = "cloudflare-ai-conversations";
const CORRUPTED_WARNING: &str = "Failed to load conversation history, starting fresh";

#[derive(Debug, Default)]
pub struct LoadedConversations {
    pub conversations: Vec<Conversation>,
    /// Set when the stored blob could not be parsed and was discarded.
    pub warning: Option<String>,
}

/// The conversation collection, serialized as one JSON array blob.
#[derive(Clone)]
pub struct ConversationStore {
    blobs: Arc<dyn BlobStore>,
}

impl ConversationStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn load(&self) -> Result<LoadedConversations, StoreError> {
        let Some(raw) = self.blobs.get(CONVERSATIONS_KEY).await? else {
            return Ok(LoadedConversations::default());
        };
        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => {
                debug!("Loaded {} stored conversations", conversations.len());
                Ok(LoadedConversations { conversations, warning: None })
            }
            Err(e) => {
                warn!("Failed to parse stored conversations: {}", e);
                Ok(LoadedConversations {
                    conversations: Vec::new(),
                    warning: Some(CORRUPTED_WARNING.to_string()),
                })
            }
        }
    }

    /// Overwrites the stored collection. Conversations without chats are dropped.
    pub async fn save_all(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        let to_save: Vec<&Conversation> = conversations
            .iter()
            .filter(|c| !c.is_empty())
            .collect();
        let json = serde_json::to_string(&to_save)?;
        self.blobs.set(CONVERSATIONS_KEY, &json).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.blobs.delete(CONVERSATIONS_KEY).await
    }
}
