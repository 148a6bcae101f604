use crate::cache::ModelCache;
use crate::config::AppConfig;
use crate::history::{ frame_follow_up, BlobStore, ConversationStore, StoreError, DEFAULT_MAX_CHATS };
use crate::llm::chat::{ query, query_with_history, InferenceClient, TransportError };
use crate::llm::format_model_name;
use crate::models::catalog::{ fallback_options, pick_default, text_generation_options, ModelOption };
use crate::models::chat::{ Chat, Conversation };

use chrono::{ DateTime, Utc };
use log::{ info, warn, error };
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Please enter a prompt")]
    EmptyPrompt,
    #[error("Please enter a question")]
    EmptyQuestion,
    #[error("Please select a model")]
    NoModel,
    #[error("Failed to query Cloudflare AI: {0}")]
    Query(#[source] TransportError),
    #[error("Failed to fetch models: {0}")]
    Models(#[source] TransportError),
    #[error("Failed to load conversations: {0}")]
    Load(#[source] StoreError),
    #[error("Failed to save conversations: {0}")]
    Save(#[source] StoreError),
    #[error("Failed to clear conversations: {0}")]
    Clear(#[source] StoreError),
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
    #[error("Conversation id '{0}' matches more than one conversation")]
    AmbiguousConversation(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Live,
    Cache(Option<DateTime<Utc>>),
    Fallback,
}

#[derive(Debug)]
pub struct ModelList {
    pub options: Vec<ModelOption>,
    pub source: ModelSource,
    /// Why the live list could not be used.
    pub fetch_error: Option<AgentError>,
}

#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub default_model: Option<String>,
    pub max_history_chats: usize,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            default_model: None,
            max_history_chats: DEFAULT_MAX_CHATS,
        }
    }
}

impl From<&AppConfig> for AssistantOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            max_history_chats: config.max_history_chats,
        }
    }
}

/// A finished question and answer. The answer survives a failed save; the
/// in-memory set is rolled back in that case so it keeps matching the store.
#[derive(Debug)]
pub struct Exchange {
    pub conversation: Conversation,
    pub save_error: Option<AgentError>,
}

/// Runs user actions against the API and keeps the stored conversations in step.
pub struct Assistant {
    client: Arc<dyn InferenceClient>,
    store: ConversationStore,
    model_cache: ModelCache,
    options: AssistantOptions,
    // Held across every append-and-save.
    conversations: Mutex<Vec<Conversation>>,
    load_warning: Option<String>,
}

impl Assistant {
    pub async fn new(
        client: Arc<dyn InferenceClient>,
        blobs: Arc<dyn BlobStore>,
        options: AssistantOptions
    ) -> Result<Self, AgentError> {
        let store = ConversationStore::new(blobs.clone());
        let loaded = store.load().await.map_err(AgentError::Load)?;
        info!("Loaded {} conversations", loaded.conversations.len());
        Ok(Self {
            client,
            store,
            model_cache: ModelCache::new(blobs),
            options,
            conversations: Mutex::new(loaded.conversations),
            load_warning: loaded.warning,
        })
    }

    /// Set when stored history was unreadable and the session started empty.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub async fn load_models(&self) -> ModelList {
        let fetch_error = match self.client.list_models().await {
            Ok(models) => {
                let options = text_generation_options(&models);
                self.model_cache.store_quietly(&options).await;
                return ModelList { options, source: ModelSource::Live, fetch_error: None };
            }
            Err(e) => {
                error!("Error fetching models: {}", e);
                AgentError::Models(e)
            }
        };

        if let Some(cached) = self.model_cache.load().await {
            info!("Loading models from cache due to API failure");
            return ModelList {
                options: cached.models,
                source: ModelSource::Cache(cached.cached_at),
                fetch_error: Some(fetch_error),
            };
        }

        warn!("No cached models available, using the built-in model list");
        ModelList {
            options: fallback_options(),
            source: ModelSource::Fallback,
            fetch_error: Some(fetch_error),
        }
    }

    /// An explicit model wins; otherwise the configured default if listed, else the first model.
    pub async fn resolve_model(&self, requested: Option<&str>) -> Result<String, AgentError> {
        if let Some(model) = requested.map(str::trim).filter(|m| !m.is_empty()) {
            return Ok(model.to_string());
        }
        let list = self.load_models().await;
        pick_default(&list.options, self.options.default_model.as_deref())
            .map(str::to_string)
            .ok_or(AgentError::NoModel)
    }

    /// Asks a fresh question. The conversation exists only once the answer arrived.
    pub async fn ask(&self, prompt: &str, model: &str) -> Result<Exchange, AgentError> {
        if prompt.trim().is_empty() {
            return Err(AgentError::EmptyPrompt);
        }
        if model.trim().is_empty() {
            return Err(AgentError::NoModel);
        }
        info!("Querying {} ({})", format_model_name(model), model);
        let answer = query(self.client.as_ref(), prompt, model).await.map_err(AgentError::Query)?;
        let conversation = Conversation::start(model, Chat::new(prompt, answer));
        let save_error = self.add(conversation.clone()).await.err();
        Ok(Exchange { conversation, save_error })
    }

    pub async fn follow_up(&self, id: &str, question: &str) -> Result<Exchange, AgentError> {
        if question.trim().is_empty() {
            return Err(AgentError::EmptyQuestion);
        }
        let snapshot = self.find(id).await?;
        let messages = frame_follow_up(&snapshot.chats, question, self.options.max_history_chats);
        info!(
            "Follow-up on {} with {} context messages",
            snapshot.id,
            messages.len().saturating_sub(1)
        );
        let answer = query_with_history(self.client.as_ref(), messages, &snapshot.model).await.map_err(
            AgentError::Query
        )?;

        let mut conversations = self.conversations.lock().await;
        let index = conversations
            .iter()
            .position(|c| c.id == snapshot.id)
            .ok_or_else(|| AgentError::ConversationNotFound(snapshot.id.to_string()))?;
        let previous = conversations[index].clone();
        conversations[index].append(Chat::new(question, answer));
        let conversation = conversations[index].clone();
        let save_error = match self.save(&conversations).await {
            Ok(()) => None,
            Err(e) => {
                conversations[index] = previous;
                Some(e)
            }
        };
        Ok(Exchange { conversation, save_error })
    }

    /// Inserts the conversation, replacing one with the same id.
    pub async fn add(&self, conversation: Conversation) -> Result<(), AgentError> {
        let mut conversations = self.conversations.lock().await;
        let previous = match conversations.iter().position(|c| c.id == conversation.id) {
            Some(index) => Some((index, std::mem::replace(&mut conversations[index], conversation))),
            None => {
                conversations.push(conversation);
                None
            }
        };
        if let Err(e) = self.save(&conversations).await {
            match previous {
                Some((index, old)) => {
                    conversations[index] = old;
                }
                None => {
                    conversations.pop();
                }
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn toggle_pin(&self, id: &str) -> Result<Conversation, AgentError> {
        let mut conversations = self.conversations.lock().await;
        let index = resolve_index(&conversations, id)?;
        let previous = conversations[index].clone();
        conversations[index].toggle_pin();
        if let Err(e) = self.save(&conversations).await {
            conversations[index] = previous;
            return Err(e);
        }
        Ok(conversations[index].clone())
    }

    pub async fn delete(&self, id: &str) -> Result<Conversation, AgentError> {
        let mut conversations = self.conversations.lock().await;
        let index = resolve_index(&conversations, id)?;
        let removed = conversations.remove(index);
        if let Err(e) = self.save(&conversations).await {
            conversations.insert(index, removed);
            return Err(e);
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), AgentError> {
        let mut conversations = self.conversations.lock().await;
        self.store.clear().await.map_err(AgentError::Clear)?;
        conversations.clear();
        Ok(())
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.lock().await.clone()
    }

    /// Looks up by full id or unique id prefix.
    pub async fn find(&self, id: &str) -> Result<Conversation, AgentError> {
        let conversations = self.conversations.lock().await;
        let index = resolve_index(&conversations, id)?;
        Ok(conversations[index].clone())
    }

    async fn save(&self, conversations: &[Conversation]) -> Result<(), AgentError> {
        self.store.save_all(conversations).await.map_err(AgentError::Save)
    }
}

fn resolve_index(conversations: &[Conversation], id: &str) -> Result<usize, AgentError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AgentError::ConversationNotFound(id.to_string()));
    }
    if let Some(index) = conversations.iter().position(|c| c.id.to_string() == id) {
        return Ok(index);
    }
    let mut matches = conversations
        .iter()
        .enumerate()
        .filter(|(_, c)| c.id.to_string().starts_with(id))
        .map(|(i, _)| i);
    match (matches.next(), matches.next()) {
        (Some(index), None) => Ok(index),
        (Some(_), Some(_)) => Err(AgentError::AmbiguousConversation(id.to_string())),
        (None, _) => Err(AgentError::ConversationNotFound(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryBlobStore;
    use crate::llm::request::InferenceRequest;
    use crate::models::catalog::ModelInfo;
    use async_trait::async_trait;
    use serde_json::{ json, Value as JsonValue };
    use std::io;
    use std::sync::atomic::{ AtomicBool, Ordering };

    struct FixedAnswer;

    #[async_trait]
    impl InferenceClient for FixedAnswer {
        async fn list_models(&self) -> Result<Vec<ModelInfo>, TransportError> {
            Ok(Vec::new())
        }

        async fn run_inference(
            &self,
            _model: &str,
            _body: &InferenceRequest
        ) -> Result<JsonValue, TransportError> {
            Ok(json!({ "response": "the paid answer" }))
        }
    }

    /// Memory store whose writes can be switched off.
    #[derive(Default)]
    struct Switchable {
        inner: MemoryBlobStore,
        read_only: AtomicBool,
    }

    #[async_trait]
    impl BlobStore for Switchable {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into());
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            if self.read_only.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into());
            }
            self.inner.delete(key).await
        }
    }

    async fn assistant(blobs: Arc<Switchable>) -> Assistant {
        Assistant::new(Arc::new(FixedAnswer), blobs, AssistantOptions::default()).await.expect("assistant")
    }

    #[tokio::test]
    async fn answer_is_kept_when_saving_a_new_conversation_fails() {
        let blobs = Arc::new(Switchable::default());
        blobs.read_only.store(true, Ordering::SeqCst);
        let assistant = assistant(blobs.clone()).await;

        let exchange = assistant.ask("question", "@cf/meta/llama-3.1-8b-instruct").await.expect("ask");
        assert_eq!(exchange.conversation.last_answer(), Some("the paid answer"));
        assert!(matches!(exchange.save_error, Some(AgentError::Save(_))));
        assert!(assistant.conversations().await.is_empty());
    }

    #[tokio::test]
    async fn failed_follow_up_save_rolls_back_memory() {
        let blobs = Arc::new(Switchable::default());
        let assistant = assistant(blobs.clone()).await;
        let first = assistant.ask("q1", "@cf/meta/llama-3.1-8b-instruct").await.expect("ask");
        assert!(first.save_error.is_none());

        blobs.read_only.store(true, Ordering::SeqCst);
        let id = first.conversation.id.to_string();
        let exchange = assistant.follow_up(&id, "q2").await.expect("follow up");
        assert_eq!(exchange.conversation.chats.len(), 2);
        assert_eq!(exchange.conversation.last_answer(), Some("the paid answer"));
        assert!(matches!(exchange.save_error, Some(AgentError::Save(_))));

        let kept = assistant.find(&id).await.expect("find");
        assert_eq!(kept, first.conversation);
    }

    #[tokio::test]
    async fn failed_pin_delete_and_clear_leave_memory_untouched() {
        let blobs = Arc::new(Switchable::default());
        let assistant = assistant(blobs.clone()).await;
        let first = assistant.ask("q1", "@cf/meta/llama-3.1-8b-instruct").await.expect("ask");
        let id = first.conversation.id.to_string();

        blobs.read_only.store(true, Ordering::SeqCst);
        assert!(matches!(assistant.toggle_pin(&id).await, Err(AgentError::Save(_))));
        assert!(matches!(assistant.delete(&id).await, Err(AgentError::Save(_))));
        assert!(matches!(assistant.clear().await, Err(AgentError::Clear(_))));
        assert_eq!(assistant.conversations().await, vec![first.conversation]);
    }

    #[test]
    fn resolves_exact_and_prefix_ids() {
        let a = Conversation::start("m", Chat::new("q", "a"));
        let b = Conversation::start("m", Chat::new("q", "a"));
        let list = vec![a.clone(), b.clone()];
        assert_eq!(resolve_index(&list, &b.id.to_string()).unwrap(), 1);
        assert_eq!(resolve_index(&list, &a.id.to_string()[..8]).unwrap(), 0);
        assert!(matches!(resolve_index(&list, "zzz"), Err(AgentError::ConversationNotFound(_))));
        assert!(matches!(resolve_index(&list, ""), Err(AgentError::ConversationNotFound(_))));
    }

    #[test]
    fn shared_prefix_is_ambiguous() {
        let mut a = Conversation::start("m", Chat::new("q", "a"));
        let mut b = Conversation::start("m", Chat::new("q", "a"));
        a.id = "aaaaaaaa-0000-4000-8000-000000000001".parse().unwrap();
        b.id = "aaaaaaaa-0000-4000-8000-000000000002".parse().unwrap();
        let list = vec![a, b];
        assert!(matches!(resolve_index(&list, "aaaa"), Err(AgentError::AmbiguousConversation(_))));
        assert_eq!(resolve_index(&list, "aaaaaaaa-0000-4000-8000-000000000002").unwrap(), 1);
    }
}
