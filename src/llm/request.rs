use serde::Serialize;

use super::ModelCategory;
use crate::models::chat::{ Message, Role };

/// JSON body for `ai/run/{model}`; serializes to exactly one top-level field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InferenceRequest {
    Responses {
        input: Vec<Message>,
    },
    Chat {
        messages: Vec<Message>,
    },
    Completion {
        prompt: String,
    },
}

pub fn build_single(prompt: &str, category: ModelCategory) -> InferenceRequest {
    match category {
        ModelCategory::Responses => InferenceRequest::Responses { input: vec![Message::user(prompt)] },
        ModelCategory::Chat => InferenceRequest::Chat { messages: vec![Message::user(prompt)] },
        ModelCategory::Completion => InferenceRequest::Completion { prompt: prompt.to_string() },
    }
}

pub fn build_with_history(messages: Vec<Message>, category: ModelCategory) -> InferenceRequest {
    match category {
        ModelCategory::Responses => InferenceRequest::Responses { input: messages },
        ModelCategory::Chat => InferenceRequest::Chat { messages },
        ModelCategory::Completion => InferenceRequest::Completion { prompt: flatten_transcript(&messages) },
    }
}

/// Completion models have no turns, so roles survive as `Q:`/`A:` prefixes.
pub fn flatten_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::User => format!("Q: {}", m.content),
            Role::Assistant => format!("A: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
