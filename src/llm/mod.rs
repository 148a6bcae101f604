pub mod chat;
pub mod request;
pub mod response;

use std::fmt;

const RESPONSES_MARKER: &str = "gpt-oss";
const CHAT_MARKERS: &[&str] = &["llama", "mistral", "granite", "qwen", "gemma", "phi"];

/// Request shape a model expects, derived from its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelCategory {
    /// OpenAI responses API: `{"input": [...]}`.
    Responses,
    /// Chat completion: `{"messages": [...]}`.
    Chat,
    /// Plain text generation: `{"prompt": "..."}`.
    Completion,
}

impl fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelCategory::Responses => "responses",
            ModelCategory::Chat => "chat",
            ModelCategory::Completion => "completion",
        };
        write!(f, "{}", name)
    }
}

/// Classifies a model identifier. First match wins; the test is case-sensitive.
pub fn classify(model: &str) -> ModelCategory {
    if model.contains(RESPONSES_MARKER) {
        return ModelCategory::Responses;
    }
    if CHAT_MARKERS.iter().any(|marker| model.contains(marker)) {
        return ModelCategory::Chat;
    }
    ModelCategory::Completion
}

/// `"@cf/meta/llama-3.1-8b-instruct"` becomes `"Llama 3.1 8b Instruct"`.
pub fn format_model_name(model: &str) -> String {
    let last = model.rsplit('/').next().unwrap_or(model);
    last.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_marker_wins_over_chat_markers() {
        assert_eq!(classify("@cf/openai/gpt-oss-120b"), ModelCategory::Responses);
        assert_eq!(classify("@cf/openai/gpt-oss-llama-qwen"), ModelCategory::Responses);
    }

    #[test]
    fn chat_families() {
        for model in [
            "@cf/meta/llama-3.1-8b-instruct",
            "@cf/mistral/mistral-7b-instruct-v0.1",
            "@cf/ibm-granite/granite-4.0-h-micro",
            "@cf/qwen/qwen1.5-14b-chat-awq",
            "@cf/google/gemma-7b-it-lora",
            "@cf/microsoft/phi-2",
        ] {
            assert_eq!(classify(model), ModelCategory::Chat, "{}", model);
        }
    }

    #[test]
    fn unknown_models_fall_back_to_completion() {
        assert_eq!(classify("@cf/tiiuae/falcon-7b-instruct"), ModelCategory::Completion);
        assert_eq!(classify(""), ModelCategory::Completion);
        assert_eq!(classify("@cf/meta/LLAMA-3"), ModelCategory::Completion);
    }

    #[test]
    fn category_names() {
        assert_eq!(ModelCategory::Responses.to_string(), "responses");
        assert_eq!(ModelCategory::Chat.to_string(), "chat");
        assert_eq!(ModelCategory::Completion.to_string(), "completion");
    }

    #[test]
    fn display_names() {
        assert_eq!(format_model_name("@cf/meta/llama-3.1-8b-instruct"), "Llama 3.1 8b Instruct");
        assert_eq!(format_model_name("plain"), "Plain");
        assert_eq!(format_model_name("@cf/x/a--b"), "A  B");
    }
}
