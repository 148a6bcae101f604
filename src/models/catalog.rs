use serde::{ Deserialize, Serialize };

use crate::llm::format_model_name;

/// Known text-generation models, used when neither the API nor the cache can
/// supply a list.
pub const FALLBACK_MODELS: &[&str] = &[
    "@cf/meta/llama-3.1-8b-instruct",
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast",
    "@cf/mistral/mistral-7b-instruct-v0.1",
    "@cf/qwen/qwen1.5-14b-chat-awq",
    "@cf/google/gemma-7b-it-lora",
    "@cf/openai/gpt-oss-120b",
];

const TEXT_GENERATION_TASK: &str = "Text Generation";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTask {
    pub name: String,
}

/// Entry of the model search endpoint. Only the fields the client reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub task: Option<ModelTask>,
}

impl ModelInfo {
    pub fn display_task(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.name.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub title: String,
    pub value: String,
}

impl ModelOption {
    pub fn from_id(model: &str) -> Self {
        Self {
            title: format_model_name(model),
            value: model.to_string(),
        }
    }
}

pub fn text_generation_options(models: &[ModelInfo]) -> Vec<ModelOption> {
    models
        .iter()
        .filter(|m| {
            m.display_task() == Some(TEXT_GENERATION_TASK) ||
                m.name.contains("llama") ||
                m.name.contains("mistral")
        })
        .map(|m| ModelOption::from_id(&m.name))
        .collect()
}

pub fn fallback_options() -> Vec<ModelOption> {
    FALLBACK_MODELS.iter().map(|m| ModelOption::from_id(m)).collect()
}

/// The preferred model when it is listed, otherwise the first listed one.
pub fn pick_default<'a>(options: &'a [ModelOption], preferred: Option<&str>) -> Option<&'a str> {
    preferred
        .and_then(|p| options.iter().find(|o| o.value == p))
        .or_else(|| options.first())
        .map(|o| o.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, task: Option<&str>) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            task: task.map(|t| ModelTask { name: t.to_string() }),
        }
    }

    #[test]
    fn keeps_text_generation_and_named_families() {
        let models = vec![
            info("@cf/qwen/qwen1.5-7b-chat-awq", Some("Text Generation")),
            info("@cf/baai/bge-base-en-v1.5", Some("Text Embeddings")),
            info("@cf/meta/llama-guard-3-8b", None),
            info("@cf/mistral/mistral-7b-instruct-v0.1", Some("Other")),
            info("@cf/openai/whisper", Some("Automatic Speech Recognition")),
        ];
        let options = text_generation_options(&models);
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec![
            "@cf/qwen/qwen1.5-7b-chat-awq",
            "@cf/meta/llama-guard-3-8b",
            "@cf/mistral/mistral-7b-instruct-v0.1",
        ]);
        assert_eq!(options[0].title, "Qwen1.5 7b Chat Awq");
    }

    #[test]
    fn default_prefers_configured_model() {
        let options = fallback_options();
        assert_eq!(
            pick_default(&options, Some("@cf/openai/gpt-oss-120b")),
            Some("@cf/openai/gpt-oss-120b")
        );
        assert_eq!(pick_default(&options, Some("@cf/unknown/model")), Some(FALLBACK_MODELS[0]));
        assert_eq!(pick_default(&options, None), Some(FALLBACK_MODELS[0]));
        assert_eq!(pick_default(&[], Some("x")), None);
    }
}
