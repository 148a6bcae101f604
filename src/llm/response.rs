//! Reduces the `result` payload of an inference call to plain text.
//!
//! Workers AI answers in a different shape depending on the model family.
//! Each recognized shape is one [`ResponseShape`] variant, tried in a fixed
//! priority order. Anything else degrades to a pretty-printed JSON dump, so
//! callers always get text back.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{ Deserialize, Deserializer };
use serde_json::Value as JsonValue;

/// A string field that only counts when it holds a non-empty string.
#[derive(Debug, Default)]
struct Text(Option<String>);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        Ok(match JsonValue::deserialize(deserializer)? {
            JsonValue::String(s) if !s.is_empty() => Text(Some(s)),
            _ => Text(None),
        })
    }
}

impl Text {
    fn is(&self, expected: &str) -> bool {
        self.0.as_deref() == Some(expected)
    }
}

#[derive(Deserialize)]
struct PlainResult {
    #[serde(default)]
    response: Text,
}

#[derive(Deserialize)]
struct OutputResult {
    output: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: Text,
    #[serde(default)]
    role: Text,
    #[serde(default)]
    content: JsonValue,
}

#[derive(Deserialize)]
struct OutputContent {
    #[serde(rename = "type", default)]
    kind: Text,
    #[serde(default)]
    text: Text,
}

#[derive(Deserialize)]
struct ChoicesResult {
    choices: Vec<JsonValue>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: JsonValue,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Text,
}

#[derive(Deserialize)]
struct Generation {
    #[serde(default)]
    content: Text,
    #[serde(default)]
    generated_text: Text,
}

/// Decodes `value` as `T` only when it is a JSON object; serde would
/// otherwise accept arrays positionally.
fn decode_object<T: DeserializeOwned>(value: &JsonValue) -> Option<T> {
    if !value.is_object() {
        return None;
    }
    T::deserialize(value).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"response": "..."}`: Llama, Mistral, Qwen and most hosted models.
    Plain(String),
    /// OpenAI responses envelope (`gpt-oss`).
    ResponsesOutput(String),
    /// OpenAI chat completion envelope (Granite).
    ChatCompletion(String),
    /// The result is itself a string.
    Raw(String),
    /// `[{"content": ...}]` or `[{"generated_text": ...}]`.
    Generations(String),
    /// Nothing matched; holds the pretty-printed result.
    Unrecognized(String),
}

impl ResponseShape {
    pub fn detect(result: &JsonValue) -> Self {
        if let Some(text) = plain(result) {
            return ResponseShape::Plain(text);
        }
        // Falls through to the later rules when no assistant output_text exists.
        if let Some(text) = responses_output(result) {
            return ResponseShape::ResponsesOutput(text);
        }
        if let Some(text) = chat_completion(result) {
            return ResponseShape::ChatCompletion(text);
        }
        if let JsonValue::String(s) = result {
            return ResponseShape::Raw(s.clone());
        }
        if let Some(text) = generations(result) {
            return ResponseShape::Generations(text);
        }
        ResponseShape::Unrecognized(pretty(result))
    }

    pub fn into_text(self) -> String {
        match self {
            | ResponseShape::Plain(text)
            | ResponseShape::ResponsesOutput(text)
            | ResponseShape::ChatCompletion(text)
            | ResponseShape::Raw(text)
            | ResponseShape::Generations(text)
            | ResponseShape::Unrecognized(text) => text,
        }
    }
}

fn plain(result: &JsonValue) -> Option<String> {
    decode_object::<PlainResult>(result)?.response.0
}

fn responses_output(result: &JsonValue) -> Option<String> {
    let envelope = decode_object::<OutputResult>(result)?;
    let message = envelope.output
        .iter()
        .filter_map(decode_object::<OutputItem>)
        .find(|item| item.kind.is("message") && item.role.is("assistant"))?;
    message.content
        .as_array()?
        .iter()
        .filter_map(decode_object::<OutputContent>)
        .find(|c| c.kind.is("output_text") && c.text.0.is_some())
        .and_then(|c| c.text.0)
}

fn chat_completion(result: &JsonValue) -> Option<String> {
    let envelope = decode_object::<ChoicesResult>(result)?;
    let first = decode_object::<Choice>(envelope.choices.first()?)?;
    decode_object::<ChoiceMessage>(&first.message)?.content.0
}

fn generations(result: &JsonValue) -> Option<String> {
    let first = decode_object::<Generation>(result.as_array()?.first()?)?;
    first.content.0.or(first.generated_text.0)
}

fn pretty(result: &JsonValue) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
}

/// Extracts the answer text. Never fails; unknown shapes come back as JSON.
pub fn extract_text(result: &JsonValue) -> String {
    let shape = ResponseShape::detect(result);
    if let ResponseShape::Unrecognized(dump) = &shape {
        warn!("Unknown response format: {}", dump);
    }
    shape.into_text()
}
