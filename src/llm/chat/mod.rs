pub mod cloudflare;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;

use self::cloudflare::CloudflareClient;
use super::classify;
use super::request::{ build_single, build_with_history, InferenceRequest };
use super::response::extract_text;
use crate::config::{ AppConfig, ConfigError };
use crate::models::catalog::ModelInfo;
use crate::models::chat::Message;

pub(crate) const UNKNOWN_ERROR: &str = "Unknown error occurred";
pub(crate) const MODELS_ERROR: &str = "Failed to fetch models";

#[derive(Debug, Error)]
pub enum TransportError {
    /// Non-2xx status.
    #[error("API Error ({status}): {message}")]
    Status {
        status: u16,
        message: String,
    },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// 2xx envelope carrying `success: false`.
    #[error("{0}")]
    Upstream(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: String,
}

/// `{success, errors, result}` wrapper around every Cloudflare API answer.
#[derive(Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }

    /// The payload, or the first upstream error when `success` is false.
    pub fn into_result(self, fallback: &str) -> Result<T, TransportError> where T: Default {
        if !self.success {
            let message = self.first_error().unwrap_or(fallback).to_string();
            return Err(TransportError::Upstream(message));
        }
        Ok(self.result.unwrap_or_default())
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, TransportError>;

    /// Runs `model` and returns the envelope's raw `result`.
    async fn run_inference(
        &self,
        model: &str,
        body: &InferenceRequest
    ) -> Result<JsonValue, TransportError>;
}

pub fn new_client(config: &AppConfig) -> Result<Arc<dyn InferenceClient>, ConfigError> {
    Ok(Arc::new(CloudflareClient::from_config(config)?))
}

pub async fn query(
    client: &dyn InferenceClient,
    prompt: &str,
    model: &str
) -> Result<String, TransportError> {
    let category = classify(model);
    debug!("Sending {} body to {}", category, model);
    let body = build_single(prompt, category);
    let result = client.run_inference(model, &body).await?;
    Ok(extract_text(&result))
}

pub async fn query_with_history(
    client: &dyn InferenceClient,
    messages: Vec<Message>,
    model: &str
) -> Result<String, TransportError> {
    let category = classify(model);
    debug!("Sending {} body with {} messages to {}", category, messages.len(), model);
    let body = build_with_history(messages, category);
    let result = client.run_inference(model, &body).await?;
    Ok(extract_text(&result))
}

pub(crate) fn envelope_error(status: u16, body: &str) -> TransportError {
    let from_envelope = serde_json
        ::from_str::<Envelope<JsonValue>>(body)
        .ok()
        .and_then(|e| e.first_error().map(str::to_string));
    let message = match from_envelope {
        Some(m) => m,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("HTTP {}", status),
    };
    TransportError::Status { status, message }
}
