use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::{ envelope_error, Envelope, InferenceClient, TransportError, MODELS_ERROR, UNKNOWN_ERROR };
use crate::config::{ AppConfig, ConfigError };
use crate::llm::request::InferenceRequest;
use crate::models::catalog::ModelInfo;

/// Workers AI over the Cloudflare REST API.
pub struct CloudflareClient {
    http: HttpClient,
    models_url: String,
    config: AppConfig,
}

impl CloudflareClient {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token)).map_err(|e|
            ConfigError::InvalidToken(e.to_string())
        )?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = HttpClient::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            models_url: config.models_url(),
            config: config.clone(),
        })
    }

    async fn read_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response
    ) -> Result<Envelope<T>, TransportError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(envelope_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl InferenceClient for CloudflareClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, TransportError> {
        debug!("GET {}", self.models_url);
        let response = self.http.get(&self.models_url).send().await?;
        let envelope: Envelope<Vec<ModelInfo>> = self.read_envelope(response).await?;
        envelope.into_result(MODELS_ERROR)
    }

    async fn run_inference(
        &self,
        model: &str,
        body: &InferenceRequest
    ) -> Result<JsonValue, TransportError> {
        let url = self.config.run_url(model);
        debug!("POST {}", url);
        let response = self.http.post(&url).json(body).send().await?;
        let envelope: Envelope<JsonValue> = self.read_envelope(response).await?;
        envelope.into_result(UNKNOWN_ERROR)
    }
}
