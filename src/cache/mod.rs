use chrono::{ DateTime, TimeZone, Utc };
use log::error;
use std::sync::Arc;

use crate::history::{ BlobStore, StoreError };
use crate::models::catalog::ModelOption;

pub const CACHED_MODELS_KEY: &str = "cached-models";
pub const CACHED_MODELS_TIMESTAMP_KEY: &str = "cached-models-timestamp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedModels {
    pub models: Vec<ModelOption>,
    pub cached_at: Option<DateTime<Utc>>,
}

/// Last successfully fetched model list.
#[derive(Clone)]
pub struct ModelCache {
    blobs: Arc<dyn BlobStore>,
}

impl ModelCache {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn store(&self, models: &[ModelOption]) -> Result<(), StoreError> {
        let json = serde_json::to_string(models)?;
        self.blobs.set(CACHED_MODELS_KEY, &json).await?;
        self.blobs.set(CACHED_MODELS_TIMESTAMP_KEY, &Utc::now().timestamp_millis().to_string()).await
    }

    /// Caching is best effort; failures are logged and otherwise ignored.
    pub async fn store_quietly(&self, models: &[ModelOption]) {
        if let Err(e) = self.store(models).await {
            error!("Failed to cache models: {}", e);
        }
    }

    /// `None` when nothing usable is cached.
    pub async fn load(&self) -> Option<CachedModels> {
        let raw = match self.blobs.get(CACHED_MODELS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to load cached models: {}", e);
                return None;
            }
        };
        let models: Vec<ModelOption> = match serde_json::from_str(&raw) {
            Ok(models) => models,
            Err(e) => {
                error!("Failed to parse cached models: {}", e);
                return None;
            }
        };
        let cached_at = self.blobs
            .get(CACHED_MODELS_TIMESTAMP_KEY).await
            .ok()
            .flatten()
            .and_then(|ts| ts.trim().parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
        Some(CachedModels { models, cached_at })
    }
}
