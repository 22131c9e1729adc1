//! Network-served models behind an Ollama-compatible HTTP API.
//!
//! Endpoints used:
//! - `GET /api/version` and `GET /api/tags` to probe readiness
//! - `POST /api/pull` to fetch a model that is not present yet
//! - `POST /api/generate` for non-streaming inference
//! - `POST /api/show` for model details

use super::{
    factory::ModelFactory, validate_input, ModelAdapter, ModelDescriptor, ModelError,
    DEFAULT_OLLAMA_URL, OLLAMA_KIND,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Generation timeout when the descriptor sets none.
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const PULL_TIMEOUT: Duration = Duration::from_secs(600);
const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

/// A model served by an Ollama instance.
pub struct OllamaModel {
    descriptor: ModelDescriptor,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
    loaded: bool,
}

impl std::fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaModel")
            .field("model", &self.descriptor.model_name)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("loaded", &self.loaded)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct NameRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Model details reported by `POST /api/show`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OllamaDetails {
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub details: Option<JsonValue>,
}

impl OllamaModel {
    /// Create an unloaded adapter. Fails only if the HTTP client cannot be built.
    pub fn new(descriptor: ModelDescriptor) -> Result<Self, ModelError> {
        let base_url = descriptor
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout = descriptor.tuning.timeout.unwrap_or(DEFAULT_GENERATE_TIMEOUT);
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ModelError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            descriptor,
            base_url,
            timeout,
            client,
            loaded: false,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Service reachable and the model present in its tag list.
    async fn probe(&self) -> bool {
        let model = self.descriptor.model_name.as_str();

        let version = self
            .client
            .get(self.url("/api/version"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        match version {
            Ok(response) if response.status().as_u16() == 200 => {}
            Ok(response) => {
                tracing::debug!(model = %model, status = response.status().as_u16(), "Ollama version probe failed");
                return false;
            }
            Err(e) => {
                tracing::debug!(model = %model, error = %e, "Ollama service unreachable");
                return false;
            }
        }

        let tags = match self
            .client
            .get(self.url("/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response.json::<TagsResponse>().await,
            Ok(response) => {
                tracing::debug!(model = %model, status = response.status().as_u16(), "Ollama tag listing failed");
                return false;
            }
            Err(e) => {
                tracing::debug!(model = %model, error = %e, "Ollama tag listing failed");
                return false;
            }
        };

        match tags {
            Ok(tags) => tags.models.iter().any(|entry| model_matches(model, &entry.name)),
            Err(e) => {
                tracing::debug!(model = %model, error = %e, "Unreadable Ollama tag listing");
                false
            }
        }
    }

    async fn pull(&self) -> Result<(), ModelError> {
        let request = NameRequest {
            name: &self.descriptor.model_name,
            stream: Some(false),
        };

        let response = self
            .client
            .post(self.url("/api/pull"))
            .timeout(PULL_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, PULL_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    /// Fetch parameters, template and details for the model.
    ///
    /// Returns `None` on any failure.
    pub async fn details(&self) -> Option<OllamaDetails> {
        let request = NameRequest {
            name: &self.descriptor.model_name,
            stream: None,
        };

        let response = self
            .client
            .post(self.url("/api/show"))
            .timeout(SHOW_TIMEOUT)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                match response.json::<OllamaDetails>().await {
                    Ok(details) => Some(details),
                    Err(e) => {
                        tracing::warn!(model = %self.descriptor.model_name, error = %e, "Unreadable model details");
                        None
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(
                    model = %self.descriptor.model_name,
                    status = response.status().as_u16(),
                    "Model details request failed"
                );
                None
            }
            Err(e) => {
                tracing::warn!(model = %self.descriptor.model_name, error = %e, "Model details request failed");
                None
            }
        }
    }
}

#[async_trait]
impl ModelAdapter for OllamaModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn load(&mut self) -> bool {
        let model = self.descriptor.model_name.clone();

        if self.probe().await {
            self.loaded = true;
            tracing::info!(model = %model, "Ollama model ready");
            return true;
        }

        tracing::info!(model = %model, "Pulling Ollama model");
        match self.pull().await {
            Ok(()) => {
                self.loaded = true;
                tracing::info!(model = %model, "Ollama model pulled");
                true
            }
            Err(e) => {
                tracing::error!(model = %model, error = %e, "Failed to load Ollama model");
                false
            }
        }
    }

    async fn is_available(&self) -> bool {
        self.loaded && self.probe().await
    }

    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ModelError> {
        validate_input(&self.descriptor, prompt, system_prompt)?;

        let model = self.descriptor.model_name.as_str();
        if !self.loaded || !self.probe().await {
            return Err(ModelError::Unavailable(format!(
                "Ollama model '{}' is not available",
                model
            )));
        }

        let request = GenerateRequest {
            model,
            prompt,
            system: system_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.descriptor.tuning.temperature,
                num_predict: self.descriptor.tuning.max_tokens,
            },
        };

        tracing::debug!(model = %model, prompt_chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(self.url("/api/generate"))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.timeout)
            } else {
                ModelError::InvalidResponse(e.to_string())
            }
        })?;

        let text = body
            .response
            .ok_or_else(|| ModelError::InvalidResponse("missing 'response' field".to_string()))?;

        tracing::debug!(model = %model, response_chars = text.len(), "Generate request completed");
        Ok(text.trim().to_string())
    }

    async fn unload(&mut self) -> bool {
        self.loaded = false;
        tracing::info!(model = %self.descriptor.model_name, "Ollama model unloaded");
        true
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(timeout)
    } else {
        ModelError::Transport(e.to_string())
    }
}

/// Untagged names match their `:latest` tag.
fn model_matches(wanted: &str, listed: &str) -> bool {
    if wanted == listed {
        return true;
    }
    !wanted.contains(':') && listed.strip_suffix(":latest") == Some(wanted)
}

/// Factory for Ollama-served models.
///
/// ## Configuration Format
/// ```yaml
/// type: ollama
/// model_name: "mistral:7b"
/// base_url: "http://ollama:11434"   # optional
/// timeout: 120s                     # optional
/// temperature: 0.7
/// max_tokens: 512
/// ```
pub struct OllamaModelFactory;

impl ModelFactory for OllamaModelFactory {
    fn kind(&self) -> &'static str {
        OLLAMA_KIND
    }

    fn create(&self, descriptor: &ModelDescriptor) -> Result<Box<dyn ModelAdapter>, ModelError> {
        self.validate_config(descriptor)?;
        Ok(Box::new(OllamaModel::new(descriptor.clone())?))
    }

    fn validate_config(&self, descriptor: &ModelDescriptor) -> Result<(), ModelError> {
        if let Some(url) = descriptor.endpoint.as_deref() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ModelError::InvalidConfig(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Ollama-served models over HTTP"
    }
}
