//! Static model configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_description() -> String {
    "No description available".to_string()
}

fn default_context_length() -> usize {
    2048
}

/// Static configuration for one backend model.
///
/// Descriptors are looked up by name from the [`RuntimeConfig`] catalogue
/// and handed to a [`ModelFactory`] to construct an adapter.
///
/// [`RuntimeConfig`]: crate::RuntimeConfig
/// [`ModelFactory`]: crate::models::ModelFactory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Backend-side model identifier (e.g. `llama2:7b`)
    #[serde(default)]
    pub model_name: String,

    /// Backend kind used to select a factory (e.g. `ollama`)
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    /// Base URL for network-served backends
    #[serde(default, alias = "base_url", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_description")]
    pub description: String,

    /// Memory requirement in megabytes
    #[serde(default)]
    pub memory_requirement: u64,

    /// Context window in tokens
    #[serde(default = "default_context_length")]
    pub context_length: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_languages: Vec<String>,

    /// Backend-specific tuning
    #[serde(flatten)]
    pub tuning: TuningParams,
}

/// Generation tuning shared by all backends. Each backend reads the
/// fields that apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParams {
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Generation request timeout (network backends)
    #[serde(with = "crate::duration::option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Compute device (in-process backends): `cpu`, `cuda`, `cuda:N`, `auto`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    pub do_sample: bool,

    pub top_p: f32,
}

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            timeout: None,
            device: None,
            do_sample: true,
            top_p: 0.9,
        }
    }
}

impl ModelDescriptor {
    /// Create a descriptor with default settings.
    pub fn new(kind: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            kind: kind.into(),
            endpoint: None,
            description: default_description(),
            memory_requirement: 0,
            context_length: default_context_length(),
            supported_languages: Vec::new(),
            tuning: TuningParams::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_memory_requirement(mut self, megabytes: u64) -> Self {
        self.memory_requirement = megabytes;
        self
    }

    pub fn with_context_length(mut self, tokens: usize) -> Self {
        self.context_length = tokens;
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.supported_languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.tuning.timeout = Some(timeout);
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.tuning.device = Some(device.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.tuning.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.tuning.max_tokens = tokens;
        self
    }

    /// Rough character budget for prompt plus system prompt (~4 chars per token).
    pub fn prompt_char_limit(&self) -> usize {
        self.context_length.saturating_mul(4)
    }
}
