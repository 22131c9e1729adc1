//! Model adapter abstractions for stance-runtime.
//!
//! This module defines the uniform contract over text-generation backends
//! and the two built-in variants:
//! - `ollama`: a network-served model reached over HTTP (feature `ollama`)
//! - `huggingface`: an in-process model driven through a [`TextGenerator`]
//!
//! ## Thread safety
//!
//! Adapters are not internally synchronized for mutation. `load` and
//! `unload` take `&mut self`; the owner serializes them against
//! `generate` (see [`StanceDetector`](crate::StanceDetector)).

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

mod descriptor;
mod factory;
mod local;

#[cfg(feature = "ollama")]
mod ollama;

pub use descriptor::{ModelDescriptor, TuningParams};
pub use factory::{ModelFactory, ModelRegistry};
pub use local::{
    GenerationParams, GeneratorLoader, LocalModel, LocalModelFactory, PromptFormat,
    TextGenerator,
};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaDetails, OllamaModel, OllamaModelFactory, DEFAULT_GENERATE_TIMEOUT};

/// Kind identifier of the network-served backend.
pub const OLLAMA_KIND: &str = "ollama";

/// Base URL used when an Ollama descriptor names no endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434";

/// Kind identifier of the in-process backend.
pub const HUGGINGFACE_KIND: &str = "huggingface";

/// Errors from model adapters and the registry.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt too long: {length} characters exceeds the context budget of {limit}")]
    PromptTooLong { length: usize, limit: usize },

    #[error("Model not available: {0}")]
    Unavailable(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unsupported model type: '{kind}'. Available types: {available:?}")]
    UnsupportedKind { kind: String, available: Vec<String> },

    #[error("Model creation failed for '{kind}': {message}")]
    Construction { kind: String, message: String },

    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ModelError {
    /// Whether the failure was caused by a deadline rather than a bad reply.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout(_))
    }

    /// Whether a caller may retry the same call, possibly with backoff.
    ///
    /// Input validation and response-shape failures are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::Timeout(_) | ModelError::Transport(_) | ModelError::Status { .. }
        )
    }
}

/// Diagnostic snapshot of an adapter.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub memory_requirement: u64,
    pub context_length: usize,
    pub is_loaded: bool,
    pub config: ModelDescriptor,
}

impl ModelInfo {
    pub fn new(descriptor: &ModelDescriptor, is_loaded: bool) -> Self {
        Self {
            name: descriptor.model_name.clone(),
            kind: descriptor.kind.clone(),
            description: descriptor.description.clone(),
            memory_requirement: descriptor.memory_requirement,
            context_length: descriptor.context_length,
            is_loaded,
            config: descriptor.clone(),
        }
    }
}

/// Uniform capability surface over text-generation backends.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// The descriptor this adapter was built from.
    fn descriptor(&self) -> &ModelDescriptor;

    /// Cached ready flag. Use [`is_available`](Self::is_available) to
    /// confirm the backend is actually reachable.
    fn is_loaded(&self) -> bool;

    /// Prepare the backend. Idempotent; returns `true` once ready.
    async fn load(&mut self) -> bool;

    /// Probe readiness. Always `false` before a successful `load` or after
    /// `unload`; otherwise re-verifies the backend.
    async fn is_available(&self) -> bool;

    /// Run one inference call.
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ModelError>;

    /// Release backend resources. Always leaves the adapter unloaded.
    async fn unload(&mut self) -> bool;

    fn name(&self) -> &str {
        &self.descriptor().model_name
    }

    fn describe(&self) -> ModelInfo {
        ModelInfo::new(self.descriptor(), self.is_loaded())
    }
}

/// Check prompt preconditions before any backend call.
pub fn validate_input(
    descriptor: &ModelDescriptor,
    prompt: &str,
    system_prompt: &str,
) -> Result<(), ModelError> {
    if prompt.trim().is_empty() {
        tracing::warn!(model = %descriptor.model_name, "Invalid user prompt provided");
        return Err(ModelError::InvalidInput("prompt is empty".to_string()));
    }

    if system_prompt.trim().is_empty() {
        tracing::warn!(model = %descriptor.model_name, "Invalid system prompt provided");
        return Err(ModelError::InvalidInput("system prompt is empty".to_string()));
    }

    let length = prompt.chars().count() + system_prompt.chars().count();
    let limit = descriptor.prompt_char_limit();
    if length > limit {
        tracing::warn!(
            model = %descriptor.model_name,
            length,
            limit,
            "Combined prompt length may exceed context window"
        );
        return Err(ModelError::PromptTooLong { length, limit });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_input_rejects_empty() {
        let descriptor = ModelDescriptor::new(OLLAMA_KIND, "llama2:7b");
        assert!(matches!(
            validate_input(&descriptor, "", "system"),
            Err(ModelError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_input(&descriptor, "prompt", "  "),
            Err(ModelError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_input_context_budget() {
        let descriptor = ModelDescriptor::new(OLLAMA_KIND, "tiny").with_context_length(10);
        assert!(validate_input(&descriptor, &"a".repeat(20), &"b".repeat(20)).is_ok());

        match validate_input(&descriptor, &"a".repeat(21), &"b".repeat(20)) {
            Err(ModelError::PromptTooLong { length, limit }) => {
                assert_eq!(length, 41);
                assert_eq!(limit, 40);
            }
            other => panic!("expected PromptTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(ModelError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(ModelError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(ModelError::Transport("reset".into()).is_retryable());
        assert!(ModelError::Status {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
        assert!(!ModelError::InvalidResponse("missing field".into()).is_retryable());
        assert!(!ModelError::InvalidResponse("missing field".into()).is_timeout());
        assert!(!ModelError::PromptTooLong { length: 2, limit: 1 }.is_retryable());
    }

    #[test]
    fn test_model_info_from_descriptor() {
        let descriptor = ModelDescriptor::new(HUGGINGFACE_KIND, "microsoft/DialoGPT-medium")
            .with_memory_requirement(3072)
            .with_context_length(1024);
        let info = ModelInfo::new(&descriptor, false);
        assert_eq!(info.name, "microsoft/DialoGPT-medium");
        assert_eq!(info.kind, "huggingface");
        assert_eq!(info.memory_requirement, 3072);
        assert!(!info.is_loaded);

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["type"], "huggingface");
        assert_eq!(value["config"]["context_length"], 1024);
    }
}
