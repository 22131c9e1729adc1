//! Runtime configuration and the model catalogue.
//!
//! Configuration is layered: built-in defaults, then an optional YAML
//! file, then environment overrides.

use crate::models::{ModelDescriptor, DEFAULT_OLLAMA_URL, HUGGINGFACE_KIND, OLLAMA_KIND};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default generation timeout for Ollama models.
pub const DEFAULT_OLLAMA_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Model '{name}' not found in available models: {available:?}")]
    UnknownModel { name: String, available: Vec<String> },

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },

    #[error("Configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    #[serde(with = "crate::duration")]
    pub ttl: Duration,

    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Catalogue key of the model loaded at startup
    pub default_model: String,

    /// Memory budget in megabytes
    pub max_model_memory: u64,

    /// Deadline for a single detection request
    #[serde(with = "crate::duration")]
    pub request_timeout: Duration,

    pub max_text_chars: usize,

    pub max_target_chars: usize,

    pub cache: CacheConfig,

    /// Model catalogue keyed by short name
    pub models: BTreeMap<String, ModelDescriptor>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_model: "llama2".to_string(),
            max_model_memory: 8192,
            request_timeout: Duration::from_secs(60),
            max_text_chars: 5000,
            max_target_chars: 200,
            cache: CacheConfig::default(),
            models: builtin_models(),
        }
    }
}

fn ollama_model(name: &str, description: &str) -> ModelDescriptor {
    ModelDescriptor::new(OLLAMA_KIND, name)
        .with_endpoint(DEFAULT_OLLAMA_URL)
        .with_timeout(DEFAULT_OLLAMA_TIMEOUT)
        .with_description(description)
}

fn builtin_models() -> BTreeMap<String, ModelDescriptor> {
    let mut models = BTreeMap::new();
    models.insert(
        "llama2".to_string(),
        ollama_model(
            "llama2:7b",
            "Llama 2 7B - General purpose language model with good instruction following",
        )
        .with_memory_requirement(4096)
        .with_context_length(4096)
        .with_languages(&["en"]),
    );
    models.insert(
        "mistral".to_string(),
        ollama_model(
            "mistral:7b",
            "Mistral 7B - Enhanced instruction following and reasoning capabilities",
        )
        .with_memory_requirement(4096)
        .with_context_length(8192)
        .with_languages(&["en", "fr", "de", "es", "it"]),
    );
    models.insert(
        "codellama".to_string(),
        ollama_model(
            "codellama:7b",
            "Code Llama 7B - Specialized for code understanding and structured output",
        )
        .with_memory_requirement(4096)
        .with_context_length(16384)
        .with_languages(&["en"]),
    );
    models.insert(
        "phi3".to_string(),
        ollama_model(
            "phi3:mini",
            "Phi-3 Mini - Lightweight model for resource-constrained environments",
        )
        .with_memory_requirement(2048)
        .with_context_length(4096)
        .with_languages(&["en"]),
    );
    models.insert(
        "dialoGPT".to_string(),
        ModelDescriptor::new(HUGGINGFACE_KIND, "microsoft/DialoGPT-medium")
            .with_description("DialoGPT Medium - Conversational AI model")
            .with_memory_requirement(3072)
            .with_context_length(1024)
            .with_languages(&["en"]),
    );
    models
}

impl RuntimeConfig {
    /// Parse configuration from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Built-in defaults with process environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Recognised: `DEFAULT_MODEL`, `OLLAMA_BASE_URL`, `OLLAMA_TIMEOUT`,
    /// `MAX_MODEL_MEMORY`, `REQUEST_TIMEOUT`, `ENABLE_RESPONSE_CACHE`,
    /// `RESPONSE_CACHE_TTL`. Timeouts are in seconds.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("DEFAULT_MODEL") {
            self.default_model = model;
        }

        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            for descriptor in self.ollama_models_mut() {
                descriptor.endpoint = Some(url.clone());
            }
        }

        if let Some(secs) = lookup("OLLAMA_TIMEOUT") {
            let timeout = Duration::from_secs(parse_var("OLLAMA_TIMEOUT", &secs)?);
            for descriptor in self.ollama_models_mut() {
                descriptor.tuning.timeout = Some(timeout);
            }
        }

        if let Some(memory) = lookup("MAX_MODEL_MEMORY") {
            self.max_model_memory = parse_var("MAX_MODEL_MEMORY", &memory)?;
        }

        if let Some(secs) = lookup("REQUEST_TIMEOUT") {
            self.request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT", &secs)?);
        }

        if let Some(enabled) = lookup("ENABLE_RESPONSE_CACHE") {
            self.cache.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }

        if let Some(secs) = lookup("RESPONSE_CACHE_TTL") {
            self.cache.ttl = Duration::from_secs(parse_var("RESPONSE_CACHE_TTL", &secs)?);
        }

        Ok(())
    }

    fn ollama_models_mut(&mut self) -> impl Iterator<Item = &mut ModelDescriptor> {
        self.models
            .values_mut()
            .filter(|descriptor| descriptor.kind.eq_ignore_ascii_case(OLLAMA_KIND))
    }

    /// Check cross-field consistency. All problems are reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        match self.models.get(&self.default_model) {
            None => errors.push(format!(
                "Default model '{}' not in available models",
                self.default_model
            )),
            Some(descriptor) if descriptor.memory_requirement > self.max_model_memory => {
                errors.push(format!(
                    "Default model requires {} MB, more than the {} MB available",
                    descriptor.memory_requirement, self.max_model_memory
                ))
            }
            Some(_) => {}
        }

        for (name, descriptor) in &self.models {
            if descriptor.model_name.trim().is_empty() {
                errors.push(format!("Model '{}' has no model_name", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Look up a catalogue entry by short name.
    pub fn model(&self, name: &str) -> Result<&ModelDescriptor, ConfigError> {
        self.models.get(name).ok_or_else(|| ConfigError::UnknownModel {
            name: name.to_string(),
            available: self.models.keys().cloned().collect(),
        })
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(|name| name.as_str()).collect()
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}
