//! In-process models.
//!
//! The adapter owns prompt formatting, input checks and lifecycle; the
//! actual inference engine is supplied through [`GeneratorLoader`] and
//! [`TextGenerator`]. Loading and generation run on the blocking pool.

use super::{
    factory::ModelFactory, validate_input, ModelAdapter, ModelDescriptor, ModelError,
    HUGGINGFACE_KIND,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Sampling settings passed to a [`TextGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub do_sample: bool,
    pub top_p: f32,
    /// Input is truncated to this many tokens
    pub context_length: usize,
}

impl GenerationParams {
    pub fn from_descriptor(descriptor: &ModelDescriptor) -> Self {
        Self {
            max_new_tokens: descriptor.tuning.max_tokens,
            temperature: descriptor.tuning.temperature,
            do_sample: descriptor.tuning.do_sample,
            top_p: descriptor.tuning.top_p,
            context_length: descriptor.context_length,
        }
    }
}

/// A loaded inference engine. Calls are blocking.
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`, returning only the newly generated text.
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError>;

    fn health_check(&self) -> bool {
        true
    }

    /// Free weights and device memory.
    fn release(&self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Loads a [`TextGenerator`] for a descriptor. Blocking.
pub trait GeneratorLoader: Send + Sync {
    fn load(&self, descriptor: &ModelDescriptor) -> Result<Arc<dyn TextGenerator>, ModelError>;
}

/// Chat template chosen from the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptFormat {
    Llama,
    Mistral,
    Generic,
}

impl PromptFormat {
    pub fn for_model(model_name: &str) -> Self {
        let name = model_name.to_lowercase();
        if name.contains("llama") {
            PromptFormat::Llama
        } else if name.contains("mistral") {
            PromptFormat::Mistral
        } else {
            PromptFormat::Generic
        }
    }

    pub fn render(self, system_prompt: &str, prompt: &str) -> String {
        match self {
            PromptFormat::Llama => format!(
                "<s>[INST] <<SYS>>\n{}\n<</SYS>>\n\n{} [/INST]",
                system_prompt, prompt
            ),
            PromptFormat::Mistral => format!("<s>[INST] {}\n\n{} [/INST]", system_prompt, prompt),
            PromptFormat::Generic => {
                format!("System: {}\n\nUser: {}\nAssistant:", system_prompt, prompt)
            }
        }
    }
}

/// A model executed inside this process.
pub struct LocalModel {
    descriptor: ModelDescriptor,
    format: PromptFormat,
    loader: Option<Arc<dyn GeneratorLoader>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl std::fmt::Debug for LocalModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalModel")
            .field("model", &self.descriptor.model_name)
            .field("device", &self.device())
            .field("format", &self.format)
            .field("has_loader", &self.loader.is_some())
            .field("loaded", &self.generator.is_some())
            .finish()
    }
}

impl LocalModel {
    pub fn new(descriptor: ModelDescriptor, loader: Option<Arc<dyn GeneratorLoader>>) -> Self {
        let format = PromptFormat::for_model(&descriptor.model_name);
        tracing::info!(
            model = %descriptor.model_name,
            device = %descriptor.tuning.device.as_deref().unwrap_or("cpu"),
            "Initialized in-process model"
        );
        Self {
            descriptor,
            format,
            loader,
            generator: None,
        }
    }

    pub fn device(&self) -> &str {
        self.descriptor.tuning.device.as_deref().unwrap_or("cpu")
    }

    pub fn prompt_format(&self) -> PromptFormat {
        self.format
    }
}

#[async_trait]
impl ModelAdapter for LocalModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn is_loaded(&self) -> bool {
        self.generator.is_some()
    }

    async fn load(&mut self) -> bool {
        if self.generator.is_some() {
            return true;
        }

        let model = self.descriptor.model_name.clone();
        let Some(loader) = self.loader.clone() else {
            tracing::error!(model = %model, "No inference engine available for in-process model");
            return false;
        };

        tracing::info!(model = %model, device = %self.device(), "Loading in-process model");
        let descriptor = self.descriptor.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&descriptor)).await;

        match loaded {
            Ok(Ok(generator)) => {
                self.generator = Some(generator);
                tracing::info!(model = %model, "Loaded in-process model");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(model = %model, error = %e, "Failed to load in-process model");
                false
            }
            Err(e) => {
                tracing::error!(model = %model, error = %e, "Model loading task failed");
                false
            }
        }
    }

    async fn is_available(&self) -> bool {
        self.generator
            .as_ref()
            .map(|generator| generator.health_check())
            .unwrap_or(false)
    }

    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ModelError> {
        validate_input(&self.descriptor, prompt, system_prompt)?;

        let generator = match &self.generator {
            Some(generator) if generator.health_check() => Arc::clone(generator),
            _ => {
                return Err(ModelError::Unavailable(format!(
                    "in-process model '{}' is not loaded",
                    self.descriptor.model_name
                )))
            }
        };

        let full_prompt = self.format.render(system_prompt, prompt);
        let params = GenerationParams::from_descriptor(&self.descriptor);

        let text = tokio::task::spawn_blocking(move || generator.generate(&full_prompt, &params))
            .await
            .map_err(|e| ModelError::Internal(format!("generation task failed: {}", e)))?
            .map_err(|e| {
                tracing::error!(model = %self.descriptor.model_name, error = %e, "In-process generation failed");
                e
            })?;

        let text = text.trim().to_string();
        tracing::debug!(
            model = %self.descriptor.model_name,
            response_chars = text.len(),
            "Generated response"
        );
        Ok(text)
    }

    async fn unload(&mut self) -> bool {
        if let Some(generator) = self.generator.take() {
            if let Err(e) = generator.release() {
                tracing::warn!(
                    model = %self.descriptor.model_name,
                    error = %e,
                    "Error releasing in-process model"
                );
            }
        }
        tracing::info!(model = %self.descriptor.model_name, "Unloaded in-process model");
        true
    }
}

const KNOWN_DEVICES: &[&str] = &["cpu", "cuda", "auto", "mps"];

fn is_known_device(device: &str) -> bool {
    KNOWN_DEVICES.contains(&device)
        || device
            .strip_prefix("cuda:")
            .map(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
}

/// Factory for in-process models.
///
/// Without a [`GeneratorLoader`] adapters are still created but `load`
/// reports failure.
#[derive(Default)]
pub struct LocalModelFactory {
    loader: Option<Arc<dyn GeneratorLoader>>,
}

impl LocalModelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: Arc<dyn GeneratorLoader>) -> Self {
        Self {
            loader: Some(loader),
        }
    }
}

impl ModelFactory for LocalModelFactory {
    fn kind(&self) -> &'static str {
        HUGGINGFACE_KIND
    }

    fn create(&self, descriptor: &ModelDescriptor) -> Result<Box<dyn ModelAdapter>, ModelError> {
        Ok(Box::new(LocalModel::new(descriptor.clone(), self.loader.clone())))
    }

    fn validate_config(&self, descriptor: &ModelDescriptor) -> Result<(), ModelError> {
        if let Some(device) = descriptor.tuning.device.as_deref() {
            if !is_known_device(device) {
                tracing::warn!(
                    model = %descriptor.model_name,
                    device = %device,
                    "Unusual device specified"
                );
            }
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "In-process models driven by a pluggable inference engine"
    }
}
