//! # stance-runtime
//!
//! Model backends and orchestration for stance detection.
//!
//! This crate provides:
//! - The [`ModelAdapter`] contract with Ollama and in-process backends
//! - A [`ModelRegistry`] that builds adapters from catalogue descriptors
//! - [`StanceDetector`], which owns the active model and turns requests
//!   into parsed verdicts via [`stance_core`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use stance_runtime::{ModelRegistry, RuntimeConfig, StanceDetector, StanceRequest};
//!
//! let config = RuntimeConfig::from_env()?;
//! let detector = StanceDetector::new(config, ModelRegistry::with_defaults());
//! detector.start().await;
//!
//! let detection = detector
//!     .detect(StanceRequest::new("Solar subsidies pay for themselves.").with_target("Renewable Energy"))
//!     .await?;
//! println!("{} ({})", detection.stance, detection.reasoning);
//! ```

pub mod cache;
pub mod config;
mod duration;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod telemetry;

pub use cache::{CacheKey, VerdictCache};
pub use config::{CacheConfig, ConfigError, RuntimeConfig};
pub use models::{
    validate_input, GenerationParams, GeneratorLoader, LocalModel, LocalModelFactory,
    ModelAdapter, ModelDescriptor, ModelError, ModelFactory, ModelInfo, ModelRegistry,
    PromptFormat, TextGenerator, TuningParams, HUGGINGFACE_KIND, OLLAMA_KIND,
};
#[cfg(feature = "ollama")]
pub use models::{OllamaDetails, OllamaModel, OllamaModelFactory};
pub use orchestrator::{
    DetectError, ModelCatalogue, ModelSummary, StanceDetection, StanceDetector, StanceRequest,
    SwitchOutcome,
};
pub use telemetry::{init_tracing, TelemetryError};

pub use stance_core::{Stance, StanceParser, StanceVerdict};
