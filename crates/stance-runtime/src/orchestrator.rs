//! Stance detection orchestrator.
//!
//! [`StanceDetector`] owns the active model and runs the request flow:
//! 1. Validate text and target
//! 2. Switch model if the request names another one
//! 3. Build the prompt and generate under the request deadline
//! 4. Parse the response into a verdict (deterministic)
//!
//! The active adapter sits behind a `tokio::sync::RwLock`: generations
//! share the read lock, switching takes the write lock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use stance_core::{Stance, StanceParser, StanceVerdict};

use crate::cache::{CacheKey, VerdictCache};
use crate::config::{ConfigError, RuntimeConfig};
use crate::models::{ModelAdapter, ModelDescriptor, ModelError, ModelInfo, ModelRegistry};
use crate::prompts;

/// Errors from the stance detector.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No model loaded")]
    NoModelLoaded,

    #[error("Model '{name}' not found. Available models: {available:?}")]
    UnknownModel { name: String, available: Vec<String> },

    #[error("Failed to load model '{0}'")]
    LoadFailed(String),

    #[error("Request exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl From<ConfigError> for DetectError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownModel { name, available } => {
                DetectError::UnknownModel { name, available }
            }
            other => DetectError::InvalidRequest(other.to_string()),
        }
    }
}

/// A stance detection request.
#[derive(Debug, Clone, Default)]
pub struct StanceRequest {
    pub text: String,
    /// Defaults to "the mentioned topic"
    pub target: Option<String>,
    /// Catalogue name of the model to use; switches the active model
    pub model_name: Option<String>,
}

impl StanceRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }
}

/// Result of a stance detection request.
#[derive(Debug, Clone, Serialize)]
pub struct StanceDetection {
    pub stance: Stance,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub model_used: String,
    pub target: String,
    #[serde(with = "crate::duration")]
    pub processing_time: Duration,
    pub processed_at: DateTime<Utc>,
    /// Served from the response cache
    pub cached: bool,
}

/// Outcome of [`StanceDetector::switch_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    AlreadyActive,
    Switched,
}

/// One catalogue entry as reported by [`StanceDetector::available_models`].
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub model_name: String,
    pub description: String,
    pub memory_requirement: u64,
    pub context_length: usize,
    pub supported_languages: Vec<String>,
}

/// Catalogue listing plus the active model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalogue {
    pub models: Vec<ModelSummary>,
    pub current_model: Option<String>,
}

struct ActiveModel {
    name: String,
    adapter: Box<dyn ModelAdapter>,
}

/// Owns the active model and turns requests into stance verdicts.
pub struct StanceDetector {
    config: RuntimeConfig,
    registry: ModelRegistry,
    active: RwLock<Option<ActiveModel>>,
    parser: StanceParser,
    cache: Option<VerdictCache>,
}

impl StanceDetector {
    /// Create a detector. No model is loaded until [`start`](Self::start)
    /// or [`switch_model`](Self::switch_model).
    pub fn new(config: RuntimeConfig, registry: ModelRegistry) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| VerdictCache::from_config(&config.cache));

        Self {
            config,
            registry,
            active: RwLock::new(None),
            parser: StanceParser::new(),
            cache,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registry used to build adapters. New kinds may be registered at any time.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Load the configured default model.
    ///
    /// A failure is logged and leaves no model active.
    pub async fn start(&self) -> bool {
        let name = self.config.default_model.clone();
        match self.switch_model(&name).await {
            Ok(_) => {
                tracing::info!(model = %name, "Stance detector started");
                true
            }
            Err(e) => {
                tracing::error!(model = %name, error = %e, "Failed to load default model");
                false
            }
        }
    }

    /// Make `name` the active model.
    ///
    /// The new adapter is loaded before the swap; on failure the previous
    /// model stays active. The replaced adapter is unloaded afterwards.
    pub async fn switch_model(&self, name: &str) -> Result<SwitchOutcome, DetectError> {
        let descriptor = self.config.model(name)?;

        {
            let active = self.active.read().await;
            if let Some(current) = active.as_ref() {
                if current.name == name && current.adapter.is_loaded() {
                    return Ok(SwitchOutcome::AlreadyActive);
                }
            }
        }

        let mut adapter = self.registry.create(&descriptor.kind, descriptor)?;
        if !adapter.load().await {
            tracing::error!(model = %name, "Model failed to load, keeping current model");
            return Err(DetectError::LoadFailed(name.to_string()));
        }

        let previous = {
            let mut active = self.active.write().await;
            active.replace(ActiveModel {
                name: name.to_string(),
                adapter,
            })
        };

        if let Some(mut previous) = previous {
            previous.adapter.unload().await;
            tracing::info!(from = %previous.name, to = %name, "Switched model");
        } else {
            tracing::info!(model = %name, "Loaded model");
        }

        Ok(SwitchOutcome::Switched)
    }

    /// Run one stance detection request.
    pub async fn detect(&self, request: StanceRequest) -> Result<StanceDetection, DetectError> {
        let started = Instant::now();

        let text = request.text.trim();
        if text.is_empty() {
            return Err(DetectError::InvalidRequest("text must not be empty".to_string()));
        }
        if text.chars().count() > self.config.max_text_chars {
            return Err(DetectError::InvalidRequest(format!(
                "text exceeds {} characters",
                self.config.max_text_chars
            )));
        }

        let target = request
            .target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(prompts::DEFAULT_TARGET);
        if target.chars().count() > self.config.max_target_chars {
            return Err(DetectError::InvalidRequest(format!(
                "target exceeds {} characters",
                self.config.max_target_chars
            )));
        }

        if let Some(model_name) = request.model_name.as_deref() {
            self.switch_model(model_name).await?;
        }

        let active = self.active.read().await;
        let current = active.as_ref().ok_or(DetectError::NoModelLoaded)?;
        let model_used = current.name.clone();

        let cache_key = CacheKey::new(&model_used, target, text);
        if let Some(cache) = &self.cache {
            if let Some(verdict) = cache.get(&cache_key).await {
                tracing::debug!(model = %model_used, "Serving cached verdict");
                return Ok(self.detection(verdict, model_used, target, started, true));
            }
        }

        let prompt = prompts::stance_prompt(target, text);
        let system_prompt = system_prompt_for(current.adapter.descriptor(), &prompt);
        let timeout = self.config.request_timeout;

        let raw = match tokio::time::timeout(
            timeout,
            current.adapter.generate(&prompt, system_prompt),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(model = %model_used, timeout = ?timeout, "Stance detection timed out");
                return Err(DetectError::DeadlineExceeded(timeout));
            }
        };
        drop(active);

        let verdict = self.parser.parse(&raw);
        if let Some(cache) = &self.cache {
            cache.insert(cache_key, verdict.clone()).await;
        }

        let detection = self.detection(verdict, model_used, target, started, false);
        tracing::info!(
            model = %detection.model_used,
            stance = %detection.stance,
            elapsed = ?detection.processing_time,
            "Stance detected"
        );
        Ok(detection)
    }

    fn detection(
        &self,
        verdict: StanceVerdict,
        model_used: String,
        target: &str,
        started: Instant,
        cached: bool,
    ) -> StanceDetection {
        let (stance, reasoning, confidence) = verdict.into_parts();
        StanceDetection {
            stance,
            reasoning,
            confidence,
            model_used,
            target: target.to_string(),
            processing_time: started.elapsed(),
            processed_at: Utc::now(),
            cached,
        }
    }

    /// Catalogue entries and the active model.
    pub async fn available_models(&self) -> ModelCatalogue {
        let models = self
            .config
            .models
            .iter()
            .map(|(name, descriptor)| ModelSummary {
                name: name.clone(),
                kind: descriptor.kind.clone(),
                model_name: descriptor.model_name.clone(),
                description: descriptor.description.clone(),
                memory_requirement: descriptor.memory_requirement,
                context_length: descriptor.context_length,
                supported_languages: descriptor.supported_languages.clone(),
            })
            .collect();

        ModelCatalogue {
            models,
            current_model: self.current_model().await,
        }
    }

    /// Catalogue name of the active model.
    pub async fn current_model(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|m| m.name.clone())
    }

    pub async fn current_model_info(&self) -> Option<ModelInfo> {
        self.active.read().await.as_ref().map(|m| m.adapter.describe())
    }

    /// Whether the active model answers its availability probe.
    pub async fn is_healthy(&self) -> bool {
        match self.active.read().await.as_ref() {
            Some(current) => current.adapter.is_available().await,
            None => false,
        }
    }

    /// Unload the active model, if any.
    pub async fn shutdown(&self) {
        let previous = self.active.write().await.take();
        if let Some(mut previous) = previous {
            previous.adapter.unload().await;
            tracing::info!(model = %previous.name, "Stance detector shut down");
        }
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}

impl std::fmt::Debug for StanceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StanceDetector")
            .field("default_model", &self.config.default_model)
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}

/// Full guidelines when they fit the model's context, the brief prompt otherwise.
fn system_prompt_for(descriptor: &ModelDescriptor, prompt: &str) -> &'static str {
    let needed = prompts::STANCE_DETECTION_SYSTEM_PROMPT.chars().count() + prompt.chars().count();
    if needed <= descriptor.prompt_char_limit() {
        prompts::STANCE_DETECTION_SYSTEM_PROMPT
    } else {
        prompts::STANCE_DETECTION_BRIEF_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFactory;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        generates: AtomicUsize,
        unloads: AtomicUsize,
    }

    struct ScriptedModel {
        descriptor: ModelDescriptor,
        loaded: bool,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl ModelAdapter for ScriptedModel {
        fn descriptor(&self) -> &ModelDescriptor {
            &self.descriptor
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        async fn load(&mut self) -> bool {
            self.loaded = self.descriptor.model_name != "broken";
            self.loaded
        }

        async fn is_available(&self) -> bool {
            self.loaded
        }

        async fn generate(&self, prompt: &str, system: &str) -> Result<String, ModelError> {
            crate::models::validate_input(&self.descriptor, prompt, system)?;
            self.counters.generates.fetch_add(1, Ordering::SeqCst);
            match self.descriptor.model_name.as_str() {
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("STANCE: NONE".to_string())
                }
                "failing" => Err(ModelError::Transport("connection reset".to_string())),
                _ => Ok("STANCE: FAVOR\nReasoning: The author supports the target.\nConfidence: 0.9"
                    .to_string()),
            }
        }

        async fn unload(&mut self) -> bool {
            self.loaded = false;
            self.counters.unloads.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct ScriptedFactory {
        counters: Arc<Counters>,
    }

    impl ModelFactory for ScriptedFactory {
        fn kind(&self) -> &'static str {
            "scripted"
        }

        fn create(
            &self,
            descriptor: &ModelDescriptor,
        ) -> Result<Box<dyn ModelAdapter>, ModelError> {
            Ok(Box::new(ScriptedModel {
                descriptor: descriptor.clone(),
                loaded: false,
                counters: Arc::clone(&self.counters),
            }))
        }

        fn validate_config(&self, _descriptor: &ModelDescriptor) -> Result<(), ModelError> {
            Ok(())
        }
    }

    fn detector_with(cache_enabled: bool) -> (StanceDetector, Arc<Counters>) {
        let mut models = BTreeMap::new();
        for name in ["alpha", "beta", "broken", "slow", "failing"] {
            models.insert(
                name.to_string(),
                ModelDescriptor::new("scripted", name).with_context_length(4096),
            );
        }

        let mut config = RuntimeConfig {
            default_model: "alpha".to_string(),
            request_timeout: Duration::from_millis(200),
            models,
            ..Default::default()
        };
        config.cache.enabled = cache_enabled;

        let counters = Arc::new(Counters::default());
        let registry = ModelRegistry::new();
        registry.register(Arc::new(ScriptedFactory {
            counters: Arc::clone(&counters),
        }));

        (StanceDetector::new(config, registry), counters)
    }

    #[tokio::test]
    async fn test_start_loads_default_model() {
        let (detector, _) = detector_with(false);
        assert!(!detector.is_healthy().await);

        assert!(detector.start().await);
        assert_eq!(detector.current_model().await.as_deref(), Some("alpha"));
        assert!(detector.is_healthy().await);

        let info = detector.current_model_info().await.unwrap();
        assert_eq!(info.name, "alpha");
        assert!(info.is_loaded);
    }

    #[tokio::test]
    async fn test_detect_without_model() {
        let (detector, _) = detector_with(false);
        let err = detector.detect(StanceRequest::new("Some text")).await.unwrap_err();
        assert!(matches!(err, DetectError::NoModelLoaded));
    }

    #[tokio::test]
    async fn test_detect_basic() {
        let (detector, counters) = detector_with(false);
        assert!(detector.start().await);

        let detection = detector
            .detect(StanceRequest::new("  Renewables are the future.  "))
            .await
            .unwrap();

        assert_eq!(detection.stance, Stance::Favor);
        assert_eq!(detection.reasoning, "The author supports the target.");
        assert_eq!(detection.confidence, Some(0.9));
        assert_eq!(detection.model_used, "alpha");
        assert_eq!(detection.target, "the mentioned topic");
        assert!(!detection.cached);
        assert_eq!(counters.generates.load(Ordering::SeqCst), 1);

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["stance"], "FAVOR");
        assert!(json["processed_at"].is_string());
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (detector, counters) = detector_with(false);
        assert!(detector.start().await);

        let empty = detector.detect(StanceRequest::new("   ")).await;
        assert!(matches!(empty, Err(DetectError::InvalidRequest(_))));

        let long_text = detector.detect(StanceRequest::new("a".repeat(5001))).await;
        assert!(matches!(long_text, Err(DetectError::InvalidRequest(_))));

        let long_target = detector
            .detect(StanceRequest::new("text").with_target("t".repeat(201)))
            .await;
        assert!(matches!(long_target, Err(DetectError::InvalidRequest(_))));

        assert_eq!(counters.generates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_switch_model() {
        let (detector, counters) = detector_with(false);
        assert!(detector.start().await);

        assert_eq!(
            detector.switch_model("alpha").await.unwrap(),
            SwitchOutcome::AlreadyActive
        );
        assert_eq!(
            detector.switch_model("beta").await.unwrap(),
            SwitchOutcome::Switched
        );
        assert_eq!(detector.current_model().await.as_deref(), Some("beta"));
        assert_eq!(counters.unloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_failure_keeps_previous_model() {
        let (detector, counters) = detector_with(false);
        assert!(detector.start().await);

        let err = detector.switch_model("broken").await.unwrap_err();
        assert!(matches!(err, DetectError::LoadFailed(ref name) if name == "broken"));
        assert_eq!(detector.current_model().await.as_deref(), Some("alpha"));
        assert_eq!(counters.unloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_model() {
        let (detector, _) = detector_with(false);
        match detector.switch_model("gpt-x").await {
            Err(DetectError::UnknownModel { name, available }) => {
                assert_eq!(name, "gpt-x");
                assert!(available.contains(&"beta".to_string()));
            }
            other => panic!("expected UnknownModel, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detect_with_requested_model() {
        let (detector, _) = detector_with(false);
        assert!(detector.start().await);

        let detection = detector
            .detect(
                StanceRequest::new("Nuclear power is safe.")
                    .with_target("Nuclear Energy")
                    .with_model("beta"),
            )
            .await
            .unwrap();

        assert_eq!(detection.model_used, "beta");
        assert_eq!(detection.target, "Nuclear Energy");
        assert_eq!(detector.current_model().await.as_deref(), Some("beta"));
    }

    #[tokio::test]
    async fn test_detect_deadline() {
        let (detector, _) = detector_with(false);
        detector.switch_model("slow").await.unwrap();

        let err = detector.detect(StanceRequest::new("text")).await.unwrap_err();
        assert!(matches!(err, DetectError::DeadlineExceeded(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_detect_model_error() {
        let (detector, _) = detector_with(false);
        detector.switch_model("failing").await.unwrap();

        match detector.detect(StanceRequest::new("text")).await {
            Err(DetectError::Model(e)) => assert!(e.is_retryable()),
            other => panic!("expected Model error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cache_short_circuits_repeat_requests() {
        let (detector, counters) = detector_with(true);
        assert!(detector.start().await);

        let request = StanceRequest::new("Solar is great.").with_target("Energy");
        let first = detector.detect(request.clone()).await.unwrap();
        let second = detector.detect(request).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.stance, second.stance);
        assert_eq!(counters.generates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_available_models() {
        let (detector, _) = detector_with(false);
        assert!(detector.start().await);

        let catalogue = detector.available_models().await;
        assert_eq!(catalogue.models.len(), 5);
        assert_eq!(catalogue.current_model.as_deref(), Some("alpha"));
        assert!(catalogue.models.iter().any(|m| m.name == "slow" && m.kind == "scripted"));
    }

    #[tokio::test]
    async fn test_shutdown_unloads() {
        let (detector, counters) = detector_with(false);
        assert!(detector.start().await);

        detector.shutdown().await;
        assert!(detector.current_model().await.is_none());
        assert!(!detector.is_healthy().await);
        assert_eq!(counters.unloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_prompt_selection() {
        let roomy = ModelDescriptor::new("scripted", "big").with_context_length(4096);
        let tight = ModelDescriptor::new("scripted", "small").with_context_length(512);
        let prompt = prompts::stance_prompt("X", "y");

        assert_eq!(
            system_prompt_for(&roomy, &prompt),
            prompts::STANCE_DETECTION_SYSTEM_PROMPT
        );
        assert_eq!(
            system_prompt_for(&tight, &prompt),
            prompts::STANCE_DETECTION_BRIEF_PROMPT
        );
    }
}
