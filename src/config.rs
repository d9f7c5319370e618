//! Configuration types for the ingestion worker.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across the worker context, log them for a run,
//! and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::IngestError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the extraction-and-chunking pipeline.
///
/// Built via [`IngestConfig::builder()`] or using
/// [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2chunks::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .window_size(10)
///     .dpi(150)
///     .chunk_size(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Number of pages rendered and transcribed per window. Default: 10.
    ///
    /// This is the memory ceiling of the whole pipeline: at most
    /// `window_size` rasterised pages are resident at any moment, and all of
    /// them are released before the next window starts rendering. Smaller
    /// windows trade a little pdfium re-open overhead for a lower peak.
    pub window_size: usize,

    /// Rendering DPI used when rasterising each page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps text sharp enough for a vision model to read reliably
    /// while image sizes stay modest. Increase to 200–300 for small-font
    /// documents; decrease to 96 when memory matters more than pixel density.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI. A 150-DPI render of an A0 poster
    /// would still produce a five-figure pixel edge; this field caps either
    /// dimension, scaling the other proportionally.
    pub max_render_pixels: u32,

    /// Maximum characters per chunk for the size-bounded splitter. Default: 1000.
    pub chunk_size: usize,

    /// Character overlap between consecutive size-bounded chunks. Default: 200.
    ///
    /// Overlap preserves cross-chunk context: a sentence that straddles a
    /// boundary is retrievable from either side. Must be smaller than
    /// `chunk_size`.
    pub chunk_overlap: usize,

    /// Percentile of the adjacent-sentence distance distribution above which
    /// the semantic splitter breaks. Range: (0, 100]. Default: 95.0.
    pub breakpoint_percentile: f64,

    /// Which segment-splitting strategy newly constructed chunkers use. Default: [`ChunkStrategy::Size`].
    pub strategy: ChunkStrategy,

    /// Sampling temperature for the vision model. Default: 0.1.
    ///
    /// Low temperature keeps the model deterministic and faithful to what it
    /// sees on the page, which is what transcription needs. Higher values
    /// introduce creativity that worsens extraction accuracy.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 2048.
    ///
    /// Caps runaway decoding on dense pages while covering normal page
    /// transcriptions comfortably.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient inference failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Permanent failures surface
    /// as [`crate::error::PageError::TranscriptionFailed`] after the retries
    /// are exhausted; the page degrades to empty text instead of killing the
    /// job.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Custom extraction prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Offload model layers to the GPU when a local gguf-backed provider is
    /// used. Default: true. Ignored by hosted API providers.
    pub gpu_offload: bool,

    /// Path to a local model file, forwarded to gguf-backed providers.
    /// Validated to exist at build time when set.
    pub model_path: Option<PathBuf>,

    /// Path to a local vision projector file, forwarded to gguf-backed
    /// providers. Validated to exist at build time when set.
    pub projector_path: Option<PathBuf>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the factory auto-detects from the
    /// environment.
    pub provider_name: Option<String>,

    /// Model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Bucket used when a job payload does not name one.
    pub default_bucket: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            dpi: 150,
            max_render_pixels: 2000,
            chunk_size: 1000,
            chunk_overlap: 200,
            breakpoint_percentile: 95.0,
            strategy: ChunkStrategy::default(),
            temperature: 0.1,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            gpu_offload: true,
            model_path: None,
            projector_path: None,
            provider_name: None,
            model: None,
            provider: None,
            default_bucket: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("window_size", &self.window_size)
            .field("dpi", &self.dpi)
            .field("max_render_pixels", &self.max_render_pixels)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("breakpoint_percentile", &self.breakpoint_percentile)
            .field("strategy", &self.strategy)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("gpu_offload", &self.gpu_offload)
            .field("model_path", &self.model_path)
            .field("projector_path", &self.projector_path)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("default_bucket", &self.default_bucket)
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn window_size(mut self, n: usize) -> Self {
        self.config.window_size = n.max(1);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_render_pixels(mut self, px: u32) -> Self {
        self.config.max_render_pixels = px.max(100);
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n.max(1);
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn breakpoint_percentile(mut self, p: f64) -> Self {
        self.config.breakpoint_percentile = p;
        self
    }

    pub fn strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn gpu_offload(mut self, v: bool) -> Self {
        self.config.gpu_offload = v;
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn projector_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.projector_path = Some(path.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.default_bucket = Some(bucket.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.window_size == 0 {
            return Err(IngestError::InvalidConfig("window_size must be ≥ 1".into()));
        }
        if c.dpi < 72 || c.dpi > 400 {
            return Err(IngestError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(IngestError::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if !(c.breakpoint_percentile > 0.0 && c.breakpoint_percentile <= 100.0) {
            return Err(IngestError::InvalidConfig(format!(
                "breakpoint_percentile must be in (0, 100], got {}",
                c.breakpoint_percentile
            )));
        }
        for path in [&c.model_path, &c.projector_path].into_iter().flatten() {
            if !path.exists() {
                return Err(IngestError::ModelFileNotFound { path: path.clone() });
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which segment-splitting strategy the chunker applies within each
/// structural section.
///
/// `Size` is the default because it has no embedder dependency: a
/// default-constructed chunker works in every deployment. `Semantic` is
/// selected explicitly at construction together with an
/// [`crate::chunking::Embedder`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    /// Greedy character windows with boundary-aware breaks and overlap.
    #[default]
    Size,
    /// Breaks where adjacent-sentence embedding similarity drops.
    Semantic,
}

impl ChunkStrategy {
    /// The tag recorded in chunk metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::Size => "size",
            ChunkStrategy::Semantic => "semantic",
        }
    }
}

impl fmt::Display for ChunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
