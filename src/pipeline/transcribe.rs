//! Vision transcription: one rendered page image in, clean Markdown out.
//!
//! [`VisionModel`] is the opaque inference seam — the rest of the pipeline
//! never sees provider types, only `messages in, text out`. The bundled
//! [`ProviderModel`] implementation wraps an `edgequake-llm` provider;
//! tests substitute fakes.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from hosted inference APIs are transient and
//! frequent. Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids
//! thundering-herd: with 500 ms base and 3 retries the wait sequence is
//! 500 ms → 1 s → 2 s, under 4 s of back-off per page.
//!
//! ## Failure semantics
//!
//! `transcribe` returns `Err(PageError)` once retries are exhausted; the
//! window stream maps that to an empty-text, error-flagged page result.
//! Transcription failure is never fatal to the job — partial extraction
//! beats all-or-nothing. Model *resolution* failure, by contrast, is fatal
//! to the worker process: a worker with no model must not accept jobs.

use crate::config::IngestConfig;
use crate::error::{IngestError, PageError};
use crate::pipeline::postprocess;
use crate::prompts::EXTRACTION_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Error surfaced by a [`VisionModel`] call.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// The opaque inference seam: a multimodal chat completion.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ModelError>;
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl VisionModel for ProviderModel {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, ModelError> {
        let response = self
            .provider
            .chat(messages, Some(options))
            .await
            .map_err(|e| ModelError(e.to_string()))?;
        Ok(response.content)
    }
}

/// Drives the vision model over single page images for the process lifetime.
///
/// Owns the model handle, the fixed extraction prompt and the decoding
/// options; constructed once at worker startup and shared by every job.
pub struct VisionTranscriber {
    model: Arc<dyn VisionModel>,
    system_prompt: String,
    options: CompletionOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl VisionTranscriber {
    /// Wrap an already-resolved model.
    pub fn new(model: Arc<dyn VisionModel>, config: &IngestConfig) -> Self {
        Self {
            model,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| EXTRACTION_SYSTEM_PROMPT.to_string()),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Resolve a provider from the config and wrap it.
    ///
    /// Fatal on failure: the worker must not start without a usable model.
    pub fn from_config(config: &IngestConfig) -> Result<Self, IngestError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(Arc::new(ProviderModel::new(provider)), config))
    }

    /// Transcribe one page image to Markdown.
    ///
    /// The request contains the fixed system prompt plus one user turn
    /// carrying the image; the empty user text is intentional, multimodal
    /// APIs require a user turn but the image carries all the content.
    pub async fn transcribe(&self, page_num: usize, image: ImageData) -> Result<String, PageError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user_with_images("", vec![image]),
        ];

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    page = page_num,
                    attempt,
                    max = self.max_retries,
                    backoff_ms = backoff,
                    "retrying transcription"
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.model.generate(&messages, &self.options).await {
                Ok(raw) => {
                    let text = postprocess::clean_markdown(&raw);
                    debug!(page = page_num, chars = text.len(), "page transcribed");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(
                        page = page_num,
                        attempt = attempt + 1,
                        error = %e,
                        "transcription attempt failed"
                    );
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(PageError::TranscriptionFailed {
            page: page_num,
            detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

/// Resolve the inference provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider entirely; used as-is.
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    a deployment-level choice (compose file, CI), honoured before full
///    auto-detection so it wins even when several API keys are present.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans known API key variables and picks the first available provider.
fn resolve_provider(config: &IngestConfig) -> Result<Arc<dyn LLMProvider>, IngestError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| IngestError::ModelUnavailable {
            provider: "auto".to_string(),
            hint: format!(
                "no provider auto-detected from environment; \
                 set OPENAI_API_KEY, ANTHROPIC_API_KEY or EDGEQUAKE_LLM_PROVIDER: {e}"
            ),
        })?;

    Ok(llm_provider)
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, IngestError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        IngestError::ModelUnavailable {
            provider: provider_name.to_string(),
            hint: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        calls: AtomicUsize,
        fail_first: usize,
        reply: String,
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, ModelError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(ModelError("503 overloaded".into()))
            } else {
                Ok(self.reply.clone())
            }
        }
    }

    fn fast_config() -> IngestConfig {
        IngestConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn image_stub() -> ImageData {
        ImageData::new("aGVsbG8=".to_string(), "image/jpeg")
    }

    #[tokio::test]
    async fn transcribe_returns_cleaned_markdown() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicUsize::new(0),
            fail_first: 0,
            reply: "```markdown\n# Title\n\nBody\n```".into(),
        });
        let t = VisionTranscriber::new(model, &fast_config());
        let text = t.transcribe(1, image_stub()).await.unwrap();
        assert!(text.starts_with("# Title"), "fences stripped, got: {text:?}");
    }

    #[tokio::test]
    async fn transcribe_retries_transient_failures() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicUsize::new(0),
            fail_first: 2,
            reply: "recovered".into(),
        });
        let t = VisionTranscriber::new(Arc::clone(&model) as Arc<dyn VisionModel>, &fast_config());
        let text = t.transcribe(4, image_stub()).await.unwrap();
        assert_eq!(text.trim(), "recovered");
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn transcribe_degrades_to_page_error_after_retries() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
            reply: String::new(),
        });
        let t = VisionTranscriber::new(model, &fast_config());
        let err = t.transcribe(7, image_stub()).await.unwrap_err();
        match err {
            PageError::TranscriptionFailed { page, detail } => {
                assert_eq!(page, 7);
                assert!(detail.contains("503"));
            }
            other => panic!("expected TranscriptionFailed, got {other:?}"),
        }
    }
}
