use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::model::{ChunkSink, LanguageModel, ModelRef};
use crate::output::decode_json;
use crate::registry::{ModelRegistry, Registry};
use crate::template::TemplateRenderer;
use crate::types::{GenerateRequest, GenerateResponse, OutputFormat};
use crate::{DittoError, Result};

use super::{GenerateOption, PromptDefinition, RequestOptions};

/// Lifecycle of one generation call, recorded on its tracing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Unconfigured,
    Resolving,
    Rendering,
    Invoking,
    Completed,
    Failed,
}

impl CallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Resolving => "resolving",
            Self::Rendering => "rendering",
            Self::Invoking => "invoking",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerateDataResponse<T> {
    pub data: T,
    pub response: GenerateResponse,
}

/// Runs prompt definitions against injected model lookup and rendering.
#[derive(Clone, Copy)]
pub struct Executor<'a> {
    models: &'a dyn ModelRegistry,
    renderer: &'a dyn TemplateRenderer,
}

impl<'a> Executor<'a> {
    pub fn new(models: &'a dyn ModelRegistry, renderer: &'a dyn TemplateRenderer) -> Self {
        Self { models, renderer }
    }

    pub async fn generate(
        &self,
        prompt: &PromptDefinition,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<GenerateResponse> {
        self.execute(prompt, options, None, cancel).await
    }

    pub async fn generate_text(
        &self,
        prompt: &PromptDefinition,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<String> {
        self.execute(prompt, options, None, cancel).await?.text()
    }

    /// Requests JSON output (keeping the prompt's output schema) and decodes it into `T`.
    pub async fn generate_data<T: DeserializeOwned>(
        &self,
        prompt: &PromptDefinition,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<GenerateDataResponse<T>> {
        let schema = match prompt.output() {
            OutputFormat::Json { schema } => schema.clone(),
            OutputFormat::Text => None,
        };
        let response = self
            .execute(prompt, options, Some(OutputFormat::Json { schema }), cancel)
            .await?;
        let data = decode_json::<T>(&response.text()?)?;
        Ok(GenerateDataResponse { data, response })
    }

    async fn execute(
        &self,
        prompt: &PromptDefinition,
        options: Vec<GenerateOption>,
        output: Option<OutputFormat>,
        cancel: CancellationToken,
    ) -> Result<GenerateResponse> {
        let span = tracing::info_span!(
            "prompt.generate",
            prompt = %prompt.name(),
            variant = %prompt.variant(),
            model = tracing::field::Empty,
            phase = CallPhase::Unconfigured.as_str(),
        );
        let result = self
            .run(prompt, options, output, cancel)
            .instrument(span.clone())
            .await;
        let phase = if result.is_ok() {
            CallPhase::Completed
        } else {
            CallPhase::Failed
        };
        span.record("phase", phase.as_str());
        result
    }

    async fn run(
        &self,
        prompt: &PromptDefinition,
        options: Vec<GenerateOption>,
        output: Option<OutputFormat>,
        cancel: CancellationToken,
    ) -> Result<GenerateResponse> {
        let RequestOptions {
            input,
            config,
            context,
            model,
            on_chunk,
        } = RequestOptions::from_options(options)?;

        enter_phase(CallPhase::Resolving);
        let model = self.resolve_model(prompt, model)?;
        let model_name = model.name();
        tracing::Span::current().record("model", model_name.as_str());
        let input = prompt.resolve_input(input)?;
        let context = context.unwrap_or_default();

        enter_phase(CallPhase::Rendering);
        let rendered = self
            .renderer
            .render(prompt, &input, &context)
            .map_err(into_render_error)?;

        let request = GenerateRequest {
            model: model_name,
            messages: rendered.messages,
            config: prompt.resolve_config(config),
            output: output.unwrap_or(rendered.output),
            context,
            stream: on_chunk.is_some(),
        };

        enter_phase(CallPhase::Invoking);
        if cancel.is_cancelled() {
            return Err(DittoError::Cancelled);
        }
        let sent = request.clone();
        let mut on_chunk = on_chunk;
        let invocation = async {
            match on_chunk.as_mut() {
                Some(callback) => {
                    let mut sink = ChunkSink::new(callback, cancel.clone());
                    model.generate(request, Some(&mut sink)).await
                }
                None => model.generate(request, None).await,
            }
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DittoError::Cancelled),
            result = invocation => result,
        };

        let mut response = result.map_err(into_invocation_error)?;
        response.request = Some(sent);
        tracing::debug!(finish_reason = ?response.finish_reason, "generation completed");
        Ok(response)
    }

    /// Per-call handle, then per-call name, then the prompt's default.
    fn resolve_model(
        &self,
        prompt: &PromptDefinition,
        requested: Option<ModelRef>,
    ) -> Result<Arc<dyn LanguageModel>> {
        let selected = requested
            .or_else(|| prompt.default_model().cloned())
            .ok_or_else(|| {
                DittoError::Resolution(format!(
                    "prompt {} has no model; pass with_model or with_model_name",
                    prompt.key()
                ))
            })?;
        match selected {
            ModelRef::Handle(model) => Ok(model),
            ModelRef::Name(name) => self.models.resolve_model(&name),
        }
    }
}

fn enter_phase(phase: CallPhase) {
    tracing::Span::current().record("phase", phase.as_str());
    tracing::debug!(phase = phase.as_str(), "generation phase");
}

fn into_render_error(err: DittoError) -> DittoError {
    match err {
        DittoError::Render(_) => err,
        other => DittoError::Render(other.to_string()),
    }
}

fn into_invocation_error(err: DittoError) -> DittoError {
    match err {
        DittoError::Invocation(_) | DittoError::Cancelled => err,
        other => DittoError::Invocation(other.to_string()),
    }
}

impl PromptDefinition {
    pub async fn generate(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
    ) -> Result<GenerateResponse> {
        self.generate_with_cancellation(registry, options, CancellationToken::new())
            .await
    }

    pub async fn generate_with_cancellation(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<GenerateResponse> {
        registry.executor().generate(self, options, cancel).await
    }

    pub async fn generate_text(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
    ) -> Result<String> {
        self.generate_text_with_cancellation(registry, options, CancellationToken::new())
            .await
    }

    pub async fn generate_text_with_cancellation(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<String> {
        registry.executor().generate_text(self, options, cancel).await
    }

    pub async fn generate_data<T: DeserializeOwned>(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
    ) -> Result<GenerateDataResponse<T>> {
        self.generate_data_with_cancellation(registry, options, CancellationToken::new())
            .await
    }

    pub async fn generate_data_with_cancellation<T: DeserializeOwned>(
        &self,
        registry: &Registry,
        options: Vec<GenerateOption>,
        cancel: CancellationToken,
    ) -> Result<GenerateDataResponse<T>> {
        registry.executor().generate_data(self, options, cancel).await
    }
}
