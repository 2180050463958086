use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Notify;

use crate::model::{ChunkSink, LanguageModel};
use crate::stream::forward_stream;
use crate::types::{GenerateRequest, GenerateResponse, Message, StreamChunk};
use crate::{DittoError, Result};

/// Replies `AI reply to "<first prompt text>"`, or a fixed JSON object when JSON output is
/// requested. When streaming it emits a single `stream!` chunk before the reply.
#[derive(Debug, Clone)]
pub struct EchoModel {
    provider: String,
    model_id: String,
    calls: Arc<AtomicUsize>,
}

impl EchoModel {
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_id: model_id.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reply_for(request: &GenerateRequest) -> String {
        if request.output.is_json() {
            return r#"{"text": "AI reply to JSON"}"#.to_string();
        }
        format!("AI reply to {:?}", request.first_text().unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for EchoModel {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: Option<&mut ChunkSink<'_>>,
    ) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = on_chunk {
            sink.send(StreamChunk::text("stream!"))?;
        }
        let reply = Self::reply_for(&request);
        let mut response = GenerateResponse::from_message(Message::model(reply));
        response.request = Some(request);
        Ok(response)
    }
}

/// Streams a fixed list of chunks; the final response is their aggregation.
#[derive(Debug, Clone)]
pub struct ScriptedStreamModel {
    chunks: Vec<String>,
}

impl ScriptedStreamModel {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedStreamModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "stream"
    }

    async fn generate(
        &self,
        _request: GenerateRequest,
        on_chunk: Option<&mut ChunkSink<'_>>,
    ) -> Result<GenerateResponse> {
        let chunks: Vec<Result<StreamChunk>> = self
            .chunks
            .iter()
            .map(|text| Ok(StreamChunk::text(text.clone())))
            .collect();
        forward_stream(stream::iter(chunks).boxed(), on_chunk).await
    }
}

/// Always fails with an invocation error and counts attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingModel {
    calls: Arc<AtomicUsize>,
}

impl FailingModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for FailingModel {
    fn provider(&self) -> &str {
        "failing"
    }

    fn model_id(&self) -> &str {
        "model"
    }

    async fn generate(
        &self,
        _request: GenerateRequest,
        _on_chunk: Option<&mut ChunkSink<'_>>,
    ) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DittoError::InvalidResponse("upstream returned 503".to_string()))
    }
}

/// Emits one `before gate` chunk, then suspends until [`GatedModel::open`] is called.
#[derive(Debug, Clone, Default)]
pub struct GatedModel {
    gate: Arc<Notify>,
    entered: Arc<Notify>,
}

impl GatedModel {
    pub fn open(&self) {
        self.gate.notify_one();
    }

    /// Resolves once a call has reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl LanguageModel for GatedModel {
    fn provider(&self) -> &str {
        "gated"
    }

    fn model_id(&self) -> &str {
        "model"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        mut on_chunk: Option<&mut ChunkSink<'_>>,
    ) -> Result<GenerateResponse> {
        if let Some(sink) = on_chunk.as_deref_mut() {
            sink.send(StreamChunk::text("before gate"))?;
        }
        self.entered.notify_one();
        self.gate.notified().await;
        if let Some(sink) = on_chunk.as_deref_mut() {
            sink.send(StreamChunk::text("after gate"))?;
        }
        let reply = EchoModel::reply_for(&request);
        let mut response = GenerateResponse::from_message(Message::model(reply));
        response.request = Some(request);
        Ok(response)
    }
}
