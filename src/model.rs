use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::types::{GenerateRequest, GenerateResponse, StreamChunk};
use crate::{DittoError, Result};

pub type StreamResult = BoxStream<'static, Result<StreamChunk>>;

/// Caller-supplied streaming callback. An error aborts the generation call.
pub type StreamCallback = Box<dyn FnMut(&StreamChunk) -> Result<()> + Send>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn provider(&self) -> &str;
    fn model_id(&self) -> &str;

    /// Registry key of the model, `provider/model_id`.
    fn name(&self) -> String {
        format!("{}/{}", self.provider(), self.model_id())
    }

    /// Runs one request. When `on_chunk` is present the model streams every incremental
    /// chunk through it before returning the final aggregated response.
    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: Option<&mut ChunkSink<'_>>,
    ) -> Result<GenerateResponse>;
}

/// Delivery end of a streaming call, handed to [`LanguageModel::generate`].
pub struct ChunkSink<'a> {
    callback: &'a mut StreamCallback,
    cancel: CancellationToken,
    delivered: usize,
}

impl<'a> ChunkSink<'a> {
    pub fn new(callback: &'a mut StreamCallback, cancel: CancellationToken) -> Self {
        Self {
            callback,
            cancel,
            delivered: 0,
        }
    }

    /// Forwards one chunk to the callback; refuses once the call is cancelled.
    pub fn send(&mut self, mut chunk: StreamChunk) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(DittoError::Cancelled);
        }
        chunk.index = self.delivered;
        tracing::trace!(index = chunk.index, "delivering stream chunk");
        (self.callback)(&chunk)?;
        self.delivered += 1;
        Ok(())
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A model chosen either by handle or by registry name.
#[derive(Clone)]
pub enum ModelRef {
    Handle(Arc<dyn LanguageModel>),
    Name(String),
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(model) => f.debug_tuple("Handle").field(&model.name()).finish(),
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

impl From<Arc<dyn LanguageModel>> for ModelRef {
    fn from(model: Arc<dyn LanguageModel>) -> Self {
        Self::Handle(model)
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}
