use futures_util::StreamExt;

use crate::model::{ChunkSink, StreamResult};
use crate::types::{ContentPart, FinishReason, GenerateResponse, Message, Role, StreamChunk};
use crate::Result;

#[derive(Debug, Clone, Copy)]
struct StreamCollectorLimits {
    max_total_bytes: usize,
    max_parts: usize,
}

impl Default for StreamCollectorLimits {
    fn default() -> Self {
        Self {
            max_total_bytes: 64 * 1024 * 1024,
            max_parts: 4096,
        }
    }
}

/// Folds streamed chunks into one model message. Adjacent text parts are merged.
#[derive(Debug, Default)]
pub(crate) struct StreamCollector {
    parts: Vec<ContentPart>,
    limits: StreamCollectorLimits,
    total_bytes: usize,
    truncated: bool,
}

impl StreamCollector {
    fn try_add_bytes(&mut self, bytes: usize) -> bool {
        if self.truncated {
            return false;
        }
        if self.total_bytes.saturating_add(bytes) > self.limits.max_total_bytes {
            self.truncated = true;
            return false;
        }
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        true
    }

    pub(crate) fn observe(&mut self, chunk: &StreamChunk) {
        for part in &chunk.content {
            match part {
                ContentPart::Text { text } => {
                    if text.is_empty() || !self.try_add_bytes(text.len()) {
                        continue;
                    }
                    if let Some(ContentPart::Text { text: existing }) = self.parts.last_mut() {
                        existing.push_str(text);
                        continue;
                    }
                    if self.parts.len() >= self.limits.max_parts {
                        self.truncated = true;
                        continue;
                    }
                    self.parts.push(part.clone());
                }
                other => {
                    if self.parts.len() >= self.limits.max_parts {
                        self.truncated = true;
                        continue;
                    }
                    self.parts.push(other.clone());
                }
            }
        }
    }

    pub(crate) fn finish(self) -> GenerateResponse {
        let finish_reason = if self.truncated {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };
        GenerateResponse {
            message: Some(Message {
                role: Role::Model,
                content: self.parts,
            }),
            finish_reason,
            ..GenerateResponse::default()
        }
    }
}

/// Drains `stream`, forwarding every chunk to `sink` (when streaming) and returning the
/// aggregated response. Intended for models whose transport yields chunk streams.
pub async fn forward_stream(
    mut stream: StreamResult,
    mut sink: Option<&mut ChunkSink<'_>>,
) -> Result<GenerateResponse> {
    let mut collector = StreamCollector::default();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        collector.observe(&chunk);
        if let Some(sink) = sink.as_deref_mut() {
            sink.send(chunk)?;
        }
    }
    Ok(collector.finish())
}

pub async fn collect_stream(stream: StreamResult) -> Result<GenerateResponse> {
    forward_stream(stream, None).await
}
