use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{DittoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Model,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::text(text)],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Concatenates the text parts in order; non-text parts are skipped.
    pub fn text(&self) -> String {
        concat_text(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    Media {
        content_type: String,
        url: String,
    },
    Data {
        data: Value,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

fn concat_text(parts: &[ContentPart]) -> String {
    let mut out = String::new();
    for part in parts {
        if let ContentPart::Text { text } = part {
            out.push_str(text);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Blocked,
    Other,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

/// Output directive produced by rendering and forwarded to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<Value>,
    },
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json { .. })
    }
}

/// Typed view of the common generation settings carried in the opaque request config.
/// Both snake_case and camelCase keys are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationCommonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, alias = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, alias = "topK", skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, alias = "topP", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, alias = "stopSequences", skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl GenerationCommonConfig {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value::<Self>(value.clone())
            .map_err(|err| DittoError::Validation(format!("invalid generation config: {err}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Resolved model name, `provider/model_id`.
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default = "empty_config")]
    pub config: Value,
    #[serde(default)]
    pub output: OutputFormat,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    #[serde(default)]
    pub stream: bool,
}

pub(crate) fn empty_config() -> Value {
    Value::Object(Map::new())
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            config: empty_config(),
            output: OutputFormat::Text,
            context: Vec::new(),
            stream: false,
        }
    }

    /// Parses the config as [`GenerationCommonConfig`]; unknown keys are ignored.
    pub fn common_config(&self) -> Result<Option<GenerationCommonConfig>> {
        match &self.config {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            other => GenerationCommonConfig::from_value(other).map(Some),
        }
    }

    /// Text of the first part of the first message, the conventional "prompt" slot.
    pub fn first_text(&self) -> Option<&str> {
        self.messages
            .first()
            .and_then(|message| message.content.first())
            .and_then(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default)]
    pub finish_reason: FinishReason,
    #[serde(default)]
    pub usage: Usage,
    /// The request that produced this response, as sent to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<GenerateRequest>,
}

impl GenerateResponse {
    pub fn from_message(message: Message) -> Self {
        Self {
            message: Some(message),
            finish_reason: FinishReason::Stop,
            ..Self::default()
        }
    }

    pub fn text(&self) -> Result<String> {
        let message = self.message.as_ref().ok_or_else(|| {
            DittoError::InvalidResponse("model response has no message".to_string())
        })?;
        Ok(message.text())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StreamChunk {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            index: 0,
            content: vec![ContentPart::text(text)],
        }
    }

    pub fn concat_text(&self) -> String {
        concat_text(&self.content)
    }
}
