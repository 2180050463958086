mod config;
mod error;
mod output;
mod registry;
mod stream;

pub mod model;
pub mod prompt;
pub mod template;
pub mod types;
pub mod utils;

pub use config::{OutputKind, PromptFile, PromptSpec};
pub use error::{DittoError, ErrorKind, Result};
pub use model::{ChunkSink, LanguageModel, ModelRef, StreamCallback, StreamResult};
pub use output::{decode_json, parse_json_from_response_text};
pub use prompt::{
    CallPhase, Executor, GenerateDataResponse, GenerateOption, InputShape, PromptConfig,
    PromptDefinition, PromptKey, RequestOptions, with_config, with_config_value, with_context,
    with_input, with_input_value, with_model, with_model_name, with_streaming,
};
pub use registry::{ModelRegistry, Registry};
pub use stream::{collect_stream, forward_stream};
pub use template::{RenderedPrompt, SimpleRenderer, TemplateRenderer};
pub use types::{
    ContentPart, FinishReason, GenerateRequest, GenerateResponse, GenerationCommonConfig, Message,
    OutputFormat, Role, StreamChunk, Usage,
};

pub use tokio_util::sync::CancellationToken;
