use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::model::{LanguageModel, ModelRef, StreamCallback};
use crate::types::StreamChunk;
use crate::{DittoError, Result};

/// One per-call setting. Every kind may be applied at most once per call, and
/// [`GenerateOption::Model`] / [`GenerateOption::ModelName`] share a single slot.
pub enum GenerateOption {
    Input(Value),
    Config(Value),
    Context(Vec<Value>),
    Model(Arc<dyn LanguageModel>),
    ModelName(String),
    Streaming(StreamCallback),
}

impl GenerateOption {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Input(_) => "with_input",
            Self::Config(_) => "with_config",
            Self::Context(_) => "with_context",
            Self::Model(_) => "with_model",
            Self::ModelName(_) => "with_model_name",
            Self::Streaming(_) => "with_streaming",
        }
    }

    pub fn apply(self, options: &mut RequestOptions) -> Result<()> {
        let option = self.name();
        match self {
            Self::Input(input) => set_once(&mut options.input, input, option),
            Self::Config(config) => set_once(&mut options.config, config, option),
            Self::Context(context) => set_once(&mut options.context, context, option),
            Self::Streaming(callback) => set_once(&mut options.on_chunk, callback, option),
            Self::Model(model) => set_model(options, ModelRef::Handle(model), option),
            Self::ModelName(name) => set_model(options, ModelRef::Name(name), option),
        }
    }
}

impl fmt::Debug for GenerateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(input) => f.debug_tuple("Input").field(input).finish(),
            Self::Config(config) => f.debug_tuple("Config").field(config).finish(),
            Self::Context(context) => f.debug_tuple("Context").field(context).finish(),
            Self::Model(model) => f.debug_tuple("Model").field(&model.name()).finish(),
            Self::ModelName(name) => f.debug_tuple("ModelName").field(name).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, option: &'static str) -> Result<()> {
    if slot.is_some() {
        return Err(DittoError::DuplicateOption {
            option,
            conflicts_with: None,
        });
    }
    *slot = Some(value);
    Ok(())
}

fn set_model(options: &mut RequestOptions, model: ModelRef, option: &'static str) -> Result<()> {
    if let Some(existing) = options.model.as_ref() {
        let existing = model_option_name(existing);
        return Err(DittoError::DuplicateOption {
            option,
            conflicts_with: (existing != option).then_some(existing),
        });
    }
    options.model = Some(model);
    Ok(())
}

fn model_option_name(model: &ModelRef) -> &'static str {
    match model {
        ModelRef::Handle(_) => "with_model",
        ModelRef::Name(_) => "with_model_name",
    }
}

/// Accumulates the options of a single generation call.
///
/// An unset field is `None`; `Some(Value::Null)` is an explicitly supplied null.
#[derive(Default)]
pub struct RequestOptions {
    pub(crate) input: Option<Value>,
    pub(crate) config: Option<Value>,
    pub(crate) context: Option<Vec<Value>>,
    pub(crate) model: Option<ModelRef>,
    pub(crate) on_chunk: Option<StreamCallback>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies options left to right, stopping at the first error.
    pub fn apply_all<I>(&mut self, options: I) -> Result<()>
    where
        I: IntoIterator<Item = GenerateOption>,
    {
        for option in options {
            option.apply(self)?;
        }
        Ok(())
    }

    pub fn from_options<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = GenerateOption>,
    {
        let mut out = Self::new();
        out.apply_all(options)?;
        Ok(out)
    }

    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    pub fn config(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    pub fn context(&self) -> Option<&[Value]> {
        self.context.as_deref()
    }

    pub fn model(&self) -> Option<&ModelRef> {
        self.model.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.on_chunk.is_some()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("input", &self.input)
            .field("config", &self.config)
            .field("context", &self.context)
            .field("model", &self.model)
            .field("streaming", &self.is_streaming())
            .finish()
    }
}

pub fn with_input<T: Serialize + ?Sized>(input: &T) -> Result<GenerateOption> {
    let value = serde_json::to_value(input)
        .map_err(|err| DittoError::Validation(format!("failed to serialize input: {err}")))?;
    Ok(GenerateOption::Input(value))
}

pub fn with_input_value(input: Value) -> GenerateOption {
    GenerateOption::Input(input)
}

pub fn with_config<T: Serialize + ?Sized>(config: &T) -> Result<GenerateOption> {
    let value = serde_json::to_value(config)
        .map_err(|err| DittoError::Validation(format!("failed to serialize config: {err}")))?;
    Ok(GenerateOption::Config(value))
}

pub fn with_config_value(config: Value) -> GenerateOption {
    GenerateOption::Config(config)
}

pub fn with_context<I, V>(context: I) -> GenerateOption
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    GenerateOption::Context(context.into_iter().map(Into::into).collect())
}

pub fn with_model(model: Arc<dyn LanguageModel>) -> GenerateOption {
    GenerateOption::Model(model)
}

pub fn with_model_name(name: impl Into<String>) -> GenerateOption {
    GenerateOption::ModelName(name.into())
}

pub fn with_streaming<F>(callback: F) -> GenerateOption
where
    F: FnMut(&StreamChunk) -> Result<()> + Send + 'static,
{
    GenerateOption::Streaming(Box::new(callback))
}
