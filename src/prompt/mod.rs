mod engine;
mod options;


use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{LanguageModel, ModelRef};
use crate::types::{OutputFormat, empty_config};
use crate::utils::json_schema;
use crate::{DittoError, Result};

pub use engine::{CallPhase, Executor, GenerateDataResponse};
pub use options::{
    GenerateOption, RequestOptions, with_config, with_config_value, with_context, with_input,
    with_input_value, with_model, with_model_name, with_streaming,
};

/// Registry key of a prompt: its name plus an optional variant (empty for the default).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromptKey {
    pub name: String,
    pub variant: String,
}

impl PromptKey {
    pub fn new(name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.name, self.variant)
        }
    }
}

/// Expected shape of a prompt's input.
#[derive(Debug, Clone)]
pub enum InputShape {
    /// Checked against a JSON schema subset, see [`json_schema::validate`].
    Schema(Value),
    /// Coerced through a serde round trip of the named Rust type.
    Typed {
        type_name: &'static str,
        coerce: fn(Value) -> Result<Value>,
    },
}

impl InputShape {
    pub fn of<T>() -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::Typed {
            type_name: std::any::type_name::<T>(),
            coerce: coerce_as::<T>,
        }
    }

    pub fn check(&self, input: Value) -> Result<Value> {
        match self {
            Self::Schema(schema) => {
                json_schema::validate(schema, &input).map_err(DittoError::Validation)?;
                Ok(input)
            }
            Self::Typed { coerce, .. } => coerce(input),
        }
    }
}

fn coerce_as<T>(input: Value) -> Result<Value>
where
    T: Serialize + DeserializeOwned,
{
    let typed = serde_json::from_value::<T>(input).map_err(|err| {
        DittoError::Validation(format!(
            "input does not match {}: {err}",
            std::any::type_name::<T>()
        ))
    })?;
    serde_json::to_value(typed).map_err(|err| {
        DittoError::Validation(format!(
            "failed to re-encode {}: {err}",
            std::any::type_name::<T>()
        ))
    })
}

/// Defaults attached to a prompt when it is defined.
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    pub variant: String,
    pub description: Option<String>,
    pub input_shape: Option<InputShape>,
    pub default_input: Option<Value>,
    pub model: Option<ModelRef>,
    pub config: Option<Value>,
    pub output: OutputFormat,
    /// Hint for front ends; streaming only happens when a callback is supplied.
    pub stream: bool,
}

impl PromptConfig {
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_type<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        self.input_shape = Some(InputShape::of::<T>());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_shape = Some(InputShape::Schema(schema));
        self
    }

    pub fn with_default_input(mut self, input: Value) -> Self {
        self.default_input = Some(input);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(ModelRef::Handle(model));
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model = Some(ModelRef::Name(name.into()));
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// An immutable, named prompt template with its defaults.
#[derive(Debug, Clone)]
pub struct PromptDefinition {
    key: PromptKey,
    template: String,
    config: PromptConfig,
}

impl PromptDefinition {
    /// Builds a definition without registering it.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        config: PromptConfig,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DittoError::Configuration(
                "prompt name must not be empty".to_string(),
            ));
        }
        if let Some(ModelRef::Name(model)) = config.model.as_ref() {
            if model.trim().is_empty() {
                return Err(DittoError::Configuration(format!(
                    "prompt {name:?} has an empty default model name"
                )));
            }
        }
        let key = PromptKey::new(name, config.variant.clone());
        if let (Some(shape), Some(input)) =
            (config.input_shape.as_ref(), config.default_input.as_ref())
        {
            shape.check(input.clone()).map_err(|err| {
                DittoError::Configuration(format!(
                    "default input of prompt {key} is invalid: {err}"
                ))
            })?;
        }
        Ok(Self {
            key,
            template: template.into(),
            config,
        })
    }

    pub fn key(&self) -> &PromptKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn variant(&self) -> &str {
        &self.key.variant
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn description(&self) -> Option<&str> {
        self.config.description.as_deref()
    }

    pub fn input_shape(&self) -> Option<&InputShape> {
        self.config.input_shape.as_ref()
    }

    pub fn default_input(&self) -> Option<&Value> {
        self.config.default_input.as_ref()
    }

    pub fn default_model(&self) -> Option<&ModelRef> {
        self.config.model.as_ref()
    }

    pub fn default_config(&self) -> Option<&Value> {
        self.config.config.as_ref()
    }

    pub fn output(&self) -> &OutputFormat {
        &self.config.output
    }

    pub fn streams_by_default(&self) -> bool {
        self.config.stream
    }

    /// Request input, else the default input, else `{}`; then checked against the shape.
    pub(crate) fn resolve_input(&self, requested: Option<Value>) -> Result<Value> {
        let input = requested
            .or_else(|| self.config.default_input.clone())
            .unwrap_or_else(empty_config);
        match self.config.input_shape.as_ref() {
            Some(shape) => shape.check(input),
            None => Ok(input),
        }
    }

    /// Request config replaces the default config wholesale.
    pub(crate) fn resolve_config(&self, requested: Option<Value>) -> Value {
        requested
            .or_else(|| self.config.config.clone())
            .filter(|config| !config.is_null())
            .unwrap_or_else(empty_config)
    }
}
