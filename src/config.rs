use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ModelRef;
use crate::prompt::{InputShape, PromptConfig, PromptDefinition};
use crate::registry::Registry;
use crate::types::OutputFormat;
use crate::{DittoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    #[default]
    Text,
    Json,
}

/// One prompt as written in a TOML prompt file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptSpec {
    pub name: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input: Option<Value>,
    #[serde(default)]
    pub output: OutputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub stream: bool,
}

impl PromptSpec {
    pub fn into_definition(self) -> Result<PromptDefinition> {
        let output = match (self.output, self.output_schema) {
            (OutputKind::Json, schema) => OutputFormat::Json { schema },
            (OutputKind::Text, None) => OutputFormat::Text,
            (OutputKind::Text, Some(_)) => {
                return Err(DittoError::Configuration(format!(
                    "prompt {:?}: output_schema requires output = \"json\"",
                    self.name
                )));
            }
        };
        let config = PromptConfig {
            variant: self.variant,
            description: self.description,
            input_shape: self.input_schema.map(InputShape::Schema),
            default_input: self.default_input,
            model: self.model.map(ModelRef::Name),
            config: self.config,
            output,
            stream: self.stream,
        };
        PromptDefinition::new(self.name, self.template, config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptFile {
    #[serde(default)]
    pub prompts: Vec<PromptSpec>,
}

impl PromptFile {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(raw)?)
    }
}

impl Registry {
    /// Defines every prompt in `raw`, stopping at the first invalid or duplicate one.
    pub fn load_prompts_from_toml_str(&self, raw: &str) -> Result<Vec<Arc<PromptDefinition>>> {
        let file = PromptFile::from_toml_str(raw)?;
        let mut defined = Vec::with_capacity(file.prompts.len());
        for spec in file.prompts {
            let definition = spec.into_definition()?;
            defined.push(self.insert_prompt(Arc::new(definition))?);
        }
        Ok(defined)
    }

    pub async fn load_prompts_from_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<Arc<PromptDefinition>>> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        self.load_prompts_from_toml_str(&raw)
    }
}
