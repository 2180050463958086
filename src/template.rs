use serde_json::Value;

use crate::prompt::PromptDefinition;
use crate::types::{Message, OutputFormat};
use crate::{DittoError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub messages: Vec<Message>,
    pub output: OutputFormat,
}

/// Turns a definition plus the effective input into model messages.
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        definition: &PromptDefinition,
        input: &Value,
        context: &[Value],
    ) -> Result<RenderedPrompt>;
}

/// Minimal renderer: replaces `{{path}}` placeholders (dotted paths into the input) and
/// emits the result as a single user message. Missing values render as empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRenderer;

impl TemplateRenderer for SimpleRenderer {
    fn render(
        &self,
        definition: &PromptDefinition,
        input: &Value,
        _context: &[Value],
    ) -> Result<RenderedPrompt> {
        let text = substitute(definition.template(), input)?;
        Ok(RenderedPrompt {
            messages: vec![Message::user(text)],
            output: definition.output().clone(),
        })
    }
}

fn substitute(template: &str, input: &Value) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            DittoError::Render(format!(
                "unterminated placeholder at byte {}",
                template.len() - rest.len() + start
            ))
        })?;
        let path = after[..end].trim();
        if path.is_empty() {
            return Err(DittoError::Render("empty placeholder".to_string()));
        }
        match lookup(input, path) {
            Some(Value::String(text)) => out.push_str(text),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&other.to_string()),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(input, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}
