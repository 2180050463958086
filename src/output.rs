use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{DittoError, Result};

/// Decodes model text into `T`. Accepts bare JSON, a fenced code block, or the last
/// balanced JSON value embedded in prose that parses.
pub fn decode_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = parse_json_from_response_text(text)?;
    serde_json::from_value::<T>(value)
        .map_err(|err| DittoError::Projection(format!("failed to deserialize output: {err}")))
}

pub fn parse_json_from_response_text(text: &str) -> Result<Value> {
    let raw = text.trim();
    if raw.is_empty() {
        return Err(DittoError::Projection(
            "model returned an empty response; expected JSON".to_string(),
        ));
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return Ok(parsed);
    }

    if let Some(block) = extract_code_fence(raw) {
        if let Ok(parsed) = serde_json::from_str::<Value>(block.trim()) {
            return Ok(parsed);
        }
    }

    for candidate in balanced_json_candidates(raw).into_iter().rev() {
        if let Ok(parsed) = serde_json::from_str::<Value>(candidate) {
            return Ok(parsed);
        }
    }

    Err(DittoError::Projection(format!(
        "failed to parse model response as JSON (response starts with {:?})",
        raw.chars().take(120).collect::<String>()
    )))
}

fn extract_code_fence(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_start = &text[start + 3..];
    let content_start = start + 3 + after_start.find('\n')? + 1;

    let remaining = &text[content_start..];
    let end = content_start + remaining.find("```")?;
    let block = text[content_start..end].trim();
    (!block.is_empty()).then_some(block)
}

/// Balanced top-level `{..}` / `[..]` spans in order of appearance.
fn balanced_json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut stack: Vec<u8> = Vec::new();
    let mut start = 0;

    for (offset, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' if !stack.is_empty() => in_string = true,
            b'{' | b'[' => {
                if stack.is_empty() {
                    start = offset;
                }
                stack.push(if b == b'{' { b'}' } else { b']' });
            }
            b'}' | b']' => {
                if stack.last() == Some(&b) {
                    stack.pop();
                    if stack.is_empty() {
                        candidates.push(&text[start..=offset]);
                    }
                }
            }
            _ => {}
        }
    }

    candidates
}
