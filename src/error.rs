use thiserror::Error;

#[derive(Debug, Error)]
pub enum DittoError {
    #[error("{option} is already set{}", conflict_suffix(.conflicts_with))]
    DuplicateOption {
        option: &'static str,
        conflicts_with: Option<&'static str>,
    },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("model resolution failed: {0}")]
    Resolution(String),
    #[error("input validation failed: {0}")]
    Validation(String),
    #[error("template render failed: {0}")]
    Render(String),
    #[error("model invocation failed: {0}")]
    Invocation(String),
    #[error("generation cancelled")]
    Cancelled,
    #[error("failed to decode structured output: {0}")]
    Projection(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse toml: {0}")]
    Toml(#[from] toml::de::Error),
}

fn conflict_suffix(conflicts_with: &Option<&'static str>) -> String {
    match conflicts_with {
        Some(other) => format!(" (conflicts with {other})"),
        None => String::new(),
    }
}

/// Coarse error taxonomy of a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Validation,
    Render,
    Invocation,
    Projection,
    Other,
}

impl DittoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateOption { .. } | Self::Configuration(_) => ErrorKind::Configuration,
            Self::Resolution(_) => ErrorKind::Resolution,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Render(_) => ErrorKind::Render,
            Self::Invocation(_) | Self::Cancelled => ErrorKind::Invocation,
            Self::Projection(_) => ErrorKind::Projection,
            Self::InvalidResponse(_) | Self::Io(_) | Self::Json(_) | Self::Toml(_) => {
                ErrorKind::Other
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DittoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_option_message_names_both_options() {
        let err = DittoError::DuplicateOption {
            option: "with_model_name",
            conflicts_with: Some("with_model"),
        };
        assert_eq!(
            err.to_string(),
            "with_model_name is already set (conflicts with with_model)"
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn cancellation_is_an_invocation_failure() {
        assert_eq!(DittoError::Cancelled.kind(), ErrorKind::Invocation);
    }
}
