use thiserror::Error;

/// Reasons a located statement is left untouched.
///
/// Every variant is local to one statement: the engine records it, keeps the
/// original text, and continues with the rest of the buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("unbalanced delimiter opened at byte {offset}")]
    UnbalancedDelimiter { offset: usize },

    #[error("malformed chain at byte {offset}: {message}")]
    MalformedChain { offset: usize, message: String },

    #[error("malformed format string {format}: {message}")]
    MalformedFormat { format: String, message: String },

    #[error("unrecognized field method `{method}`")]
    UnrecognizedField { method: String },

    #[error("cannot pair %w with its argument: {message}")]
    AmbiguousCause { message: String },
}

impl ChainError {
    pub(crate) fn malformed_chain(offset: usize, message: impl Into<String>) -> Self {
        ChainError::MalformedChain {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn malformed_format(format: &str, message: impl Into<String>) -> Self {
        ChainError::MalformedFormat {
            format: format.to_string(),
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::UnbalancedDelimiter { .. } => "unbalanced-delimiter",
            ChainError::MalformedChain { .. } => "malformed-chain",
            ChainError::MalformedFormat { .. } => "malformed-format",
            ChainError::UnrecognizedField { .. } => "unrecognized-field",
            ChainError::AmbiguousCause { .. } => "ambiguous-cause",
        }
    }
}
