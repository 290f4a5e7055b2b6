use thiserror::Error;

/// Why an expression could not be evaluated. The `Display` text is what ends up in
/// `status.message`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("cannot parse variable \"{name}\": {reason}")]
    VariableParse { name: String, reason: String },

    #[error("unbound variable \"{0}\"")]
    UnboundVariable(String),

    #[error("duplicate variable \"{0}\"")]
    DuplicateVariable(String),

    #[error("type error: {0}")]
    Type(String),
}

impl EvaluationError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}
