use formdoc_core::ConfigError;

/// Errors raised while turning a definition tree into a [`crate::Function`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    #[error("unknown function kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("'{kind}' expects {expected}")]
    Arity { kind: String, expected: String },

    #[error("invalid regular expression '{pattern}': {message}")]
    Regex { pattern: String, message: String },

    /// A `BIND` refers to a function the library does not know.
    #[error("function '{name}' is not defined")]
    Undefined { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FunctionError {
    pub(crate) fn arity(kind: &str, expected: &str) -> Self {
        FunctionError::Arity {
            kind: kind.to_owned(),
            expected: expected.to_owned(),
        }
    }
}
