/// Errors raised while reading or querying a configuration tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The text could not be tokenized or parsed.
    #[error("{source_name}:{line}: {message}")]
    Syntax {
        source_name: String,
        line: u32,
        message: String,
    },

    /// A query by name found no descendant.
    #[error("no node named '{name}' below '{parent}'")]
    NodeNotFound { parent: String, name: String },

    /// A string that was required to be an identifier is not one.
    #[error("'{text}' is not a valid identifier")]
    InvalidIdentifier { text: String },
}

impl ConfigError {
    pub fn syntax(source_name: &str, line: u32, message: impl Into<String>) -> Self {
        ConfigError::Syntax {
            source_name: source_name.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub fn not_found(parent: &str, name: &str) -> Self {
        ConfigError::NodeNotFound {
            parent: parent.to_owned(),
            name: name.to_owned(),
        }
    }
}
