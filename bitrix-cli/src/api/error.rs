//! Error types for request translation and execution

/// Errors raised while translating or executing a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitrixError {
    /// A required parameter (id, entityTypeId, method name) is absent or falsy
    MissingParameter { name: String },
    /// Malformed JSON or a JSON value of the wrong shape
    InvalidInput {
        message: String,
        /// Underlying parser message, if any
        details: Option<String>,
    },
    /// The resolved field set of an add/update is empty
    EmptyFields,
    /// Operation string not recognised for the resource
    UnsupportedOperation { operation: String },
    /// Non-2xx response or transport failure
    Api {
        /// What was being called (e.g. "crm.deal.get")
        context: String,
        status: Option<u16>,
        message: String,
    },
    /// Credentials could not be resolved
    Auth { message: String },
}

impl BitrixError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: None,
        }
    }

    /// Wrap a serde_json parse failure, keeping the parser message
    pub fn invalid_json(message: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: Some(err.to_string()),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in placeholders and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter { .. } => "missing_parameter",
            Self::InvalidInput { .. } => "invalid_input",
            Self::EmptyFields => "empty_fields",
            Self::UnsupportedOperation { .. } => "unsupported_operation",
            Self::Api { .. } => "api_error",
            Self::Auth { .. } => "auth_error",
        }
    }
}

impl std::fmt::Display for BitrixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingParameter { name } => write!(f, "missing required parameter '{}'", name),
            Self::InvalidInput { message, details } => match details {
                Some(details) => write!(f, "{}: {}", message, details),
                None => write!(f, "{}", message),
            },
            Self::EmptyFields => write!(f, "fields cannot be empty"),
            Self::UnsupportedOperation { operation } => {
                write!(f, "unsupported operation: {}", operation)
            }
            Self::Api {
                context,
                status,
                message,
            } => match status {
                Some(status) => write!(f, "Bitrix24 API error ({}) [{}]: {}", context, status, message),
                None => write!(f, "Bitrix24 API error ({}): {}", context, message),
            },
            Self::Auth { message } => write!(f, "authentication error: {}", message),
        }
    }
}

impl std::error::Error for BitrixError {}

/// A run aborted on a failing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    pub item_index: usize,
    pub source: BitrixError,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {} failed: {}", self.item_index, self.source)
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
