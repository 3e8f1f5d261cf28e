//! Error types for the routing table
//!
//! Insertion itself never fails; these errors cover the boundaries around the
//! table: identifier parsing, configuration, liveness probes and file I/O.

use std::fmt;

/// Error type for routing table operations
#[derive(Debug, Clone)]
pub enum RoutingError {
    /// Configuration errors
    ConfigError {
        message: String,
        field: Option<String>,
    },

    /// Malformed input such as an identifier of the wrong length
    ValidationError {
        message: String,
        field: Option<String>,
    },

    /// Liveness probe failures (timeouts, transport errors)
    LivenessError {
        message: String,
        contact: Option<String>,
        source: Option<String>,
    },

    /// File I/O errors
    IoError {
        message: String,
        path: Option<String>,
        source: Option<String>,
    },
}

impl RoutingError {
    /// Create a new ConfigError with field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        RoutingError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new ValidationError with field
    pub fn validation_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        RoutingError::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new LivenessError with contact and source
    pub fn liveness_error_full(
        message: impl Into<String>,
        contact: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        RoutingError::LivenessError {
            message: message.into(),
            contact: Some(contact.into()),
            source: Some(source.into()),
        }
    }

    /// Create a new IoError with path and source
    pub fn io_error_full(message: impl Into<String>, path: impl Into<String>, source: impl Into<String>) -> Self {
        RoutingError::IoError {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source.into()),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match &mut self {
            RoutingError::LivenessError { source, .. } | RoutingError::IoError { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            RoutingError::ConfigError { message, .. } | RoutingError::ValidationError { message, .. } => {
                *message = format!("{} ({})", message, ctx);
            }
        }
        self
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
            RoutingError::ValidationError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Validation error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Validation error: {}", message)
                }
            }
            RoutingError::LivenessError { message, contact, source } => match (contact, source) {
                (Some(c), Some(s)) => write!(f, "Liveness error: {} (contact: {}, source: {})", message, c, s),
                (Some(c), None) => write!(f, "Liveness error: {} (contact: {})", message, c),
                (None, Some(s)) => write!(f, "Liveness error: {} (source: {})", message, s),
                (None, None) => write!(f, "Liveness error: {}", message),
            },
            RoutingError::IoError { message, path, source } => match (path, source) {
                (Some(p), Some(s)) => write!(f, "I/O error: {} (path: {}, source: {})", message, p, s),
                (Some(p), None) => write!(f, "I/O error: {} (path: {})", message, p),
                (None, Some(s)) => write!(f, "I/O error: {} (source: {})", message, s),
                (None, None) => write!(f, "I/O error: {}", message),
            },
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<serde_json::Error> for RoutingError {
    fn from(err: serde_json::Error) -> Self {
        RoutingError::ConfigError {
            message: format!("Failed to parse JSON data: {}", err),
            field: None,
        }
    }
}

impl From<hex::FromHexError> for RoutingError {
    fn from(err: hex::FromHexError) -> Self {
        RoutingError::validation_error_with_field(format!("invalid hex: {}", err), "node_id")
    }
}
