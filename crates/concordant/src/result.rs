//! Result and error types for Concordant.

use crate::document::ElementError;
use crate::listener::ListenerError;
use thiserror::Error;

/// Result type for Concordant operations
pub type ConcordantResult<T> = Result<T, ConcordantError>;

/// Errors that abort processing of a specification.
///
/// Evaluation problems inside a single command are never reported through
/// this type; they are recorded as exception outcomes instead.
#[derive(Debug, Error)]
pub enum ConcordantError {
    /// Command markup in a registered namespace names no known command
    #[error("Unknown command '{name}' in namespace {namespace}")]
    UnknownCommand {
        /// Namespace URI the markup was bound to
        namespace: String,
        /// Local name as written in the document
        name: String,
    },

    /// The same (namespace, name) pair was registered twice
    #[error("Command '{name}' is already registered in namespace {namespace}")]
    DuplicateCommand {
        /// Namespace URI
        namespace: String,
        /// Lower-cased command name
        name: String,
    },

    /// A registration arrived after the extension set was built
    #[error("Cannot register {what}: extension set is already built")]
    LateRegistration {
        /// What the caller attempted to register
        what: String,
    },

    /// An extension declaration could not be honoured
    #[error("Invalid extension '{name}': {message}")]
    InvalidExtension {
        /// Extension name
        name: String,
        /// Error message
        message: String,
    },

    /// Engine configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A listener failed; listeners are infrastructure so this is fatal
    #[error("Listener '{listener}' failed: {message}")]
    Listener {
        /// Listener description
        listener: String,
        /// Error message
        message: String,
    },

    /// Structural error in the element tree
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ConcordantError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error was raised while assembling the engine or the
    /// call graph, before any command ran.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand { .. }
                | Self::DuplicateCommand { .. }
                | Self::LateRegistration { .. }
                | Self::InvalidExtension { .. }
                | Self::Config { .. }
        )
    }
}

impl From<ListenerError> for ConcordantError {
    fn from(err: ListenerError) -> Self {
        Self::Listener {
            listener: err.listener,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message() {
        let err = ConcordantError::UnknownCommand {
            namespace: "urn:concordant".to_string(),
            name: "asertequals".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown command 'asertequals' in namespace urn:concordant"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_listener_error_conversion() {
        let err: ConcordantError = ListenerError::new("audit", "disk full").into();
        assert!(matches!(err, ConcordantError::Listener { .. }));
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConcordantError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
