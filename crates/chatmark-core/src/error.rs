//! Error types for chatmark

use thiserror::Error;

/// Main error type for chatmark
#[derive(Debug, Error)]
pub enum ChatmarkError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Conversation data could not be understood
    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    /// Nothing to export yet
    #[error("Conversation '{0}' has no messages to export")]
    EmptyConversation(String),

    /// Requested export format is not registered
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// File name template error
    #[error("Template error: {0}")]
    Template(String),

    /// Rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Archive could not be built
    #[error("Archive error: {0}")]
    Archive(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ChatmarkError>,
    },
}

impl ChatmarkError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ChatmarkError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error is a refusal the user can act on rather than a fault
    pub fn is_precondition(&self) -> bool {
        match self {
            ChatmarkError::EmptyConversation(_) => true,
            ChatmarkError::WithContext { source, .. } => source.is_precondition(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for ChatmarkError {
    fn from(err: toml::de::Error) -> Self {
        ChatmarkError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for ChatmarkError {
    fn from(err: toml::ser::Error) -> Self {
        ChatmarkError::Toml(err.to_string())
    }
}

/// Result type alias for chatmark
pub type Result<T> = std::result::Result<T, ChatmarkError>;

/// Failure while fetching one image
///
/// Never surfaces past a strategy: every variant degrades to the failure marker.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status
    #[error("unexpected status {status} for {locator}")]
    Status { status: u16, locator: String },

    /// Payload exceeds the configured size limit
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Locator cannot be mapped to anything fetchable
    #[error("cannot resolve image locator: {0}")]
    Unresolvable(String),

    /// Payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Local asset read failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatmarkError::EmptyConversation("abc-123".to_string());
        assert_eq!(
            err.to_string(),
            "Conversation 'abc-123' has no messages to export"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = ChatmarkError::UnknownFormat("pdf".to_string());
        let err = err.with_context("Failed to export conversation");
        assert!(err.to_string().contains("Failed to export conversation"));
        assert!(err.to_string().contains("pdf"));
    }

    #[test]
    fn test_precondition_survives_context() {
        let err = ChatmarkError::EmptyConversation("x".to_string()).with_context("batch");
        assert!(err.is_precondition());
        assert!(!ChatmarkError::Render("x".to_string()).is_precondition());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChatmarkError = io_err.into();
        assert!(matches!(err, ChatmarkError::Io(_)));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 404,
            locator: "https://example.com/a.png".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 404 for https://example.com/a.png"
        );
    }
}
