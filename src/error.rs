//! Error types for image ingestion and editing.

/// Errors that can occur while ingesting an image or requesting an edit.
#[derive(Debug, thiserror::Error)]
pub enum NanoEditError {
    /// Selected file's declared media type is outside the supported set.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service returned a response with zero candidates.
    #[error("no candidates returned from Gemini")]
    NoCandidates,

    /// The first candidate carried no content parts.
    #[error("no content parts returned")]
    NoParts,

    /// No part of the first candidate carried inline image data.
    #[error("no image data found in the response")]
    NoImageData,

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code of the failed exchange.
        status: u16,
        /// Service-supplied message, or a sanitized body excerpt.
        message: String,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error (e.g., reading the input or saving the result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fallback shown when the service supplies no usable message.
pub const GENERIC_FAILURE: &str = "Failed to generate image.";

impl NanoEditError {
    /// Returns true if the service answered but carried nothing usable,
    /// as opposed to the transport itself failing.
    pub fn is_empty_response(&self) -> bool {
        matches!(self, Self::NoCandidates | Self::NoParts | Self::NoImageData)
    }

    /// Returns true if the error is a configuration problem that should be
    /// fixed before retrying (missing or rejected credential).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Normalizes any error into a single user-visible message string.
    ///
    /// Service-supplied messages pass through; transport failures fall back
    /// to a generic message since they carry no service text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => {
                if message.is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    message.clone()
                }
            }
            Self::Network(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for image editing operations.
pub type Result<T> = std::result::Result<T, NanoEditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty_response() {
        assert!(NanoEditError::NoCandidates.is_empty_response());
        assert!(NanoEditError::NoParts.is_empty_response());
        assert!(NanoEditError::NoImageData.is_empty_response());

        assert!(!NanoEditError::Auth("bad key".into()).is_empty_response());
        assert!(!NanoEditError::Decode("bad base64".into()).is_empty_response());
        assert!(!NanoEditError::UnsupportedMediaType("image/gif".into()).is_empty_response());
    }

    #[test]
    fn test_is_configuration() {
        assert!(NanoEditError::Auth("no key".into()).is_configuration());
        assert!(!NanoEditError::NoCandidates.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = NanoEditError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = NanoEditError::UnsupportedMediaType("image/gif".into());
        assert_eq!(err.to_string(), "unsupported media type: image/gif");

        assert_eq!(
            NanoEditError::NoCandidates.to_string(),
            "no candidates returned from Gemini"
        );
    }

    #[test]
    fn test_user_message_passes_service_text_through() {
        let err = NanoEditError::Api {
            status: 500,
            message: "Internal error while editing".into(),
        };
        assert_eq!(err.user_message(), "Internal error while editing");
    }

    #[test]
    fn test_user_message_generic_fallback() {
        let err = NanoEditError::Api {
            status: 502,
            message: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_user_message_empty_response_is_not_transport() {
        let msg = NanoEditError::NoCandidates.user_message();
        assert!(msg.contains("candidates"));
        assert_ne!(msg, GENERIC_FAILURE);
    }
}
