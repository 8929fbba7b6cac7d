//! Error types for the reflow engine.
//!
//! Most user-facing failures in this crate degrade silently (an unresolvable
//! selection simply isn't applied). The variants here cover the cases that
//! callers actually need to branch on.

/// Result type alias for reflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building overlays or reconstructing documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An overlay render task was canceled before its measurement pass ran
    #[error("canceled")]
    Canceled,

    /// The document has no structure tree, so nothing can be reconstructed
    #[error("No structure tree available")]
    MissingStructureTree,

    /// The document source failed to deliver page text or the structure tree
    #[error("Document source error: {0}")]
    Source(String),

    /// A figure image job failed for a page
    #[error("Figure generation failed for page {page}: {reason}")]
    Figure {
        /// Page the job was generating images for
        page: u32,
        /// Reason reported by the producer
        reason: String,
    },

    /// Font data could not be parsed for text measurement
    #[error("Font error: {0}")]
    Font(String),

    /// A "page/mcid" identifier could not be parsed
    #[error("Invalid marked content id: '{0}'")]
    InvalidMcidKey(String),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_message() {
        // The paired viewer matches on this exact status string.
        assert_eq!(Error::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_figure_error() {
        let err = Error::Figure {
            page: 3,
            reason: "renderer crashed".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("page 3"));
        assert!(msg.contains("renderer crashed"));
    }

    #[test]
    fn test_invalid_mcid_key() {
        let err = Error::InvalidMcidKey("3-x".to_string());
        assert!(format!("{}", err).contains("'3-x'"));
    }

    #[test]
    fn test_serialization_from() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
