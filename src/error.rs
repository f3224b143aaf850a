//! Error types for tabdeck.

use std::io;

/// Failures raised by a storage backend. The [`crate::store::Store`] adapter
/// logs and swallows these; they never reach UI handlers.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Index-addressed operations on the entity list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("index {index} out of range for list of length {len}")]
    OutOfBounds { index: usize, len: usize },
}

/// Reasons a drag commit was aborted without touching persisted state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    #[error("no drag in progress")]
    NoSession,

    #[error("dragged index {index} is stale for list of length {len}")]
    StaleIndex { index: usize, len: usize },

    #[error("board shows {visual} cards but {persisted} links are stored")]
    CountMismatch { visual: usize, persisted: usize },

    #[error("could not determine new index after drop")]
    DraggedCardMissing,
}

/// Form-level validation of a link or bookmark.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Both URL and Name are required.")]
    MissingField,

    #[error("Please enter a valid URL.")]
    InvalidUrl,

    #[error("Invalid background. Use an http(s) or data: URL, or a local wallpaper.")]
    InvalidBackground,

    #[error("Wallpaper '{0}' was not found")]
    UnknownWallpaper(String),
}

/// Import and export of the quick links document.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("No data to export.")]
    Empty,

    #[error("Error reading file: {0}")]
    Io(#[from] io::Error),

    #[error("File is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid import file format or content.")]
    InvalidFormat,
}

/// Failures reported by a bookmark provider.
#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    #[error("bookmarks are not available")]
    Unavailable,

    #[error("bookmark {0} not found")]
    NotFound(String),

    #[error("bookmarks file is malformed: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for backend results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_display() {
        let e = ListError::OutOfBounds { index: 4, len: 2 };
        assert_eq!(format!("{e}"), "index 4 out of range for list of length 2");
    }

    #[test]
    fn quota_display() {
        let e = StoreError::QuotaExceeded {
            needed: 12,
            quota: 10,
        };
        assert_eq!(
            format!("{e}"),
            "storage quota exceeded: 12 bytes needed, 10 allowed"
        );
    }

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingField.to_string(),
            "Both URL and Name are required."
        );
        assert_eq!(TransferError::Empty.to_string(), "No data to export.");
    }

    #[test]
    fn io_converts_into_store_error() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk gone");
        let e: StoreError = io_err.into();
        assert!(matches!(e, StoreError::Io(_)));
    }
}
