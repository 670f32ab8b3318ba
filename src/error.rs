use std::fmt;
use thiserror::Error;

/// Error type for image-append operations
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("dropped file is not a PDF (media type {0:?})")]
    InvalidPdf(String),

    #[error("a PDF and at least one image are required")]
    MissingInputs,

    #[error("a merge is already in progress")]
    Busy,

    #[error("image index {index} out of range (set holds {len})")]
    ImageIndexOutOfRange { index: usize, len: usize },

    #[error("failed to read {name}: {reason}")]
    Read { name: String, reason: String },

    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("failed to embed image {name}: {reason}")]
    Embed { name: String, reason: String },

    #[error("failed to save PDF: {0}")]
    Serialize(String),

    #[error("failed to create preview for {name}: {reason}")]
    Preview { name: String, reason: String },

    #[error("failed to deliver merged PDF: {0}")]
    Download(String),
}

impl MergeError {
    /// The message a user sees for this error. Pipeline details stay in the logs.
    pub fn notice(&self) -> ErrorNotice {
        match self {
            MergeError::InvalidPdf(_) => ErrorNotice::InvalidPdf,
            MergeError::MissingInputs => ErrorNotice::MissingInputs,
            MergeError::Busy
            | MergeError::ImageIndexOutOfRange { .. }
            | MergeError::Read { .. }
            | MergeError::Parse(_)
            | MergeError::Embed { .. }
            | MergeError::Serialize(_)
            | MergeError::Preview { .. }
            | MergeError::Download(_) => ErrorNotice::MergeFailed,
        }
    }

    /// Whether this error came out of the merge pipeline itself
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            MergeError::Read { .. }
                | MergeError::Parse(_)
                | MergeError::Embed { .. }
                | MergeError::Serialize(_)
                | MergeError::Download(_)
        )
    }
}

/// User-facing error state held by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorNotice {
    /// A PDF drop whose first file is not `application/pdf`
    InvalidPdf,
    /// Merge triggered without a PDF or without images
    MissingInputs,
    /// Anything that went wrong while reading, parsing, embedding or saving
    MergeFailed,
}

impl ErrorNotice {
    pub fn message(self) -> &'static str {
        match self {
            ErrorNotice::InvalidPdf => "Please select a valid PDF file.",
            ErrorNotice::MissingInputs => "Please select a PDF and at least one image.",
            ErrorNotice::MergeFailed => "Failed to merge images into the PDF. Please try again.",
        }
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
