//! PDF Image Appender Library
//!
//! Core logic for appending PNG and JPEG images to a PDF, one centered page
//! per image. Shared between the browser (WASM) front end and the CLI.
//!
//! A [`MergeSession`] holds the dropped PDF, the ordered image set with their
//! preview handles, the current error notice and the idle/busy state. The
//! merge itself reads every file, appends pages through [`PdfAppender`] and
//! hands the serialized bytes to a [`DownloadSink`].

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod delivery;
pub mod document;
pub mod embed;
pub mod error;
pub mod input;
pub mod media;
pub mod preview;
pub mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use delivery::DownloadSink;
pub use document::{PdfAppender, Placement};
pub use error::{ErrorNotice, MergeError};
pub use input::{InputFile, MemoryFile};
pub use media::ImageKind;
pub use preview::{PreviewBackend, PreviewHandle};
pub use session::{MergeJob, MergeSession, MergeState};

use std::str::FromStr;

/// Uniform scale applied to an image's natural size (pixels taken as points)
pub const IMAGE_SCALE: f32 = 0.8;

/// File name offered for the merged document
pub const DEFAULT_OUTPUT_NAME: &str = "merged-document.pdf";

/// Page size in PDF points (72 points = 1 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

impl FromStr for PageSize {
    type Err = String;

    /// Accepts `a4`, `letter`, or `<width>x<height>` in points
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::LETTER),
            custom => {
                let (w, h) = custom
                    .split_once('x')
                    .ok_or_else(|| format!("Unknown page size: {}", s))?;
                let width: f32 = w.trim().parse().map_err(|_| format!("Invalid page width: {}", w))?;
                let height: f32 = h.trim().parse().map_err(|_| format!("Invalid page height: {}", h))?;
                if width <= 0.0 || height <= 0.0 {
                    return Err("Page dimensions must be positive".to_string());
                }
                Ok(PageSize { width, height })
            }
        }
    }
}

/// Options for appending images
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Size of every page added for an image
    pub page_size: PageSize,
    /// Compress PDF streams (reduces file size)
    pub compress_streams: bool,
    /// Name the merged document is delivered under
    pub file_name: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            compress_streams: true,
            file_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

/// Result of a successful merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub original_pages: usize,
    pub pages_added: usize,
    pub skipped_images: usize,
    pub output_bytes: usize,
}
