//! Declared media types and the closed set of embeddable image formats.

/// Media type a PDF drop must declare exactly
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Prefix shared by every media type the image drop target accepts
pub const IMAGE_MEDIA_PREFIX: &str = "image/";

/// Whether a declared media type is exactly the PDF media type
pub fn is_pdf(media_type: &str) -> bool {
    media_type == PDF_MEDIA_TYPE
}

/// Whether a declared media type belongs to the image family
pub fn is_image_family(media_type: &str) -> bool {
    media_type.starts_with(IMAGE_MEDIA_PREFIX)
}

/// Image formats that can be embedded as a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Pick the embedding format for a declared media type.
    ///
    /// Returns `None` for image-family types that cannot be embedded
    /// (GIF, WebP, SVG, ...); those entries are skipped by the merge.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}
