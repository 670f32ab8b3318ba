//! Test fixtures: small PDFs and images built in memory.
//!
//! Shared by the unit tests and, through `tests/common`, the integration
//! tests.

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Cursor;

/// Page content used by `blank_pdf` for page `n` (1-based)
pub fn page_text(n: u32) -> String {
    format!("BT /F1 12 Tf 50 700 Td (Original-{}) Tj ET", n)
}

/// A PDF with `num_pages` Letter-sized pages, each with an identifiable text stream
pub fn blank_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for n in 1..=num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), page_text(n).into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => num_pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 200, 10]))),
        ImageFormat::Png,
    )
}

pub fn transparent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([10, 10, 200, 0]))),
        ImageFormat::Png,
    )
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([250, 180, 20]))),
        ImageFormat::Jpeg,
    )
}

/// GIF header only; nothing downstream decodes it
pub fn gif_bytes() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec()
}
