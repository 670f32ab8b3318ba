//! Image XObject construction for JPEG and PNG inputs.

use crate::media::ImageKind;
use image::{DynamicImage, ImageFormat};
use lopdf::{Dictionary, Object, Stream};

/// An image ready to be inserted into a document
#[derive(Debug)]
pub struct EmbeddedImage {
    /// Main image XObject stream
    pub stream: Stream,
    /// Soft mask holding the alpha channel, PNG only
    pub smask: Option<Stream>,
    /// Natural width in pixels
    pub width: u32,
    /// Natural height in pixels
    pub height: u32,
}

/// Build the XObject stream(s) for an image of the given kind
pub fn embed_image(kind: ImageKind, bytes: &[u8]) -> Result<EmbeddedImage, String> {
    match kind {
        ImageKind::Jpeg => embed_jpeg(bytes),
        ImageKind::Png => embed_png(bytes),
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str, len: usize) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    dict.set("Length", Object::Integer(len as i64));
    dict
}

/// Fields of a JPEG frame header needed to describe the image to a PDF reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
    /// An Adobe APP14 segment was seen; Adobe writes CMYK samples inverted
    adobe: bool,
}

fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
}

/// Walk the marker segments up to the first SOFn
fn read_jpeg_header(bytes: &[u8]) -> Result<JpegHeader, String> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return Err("Missing JPEG start-of-image marker".to_string());
    }

    let mut pos = 2;
    let mut adobe = false;
    loop {
        if bytes.get(pos) != Some(&0xFF) {
            return Err(format!("Expected JPEG marker at offset {}", pos));
        }
        while bytes.get(pos) == Some(&0xFF) {
            pos += 1;
        }
        let marker = *bytes
            .get(pos)
            .ok_or("JPEG ended before the frame header")?;
        pos += 1;

        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return Err("JPEG has no frame header before image data".to_string()),
            _ => {}
        }

        let len = match bytes.get(pos..pos + 2) {
            Some(&[hi, lo]) => u16::from_be_bytes([hi, lo]) as usize,
            _ => return Err("Truncated JPEG segment length".to_string()),
        };
        if len < 2 {
            return Err(format!("Invalid JPEG segment length {}", len));
        }
        let segment = bytes
            .get(pos + 2..pos + len)
            .ok_or("Truncated JPEG segment")?;

        if is_start_of_frame(marker) {
            if segment.len() < 6 {
                return Err("Truncated JPEG frame header".to_string());
            }
            return Ok(JpegHeader {
                height: u16::from_be_bytes([segment[1], segment[2]]) as u32,
                width: u16::from_be_bytes([segment[3], segment[4]]) as u32,
                components: segment[5],
                adobe,
            });
        }
        if marker == 0xEE && segment.starts_with(b"Adobe") {
            adobe = true;
        }

        pos += len;
    }
}

/// JPEG data goes into the PDF untouched; only the header is parsed
fn embed_jpeg(bytes: &[u8]) -> Result<EmbeddedImage, String> {
    let header = read_jpeg_header(bytes)?;
    let (width, height) = (header.width, header.height);
    if width == 0 || height == 0 {
        return Err("JPEG has zero width or height".to_string());
    }

    let color_space = match header.components {
        1 => "DeviceGray",
        3 => "DeviceRGB",
        4 => "DeviceCMYK",
        n => return Err(format!("Unsupported JPEG component count: {}", n)),
    };

    let mut dict = image_dict(width, height, color_space, "DCTDecode", bytes.len());
    if header.components == 4 && header.adobe {
        let decode = [1, 0, 1, 0, 1, 0, 1, 0].map(Object::Integer).to_vec();
        dict.set("Decode", Object::Array(decode));
    }

    Ok(EmbeddedImage {
        stream: Stream::new(dict, bytes.to_vec()),
        smask: None,
        width,
        height,
    })
}

/// PNG is decoded and re-stored as Flate-compressed samples plus an optional SMask
fn embed_png(bytes: &[u8]) -> Result<EmbeddedImage, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| format!("Failed to decode PNG: {}", e))?;
    let (width, height) = (img.width(), img.height());
    let color = img.color();

    let (samples, color_space) = if color.has_color() {
        (img.to_rgb8().into_raw(), "DeviceRGB")
    } else {
        (img.to_luma8().into_raw(), "DeviceGray")
    };
    let stream = flate_image_stream(&samples, width, height, color_space)?;

    let smask = if color.has_alpha() {
        let alpha = alpha_channel(&img);
        Some(flate_image_stream(&alpha, width, height, "DeviceGray")?)
    } else {
        None
    };

    Ok(EmbeddedImage {
        stream,
        smask,
        width,
        height,
    })
}

fn alpha_channel(img: &DynamicImage) -> Vec<u8> {
    img.to_rgba8().pixels().map(|p| p.0[3]).collect()
}

fn flate_image_stream(
    samples: &[u8],
    width: u32,
    height: u32,
    color_space: &str,
) -> Result<Stream, String> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    std::io::Write::write_all(&mut encoder, samples)
        .map_err(|e| format!("Failed to compress image data: {}", e))?;
    let compressed = encoder
        .finish()
        .map_err(|e| format!("Failed to finish compression: {}", e))?;

    let dict = image_dict(width, height, color_space, "FlateDecode", compressed.len());
    Ok(Stream::new(dict, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{GrayImage, RgbImage, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn name(stream: &Stream, key: &[u8]) -> String {
        String::from_utf8_lossy(stream.dict.get(key).unwrap().as_name().unwrap()).to_string()
    }

    fn int(stream: &Stream, key: &[u8]) -> i64 {
        stream.dict.get(key).unwrap().as_i64().unwrap()
    }

    #[test]
    fn jpeg_is_embedded_verbatim() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, image::Rgb([200, 10, 10]))),
            ImageFormat::Jpeg,
        );
        let embedded = embed_image(ImageKind::Jpeg, &bytes).unwrap();

        assert_eq!((embedded.width, embedded.height), (40, 30));
        assert_eq!(embedded.stream.content, bytes);
        assert_eq!(name(&embedded.stream, b"Filter"), "DCTDecode");
        assert_eq!(name(&embedded.stream, b"ColorSpace"), "DeviceRGB");
        assert_eq!(int(&embedded.stream, b"Width"), 40);
        assert_eq!(int(&embedded.stream, b"Height"), 30);
        assert!(embedded.smask.is_none());
    }

    #[test]
    fn grayscale_jpeg_uses_device_gray() {
        let bytes = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, image::Luma([90]))),
            ImageFormat::Jpeg,
        );
        let embedded = embed_image(ImageKind::Jpeg, &bytes).unwrap();
        assert_eq!(name(&embedded.stream, b"ColorSpace"), "DeviceGray");
    }

    #[test]
    fn opaque_png_has_no_smask() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 4, image::Rgb([1, 2, 3]))),
            ImageFormat::Png,
        );
        let embedded = embed_image(ImageKind::Png, &bytes).unwrap();

        assert_eq!((embedded.width, embedded.height), (5, 4));
        assert_eq!(name(&embedded.stream, b"Filter"), "FlateDecode");
        assert!(embedded.smask.is_none());

        let mut samples = Vec::new();
        ZlibDecoder::new(&embedded.stream.content[..])
            .read_to_end(&mut samples)
            .unwrap();
        assert_eq!(samples.len(), 5 * 4 * 3);
        assert_eq!(&samples[..3], &[1, 2, 3]);
    }

    #[test]
    fn transparent_png_gets_gray_smask() {
        let bytes = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 128]))),
            ImageFormat::Png,
        );
        let embedded = embed_image(ImageKind::Png, &bytes).unwrap();
        let smask = embedded.smask.expect("alpha channel should produce an SMask");

        assert_eq!(name(&smask, b"ColorSpace"), "DeviceGray");
        let mut alpha = Vec::new();
        ZlibDecoder::new(&smask.content[..]).read_to_end(&mut alpha).unwrap();
        assert_eq!(alpha, vec![128; 9]);
    }

    fn cmyk_jpeg(width: u16, height: u16) -> Vec<u8> {
        let pixels = vec![30u8; width as usize * height as usize * 4];
        let mut bytes = Vec::new();
        jpeg_encoder::Encoder::new(&mut bytes, 90)
            .encode(&pixels, width, height, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        bytes
    }

    #[test]
    fn cmyk_jpeg_uses_device_cmyk_with_inverted_decode() {
        let bytes = cmyk_jpeg(16, 12);
        let embedded = embed_image(ImageKind::Jpeg, &bytes).unwrap();

        assert_eq!((embedded.width, embedded.height), (16, 12));
        assert_eq!(name(&embedded.stream, b"ColorSpace"), "DeviceCMYK");
        let decode: Vec<i64> = embedded
            .stream
            .dict
            .get(b"Decode")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect();
        assert_eq!(decode, vec![1, 0, 1, 0, 1, 0, 1, 0]);
    }

    /// SOI, optional APP14, then a baseline SOF0 with the given component count
    fn jpeg_headers(components: u8, adobe: bool) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        if adobe {
            bytes.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
            bytes.extend_from_slice(b"Adobe\0\0\0\0\0\0\0");
        }
        bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00]);
        let sof_len = 8 + 3 * components as u16;
        bytes.extend_from_slice(&[0xFF, 0xC0]);
        bytes.extend_from_slice(&sof_len.to_be_bytes());
        bytes.extend_from_slice(&[8, 0x01, 0x2C, 0x02, 0x58, components]);
        for id in 1..=components {
            bytes.extend_from_slice(&[id, 0x11, 0]);
        }
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn frame_header_is_found_past_app_segments() {
        assert_eq!(
            read_jpeg_header(&jpeg_headers(4, true)).unwrap(),
            JpegHeader {
                width: 600,
                height: 300,
                components: 4,
                adobe: true,
            }
        );
        assert_eq!(read_jpeg_header(&jpeg_headers(1, false)).unwrap().components, 1);
    }

    #[test]
    fn plain_cmyk_jpeg_has_no_decode_array() {
        let embedded = embed_image(ImageKind::Jpeg, &jpeg_headers(4, false)).unwrap();
        assert_eq!(name(&embedded.stream, b"ColorSpace"), "DeviceCMYK");
        assert!(embedded.stream.dict.get(b"Decode").is_err());
    }

    #[test]
    fn unusual_component_counts_are_rejected() {
        assert!(embed_image(ImageKind::Jpeg, &jpeg_headers(2, false)).is_err());
    }

    #[test]
    fn truncated_jpeg_header_is_rejected() {
        let bytes = jpeg_headers(3, false);
        assert!(read_jpeg_header(&bytes[..bytes.len() - 8]).is_err());
        assert!(read_jpeg_header(&[0xFF, 0xD8]).is_err());
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let garbage = b"definitely not an image".to_vec();
        assert!(embed_image(ImageKind::Jpeg, &garbage).is_err());
        assert!(embed_image(ImageKind::Png, &garbage).is_err());
    }

    #[test]
    fn png_bytes_declared_as_jpeg_fail() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::new(2, 2)),
            ImageFormat::Png,
        );
        assert!(embed_image(ImageKind::Jpeg, &png).is_err());
    }
}
