//! In-memory PDF document that images are appended to as new pages.

use crate::embed::{embed_image, EmbeddedImage};
use crate::error::MergeError;
use crate::media::ImageKind;
use crate::{PageSize, IMAGE_SCALE};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Resource name every appended page uses for its single image
const IMAGE_RESOURCE_NAME: &[u8] = b"Im0";

/// Where an image lands on its page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Scale the natural size uniformly and center it on the page.
    ///
    /// Images larger than the page end up with negative offsets and are
    /// clipped by the page box.
    pub fn centered(pixel_width: u32, pixel_height: u32, page: PageSize) -> Self {
        let width = pixel_width as f32 * IMAGE_SCALE;
        let height = pixel_height as f32 * IMAGE_SCALE;
        Placement {
            x: (page.width - width) / 2.0,
            y: (page.height - height) / 2.0,
            width,
            height,
        }
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// A loaded PDF that accepts image pages and serializes back to bytes
pub struct PdfAppender {
    doc: Document,
    pages_id: ObjectId,
    page_size: PageSize,
    original_pages: usize,
    pages_added: usize,
}

impl PdfAppender {
    /// Parse PDF bytes into a document model
    pub fn load(bytes: &[u8], page_size: PageSize) -> Result<Self, MergeError> {
        let doc = Document::load_mem(bytes).map_err(|e| MergeError::Parse(e.to_string()))?;

        let pages_id = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| MergeError::Parse(format!("missing page tree root: {}", e)))?;

        let original_pages = doc.get_pages().len();
        tracing::debug!(original_pages, "loaded PDF");

        Ok(PdfAppender {
            doc,
            pages_id,
            page_size,
            original_pages,
            pages_added: 0,
        })
    }

    pub fn original_pages(&self) -> usize {
        self.original_pages
    }

    pub fn pages_added(&self) -> usize {
        self.pages_added
    }

    /// Embed an image and append one page showing it centered at the fixed scale
    pub fn append_image_page(
        &mut self,
        name: &str,
        kind: ImageKind,
        bytes: &[u8],
    ) -> Result<Placement, MergeError> {
        let EmbeddedImage {
            mut stream,
            smask,
            width,
            height,
        } = embed_image(kind, bytes).map_err(|reason| MergeError::Embed {
            name: name.to_string(),
            reason,
        })?;

        if let Some(smask) = smask {
            let smask_id = self.doc.add_object(smask);
            stream.dict.set("SMask", Object::Reference(smask_id));
        }
        let image_id = self.doc.add_object(stream);

        let placement = Placement::centered(width, height, self.page_size);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        real(placement.width),
                        Object::Integer(0),
                        Object::Integer(0),
                        real(placement.height),
                        real(placement.x),
                        real(placement.y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE_NAME.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| MergeError::Serialize(format!("content stream for {}: {}", name, e)))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let mut xobjects = Dictionary::new();
        xobjects.set(IMAGE_RESOURCE_NAME.to_vec(), Object::Reference(image_id));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(self.page_size.width),
                real(self.page_size.height),
            ],
            "Resources" => dictionary! { "XObject" => xobjects },
            "Contents" => content_id,
        });

        self.attach_page(page_id)?;
        self.pages_added += 1;

        tracing::debug!(
            image = name,
            width,
            height,
            x = placement.x,
            y = placement.y,
            "appended image page"
        );

        Ok(placement)
    }

    /// Add a page reference to the root page tree node.
    ///
    /// `/Kids` and `/Count` may be stored inline or as indirect objects; the
    /// update is written wherever the value lives.
    fn attach_page(&mut self, page_id: ObjectId) -> Result<(), MergeError> {
        let tree_error = |what: &str, e: lopdf::Error| {
            MergeError::Parse(format!("page tree root {}: {}", what, e))
        };

        let pages = self
            .doc
            .get_dictionary(self.pages_id)
            .map_err(|e| tree_error("is not a dictionary", e))?;

        let kids_id = match pages.get(b"Kids") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };

        let (count_id, count) = match pages.get(b"Count") {
            Ok(count) => {
                let (id, value) = self
                    .doc
                    .dereference(count)
                    .map_err(|e| tree_error("has a dangling Count", e))?;
                let count = value
                    .as_i64()
                    .map_err(|e| tree_error("has a non-integer Count", e))?;
                (id, count)
            }
            Err(_) => (None, (self.original_pages + self.pages_added) as i64),
        };

        let kids = match kids_id {
            Some(id) => self.doc.get_object_mut(id).and_then(Object::as_array_mut),
            None => self
                .doc
                .get_object_mut(self.pages_id)
                .and_then(Object::as_dict_mut)
                .and_then(|pages| pages.get_mut(b"Kids"))
                .and_then(Object::as_array_mut),
        }
        .map_err(|e| tree_error("has no Kids array", e))?;
        kids.push(Object::Reference(page_id));

        let count = Object::Integer(count + 1);
        match count_id {
            Some(id) => {
                self.doc.objects.insert(id, count);
            }
            None => {
                self.doc
                    .get_object_mut(self.pages_id)
                    .and_then(Object::as_dict_mut)
                    .map_err(|e| tree_error("is not a dictionary", e))?
                    .set("Count", count);
            }
        }
        Ok(())
    }

    /// Serialize the document, optionally compressing plain streams first
    pub fn finish(mut self, compress_streams: bool) -> Result<Vec<u8>, MergeError> {
        if compress_streams {
            self.doc.compress();
        }

        let mut output_bytes = Vec::new();
        self.doc
            .save_to(&mut output_bytes)
            .map_err(|e| MergeError::Serialize(e.to_string()))?;

        Ok(output_bytes)
    }
}
