#![allow(dead_code)]

use lopdf::Document;
use pdf_image_append::{DownloadSink, MergeError};
use std::cell::RefCell;

#[path = "../../src/fixtures.rs"]
mod fixtures;

pub use fixtures::*;

/// Keeps every delivered document in memory
#[derive(Default)]
pub struct RecordingSink {
    pub saved: RefCell<Vec<Delivery>>,
}

pub struct Delivery {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DownloadSink for RecordingSink {
    fn save(&self, bytes: Vec<u8>, file_name: &str, media_type: &str) -> Result<(), MergeError> {
        self.saved.borrow_mut().push(Delivery {
            file_name: file_name.to_string(),
            media_type: media_type.to_string(),
            bytes,
        });
        Ok(())
    }
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.saved.borrow().len()
    }

    pub fn last_document(&self) -> Document {
        let saved = self.saved.borrow();
        let delivery = saved.last().expect("nothing was delivered");
        Document::load_mem(&delivery.bytes).unwrap()
    }
}
