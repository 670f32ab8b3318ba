//! WebAssembly bindings for the PDF image appender
//!
//! JavaScript owns the drop zones and rendering; everything else (the
//! selected PDF, the image list and its object URLs, the error message and
//! the busy flag) lives in a [`MergeApp`].
//!
//! ```javascript
//! import init, { MergeApp } from './pkg/pdf_image_append.js';
//!
//! await init();
//! const app = new MergeApp();
//! pdfZone.ondrop = (e) => { app.dropPdf(e.dataTransfer.files); render(); };
//! imageZone.ondrop = (e) => { app.dropImages(e.dataTransfer.files); render(); };
//! mergeButton.onclick = async () => { render(); await app.merge(); render(); };
//! ```

use crate::delivery::DownloadSink;
use crate::error::MergeError;
use crate::input::InputFile;
use crate::preview::PreviewBackend;
use crate::session::MergeSession;
use crate::MergeOptions;
use js_sys::{Array, Uint8Array};
use serde::Serialize;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, File, HtmlAnchorElement, Url};

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn download_error(value: JsValue) -> MergeError {
    MergeError::Download(describe(&value))
}

/// Revoke an object URL, reporting a failure instead of dropping it
fn revoke_url(url: &str) -> bool {
    match Url::revoke_object_url(url) {
        Ok(()) => true,
        Err(e) => {
            let reason = describe(&e);
            tracing::warn!(%url, %reason, "failed to revoke object URL");
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "Failed to revoke {}: {}",
                url, reason
            )));
            false
        }
    }
}

/// A dropped `File`
#[derive(Debug, Clone)]
pub struct BrowserFile(File);

impl InputFile for BrowserFile {
    fn name(&self) -> String {
        self.0.name()
    }

    fn media_type(&self) -> String {
        self.0.type_()
    }

    fn read_bytes(&self) -> impl Future<Output = Result<Vec<u8>, MergeError>> {
        let name = self.0.name();
        let promise = self.0.array_buffer();
        async move {
            let buffer = JsFuture::from(promise).await.map_err(|e| MergeError::Read {
                name,
                reason: describe(&e),
            })?;
            Ok(Uint8Array::new(&buffer).to_vec())
        }
    }
}

/// Accepts a `FileList` or an array of `File`s; anything else is ignored
fn files_from(value: &JsValue) -> Vec<BrowserFile> {
    Array::from(value)
        .iter()
        .filter_map(|item| item.dyn_into::<File>().ok())
        .map(BrowserFile)
        .collect()
}

/// Previews backed by `URL.createObjectURL`
pub struct ObjectUrlPreviews;

impl PreviewBackend for ObjectUrlPreviews {
    type File = BrowserFile;

    fn create_preview(&self, file: &BrowserFile) -> Result<String, MergeError> {
        Url::create_object_url_with_blob(&file.0).map_err(|e| MergeError::Preview {
            name: file.name(),
            reason: describe(&e),
        })
    }

    fn revoke_preview(&self, url: &str) {
        revoke_url(url);
    }
}

/// Saves through a temporary `<a download>` click
pub struct AnchorDownload;

impl DownloadSink for AnchorDownload {
    fn save(&self, bytes: Vec<u8>, file_name: &str, media_type: &str) -> Result<(), MergeError> {
        let parts = Array::of1(&Uint8Array::from(bytes.as_slice()));
        let options = BlobPropertyBag::new();
        options.set_type(media_type);
        let blob =
            Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(download_error)?;

        let url = Url::create_object_url_with_blob(&blob).map_err(download_error)?;
        let clicked = click_download_link(&url, file_name);
        revoke_url(&url);
        clicked
    }
}

fn click_download_link(url: &str, file_name: &str) -> Result<(), MergeError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| MergeError::Download("no document available".to_string()))?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(download_error)?
        .dyn_into()
        .map_err(|_| MergeError::Download("created element is not an anchor".to_string()))?;
    anchor.set_href(url);
    anchor.set_download(file_name);
    anchor.click();
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageView {
    name: String,
    media_type: String,
    preview_url: Option<String>,
}

type BrowserSession = MergeSession<ObjectUrlPreviews>;

/// Stateful merge UI model held in Rust memory
#[wasm_bindgen]
pub struct MergeApp {
    session: Rc<RefCell<BrowserSession>>,
}

#[wasm_bindgen]
impl MergeApp {
    /// Create an app; `page_size` is `"a4"` (default), `"letter"` or `"WxH"` in points
    #[wasm_bindgen(constructor)]
    pub fn new(page_size: Option<String>) -> Result<MergeApp, JsError> {
        let mut options = MergeOptions::default();
        if let Some(size) = page_size {
            options.page_size = size.parse().map_err(|e: String| JsError::new(&e))?;
        }
        let session = MergeSession::with_options(Rc::new(ObjectUrlPreviews), options);
        Ok(MergeApp {
            session: Rc::new(RefCell::new(session)),
        })
    }

    /// Handle a drop on the PDF zone; returns whether a PDF was accepted
    #[wasm_bindgen(js_name = dropPdf)]
    pub fn drop_pdf(&self, files: JsValue) -> bool {
        self.session.borrow_mut().drop_pdf(files_from(&files)).is_ok()
    }

    /// Handle a drop on the image zone; returns how many images were added
    #[wasm_bindgen(js_name = dropImages)]
    pub fn drop_images(&self, files: JsValue) -> usize {
        self.session.borrow_mut().drop_images(files_from(&files))
    }

    #[wasm_bindgen(js_name = removeImage)]
    pub fn remove_image(&self, index: usize) -> Result<(), JsError> {
        self.session
            .borrow_mut()
            .remove_image(index)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Current image list as a JSON array of `{ name, mediaType, previewUrl }`
    pub fn images(&self) -> String {
        let session = self.session.borrow();
        let views: Vec<ImageView> = session
            .images()
            .iter()
            .map(|entry| ImageView {
                name: entry.name(),
                media_type: entry.media_type(),
                preview_url: entry.preview_url().map(str::to_string),
            })
            .collect();
        serde_json::to_string(&views).unwrap_or_else(|_| "[]".to_string())
    }

    #[wasm_bindgen(js_name = pdfName)]
    pub fn pdf_name(&self) -> Option<String> {
        self.session.borrow().pdf().map(InputFile::name)
    }

    #[wasm_bindgen(js_name = errorMessage)]
    pub fn error_message(&self) -> Option<String> {
        self.session.borrow().error_message().map(str::to_string)
    }

    #[wasm_bindgen(js_name = isBusy)]
    pub fn is_busy(&self) -> bool {
        self.session.borrow().is_busy()
    }

    /// Merge and trigger the download.
    ///
    /// The promise always resolves: `true` when the file was delivered,
    /// `false` otherwise (see `errorMessage()`).
    pub fn merge(&self) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        wasm_bindgen_futures::future_to_promise(async move {
            let job = session.borrow_mut().begin_merge();
            let job = match job {
                Ok(job) => job,
                Err(_) => return Ok(JsValue::FALSE),
            };

            let outcome = job.run(&AnchorDownload).await;
            if let Err(e) = &outcome {
                web_sys::console::error_1(&JsValue::from_str(&format!("Merge failed: {}", e)));
            }
            session.borrow_mut().finish_merge(&outcome);

            Ok(JsValue::from_bool(outcome.is_ok()))
        })
    }
}
