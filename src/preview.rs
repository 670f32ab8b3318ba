//! Preview handles: display resources acquired per image and released exactly once.

use crate::error::MergeError;
use crate::input::InputFile;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Platform side of previews (object URLs in the browser)
pub trait PreviewBackend {
    type File: InputFile;

    /// Register a display resource for a file and return its URL
    fn create_preview(&self, file: &Self::File) -> Result<String, MergeError>;

    /// Free a display resource previously returned by `create_preview`
    fn revoke_preview(&self, url: &str);
}

/// A preview URL owned by one image entry.
///
/// The URL is revoked on [`PreviewHandle::release`] or on drop, whichever
/// comes first; later calls do nothing.
pub struct PreviewHandle<B: PreviewBackend> {
    url: Option<String>,
    backend: Rc<B>,
}

impl<B: PreviewBackend> PreviewHandle<B> {
    pub fn acquire(backend: &Rc<B>, file: &B::File) -> Result<Self, MergeError> {
        let url = backend.create_preview(file)?;
        Ok(Self {
            url: Some(url),
            backend: Rc::clone(backend),
        })
    }

    /// The preview URL while the handle is live
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_live(&self) -> bool {
        self.url.is_some()
    }

    pub fn release(&mut self) {
        if let Some(url) = self.url.take() {
            self.backend.revoke_preview(&url);
        }
    }
}

impl<B: PreviewBackend> Drop for PreviewHandle<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: PreviewBackend> fmt::Debug for PreviewHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("url", &self.url).finish()
    }
}

/// In-process preview registry for headless use: URLs are plain strings and
/// every create/revoke is recorded.
pub struct MemoryPreviews<F> {
    next_id: Cell<u64>,
    live: RefCell<BTreeSet<String>>,
    revoked: RefCell<Vec<String>>,
    _file: PhantomData<F>,
}

impl<F> MemoryPreviews<F> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            live: RefCell::new(BTreeSet::new()),
            revoked: RefCell::new(Vec::new()),
            _file: PhantomData,
        }
    }

    /// Number of previews created and not yet revoked
    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.borrow().contains(url)
    }

    /// How many times `url` has been revoked
    pub fn revocations(&self, url: &str) -> usize {
        self.revoked.borrow().iter().filter(|u| u.as_str() == url).count()
    }
}

impl<F> Default for MemoryPreviews<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: InputFile> PreviewBackend for MemoryPreviews<F> {
    type File = F;

    fn create_preview(&self, file: &F) -> Result<String, MergeError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let url = format!("preview:{}/{}", id, file.name());
        self.live.borrow_mut().insert(url.clone());
        Ok(url)
    }

    fn revoke_preview(&self, url: &str) {
        self.live.borrow_mut().remove(url);
        self.revoked.borrow_mut().push(url.to_string());
    }
}
