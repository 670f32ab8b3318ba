//! Files handed to a session by a drop (or by the CLI).

use crate::error::MergeError;
use std::future::Future;
use std::sync::Arc;

/// A candidate file with a declared media type and lazily read contents.
///
/// Cloning must be cheap: a merge snapshots the current inputs before it
/// starts reading them.
pub trait InputFile: Clone {
    /// Display name, used in previews and logs
    fn name(&self) -> String;

    /// Media type declared by the platform, e.g. `image/png`
    fn media_type(&self) -> String;

    /// Read the whole file
    fn read_bytes(&self) -> impl Future<Output = Result<Vec<u8>, MergeError>>;
}

/// A file whose bytes are already in memory
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    media_type: String,
    data: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

impl InputFile for MemoryFile {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn media_type(&self) -> String {
        self.media_type.clone()
    }

    fn read_bytes(&self) -> impl Future<Output = Result<Vec<u8>, MergeError>> {
        std::future::ready(Ok(self.data.to_vec()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use disk::DiskFile;

#[cfg(not(target_arch = "wasm32"))]
mod disk {
    use super::*;
    use std::path::{Path, PathBuf};

    /// A file on disk whose media type is guessed from its extension
    #[derive(Debug, Clone)]
    pub struct DiskFile {
        path: PathBuf,
        media_type: String,
    }

    impl DiskFile {
        pub fn from_path(path: impl AsRef<Path>) -> Self {
            let path = path.as_ref().to_path_buf();
            let media_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            Self { path, media_type }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl InputFile for DiskFile {
        fn name(&self) -> String {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.display().to_string())
        }

        fn media_type(&self) -> String {
            self.media_type.clone()
        }

        fn read_bytes(&self) -> impl Future<Output = Result<Vec<u8>, MergeError>> {
            let result = std::fs::read(&self.path).map_err(|e| MergeError::Read {
                name: self.path.display().to_string(),
                reason: e.to_string(),
            });
            std::future::ready(result)
        }
    }
}
