//! Handing the merged document to the user.

use crate::error::MergeError;

/// Receives the merged document once the whole pipeline has succeeded
pub trait DownloadSink {
    /// Deliver `bytes` under `file_name`. Any transient resource created to
    /// trigger the delivery must be released before returning, on success
    /// or failure.
    fn save(&self, bytes: Vec<u8>, file_name: &str, media_type: &str) -> Result<(), MergeError>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use directory::DirectorySink;

#[cfg(not(target_arch = "wasm32"))]
mod directory {
    use super::*;
    use std::path::{Path, PathBuf};

    /// Writes the merged document into a directory, the native stand-in for
    /// a browser download
    #[derive(Debug, Clone)]
    pub struct DirectorySink {
        dir: PathBuf,
    }

    impl DirectorySink {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        /// Path a document named `file_name` is written to
        pub fn target(&self, file_name: &str) -> PathBuf {
            self.dir.join(file_name)
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }
    }

    impl DownloadSink for DirectorySink {
        fn save(&self, bytes: Vec<u8>, file_name: &str, _media_type: &str) -> Result<(), MergeError> {
            let target = self.target(file_name);
            std::fs::write(&target, &bytes)
                .map_err(|e| MergeError::Download(format!("{:?}: {}", target, e)))?;
            tracing::info!(path = %target.display(), bytes = bytes.len(), "saved merged PDF");
            Ok(())
        }
    }
}
