//! Merge orchestration: inputs, previews, error notice and the idle/busy gate.
//!
//! A session accepts drops and removals at any time. A merge snapshots the
//! current PDF and image list into a [`MergeJob`] and flips the session to
//! [`MergeState::Busy`]; the job runs without borrowing the session, and
//! [`MergeSession::finish_merge`] flips it back to idle.

use crate::delivery::DownloadSink;
use crate::document::PdfAppender;
use crate::error::{ErrorNotice, MergeError};
use crate::input::InputFile;
use crate::media::{self, ImageKind, PDF_MEDIA_TYPE};
use crate::preview::{PreviewBackend, PreviewHandle};
use crate::{MergeOptions, MergeReport};
use std::rc::Rc;

/// Whether a merge is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeState {
    #[default]
    Idle,
    Busy,
}

/// One accepted image and the preview it owns
pub struct ImageEntry<B: PreviewBackend> {
    file: B::File,
    preview: PreviewHandle<B>,
}

impl<B: PreviewBackend> ImageEntry<B> {
    pub fn file(&self) -> &B::File {
        &self.file
    }

    pub fn name(&self) -> String {
        self.file.name()
    }

    pub fn media_type(&self) -> String {
        self.file.media_type()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview.url()
    }
}

/// State of one PDF + images merge UI
pub struct MergeSession<B: PreviewBackend> {
    backend: Rc<B>,
    pdf: Option<B::File>,
    images: Vec<ImageEntry<B>>,
    error: Option<ErrorNotice>,
    state: MergeState,
    options: MergeOptions,
}

impl<B: PreviewBackend> MergeSession<B> {
    pub fn new(backend: Rc<B>) -> Self {
        Self::with_options(backend, MergeOptions::default())
    }

    pub fn with_options(backend: Rc<B>, options: MergeOptions) -> Self {
        Self {
            backend,
            pdf: None,
            images: Vec::new(),
            error: None,
            state: MergeState::Idle,
            options,
        }
    }

    pub fn pdf(&self) -> Option<&B::File> {
        self.pdf.as_ref()
    }

    pub fn images(&self) -> &[ImageEntry<B>] {
        &self.images
    }

    pub fn error(&self) -> Option<ErrorNotice> {
        self.error
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error.map(ErrorNotice::message)
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == MergeState::Busy
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Handle a drop on the PDF target. Only the first candidate counts.
    pub fn drop_pdf(&mut self, candidates: Vec<B::File>) -> Result<(), MergeError> {
        let first = candidates.into_iter().next();
        match first {
            Some(file) if media::is_pdf(&file.media_type()) => {
                tracing::debug!(name = %file.name(), "PDF selected");
                self.pdf = Some(file);
                self.error = None;
                Ok(())
            }
            other => {
                let media_type = other.map(|f| f.media_type()).unwrap_or_default();
                tracing::debug!(%media_type, "rejected PDF drop");
                self.error = Some(ErrorNotice::InvalidPdf);
                Err(MergeError::InvalidPdf(media_type))
            }
        }
    }

    /// Handle a drop on the image target; returns how many files were added.
    ///
    /// Non-image files are dropped silently, and the error notice is cleared
    /// even when nothing survives the filter.
    pub fn drop_images(&mut self, candidates: impl IntoIterator<Item = B::File>) -> usize {
        self.error = None;

        let mut added = 0;
        for file in candidates {
            if !media::is_image_family(&file.media_type()) {
                continue;
            }
            match PreviewHandle::acquire(&self.backend, &file) {
                Ok(preview) => {
                    self.images.push(ImageEntry { file, preview });
                    added += 1;
                }
                Err(e) => tracing::warn!(error = %e, "skipping image without preview"),
            }
        }
        tracing::debug!(added, total = self.images.len(), "images dropped");
        added
    }

    /// Remove one image, releasing its preview. Order of the rest is kept.
    pub fn remove_image(&mut self, index: usize) -> Result<(), MergeError> {
        if index >= self.images.len() {
            return Err(MergeError::ImageIndexOutOfRange {
                index,
                len: self.images.len(),
            });
        }
        let mut entry = self.images.remove(index);
        entry.preview.release();
        Ok(())
    }

    /// Start a merge: check preconditions, snapshot inputs, go busy.
    ///
    /// Rejected with [`MergeError::Busy`] while another merge is running;
    /// the session is left untouched in that case.
    pub fn begin_merge(&mut self) -> Result<MergeJob<B::File>, MergeError> {
        if self.state == MergeState::Busy {
            return Err(MergeError::Busy);
        }
        self.error = None;

        let pdf = match &self.pdf {
            Some(pdf) if !self.images.is_empty() => pdf.clone(),
            _ => {
                self.error = Some(ErrorNotice::MissingInputs);
                return Err(MergeError::MissingInputs);
            }
        };

        self.state = MergeState::Busy;
        Ok(MergeJob {
            pdf,
            images: self.images.iter().map(|entry| entry.file.clone()).collect(),
            options: self.options.clone(),
        })
    }

    /// Return to idle and record the outcome of a job started by `begin_merge`
    pub fn finish_merge(&mut self, outcome: &Result<MergeReport, MergeError>) {
        self.state = MergeState::Idle;
        match outcome {
            Ok(report) => tracing::info!(
                original_pages = report.original_pages,
                pages_added = report.pages_added,
                skipped_images = report.skipped_images,
                output_bytes = report.output_bytes,
                "merge finished"
            ),
            Err(e) => {
                tracing::error!(error = %e, "merge failed");
                self.error = Some(e.notice());
            }
        }
    }

    /// Run a whole merge against `sink`; the session is idle again on return
    pub async fn merge<S: DownloadSink>(&mut self, sink: &S) -> Result<MergeReport, MergeError> {
        let job = self.begin_merge()?;
        let outcome = job.run(sink).await;
        self.finish_merge(&outcome);
        outcome
    }
}

/// Inputs captured for one merge run
#[derive(Debug, Clone)]
pub struct MergeJob<F: InputFile> {
    pdf: F,
    images: Vec<F>,
    options: MergeOptions,
}

impl<F: InputFile> MergeJob<F> {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Read, embed and serialize, then deliver. Nothing reaches `sink`
    /// unless every step before it succeeded.
    pub async fn run<S: DownloadSink>(self, sink: &S) -> Result<MergeReport, MergeError> {
        let pdf_bytes = self.pdf.read_bytes().await?;
        let mut appender = PdfAppender::load(&pdf_bytes, self.options.page_size)?;

        let mut skipped_images = 0;
        for file in &self.images {
            let bytes = file.read_bytes().await?;
            let name = file.name();
            match ImageKind::from_media_type(&file.media_type()) {
                Some(kind) => {
                    appender.append_image_page(&name, kind, &bytes)?;
                }
                None => {
                    tracing::debug!(image = %name, media_type = %file.media_type(), "skipping non-embeddable image");
                    skipped_images += 1;
                }
            }
        }

        let original_pages = appender.original_pages();
        let pages_added = appender.pages_added();
        let output = appender.finish(self.options.compress_streams)?;
        let output_bytes = output.len();

        sink.save(output, &self.options.file_name, PDF_MEDIA_TYPE)?;

        Ok(MergeReport {
            original_pages,
            pages_added,
            skipped_images,
            output_bytes,
        })
    }
}
