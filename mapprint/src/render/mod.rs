//! Job rendering
//!
//! [`MapRenderer`] drives a [`RenderJob`] page by page:
//!
//! ```text
//! select_print_layers ──► clone_for_print ──► + decorations
//!        │
//!        ▼  per page
//! LayerTileIterator ──► TileQueueBuffer ──► settle ──► PageComposer ──► JPEG
//!        │                                                              │
//!        └────────────── one page token, child of the job token ───────┘
//!                                                                       ▼
//!                                                             PdfWriter | JPEGs
//! ```
//!
//! Pages render one after the other. Within a page, tiles are composited
//! in pull order while up to `max_active` fetches run ahead. The first
//! failure, or a caller cancellation, aborts every outstanding fetch and
//! fails the whole render.

mod error;
mod progress;

pub use error::RenderError;
pub use progress::ProgressTracker;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::composer::PageComposer;
use crate::executor::BlockingExecutor;
use crate::job::RenderJob;
use crate::layer::{select_print_layers, LayerError, LayerKind};
use crate::pdf::{make_pdf, PdfPage};
use crate::scheduler::{LayerTileIterator, PendingTile, TileQueueBuffer};

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub label: String,
    /// Baseline JPEG bytes.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Renders print jobs to page JPEGs or a PDF.
pub struct MapRenderer<E: BlockingExecutor> {
    executor: Arc<E>,
}

impl<E: BlockingExecutor> MapRenderer<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    /// Renders every page of `job` to a JPEG.
    pub async fn render_pages(&self, job: &RenderJob) -> Result<Vec<PageImage>, RenderError> {
        if job.pages.is_empty() {
            return Err(RenderError::NoPages);
        }

        let mut layers: Vec<LayerKind> = select_print_layers(&job.layers)?
            .iter()
            .map(LayerKind::clone_for_print)
            .collect();
        layers.extend(job.decorations.iter().map(LayerKind::clone_for_print));

        info!(
            pages = job.pages.len(),
            layers = layers.len(),
            resolution = job.resolution,
            scale = job.scale,
            "Rendering job"
        );

        let mut tracker = ProgressTracker::new(job.progress.clone(), &layers, job.pages.len());
        let mut images = Vec::with_capacity(job.pages.len());
        for index in 0..job.pages.len() {
            images.push(self.render_page(job, index, &layers, &mut tracker).await?);
        }

        info!(pages = images.len(), "Job rendered");
        Ok(images)
    }

    /// Renders every page of `job` into one PDF document.
    pub async fn render_pdf(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        let pages = self.render_pages(job).await?;
        let resolution = job.resolution;

        let pdf = self
            .executor
            .execute_blocking(move || {
                let entries: Vec<PdfPage<'_>> = pages
                    .iter()
                    .map(|page| PdfPage {
                        jpeg: &page.jpeg,
                        width: page.width,
                        height: page.height,
                    })
                    .collect();
                make_pdf(&entries, resolution)
            })
            .await?
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        debug!(bytes = pdf.len(), "PDF assembled");
        Ok(pdf)
    }

    #[instrument(skip(self, job, layers, tracker), fields(label = %job.pages[index].label))]
    async fn render_page(
        &self,
        job: &RenderJob,
        index: usize,
        layers: &[LayerKind],
        tracker: &mut ProgressTracker,
    ) -> Result<PageImage, RenderError> {
        if job.cancellation.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        let options = job
            .print_options(index)
            .ok_or_else(|| RenderError::Internal(format!("page {} out of range", index)))?;

        let page_token = job.cancellation.child_token();
        let source = LayerTileIterator::new(
            layers.to_vec(),
            options.clone(),
            job.zooms,
            page_token.clone(),
        );
        let mut buffer = TileQueueBuffer::new(source, job.max_active);
        let mut composer = PageComposer::for_page(&options)?;

        if let Err(err) =
            compose_tiles(&mut buffer, &mut composer, tracker, &job.cancellation).await
        {
            page_token.cancel();
            let aborted = buffer.abort();
            warn!(page = index, aborted = aborted, error = %err, "Page render failed");
            return Err(err);
        }
        drop(buffer);

        let (width, height) = (composer.width(), composer.height());
        let quality = job.jpeg_quality;
        let jpeg = self
            .executor
            .execute_blocking(move || composer.encode_jpeg(quality))
            .await??;

        debug!(
            page = index,
            width = width,
            height = height,
            bytes = jpeg.len(),
            "Page encoded"
        );
        Ok(PageImage {
            label: options.page_label,
            jpeg,
            width,
            height,
        })
    }
}

/// Pulls, settles and composites tiles until the page is complete.
async fn compose_tiles(
    buffer: &mut TileQueueBuffer,
    composer: &mut PageComposer,
    tracker: &mut ProgressTracker,
    cancellation: &CancellationToken,
) -> Result<(), RenderError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(RenderError::Cancelled),
            next = buffer.next() => next.map_err(layer_error)?,
        };
        let Some(PendingTile {
            token,
            layer,
            progress_weight,
            ..
        }) = next
        else {
            return Ok(());
        };

        let settled = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(RenderError::Cancelled),
            settled = token.settle() => settled,
        };
        let info = settled.map_err(|e| {
            if e.is_aborted() && cancellation.is_cancelled() {
                RenderError::Cancelled
            } else {
                layer_error(e)
            }
        })?;

        trace!(layer = %layer, "Tile settled");
        composer.put_tile(info)?;
        tracker.advance(progress_weight);
    }
}

fn layer_error(err: LayerError) -> RenderError {
    match err {
        LayerError::Draw { .. } => RenderError::Draw(err),
        _ => RenderError::Fetch(err),
    }
}
