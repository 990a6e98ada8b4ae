//! Page rasterization for upload previews
//!
//! Every page is rendered with MuPDF at [`RENDER_SCALE`], shrunk with a
//! Lanczos3 filter into a [`PREVIEW_MAX_WIDTH`]×[`PREVIEW_MAX_HEIGHT`] box and
//! returned as a PNG data URI. The source file is never modified.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use mupdf::{Colorspace, Matrix, MetadataName};
use tokio::time::{timeout, Duration};

use super::error::RasterError;
use super::types::{
    PagePreview, PdfInfo, METADATA_KEYS, PREVIEW_MAX_HEIGHT, PREVIEW_MAX_WIDTH, RENDER_SCALE,
};
use crate::mupdf::SafeDocument;
use crate::storage::{ArtifactStore, Directory};

/// Upper bound for rendering one document
pub const RENDER_TIMEOUT_SECS: u64 = 60;

/// Renders previews and reads info for stored source documents
#[derive(Clone)]
pub struct PageRasterizer {
    store: ArtifactStore,
}

impl PageRasterizer {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Render a preview of every page of `source_id`
    pub async fn list_pages(&self, source_id: &str) -> Result<Vec<PagePreview>, RasterError> {
        let doc = self.open(source_id).await?;
        run_blocking(move |cancelled| render_previews(&doc, cancelled)).await
    }

    /// Page count, metadata and filename of `source_id`
    pub async fn get_info(&self, source_id: &str) -> Result<PdfInfo, RasterError> {
        let doc = self.open(source_id).await?;
        run_blocking(move |_| read_info(&doc)).await
    }

    /// Info and previews from a single parse of the source
    pub async fn describe(
        &self,
        source_id: &str,
    ) -> Result<(PdfInfo, Vec<PagePreview>), RasterError> {
        let doc = self.open(source_id).await?;
        run_blocking(move |cancelled| {
            doc.with_doc(|d| {
                let pages = render_pages(d, &doc, cancelled)?;
                Ok((info_from(d, &doc), pages))
            })
        })
        .await
    }

    async fn open(&self, source_id: &str) -> Result<SafeDocument, RasterError> {
        let data = self.store.read(Directory::Sources, source_id).await?;
        let id = source_id.to_string();
        run_blocking(move |_| SafeDocument::from_bytes(Arc::new(data), id)).await
    }
}

/// Run CPU-bound MuPDF work on the blocking pool under [`RENDER_TIMEOUT_SECS`].
///
/// A blocking task cannot be aborted, so on timeout the closure's flag is
/// raised and the render loop gives up at the next page.
async fn run_blocking<F, T>(f: F) -> Result<T, RasterError>
where
    F: FnOnce(&AtomicBool) -> Result<T, RasterError> + Send + 'static,
    T: Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);

    match timeout(
        Duration::from_secs(RENDER_TIMEOUT_SECS),
        tokio::task::spawn_blocking(move || f(&flag)),
    )
    .await
    {
        Ok(join_result) => join_result.map_err(|e| RasterError::Join(e.to_string()))?,
        Err(_) => {
            cancelled.store(true, Ordering::Relaxed);
            tracing::warn!(timeout_secs = RENDER_TIMEOUT_SECS, "Rendering timed out");
            Err(RasterError::Timeout(RENDER_TIMEOUT_SECS))
        }
    }
}

/// Render every page and build its thumbnail.
///
/// Stops with [`RasterError::Timeout`] once `cancelled` is set.
pub fn render_previews(
    doc: &SafeDocument,
    cancelled: &AtomicBool,
) -> Result<Vec<PagePreview>, RasterError> {
    doc.with_doc(|d| render_pages(d, doc, cancelled))
}

/// Page count and info-dictionary metadata
pub fn read_info(doc: &SafeDocument) -> Result<PdfInfo, RasterError> {
    doc.with_doc(|d| Ok(info_from(d, doc)))
}

fn render_pages(
    mupdf_doc: &mupdf::Document,
    doc: &SafeDocument,
    cancelled: &AtomicBool,
) -> Result<Vec<PagePreview>, RasterError> {
    let page_count = doc.page_count();
    let matrix = Matrix::new_scale(RENDER_SCALE, RENDER_SCALE);
    let colorspace = Colorspace::device_rgb();
    let mut previews = Vec::with_capacity(page_count);

    for index in 0..page_count {
        if cancelled.load(Ordering::Relaxed) {
            tracing::debug!(document = %doc.id(), rendered = index, "Rendering abandoned");
            return Err(RasterError::Timeout(RENDER_TIMEOUT_SECS));
        }

        let render_err = |e: mupdf::Error| RasterError::Render {
            page: index + 1,
            reason: e.to_string(),
        };

        let page = mupdf_doc.load_page(index as i32).map_err(render_err)?;
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, true)
            .map_err(render_err)?;

        let full = pixmap_to_image(&pixmap)?;
        let (width, height) = (full.width(), full.height());
        let png = encode_thumbnail(full)?;

        previews.push(PagePreview {
            page_number: index + 1,
            image_data: format!("data:image/png;base64,{}", BASE64.encode(png)),
            width,
            height,
        });
    }

    tracing::debug!(document = %doc.id(), pages = previews.len(), "Rendered page previews");
    Ok(previews)
}

fn info_from(mupdf_doc: &mupdf::Document, doc: &SafeDocument) -> PdfInfo {
    let names = [
        MetadataName::Title,
        MetadataName::Author,
        MetadataName::Subject,
        MetadataName::Keywords,
        MetadataName::Creator,
        MetadataName::Producer,
        MetadataName::CreationDate,
        MetadataName::ModDate,
    ];

    let metadata: BTreeMap<String, String> = METADATA_KEYS
        .iter()
        .zip(names)
        .map(|(key, name)| (key.to_string(), mupdf_doc.metadata(name).unwrap_or_default()))
        .collect();

    PdfInfo {
        page_count: doc.page_count(),
        metadata,
        filename: doc.id().to_string(),
    }
}

fn pixmap_to_image(pixmap: &mupdf::Pixmap) -> Result<RgbImage, RasterError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| RasterError::Image("Failed to create image buffer".to_string()))
}

/// Shrink into the preview box and encode as PNG
fn encode_thumbnail(full: RgbImage) -> Result<Vec<u8>, RasterError> {
    let (width, height) = fit_within(
        full.width(),
        full.height(),
        PREVIEW_MAX_WIDTH,
        PREVIEW_MAX_HEIGHT,
    );

    let mut thumbnail = DynamicImage::ImageRgb8(full);
    if (width, height) != (thumbnail.width(), thumbnail.height()) {
        thumbnail = thumbnail.resize_exact(width, height, FilterType::Lanczos3);
    }

    let mut output = Vec::new();
    thumbnail
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RasterError::Image(e.to_string()))?;
    Ok(output)
}

/// Largest size no bigger than `max_width`×`max_height` with the same aspect
/// ratio. Images already inside the box are left as they are.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    let fitted_width = ((f64::from(width) * scale).round() as u32).clamp(1, max_width);
    let fitted_height = ((f64::from(height) * scale).round() as u32).clamp(1, max_height);
    (fitted_width, fitted_height)
}
