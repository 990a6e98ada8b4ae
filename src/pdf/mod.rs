//! PDF processing
//!
//! Preview rendering goes through MuPDF, page reassembly through lopdf.

mod assembler;
mod error;
mod rasterizer;
mod types;

pub use assembler::{assemble, DocumentAssembler};
pub use error::{AssemblyError, RasterError};
pub use rasterizer::{fit_within, read_info, render_previews, PageRasterizer, RENDER_TIMEOUT_SECS};
pub use types::{
    normalize_rotation, AssemblyResult, PagePreview, PageReference, PdfInfo, METADATA_KEYS,
    PREVIEW_MAX_HEIGHT, PREVIEW_MAX_WIDTH, RENDER_SCALE,
};
