//! PDF data types
//!
//! Wire-facing shapes for previews, document info and page references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Render scale applied to page native resolution for previews
pub const RENDER_SCALE: f32 = 2.0;

/// Bounding box previews are shrunk into
pub const PREVIEW_MAX_WIDTH: u32 = 300;
pub const PREVIEW_MAX_HEIGHT: u32 = 400;

/// Metadata keys reported for every document, empty when absent
pub const METADATA_KEYS: [&str; 8] = [
    "title",
    "author",
    "subject",
    "keywords",
    "creator",
    "producer",
    "creationDate",
    "modDate",
];

/// One rendered page preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePreview {
    /// 1-based page number
    pub page_number: usize,
    /// `data:image/png;base64,...` thumbnail
    pub image_data: String,
    /// Full render width in pixels (not the thumbnail's)
    pub width: u32,
    /// Full render height in pixels (not the thumbnail's)
    pub height: u32,
}

/// Basic document information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: usize,
    pub metadata: BTreeMap<String, String>,
    pub filename: String,
}

/// A pointer to one page of one uploaded source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReference {
    /// Source filename in the uploads directory
    pub source_pdf: String,
    /// 1-based page number
    pub page_number: u32,
    /// Client correlation id, echoed only in logs
    #[serde(default)]
    pub unique_id: String,
    /// Requested rotation in degrees, any integer
    #[serde(default)]
    pub rotation: i32,
}

impl PageReference {
    pub fn new(source_pdf: impl Into<String>, page_number: u32, rotation: i32) -> Self {
        Self {
            source_pdf: source_pdf.into(),
            page_number,
            unique_id: String::new(),
            rotation,
        }
    }

    /// Rotation as stored in the output `/Rotate` entry
    pub fn normalized_rotation(&self) -> i64 {
        normalize_rotation(self.rotation)
    }
}

/// Normalize degrees to `0 | 90 | 180 | 270`.
///
/// Values are reduced modulo 360 and then rounded to the nearest right angle,
/// halfway values rounding up.
pub fn normalize_rotation(degrees: i32) -> i64 {
    let reduced = i64::from(degrees).rem_euclid(360);
    ((reduced + 45) / 90 * 90) % 360
}

/// Outcome of a successful reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssemblyResult {
    pub page_count: usize,
    pub file_size: u64,
}
