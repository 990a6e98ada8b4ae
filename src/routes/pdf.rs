//! PDF API endpoints
//!
//! - `POST /upload`: store a source PDF and return page previews
//! - `POST /create-pdf`: reassemble pages from stored sources
//! - `GET /download/:result_id`: fetch a generated PDF
//! - `GET /result/:result_id`: describe a generated PDF

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, HeaderValue},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::mupdf::PDF_MIME;
use crate::pdf::{PagePreview, PageReference, PdfInfo};
use crate::state::AppState;
use crate::storage::{sanitize_filename, Directory, StoredFile};

/// Length of the random id prefixed to output filenames
pub const RESULT_ID_LEN: usize = 8;

/// Upload response. Rasterization failures still report the stored filename.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Processed {
        filename: String,
        pdf_info: PdfInfo,
        pages: Vec<PagePreview>,
    },
    Failed {
        filename: String,
        error: String,
    },
}

/// Body of `POST /create-pdf`
#[derive(Debug, Deserialize)]
pub struct CreatePdfRequest {
    pub pages: Vec<PageReference>,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePdfResponse {
    pub result_id: String,
    pub filename: String,
    pub page_count: usize,
    pub file_size: u64,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub result_id: String,
    pub filename: String,
    pub file_size: u64,
    pub page_count: usize,
    pub created_at: String,
    pub download_url: String,
}

/// Upload a source PDF
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if field.content_type() != Some(PDF_MIME) {
            return Err(AppError::Validation("File must be a PDF".into()));
        }

        let raw_name = field
            .file_name()
            .ok_or_else(|| AppError::Validation("Missing filename".into()))?
            .to_string();
        let filename = sanitize_filename(&raw_name)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

        state
            .store()
            .write(Directory::Sources, &filename, &data)
            .await?;

        tracing::info!(filename = %filename, size = data.len(), "PDF uploaded");

        let response = match state.rasterizer().describe(&filename).await {
            Ok((pdf_info, pages)) => UploadResponse::Processed {
                filename,
                pdf_info,
                pages,
            },
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Preview generation failed");
                UploadResponse::Failed {
                    filename,
                    error: e.to_string(),
                }
            }
        };

        return Ok(Json(response));
    }

    Err(AppError::Validation("No file uploaded".into()))
}

/// Build a new PDF from pages of uploaded sources
pub async fn create_pdf(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreatePdfRequest>, JsonRejection>,
) -> Result<Json<CreatePdfResponse>> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;

    if request.pages.is_empty() {
        return Err(AppError::Validation("No pages requested".into()));
    }
    let filename = sanitize_filename(&request.filename)?;

    let result_id = new_result_id();
    let output_name = format!("{}_{}", result_id, filename);

    let result = state
        .assembler()
        .build(&request.pages, &output_name)
        .await?;

    Ok(Json(CreatePdfResponse {
        result_id,
        filename: output_name,
        page_count: result.page_count,
        file_size: result.file_size,
    }))
}

/// Download a generated PDF
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Response> {
    let file = find_result(&state, &result_id).await?;
    let data = state.store().read(Directory::Outputs, &file.name).await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        file.name.replace(['"', '\\'], "_")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Response::builder()
        .header(header::CONTENT_TYPE, PDF_MIME)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Describe a generated PDF
pub async fn get_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Json<ResultResponse>> {
    let file = find_result(&state, &result_id).await?;
    let data = state.store().read(Directory::Outputs, &file.name).await?;

    let page_count = tokio::task::spawn_blocking(move || {
        lopdf::Document::load_mem(&data).map(|doc| doc.get_pages().len())
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e| AppError::Processing(format!("Failed to read PDF: {}", e)))?;

    Ok(Json(ResultResponse {
        download_url: format!("/download/{}", result_id),
        result_id,
        filename: file.name.clone(),
        file_size: file.size,
        page_count,
        created_at: file.modified_utc().to_rfc3339(),
    }))
}

async fn find_result(state: &AppState, result_id: &str) -> Result<StoredFile> {
    let not_found = || AppError::NotFound(format!("Result not found: {}", result_id));

    if result_id.is_empty() || !result_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(not_found());
    }

    state
        .store()
        .find_by_prefix(Directory::Outputs, &format!("{}_", result_id))
        .await?
        .ok_or_else(not_found)
}

/// First [`RESULT_ID_LEN`] hex digits of a random UUID
pub fn new_result_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(RESULT_ID_LEN);
    id
}
