use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::files::dtos::{
    DeleteFileDto, DeleteFileResponseDto, ResizeOptions, UploadError, UploadFileDto,
    UploadOptionsOverride, UploadedFile,
};
use crate::features::files::services::UploadService;
use crate::shared::types::ApiResponse;

fn parse_number<T: std::str::FromStr>(field: &str, text: &str) -> Result<Option<T>, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<T>()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Invalid value for '{}': {}", field, text)))
}

/// A body cut off by the request limit reports the upload size limit,
/// anything else is a malformed form
fn multipart_error(err: MultipartError, max_size: usize, context: &str) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        debug!("Multipart body exceeded the request limit: {}", err);
        return UploadError::file_too_large(max_size).into();
    }

    debug!("{}: {}", context, err);
    AppError::BadRequest(format!("{}: {}", context, err))
}

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `folder`: Destination folder (optional, defaults to "shikshaguru")
/// - `quality`: Initial image quality 0-100 (optional, defaults to 80)
/// - `width` / `height`: Box to fit images inside (optional, never enlarges)
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional folder, quality and resize fields",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<UploadedFile>),
        (status = 400, description = "File too large, type not allowed, or malformed form"),
        (status = 502, description = "Storage provider rejected the upload"),
        (status = 504, description = "Storage provider did not answer in time")
    )
)]
pub async fn upload_file(
    State(service): State<Arc<UploadService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedFile>>), AppError> {
    let mut file: Option<(Vec<u8>, String)> = None;
    let mut overrides = UploadOptionsOverride::default();
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;

    let max_size = service.max_file_size();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_size, "Failed to read multipart data"))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                // The client's content type is ignored; the pipeline sniffs bytes
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_size, "Failed to read file data"))?;

                file = Some((data.to_vec(), file_name));
            }
            "folder" | "quality" | "width" | "height" => {
                let text = field.text().await.map_err(|e| {
                    multipart_error(e, max_size, &format!("Failed to read {} field", field_name))
                })?;

                match field_name.as_str() {
                    "folder" => {
                        overrides.folder = Some(text.trim().to_string()).filter(|f| !f.is_empty())
                    }
                    "quality" => overrides.quality = parse_number(&field_name, &text)?,
                    "width" => width = parse_number(&field_name, &text)?,
                    _ => height = parse_number(&field_name, &text)?,
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (data, file_name) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    if overrides.quality.is_some_and(|q| q > 100) {
        return Err(AppError::BadRequest(
            "quality must be between 0 and 100".to_string(),
        ));
    }
    overrides.resize = ResizeOptions::from_dimensions(width, height);

    let uploaded = service.upload(data, &file_name, overrides).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(uploaded), None)),
    ))
}

/// Delete a file by its public id
#[utoipa::path(
    delete,
    path = "/api/files",
    tag = "files",
    request_body = DeleteFileDto,
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteFileResponseDto>),
        (status = 400, description = "Invalid public id"),
        (status = 502, description = "Storage provider could not delete the file")
    )
)]
pub async fn delete_file(
    State(service): State<Arc<UploadService>>,
    AppJson(dto): AppJson<DeleteFileDto>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    service.delete(&dto.public_id).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: true }),
        Some("File deleted successfully".to_string()),
    )))
}
