use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        files_handlers::upload_file,
        files_handlers::delete_file,
    ),
    components(
        schemas(
            files_dtos::UploadFileDto,
            files_dtos::UploadedFile,
            files_dtos::ResizeOptions,
            files_dtos::DeleteFileDto,
            files_dtos::DeleteFileResponseDto,
            ApiResponse<files_dtos::UploadedFile>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
        )
    ),
    tags(
        (name = "files", description = "File upload and deletion"),
    ),
    info(
        title = "Shikshaguru Upload API",
        version = "0.1.0",
        description = "File upload API for Shikshaguru",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
