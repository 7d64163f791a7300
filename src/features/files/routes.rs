use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{delete_file, upload_file};
use crate::features::files::services::UploadService;
use crate::shared::constants::MULTIPART_OVERHEAD;

/// Create routes for the files feature
pub fn routes(upload_service: Arc<UploadService>) -> Router {
    let body_limit = upload_service.max_file_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/api/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/files", delete(delete_file))
        .with_state(upload_service)
}
