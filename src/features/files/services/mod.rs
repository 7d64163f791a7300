pub mod file_type;
pub mod image_compressor;
pub mod remote_store;
mod upload_service;

pub use upload_service::UploadService;
