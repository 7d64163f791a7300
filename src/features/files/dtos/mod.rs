pub mod file_dto;

pub use file_dto::{
    DeleteFileDto, DeleteFileResponseDto, DeleteResult, ResizeOptions, UploadError,
    UploadFileDto, UploadOptions, UploadOptionsOverride, UploadResult, UploadedFile,
};
