use std::env;
use std::time::Duration;

use crate::shared::constants::{
    DEFAULT_ALLOWED_MIME_TYPES, DEFAULT_MAX_FILE_SIZE, DEFAULT_QUALITY, DEFAULT_UPLOAD_FOLDER,
    IMAGE_TARGET_SIZE,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub swagger: SwaggerConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Defaults applied to every upload unless the caller overrides them
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Folder in the remote store that uploads land in
    pub default_folder: String,
    /// Maximum accepted upload size in bytes
    pub max_file_size: usize,
    /// Initial encode quality for image compression (0-100)
    pub default_quality: u8,
    /// Byte budget the image compressor aims for
    pub target_size: usize,
    /// Deadline for a single store call, `None` waits indefinitely
    pub store_timeout: Option<Duration>,
}

/// Which object store backs the upload pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    Cloudinary,
    MinIO,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub cloudinary: Option<CloudinaryConfig>,
    pub minio: Option<MinIOConfig>,
}

/// Cloudinary account credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// REST API base URL, overridable for tests and proxies
    pub api_base_url: String,
}

/// MinIO/S3 storage configuration for file uploads
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Public endpoint URL used to build file URLs (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title =
            env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Shikshaguru Upload API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "File upload API for Shikshaguru".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl UploadConfig {
    const DEFAULT_STORE_TIMEOUT_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let default_folder = env::var("UPLOAD_DEFAULT_FOLDER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string());

        let max_file_size = env::var("UPLOAD_MAX_FILE_SIZE")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "UPLOAD_MAX_FILE_SIZE must be a valid number".to_string())?;

        let default_quality = env::var("UPLOAD_DEFAULT_QUALITY")
            .unwrap_or_else(|_| DEFAULT_QUALITY.to_string())
            .parse::<u8>()
            .ok()
            .filter(|q| *q <= 100)
            .ok_or_else(|| "UPLOAD_DEFAULT_QUALITY must be a number from 0 to 100".to_string())?;

        let target_size = env::var("UPLOAD_TARGET_SIZE")
            .unwrap_or_else(|_| IMAGE_TARGET_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "UPLOAD_TARGET_SIZE must be a valid number".to_string())?;

        // 0 disables the deadline
        let store_timeout_secs = env::var("UPLOAD_STORE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_STORE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "UPLOAD_STORE_TIMEOUT_SECS must be a valid number".to_string())?;

        Ok(Self {
            default_folder,
            max_file_size,
            default_quality,
            target_size,
            store_timeout: (store_timeout_secs > 0).then(|| Duration::from_secs(store_timeout_secs)),
        })
    }

    pub fn allowed_types(&self) -> Vec<String> {
        DEFAULT_ALLOWED_MIME_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect()
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_folder: DEFAULT_UPLOAD_FOLDER.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_quality: DEFAULT_QUALITY,
            target_size: IMAGE_TARGET_SIZE,
            store_timeout: None,
        }
    }
}

impl StorageProvider {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "cloudinary" => Ok(StorageProvider::Cloudinary),
            "minio" | "s3" => Ok(StorageProvider::MinIO),
            other => Err(format!(
                "Unknown STORAGE_PROVIDER '{}'. Expected 'cloudinary' or 'minio'",
                other
            )),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let provider = StorageProvider::parse(
            &env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "cloudinary".to_string()),
        )?;

        let (cloudinary, minio) = match provider {
            StorageProvider::Cloudinary => (Some(CloudinaryConfig::from_env()?), None),
            StorageProvider::MinIO => (None, Some(MinIOConfig::from_env()?)),
        };

        Ok(Self {
            provider,
            cloudinary,
            minio,
        })
    }
}

impl CloudinaryConfig {
    const DEFAULT_API_BASE_URL: &'static str = "https://api.cloudinary.com";

    pub fn from_env() -> Result<Self, String> {
        let cloud_name = env::var("CLOUDINARY_CLOUD_NAME")
            .map_err(|_| "CLOUDINARY_CLOUD_NAME environment variable is required".to_string())?;

        let api_key = env::var("CLOUDINARY_API_KEY")
            .map_err(|_| "CLOUDINARY_API_KEY environment variable is required".to_string())?;

        let api_secret = env::var("CLOUDINARY_API_SECRET")
            .map_err(|_| "CLOUDINARY_API_SECRET environment variable is required".to_string())?;

        let api_base_url = env::var("CLOUDINARY_API_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
            api_base_url,
        })
    }
}

impl MinIOConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let public_endpoint =
            env::var("MINIO_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "shikshaguru-uploads".to_string());

        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        Ok(Self {
            endpoint,
            public_endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        })
    }
}
