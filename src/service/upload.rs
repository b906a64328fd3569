//! Image uploads: type and size checks, then storage on S3 or local disk.

use crate::error::AppError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// (MIME type, file extension).
pub const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

pub const FOLDERS: &[&str] = &["products", "categories", "banners", "blogs"];

#[derive(Debug, Serialize, PartialEq)]
pub struct StoredImage {
    pub url: String,
    pub key: String,
    pub size: usize,
    pub content_type: String,
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Store bytes under `key`; returns the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

/// Files under a directory served statically at `public_base`.
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        LocalStorage {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStorage for LocalStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        let path = self.root.join(key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("create {}: {}", dir.display(), e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {}", path.display(), e)))?;
        Ok(format!("{}/{}", self.public_base, key))
    }
}

pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3Storage {
    /// Credentials and region from the standard AWS environment.
    pub async fn from_env(bucket: &str, public_base: Option<&str>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let public_base = public_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket));
        S3Storage {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.to_string(),
            public_base,
        }
    }
}

#[async_trait]
impl ImageStorage for S3Storage {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("s3 put {}: {}", key, e)))?;
        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Extension for an allowed MIME type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let ct = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    ALLOWED_TYPES.iter().find(|(m, _)| *m == ct).map(|(_, ext)| *ext)
}

/// MIME type from magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && (&bytes[8..12] == b"avif" || &bytes[8..12] == b"avis") {
        Some("image/avif")
    } else {
        None
    }
}

pub fn folder(requested: Option<&str>) -> Result<&'static str, AppError> {
    match requested.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok("products"),
        Some(f) => FOLDERS
            .iter()
            .copied()
            .find(|known| *known == f)
            .ok_or_else(|| AppError::Validation(format!("folder must be one of: {}", FOLDERS.join(", ")))),
    }
}

/// Check type and size; returns (MIME type, extension).
pub fn check(declared: Option<&str>, bytes: &[u8], max_bytes: usize) -> Result<(&'static str, &'static str), AppError> {
    if bytes.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "file is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("file is empty".into()));
    }
    let declared = declared.unwrap_or("application/octet-stream");
    if extension_for(declared).is_none() {
        return Err(AppError::UnsupportedMediaType(format!("{} is not an allowed image type", declared)));
    }
    let actual = sniff(bytes)
        .ok_or_else(|| AppError::UnsupportedMediaType("file content is not a recognized image".into()))?;
    let ext = extension_for(actual).ok_or_else(|| AppError::UnsupportedMediaType(actual.to_string()))?;
    Ok((actual, ext))
}

pub async fn store(
    storage: &dyn ImageStorage,
    folder_name: Option<&str>,
    declared: Option<&str>,
    bytes: Vec<u8>,
    max_bytes: usize,
) -> Result<StoredImage, AppError> {
    let folder = folder(folder_name)?;
    let (content_type, ext) = check(declared, &bytes, max_bytes)?;
    let key = format!("{}/{}.{}", folder, Uuid::new_v4(), ext);
    let size = bytes.len();
    let url = storage.put(&key, bytes, content_type).await?;
    tracing::info!(key = %key, size, content_type, "image stored");
    Ok(StoredImage {
        url,
        key,
        size,
        content_type: content_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn allowed_types_only() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert!(matches!(
            check(Some("application/pdf"), PNG, 1024),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn oversize_is_413() {
        assert!(matches!(check(Some("image/png"), PNG, 4), Err(AppError::PayloadTooLarge(_))));
    }

    #[test]
    fn content_must_be_an_image() {
        assert!(matches!(
            check(Some("image/png"), b"<svg onload=alert(1)>", 1024),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert_eq!(check(Some("image/png"), PNG, 1024).unwrap(), ("image/png", "png"));
        let webp = b"RIFF\0\0\0\0WEBPVP8 ";
        assert_eq!(sniff(webp), Some("image/webp"));
        let avif = b"\0\0\0\x1cftypavif";
        assert_eq!(sniff(avif), Some("image/avif"));
    }

    #[test]
    fn folders_whitelisted() {
        assert_eq!(folder(None).unwrap(), "products");
        assert_eq!(folder(Some("banners")).unwrap(), "banners");
        assert!(folder(Some("../etc")).is_err());
    }

    #[tokio::test]
    async fn local_storage_writes_under_key() {
        let root = std::env::temp_dir().join(format!("rigstore-upload-{}", Uuid::new_v4()));
        let storage = LocalStorage::new(&root, "/uploads/");
        let stored = store(&storage, Some("blogs"), Some("image/png"), PNG.to_vec(), 1024)
            .await
            .unwrap();
        assert!(stored.key.starts_with("blogs/") && stored.key.ends_with(".png"));
        assert_eq!(stored.url, format!("/uploads/{}", stored.key));
        assert_eq!(tokio::fs::read(root.join(&stored.key)).await.unwrap(), PNG);
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
