//! Image storage behind the `/images/{name}` route

use async_trait::async_trait;
use picforge_common::errors::{AppError, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Image bytes with their content type
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Trait for resolving an image file name
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetch an image. Missing images are [`AppError::ImageNotFound`].
    async fn fetch(&self, name: &str) -> Result<StoredImage>;
}

/// Serves images from a local directory
pub struct DirectoryImageStore {
    root: PathBuf,
}

impl DirectoryImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ImageStore for DirectoryImageStore {
    async fn fetch(&self, name: &str) -> Result<StoredImage> {
        validate_image_name(name)?;

        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(StoredImage {
                bytes,
                content_type: content_type_for(name),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::ImageNotFound {
                name: name.to_string(),
            }),
            Err(e) => {
                tracing::error!(error = %e, "Image storage read failed");
                Err(AppError::Internal {
                    message: "Image storage unavailable".to_string(),
                })
            }
        }
    }
}

/// Reject names that could escape the image directory
pub fn validate_image_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");

    if invalid {
        return Err(AppError::Validation {
            message: "Invalid image name".to_string(),
            field: Some("name".to_string()),
        });
    }
    Ok(())
}

/// Content type from the file extension
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picforge_common::ErrorCode;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("picforge-images-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_image_name("sunset1.jpg").is_ok());
        assert!(validate_image_name("my photo (2).PNG").is_ok());

        for bad in ["", "../secret.jpg", "a/b.jpg", "a\\b.jpg", "..", "x\0.jpg"] {
            let err = validate_image_name(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError, "{:?}", bad);
        }
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_fetch_existing_and_missing() {
        let dir = temp_dir();
        std::fs::write(dir.join("cat.jpg"), b"jpeg-bytes").unwrap();
        let store = DirectoryImageStore::new(&dir);

        let image = store.fetch("cat.jpg").await.unwrap();
        assert_eq!(image.bytes, b"jpeg-bytes");
        assert_eq!(image.content_type, "image/jpeg");

        let err = store.fetch("dog.jpg").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ImageNotFound);

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_internal() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("folder.jpg")).unwrap();
        let store = DirectoryImageStore::new(&dir);

        let err = store.fetch("folder.jpg").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.to_string().contains("folder"));

        std::fs::remove_dir_all(dir).ok();
    }
}
