//! Image hosting boundary.

use std::{io::Cursor, path::PathBuf};

use async_trait::async_trait;
use image::ImageReader;

use crate::{
    config,
    model::{UploadedImage, User},
    notification::{NotificationEvent, Notifier, dispatch},
};

pub const MANGA_COVER_FOLDER: &str = "manga-covers";
pub const CHAPTER_PAGE_FOLDER: &str = "chapter-pages";
pub const PROFILE_IMAGE_FOLDER: &str = "profile-images";

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("Folder `{0}` is not allowed")]
    InvalidFolder(String),
    #[error("Public id `{0}` is not valid")]
    InvalidPublicId(String),
    #[error("Upload is empty")]
    EmptyPayload,
    #[error("Upload is not a supported image")]
    Image(#[from] image::ImageError),
    #[error("Failed to store image")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, data: &[u8], folder: &str) -> Result<UploadedImage, UploadError>;
    /// Returns whether an image was removed.
    async fn delete(&self, public_id: &str) -> Result<bool, UploadError>;
}

/// Folder and public id segments are limited to `[A-Za-z0-9_-]`.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

const EXTENSIONS: [&str; 4] = ["png", "jpg", "gif", "webp"];

/// Stores images below a directory served under `base_url`.
pub struct LocalMediaStore {
    base_path: PathBuf,
    base_url: String,
    secure_base_url: String,
}

impl LocalMediaStore {
    pub fn new(config: &config::Media) -> Self {
        LocalMediaStore {
            base_path: config.base_path.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secure_base_url: config.secure_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[tracing::instrument(name = "upload image", skip(self, data), fields(size = data.len()))]
    async fn upload(&self, data: &[u8], folder: &str) -> Result<UploadedImage, UploadError> {
        if !is_valid_key(folder) {
            return Err(UploadError::InvalidFolder(folder.to_string()));
        }
        if data.is_empty() {
            return Err(UploadError::EmptyPayload);
        }

        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let format = reader
            .format()
            .and_then(|f| f.extensions_str().first().copied())
            .filter(|ext| EXTENSIONS.contains(ext))
            .ok_or_else(|| {
                UploadError::Image(image::ImageError::Unsupported(
                    image::error::ImageFormatHint::Unknown.into(),
                ))
            })?;
        let (width, height) = reader.into_dimensions()?;

        let public_id = format!("{}/{}", folder, uuid::Uuid::new_v4());
        let file_name = format!("{}.{}", public_id, format);
        let path = self.base_path.join(&file_name);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        Ok(UploadedImage {
            url: format!("{}/{}", self.base_url, file_name),
            secure_url: format!("{}/{}", self.secure_base_url, file_name),
            public_id,
            format: format.to_string(),
            width,
            height,
            size: data.len() as u64,
        })
    }

    #[tracing::instrument(name = "delete image", skip(self))]
    async fn delete(&self, public_id: &str) -> Result<bool, UploadError> {
        if !is_valid_key(public_id) {
            return Err(UploadError::InvalidPublicId(public_id.to_string()));
        }

        for extension in EXTENSIONS {
            let path = self
                .base_path
                .join(format!("{}.{}", public_id, extension));
            match tokio::fs::remove_file(&path).await {
                Ok(()) => return Ok(true),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
                Err(error) => return Err(error.into()),
            }
        }

        Ok(false)
    }
}

/// Uploads an image for `actor` and, when the actor has a registered device,
/// sends an upload notification.
#[tracing::instrument(name = "upload image for user", skip_all, fields(user_id = actor.id, folder = %folder))]
pub async fn upload_image(
    media: &dyn MediaStore,
    notifier: &dyn Notifier,
    actor: &User,
    data: &[u8],
    folder: &str,
) -> Result<UploadedImage, UploadError> {
    let image = media.upload(data, folder).await?;

    if let Some(token) = actor.device_token.as_deref().filter(|t| !t.is_empty()) {
        dispatch(
            notifier,
            NotificationEvent::upload_success(token, folder, &image),
        )
        .await;
    }

    Ok(image)
}
