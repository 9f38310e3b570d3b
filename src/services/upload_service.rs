// src/services/upload_service.rs

use std::path::PathBuf;

use uuid::Uuid;

use crate::common::error::AppError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

// Prefixo público servido pelo ServeDir
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
        }
    }
}

/// Identifica a imagem pelos bytes iniciais, não pela extensão nem pelo
/// Content-Type informado pelo cliente.
pub fn detect_image(bytes: &[u8]) -> Option<ImageKind> {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    if bytes.starts_with(PNG) {
        Some(ImageKind::Png)
    } else if bytes.starts_with(JPEG) {
        Some(ImageKind::Jpeg)
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageKind::Webp)
    } else {
        None
    }
}

#[derive(Clone)]
pub struct UploadService {
    root: PathBuf,
    // Ex.: "https://api.restaurante.com"; vazio gera URL relativa
    public_base_url: String,
}

impl UploadService {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Grava a imagem em `<root>/<folder>/<uuid>.<ext>` e devolve a URL pública.
    pub async fn store_image(&self, folder: &str, bytes: &[u8]) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::InvalidUpload("empty".into()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::UploadTooLarge);
        }
        let kind = detect_image(bytes).ok_or_else(|| AppError::InvalidUpload("unsupported_type".into()))?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), kind.extension());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::debug!(folder, file = %file_name, size = bytes.len(), "Upload gravado");
        Ok(format!("{}{PUBLIC_PREFIX}/{folder}/{file_name}", self.public_base_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_formats_by_magic_bytes() {
        assert_eq!(
            detect_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some(ImageKind::Png)
        );
        assert_eq!(detect_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(detect_image(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageKind::Webp));
    }

    #[test]
    fn rejects_other_content() {
        assert_eq!(detect_image(b"GIF89a"), None);
        assert_eq!(detect_image(b"%PDF-1.7"), None);
        assert_eq!(detect_image(b"RIFF"), None);
    }

    #[tokio::test]
    async fn store_rejects_oversized_and_unknown_files() {
        let service = UploadService::new(std::env::temp_dir().join("resto-upload-test"), "");

        let big = vec![0xFFu8; MAX_UPLOAD_BYTES + 1];
        assert!(matches!(service.store_image("logos", &big).await, Err(AppError::UploadTooLarge)));

        let gif = b"GIF89a-----".to_vec();
        assert!(matches!(
            service.store_image("logos", &gif).await,
            Err(AppError::InvalidUpload(_))
        ));
    }

    #[tokio::test]
    async fn public_base_url_prefixes_returned_url() {
        let root = std::env::temp_dir().join(format!("resto-upload-{}", Uuid::new_v4()));
        let service = UploadService::new(&root, "https://api.exemplo.com/");

        let url = service.store_image("logos", &[0xFF, 0xD8, 0xFF, 0xDB]).await.unwrap();
        assert!(url.starts_with("https://api.exemplo.com/uploads/logos/"));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn store_writes_file_and_returns_public_url() {
        let root = std::env::temp_dir().join(format!("resto-upload-{}", Uuid::new_v4()));
        let service = UploadService::new(&root, "");

        let url = service
            .store_image("avatars", &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/avatars/"));
        assert!(url.ends_with(".jpg"));
        let file = root.join(url.trim_start_matches("/uploads/"));
        assert!(file.exists());

        let _ = std::fs::remove_dir_all(root);
    }
}
